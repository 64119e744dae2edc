#![forbid(unsafe_code)]

use miette::Diagnostic;
use thiserror::Error;
use veld_model::{BranchId, Span};

/// Internal-consistency failures: the model violates its own well-formedness
/// contract. These abort the current validation call; they are never user
/// type errors (those are findings or the `Error` lattice value).
#[derive(Debug, Error, Diagnostic)]
pub enum ModelFault {
    #[error("access chain contains a forbidden element: {found}")]
    #[diagnostic(code(veld::sema::access_chain))]
    MalformedAccessChain {
        found: &'static str,
        #[label]
        span: Span,
    },

    #[error("access chain does not match the nesting of the accessed type ({ty})")]
    #[diagnostic(code(veld::sema::access_chain))]
    InconsistentAccessChain {
        ty: &'static str,
        #[label]
        span: Span,
    },

    #[error("record type has no field named `{field}`")]
    #[diagnostic(code(veld::sema::access_chain))]
    UnknownField {
        field: String,
        #[label]
        span: Span,
    },

    #[error("type reference does not target a type declaration: `{name}`")]
    #[diagnostic(code(veld::sema::alias))]
    NotATypeDeclaration { name: String },

    #[error("type reference chain exceeds {max} hops, alias cycle suspected")]
    #[diagnostic(code(veld::sema::alias))]
    AliasDepthExceeded { max: usize },

    #[error("branch {branch:?} is not owned by any statement")]
    #[diagnostic(code(veld::sema::containment))]
    BranchOutsideAction { branch: BranchId },

    #[error("assignment target does not resolve to a value declaration")]
    #[diagnostic(code(veld::sema::assignment))]
    UnresolvedAssignmentTarget {
        #[label]
        span: Span,
    },
}

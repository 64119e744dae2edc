#![forbid(unsafe_code)]

use veld_model::{ActionId, BranchId, DeclId, Span};

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn display(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// Structural feature of the offending node a finding points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feature {
    AssignmentLhs,
    AssignmentRhs,
    VariableDeclaration,
    SelectOperand,
    ReturnValue,
}

/// Reference to the offending node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeRef {
    Action(ActionId),
    Branch(BranchId),
    Decl(DeclId),
}

/// One reported validation outcome. Findings never halt other checks; the
/// whole collection is returned together.
#[derive(Clone, Debug)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
    pub node: NodeRef,
    pub feature: Option<Feature>,
    /// Position within a multi-valued feature, where applicable.
    pub index: Option<usize>,
    pub span: Span,
}

impl Finding {
    pub fn error(message: impl Into<String>, node: NodeRef, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            node,
            feature: None,
            index: None,
            span,
        }
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.feature = Some(feature);
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

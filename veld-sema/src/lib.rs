#![forbid(unsafe_code)]

mod determinator;
mod error;
mod findings;
mod hierarchy;
mod lattice;
mod util;
mod validator;

pub use determinator::TypeDeterminator;
pub use error::ModelFault;
pub use findings::{Feature, Finding, NodeRef, Severity};
pub use hierarchy::FieldPath;
pub use lattice::ExpressionType;
pub use util::{accessed_declaration, find_type_definition, referred_values, MAX_ALIAS_HOPS};
pub use validator::Validator;

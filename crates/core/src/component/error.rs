use super::TypeKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("No component method '{name}' accepts self type {this} with arguments ({args})")]
    UnknownMethod {
        name: String,
        this: TypeKey,
        args: String,
    },
    #[error("Call to component method '{name}' is ambiguous between {candidates} candidates")]
    AmbiguousMethod { name: String, candidates: usize },
    /// The method itself failed. The original error is passed through unchanged.
    #[error(transparent)]
    Failed(anyhow::Error),
    #[error("Component call was dropped before it produced a result")]
    Interrupted,
    #[error("Component argument {position} is not a {expected}")]
    TypeMismatch {
        position: usize,
        expected: &'static str,
    },
    #[error("Declaring {ty} as a subtype of {parent} would create a cycle")]
    InvalidHierarchy { ty: TypeKey, parent: TypeKey },
    #[error("Component method '{name}' panicked: {message}")]
    Panicked { name: String, message: String },
}

use super::value::ValueType;
use std::error::Error as StdError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("Argument index {index} is out of range for {len} arguments")]
    IndexOutOfRange { index: isize, len: usize },
    #[error("'{token}' is not a valid {expected}")]
    Malformed { token: String, expected: ValueType },
    #[error("No converter supports {0}")]
    UnsupportedType(ValueType),
    #[error("Slice step cannot be zero")]
    InvalidSlice,
    #[error("No player or console named '{0}'")]
    UnknownSender(String),
}

impl ArgumentError {
    /// Failures a caller-supplied default is allowed to absorb.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ArgumentError::IndexOutOfRange { .. } | ArgumentError::Malformed { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum InternalError {
    #[error("Internal error: command '{command}' expects parsed arguments but none were built")]
    MissingArguments { command: String },
    #[error("Internal error: handler for '{command}' panicked: {message}")]
    Panicked { command: String, message: String },
}

#[derive(Debug, Error)]
pub enum CommandError {
    /// Control signal raised by a branch handler to stop sub-command resolution.
    /// Never routed to exception handlers.
    #[error("Sub-command execution was suppressed")]
    SkipSubcommand,
    #[error(transparent)]
    Argument(#[from] ArgumentError),
    #[error(transparent)]
    Internal(#[from] InternalError),
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl CommandError {
    pub fn failed<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        CommandError::Failed(anyhow::Error::new(error))
    }

    pub fn message(message: impl Into<String>) -> Self {
        CommandError::Failed(anyhow::Error::msg(message.into()))
    }

    /// The error exception handlers are matched against, if this error is routed
    /// through them at all.
    pub(crate) fn as_routable(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            CommandError::Argument(err) => Some(err),
            CommandError::Failed(err) => Some(&**err),
            CommandError::SkipSubcommand | CommandError::Internal(_) => None,
        }
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("No command loader accepts this source")]
    UnsupportedSource,
    #[error("Command names cannot be empty or contain whitespace: '{0}'")]
    InvalidName(String),
    #[error("Command '{name}' has min args {min} greater than max args {max}")]
    InvalidBounds { name: String, min: i32, max: i32 },
    #[error("Command '{0}' has no handler")]
    MissingHandler(String),
    #[error("Handler node {0} does not exist")]
    UnknownNode(usize),
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

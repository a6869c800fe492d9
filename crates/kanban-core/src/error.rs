//! Command error taxonomy shared by the server and the client.

use thiserror::Error;

/// Why a command was rejected. Nothing is persisted or broadcast in any case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Malformed command shape
    #[error("{0}")]
    Validation(String),
    /// Actor is not a member of the owning board
    #[error("You are not authorized to perform this action")]
    NotAuthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    /// Transaction failed, no partial effect persisted
    #[error("store error: {0}")]
    Store(String),
}

pub type CommandResult<T> = Result<T, CommandError>;

impl CommandError {
    pub const GENERIC_MESSAGE: &'static str = "Something went wrong.";
    pub const STORE_MESSAGE: &'static str = "Database error";

    pub fn validation(msg: impl Into<String>) -> Self {
        CommandError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        CommandError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        CommandError::Conflict(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        CommandError::Store(msg.into())
    }

    /// Message safe to show the issuing user. Store details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            CommandError::Store(_) => Self::STORE_MESSAGE.to_string(),
            CommandError::Validation(msg) if msg.is_empty() => Self::GENERIC_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_details_are_hidden() {
        let err = CommandError::store("UNIQUE constraint failed: cards.position");
        assert_eq!(err.public_message(), "Database error");
        assert!(err.to_string().contains("UNIQUE"));
    }

    #[test]
    fn test_public_messages() {
        assert_eq!(
            CommandError::NotAuthorized.public_message(),
            "You are not authorized to perform this action"
        );
        assert_eq!(
            CommandError::not_found("User does not exist").public_message(),
            "User does not exist"
        );
        assert_eq!(
            CommandError::validation("").public_message(),
            "Something went wrong."
        );
    }
}

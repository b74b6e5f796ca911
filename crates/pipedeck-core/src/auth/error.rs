use thiserror::Error;

use super::storage::StorageError;
use crate::api::{ApiError, ErrorKind};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to persist session: {0}")]
    Storage(#[from] StorageError),

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Username and password required")]
    MissingCredentials,
}

impl SessionError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SessionError::Api(e) => Some(e.kind()),
            SessionError::NotAuthenticated => Some(ErrorKind::Unauthorized),
            SessionError::MissingCredentials => Some(ErrorKind::ValidationFailure),
            SessionError::Storage(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind() == Some(ErrorKind::Unauthorized)
    }

    /// Human-readable message for page-level display
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Api(e) => e.user_message(),
            SessionError::Storage(e) => format!("Could not save the session locally: {}", e),
            SessionError::NotAuthenticated => "Please log in first".to_string(),
            SessionError::MissingCredentials => self.to_string(),
        }
    }
}

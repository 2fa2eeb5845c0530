//! Errors raised while talking to the backend and the subset a store keeps.
//!
//! - [`BackendError`] is what a [`Backend`] call returns.
//! - [`StoreError`] is what a store records in its `error` field after a
//!   failed refresh. Cancellations never reach it.
//!
//!  [`Backend`]: crate::Backend
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid payload: {0}")]
    Validation(String),
    #[error("request cancelled")]
    Cancelled,
}

impl BackendError {
    /// Maps the error to the value recorded by a store. `None` for
    /// cancellations, which are neither success nor failure.
    pub fn into_store_error(self) -> Option<StoreError> {
        match self {
            Self::Transport(msg) => Some(StoreError::Transport(msg)),
            Self::Validation(msg) => Some(StoreError::Validation(msg)),
            Self::Cancelled => None,
        }
    }
}

/// Error kept by a store after a failed refresh, until the next success or reset.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid payload: {0}")]
    Validation(String),
}

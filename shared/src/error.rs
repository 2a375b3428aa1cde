use thiserror::Error;

use crate::capabilities::HttpError;
use crate::model::ActivityId;

/// Failure of a store operation.
///
/// The `Display` form is what lands in the state's `error` field, so the
/// status variant renders as the bare `HTTP {status}` the views show.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("HTTP {status}")]
    Status { status: u16, request_id: String },

    #[error(transparent)]
    Transport(#[from] HttpError),

    #[error("invalid response body: {reason}")]
    Decode { reason: String },

    #[error("detail request for activity {id} was dropped before it completed")]
    Abandoned { id: ActivityId },

    #[error("lock acquisition failed")]
    LockPoisoned,
}

impl StoreError {
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            StoreError::Status { request_id, .. } => Some(request_id),
            StoreError::Transport(e) => e.request_id(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid API base URL: {0}")]
    BaseUrl(#[from] HttpError),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown speed unit '{0}', expected one of kmh, mps, pace")]
    UnknownUnit(String),
}

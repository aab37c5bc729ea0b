//! Error taxonomy for the game core and its HTTP mapping.
//!
//! Collaborators (word pool, player store, record store, ranked cache) return
//! `StoreError`; the services lift those into `CoreError` tagged with the
//! dependency that failed.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::PlayerId;

/// Which collaborator a failure came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dependency {
    WordPool,
    PlayerStore,
    RecordStore,
    RankedCache,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dependency::WordPool => "word_pool",
            Dependency::PlayerStore => "player_store",
            Dependency::RecordStore => "record_store",
            Dependency::RankedCache => "ranked_cache",
        })
    }
}

/// Failure reported by a storage collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Transient: connection refused, dropped or timed out.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The backend answered but rejected the operation.
    #[error("backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("{dependency} failure: {reason}")]
    DependencyFailure {
        dependency: Dependency,
        reason: String,
        retryable: bool,
    },

    /// A game record was appended but the reward increment did not apply.
    #[error("consistency fault for player {player_id}: record {record_id} stored without reward ({reason})")]
    ConsistencyFault {
        player_id: PlayerId,
        record_id: i64,
        reason: String,
    },
}

impl CoreError {
    pub fn dependency(dependency: Dependency, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => CoreError::NotFound(what),
            StoreError::Unavailable(reason) => CoreError::DependencyFailure {
                dependency,
                reason,
                retryable: true,
            },
            StoreError::Backend(reason) => CoreError::DependencyFailure {
                dependency,
                reason,
                retryable: false,
            },
        }
    }

    pub fn timeout(dependency: Dependency, after: std::time::Duration) -> Self {
        CoreError::DependencyFailure {
            dependency,
            reason: format!("timed out after {}ms", after.as_millis()),
            retryable: true,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "not_found",
            CoreError::Validation(_) => "validation_error",
            CoreError::DependencyFailure { .. } => "dependency_failure",
            CoreError::ConsistencyFault { .. } => "consistency_fault",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::DependencyFailure { retryable: true, .. })
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = match self {
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::DependencyFailure { .. } => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::ConsistencyFault { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            CoreError::DependencyFailure { retryable, .. } => json!({
                "error": self.code(),
                "message": self.to_string(),
                "retryable": retryable,
            }),
            _ => json!({ "error": self.code(), "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

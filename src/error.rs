//! Error types

use thiserror::Error;

use crate::session::run_manager::RunState;

/// Errors surfaced by the run lifecycle
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("render target unavailable")]
    ResourceUnavailable,

    #[error("cannot {action} while run is {state:?}")]
    InvalidState { action: &'static str, state: RunState },

    #[error("frame driver task failed: {0}")]
    DriverFailed(String),
}

/// Profile storage errors. Never propagated into the tick path.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("profile i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("profile json invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported profile schema version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("profile file too large ({0} bytes)")]
    TooLarge(u64),

    #[error("settlement writer stopped")]
    WriterClosed,
}

/// Score service errors
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[cfg(feature = "remote")]
impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        RemoteError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(EngineError::ResourceUnavailable.to_string(), "render target unavailable");
        let e = EngineError::InvalidState {
            action: "pause",
            state: RunState::Idle,
        };
        assert_eq!(e.to_string(), "cannot pause while run is Idle");
        let e = PersistenceError::UnsupportedVersion { found: 9, expected: 1 };
        assert!(e.to_string().contains("version 9"));
    }

    #[test]
    fn test_json_error_converts() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        let e: PersistenceError = err.into();
        assert!(matches!(e, PersistenceError::Json(_)));
    }
}

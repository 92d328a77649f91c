//! Board-level errors

use mirny_engine::{ConfigError, EndpointKind, SnapshotError};
use thiserror::Error;

/// Errors raised while assembling or operating a board
#[derive(Error, Debug)]
pub enum BoardError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("Board description error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No channel {0} on this board")]
    UnknownChannel(usize),
    #[error("Address {address:#04x} is not a {expected:?} endpoint")]
    WrongKind {
        address: u8,
        expected: EndpointKind,
    },
}

/// Result type for board operations
pub type Result<T> = std::result::Result<T, BoardError>;

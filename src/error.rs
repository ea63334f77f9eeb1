//! Error types for scenelink

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("External editor unreachable on port {port}: {message}")]
    Unreachable { port: u16, message: String },

    #[error("Transport not supported in this environment")]
    TransportUnsupported,

    #[error("Failed to decode snapshot: {0}")]
    SnapshotDecode(String),

    #[error("Failed to encode snapshot: {0}")]
    SnapshotEncode(String),

    #[error("No project loaded")]
    NoProject,

    #[error("Scene not found in project: {0}")]
    SceneNotFound(String),

    #[error("Timed out waiting for update (token {token})")]
    RequestTimeout { token: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

//! scenelink - External editor synchronization bridge
//!
//! Hands a project back and forth between this process and a companion
//! external editor via serialized snapshots over a named-port transport.

pub mod codec;
pub mod config;
pub mod controller;
pub mod error;
pub mod project;
pub mod transport;
pub mod views;

// Re-export commonly used types
pub use codec::{JsonCodec, ProjectCodec};
pub use config::Config;
pub use controller::{
    EditorKind, LaunchOptions, Notice, SyncController, SyncState, SyncStats,
};
pub use error::{BridgeError, Result};
pub use project::{ExternalEvents, ExternalLayout, Instance, Layout, Project};
pub use transport::{
    EditorTransport, TcpTransport, TransportEvent, UpdateScope,
};
pub use views::{select_panels, EditorOpenState, EditorPanel};

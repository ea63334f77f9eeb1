//! Project snapshot codec
//!
//! Snapshots crossing the external-editor boundary are opaque strings. The
//! codec that produces and consumes them is handed to the controller as an
//! explicit dependency rather than reached for as a process-wide global, so
//! tests can substitute a double and a different serialization can be
//! swapped in without touching the controller.

use crate::error::{BridgeError, Result};
use crate::project::{Instance, Layout, Project};

/// Encodes and decodes project and instance snapshots
pub trait ProjectCodec: Send {
    /// Serialize a whole project graph into one opaque snapshot
    fn encode_project(&self, project: &Project) -> Result<String>;

    /// Deserialize a snapshot into a live project
    fn decode_project(&self, snapshot: &str) -> Result<Project>;

    /// Serialize one scene's placed instances
    fn encode_instances(&self, layout: &Layout) -> Result<String>;

    /// Deserialize an instances-only snapshot
    fn decode_instances(&self, snapshot: &str) -> Result<Vec<Instance>>;
}

/// JSON snapshot codec
#[derive(Debug, Clone, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ProjectCodec for JsonCodec {
    fn encode_project(&self, project: &Project) -> Result<String> {
        serde_json::to_string(project).map_err(|e| BridgeError::SnapshotEncode(e.to_string()))
    }

    fn decode_project(&self, snapshot: &str) -> Result<Project> {
        serde_json::from_str(snapshot).map_err(|e| BridgeError::SnapshotDecode(e.to_string()))
    }

    fn encode_instances(&self, layout: &Layout) -> Result<String> {
        serde_json::to_string(&layout.instances)
            .map_err(|e| BridgeError::SnapshotEncode(e.to_string()))
    }

    fn decode_instances(&self, snapshot: &str) -> Result<Vec<Instance>> {
        serde_json::from_str(snapshot).map_err(|e| BridgeError::SnapshotDecode(e.to_string()))
    }
}

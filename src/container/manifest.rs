//! Manifest schema for the ZIP container.
//!
//! The manifest.json entry records the container format version and the
//! full node table, so the hierarchy can be rebuilt without scanning entry
//! names. Dataset payloads live in separate `nodes/` entries.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Dataspace, ElementLayout};

/// MIME type stored as the first, uncompressed entry of every container
pub const CONTAINER_MIMETYPE: &str = "application/vnd.ismrmrd-dataset";

/// Container format version written by this crate
pub const CONTAINER_FORMAT_VERSION: &str = "1.0";

/// Kind-specific part of a node entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum NodeKindEntry {
    /// A group
    Group,
    /// A dataset with its element layout and extent
    Dataset {
        /// Element layout
        layout: ElementLayout,
        /// Current and maximum extent
        space: Dataspace,
    },
}

/// One row of the node table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    /// Absolute node path (e.g. "/dataset/data")
    pub path: String,
    /// Node kind
    #[serde(flatten)]
    pub kind: NodeKindEntry,
}

/// Contents of manifest.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Container format version (e.g., "1.0")
    pub format_version: String,
    /// Identifier assigned when the container was created
    pub container_id: Uuid,
    /// RFC 3339 timestamp of creation
    pub created: String,
    /// RFC 3339 timestamp of the last flush
    pub modified: String,
    /// Name and version of the library that last wrote the file
    pub writer: String,
    /// Every group and dataset, parents before children
    pub nodes: Vec<NodeEntry>,
}

impl Manifest {
    /// Creates a manifest for a brand-new, empty container.
    pub fn new() -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            format_version: CONTAINER_FORMAT_VERSION.to_string(),
            container_id: Uuid::new_v4(),
            created: now.clone(),
            modified: now,
            writer: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            nodes: Vec::new(),
        }
    }

    /// Whether this crate understands the manifest's format version.
    ///
    /// Only the major version has to match.
    pub fn is_supported(&self) -> bool {
        let major = |v: &str| v.split('.').next().map(str::to_string);
        major(&self.format_version) == major(CONTAINER_FORMAT_VERSION)
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

/// Name of the payload entry holding a dataset's elements
pub(super) fn payload_entry_name(path: &str) -> String {
    format!("nodes/{}", path.trim_start_matches('/'))
}

//! # Container Backend
//!
//! The record store is layered on a generic hierarchical container: a tree
//! of groups addressed by `/`-separated paths whose leaves are typed
//! datasets. This module defines that surface and ships two backends:
//!
//! - [`MemoryContainer`]: an in-memory node tree
//! - [`ZipContainer`]: a single-file container backed by a ZIP archive
//!
//! ## File Layout
//!
//! ```text
//! {name} (ZIP archive)
//! ├── mimetype          # "application/vnd.ismrmrd-dataset" (uncompressed, first entry)
//! ├── manifest.json     # Format version, container id and node table
//! └── nodes/<path>      # One payload entry per dataset
//! ```
//!
//! Every call returns a [`BackendResult`]. Backends never report failures
//! through global state; callers decide which failures are meaningful.

mod error;
pub mod layout;
mod manifest;
mod memory;
mod zip_container;

#[cfg(test)]
pub(crate) mod faulty;

use std::path::Path;

use bytes::Bytes;

pub use error::{BackendError, BackendResult};
pub use layout::{Dataspace, ElementLayout, Field, FieldType, ScalarType};
pub use manifest::{Manifest, NodeEntry, NodeKindEntry, CONTAINER_FORMAT_VERSION, CONTAINER_MIMETYPE};
pub use memory::MemoryContainer;
pub use zip_container::ZipContainer;

use crate::config::DatasetConfig;

/// Kind of node found at a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Interior node that holds named children
    Group,
    /// Leaf node holding typed elements
    Dataset,
}

/// Stored description of a dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetInfo {
    /// Element layout fixed at creation
    pub layout: ElementLayout,
    /// Current and maximum extent
    pub space: Dataspace,
}

/// Outcome of probing a path for a container file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// The file exists and is a valid container
    Container,
    /// The file exists but is not a container
    NotContainer,
    /// Nothing exists at the path
    Missing,
}

/// Structural operations on a hierarchical container.
///
/// Paths are `/`-separated; a leading `/` is optional and `/` alone names
/// the root group.
pub trait ContainerBackend {
    /// Whether a link exists at `path`.
    ///
    /// A missing intermediate group yields `Ok(false)`. An intermediate
    /// component that is a dataset yields `Err(NotAGroup)`.
    fn link_exists(&self, path: &str) -> BackendResult<bool>;

    /// Kind of the node at `path`, if any
    fn node_kind(&self, path: &str) -> BackendResult<Option<NodeKind>>;

    /// Create a group at `path`.
    ///
    /// With `create_intermediate`, missing parent groups are created too.
    /// Fails with `AlreadyExists` if a node is already present.
    fn create_group(&mut self, path: &str, create_intermediate: bool) -> BackendResult<()>;

    /// Remove the link at `path` together with everything below it
    fn delete_link(&mut self, path: &str) -> BackendResult<()>;

    /// Move the node at `from` to `to`; `to` must not exist
    fn move_link(&mut self, from: &str, to: &str) -> BackendResult<()>;

    /// Names of the children of the group at `path`, in sorted order
    fn children(&self, path: &str) -> BackendResult<Vec<String>>;

    /// Create a dataset with the given element layout and dataspace.
    ///
    /// The parent group must exist. All element slots start unwritten.
    fn create_dataset(
        &mut self,
        path: &str,
        layout: &ElementLayout,
        space: &Dataspace,
    ) -> BackendResult<()>;

    /// Layout and extent of the dataset at `path`
    fn dataset_info(&self, path: &str) -> BackendResult<DatasetInfo>;

    /// Change the extent of axis 0.
    ///
    /// Growing past a fixed maximum fails with `NotExtendible`. Shrinking
    /// discards the trailing elements.
    fn set_extent(&mut self, path: &str, len: u64) -> BackendResult<()>;

    /// Write one element at a linear index
    fn write_element(&mut self, path: &str, index: u64, bytes: &[u8]) -> BackendResult<()>;

    /// Read one element at a linear index
    fn read_element(&self, path: &str, index: u64) -> BackendResult<Bytes>;
}

/// A container stored in a file.
pub trait ContainerFile: ContainerBackend + Sized {
    /// Check whether `path` holds a valid container.
    ///
    /// I/O failures other than "not found" are returned as errors rather
    /// than reported as [`Probe::Missing`], so a file that cannot be read is
    /// never mistaken for one that can be created.
    fn probe(path: &Path) -> BackendResult<Probe>;

    /// Open an existing container for reading and writing
    fn open(path: &Path, config: &DatasetConfig) -> BackendResult<Self>;

    /// Create a new, empty container, replacing any file at `path`
    fn create(path: &Path, config: &DatasetConfig) -> BackendResult<Self>;

    /// Persist all pending changes
    fn flush(&mut self) -> BackendResult<()>;

    /// Persist pending changes and release the file
    fn close(self) -> BackendResult<()>;
}

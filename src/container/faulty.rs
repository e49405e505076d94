//! Fault injection for tests.

use bytes::Bytes;

use super::{
    BackendError, BackendResult, ContainerBackend, DatasetInfo, Dataspace, ElementLayout,
    MemoryContainer, NodeKind,
};

/// In-memory container whose mutations can be made to fail on demand.
pub(crate) struct FaultyContainer {
    pub(crate) inner: MemoryContainer,
    /// Fail every `write_element`
    pub(crate) fail_writes: bool,
    /// Fail every `set_extent` that shrinks a dataset
    pub(crate) fail_shrink: bool,
    /// Fail every `link_exists` with an I/O error
    pub(crate) fail_probes: bool,
    /// Fail every `move_link`
    pub(crate) fail_moves: bool,
}

impl FaultyContainer {
    pub(crate) fn new(inner: MemoryContainer) -> Self {
        Self {
            inner,
            fail_writes: false,
            fail_shrink: false,
            fail_probes: false,
            fail_moves: false,
        }
    }
}

fn injected(what: &str) -> BackendError {
    BackendError::IoError(std::io::Error::other(format!("injected {} failure", what)))
}

impl ContainerBackend for FaultyContainer {
    fn link_exists(&self, path: &str) -> BackendResult<bool> {
        if self.fail_probes {
            return Err(injected("probe"));
        }
        self.inner.link_exists(path)
    }

    fn node_kind(&self, path: &str) -> BackendResult<Option<NodeKind>> {
        self.inner.node_kind(path)
    }

    fn create_group(&mut self, path: &str, create_intermediate: bool) -> BackendResult<()> {
        self.inner.create_group(path, create_intermediate)
    }

    fn delete_link(&mut self, path: &str) -> BackendResult<()> {
        self.inner.delete_link(path)
    }

    fn move_link(&mut self, from: &str, to: &str) -> BackendResult<()> {
        if self.fail_moves {
            return Err(injected("move"));
        }
        self.inner.move_link(from, to)
    }

    fn children(&self, path: &str) -> BackendResult<Vec<String>> {
        self.inner.children(path)
    }

    fn create_dataset(
        &mut self,
        path: &str,
        layout: &ElementLayout,
        space: &Dataspace,
    ) -> BackendResult<()> {
        self.inner.create_dataset(path, layout, space)
    }

    fn dataset_info(&self, path: &str) -> BackendResult<DatasetInfo> {
        self.inner.dataset_info(path)
    }

    fn set_extent(&mut self, path: &str, len: u64) -> BackendResult<()> {
        if self.fail_shrink && len < self.inner.dataset_info(path)?.space.len() {
            return Err(injected("shrink"));
        }
        self.inner.set_extent(path, len)
    }

    fn write_element(&mut self, path: &str, index: u64, bytes: &[u8]) -> BackendResult<()> {
        if self.fail_writes {
            return Err(injected("write"));
        }
        self.inner.write_element(path, index, bytes)
    }

    fn read_element(&self, path: &str, index: u64) -> BackendResult<Bytes> {
        self.inner.read_element(path, index)
    }
}

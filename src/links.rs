//! Existence checks and lazy creation of links.
//!
//! These helpers sit between the record store and a [`ContainerBackend`]
//! and fix the semantics the rest of the crate relies on:
//!
//! - [`exists`] never fails for a missing link. A probe that cannot tell
//!   "absent" from "broken" (for example a path running through a dataset)
//!   is reported as absent; only I/O failures surface as errors.
//! - [`ensure`] is idempotent and creates missing intermediate groups.
//! - [`remove`] is a no-op when nothing is there.

use crate::container::{BackendError, ContainerBackend};
use crate::dataset::DatasetError;

/// Whether a link exists at `path`.
pub fn exists<B: ContainerBackend + ?Sized>(backend: &B, path: &str) -> Result<bool, DatasetError> {
    match backend.link_exists(path) {
        Ok(found) => Ok(found),
        Err(e) if e.is_io() => Err(DatasetError::storage(path, e)),
        Err(e) => {
            log::warn!("Treating {} as absent: {}", path, e);
            Ok(false)
        }
    }
}

/// Make sure a group exists at `path`, creating intermediate groups.
pub fn ensure<B: ContainerBackend + ?Sized>(backend: &mut B, path: &str) -> Result<(), DatasetError> {
    if exists(backend, path)? {
        return Ok(());
    }
    match backend.create_group(path, true) {
        Ok(()) => {
            log::debug!("Created group {}", path);
            Ok(())
        }
        Err(BackendError::AlreadyExists(_)) => Ok(()),
        Err(e) => Err(DatasetError::storage(path, e)),
    }
}

/// Delete the link at `path` if present.
pub fn remove<B: ContainerBackend + ?Sized>(backend: &mut B, path: &str) -> Result<(), DatasetError> {
    if !exists(backend, path)? {
        return Ok(());
    }
    match backend.delete_link(path) {
        Ok(()) | Err(BackendError::NotFound(_)) => Ok(()),
        Err(e) => Err(DatasetError::storage(path, e)),
    }
}

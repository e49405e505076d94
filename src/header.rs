//! Storage of the XML metadata header.
//!
//! The header is a single variable-length text value at
//! `<root_group>/xml`. Writing replaces it: the new text is first written
//! under an internal staging name, then the old value is deleted and the
//! staged one is moved into place. If writing the new text fails the old
//! header is left untouched.

use crate::container::{BackendError, ContainerBackend, Dataspace, ElementLayout};
use crate::dataset::DatasetError;
use crate::links;
use crate::path::{self, HEADER_NAME};
use crate::records::CodecError;

/// Staging name used while a new header is written
const STAGING_NAME: &str = ".xml.pending";

/// Replace the header of the dataset rooted at `root_group` with `text`.
pub fn write<B: ContainerBackend + ?Sized>(
    backend: &mut B,
    root_group: &str,
    text: &str,
) -> Result<(), DatasetError> {
    let target = path::header_path(root_group);
    if text.contains('\0') {
        return Err(DatasetError::storage(
            &target,
            BackendError::InvalidArgument("header text must not contain NUL".to_string()),
        ));
    }

    let staging = path::join(root_group, STAGING_NAME);
    links::remove(backend, &staging)?;

    backend
        .create_dataset(&staging, &ElementLayout::var_string(), &Dataspace::scalar())
        .map_err(|e| DatasetError::storage(&staging, e))?;

    if let Err(e) = backend.write_element(&staging, 0, text.as_bytes()) {
        discard_staging(backend, &staging);
        return Err(DatasetError::storage(&staging, e));
    }

    if let Err(e) = links::remove(backend, &target) {
        discard_staging(backend, &staging);
        return Err(e);
    }

    if let Err(e) = backend.move_link(&staging, &target) {
        log::warn!("Failed to move staged header into {}: {}", target, e);
        discard_staging(backend, &staging);
        return Err(DatasetError::storage(&target, e));
    }

    log::debug!("Wrote {} byte header to {}", text.len(), target);
    Ok(())
}

/// Read the header of the dataset rooted at `root_group`.
///
/// Returns `Ok(None)` when no header has been written.
pub fn read<B: ContainerBackend + ?Sized>(
    backend: &B,
    root_group: &str,
) -> Result<Option<String>, DatasetError> {
    let target = path::header_path(root_group);
    if !links::exists(backend, &target)? {
        return Ok(None);
    }

    let bytes = backend
        .read_element(&target, 0)
        .map_err(|e| DatasetError::storage(&target, e))?;
    let value = std::str::from_utf8(&bytes).map_err(CodecError::from)?;

    let mut text = String::new();
    text.try_reserve_exact(value.len()).map_err(|e| {
        DatasetError::MemoryError(format!("Failed to allocate {} header: {}", HEADER_NAME, e))
    })?;
    text.push_str(value);
    Ok(Some(text))
}

fn discard_staging<B: ContainerBackend + ?Sized>(backend: &mut B, staging: &str) {
    if let Err(e) = links::remove(backend, staging) {
        log::warn!("Failed to discard staged header {}: {}", staging, e);
    }
}

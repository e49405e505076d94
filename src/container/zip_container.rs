use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use tempfile::NamedTempFile;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::config::DatasetConfig;

use super::manifest::{payload_entry_name, Manifest, NodeEntry, NodeKindEntry};
use super::memory::{DatasetNode, Node};
use super::{
    BackendError, BackendResult, ContainerBackend, ContainerFile, DatasetInfo, Dataspace,
    ElementLayout, MemoryContainer, NodeKind, Probe, CONTAINER_MIMETYPE,
};

/// Frame length marking an element slot that was never written
const UNWRITTEN_FRAME: u32 = u32::MAX;

const MANIFEST_ENTRY: &str = "manifest.json";
const MIMETYPE_ENTRY: &str = "mimetype";

/// Single-file container stored as a ZIP archive.
///
/// The whole hierarchy is loaded into a [`MemoryContainer`] on open.
/// Mutations only touch memory and mark the container dirty; [`flush`]
/// writes a complete new archive to a temporary file next to the target and
/// atomically renames it into place, so the file on disk is always either
/// the previous or the new consistent state.
///
/// [`flush`]: ContainerFile::flush
pub struct ZipContainer {
    path: PathBuf,
    tree: MemoryContainer,
    manifest: Manifest,
    compression: CompressionMethod,
    dirty: bool,
}

impl ZipContainer {
    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Manifest as of the last load or flush
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Whether there are changes not yet persisted
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn mark_dirty<T>(&mut self, result: BackendResult<T>) -> BackendResult<T> {
        if result.is_ok() {
            self.dirty = true;
        }
        result
    }

    /// Open the archive and check the mimetype entry.
    ///
    /// Returns `Ok(None)` when the file is readable but is not a container.
    fn read_archive(path: &Path) -> BackendResult<Option<ZipArchive<BufReader<File>>>> {
        let file = File::open(path)?;
        let mut archive = match ZipArchive::new(BufReader::new(file)) {
            Ok(archive) => archive,
            Err(ZipError::Io(e)) if e.kind() != io::ErrorKind::UnexpectedEof => {
                return Err(e.into())
            }
            Err(_) => return Ok(None),
        };

        let mut mimetype = String::new();
        {
            let mut first = match archive.by_index(0) {
                Ok(entry) => entry,
                Err(ZipError::Io(e)) => return Err(e.into()),
                Err(_) => return Ok(None),
            };
            if first.name() != MIMETYPE_ENTRY {
                return Ok(None);
            }
            if first.read_to_string(&mut mimetype).is_err() {
                return Ok(None);
            }
        }
        if mimetype != CONTAINER_MIMETYPE {
            return Ok(None);
        }
        Ok(Some(archive))
    }

    fn load(archive: &mut ZipArchive<BufReader<File>>) -> BackendResult<(Manifest, MemoryContainer)> {
        let manifest: Manifest = {
            let entry = archive.by_name(MANIFEST_ENTRY).map_err(|_| {
                BackendError::InvalidFormat(format!("container missing {}", MANIFEST_ENTRY))
            })?;
            serde_json::from_reader(entry)?
        };

        if !manifest.is_supported() {
            return Err(BackendError::InvalidFormat(format!(
                "unsupported container format version {}",
                manifest.format_version
            )));
        }

        let mut tree = MemoryContainer::new();
        for node in &manifest.nodes {
            match &node.kind {
                NodeKindEntry::Group => match tree.create_group(&node.path, true) {
                    Ok(()) | Err(BackendError::AlreadyExists(_)) => {}
                    Err(e) => return Err(e),
                },
                NodeKindEntry::Dataset { layout, space } => {
                    if !space.is_valid() {
                        return Err(BackendError::InvalidFormat(format!(
                            "invalid dataspace for {}",
                            node.path
                        )));
                    }
                    let name = payload_entry_name(&node.path);
                    let mut payload = Vec::new();
                    archive
                        .by_name(&name)
                        .map_err(|_| {
                            BackendError::InvalidFormat(format!("container missing {}", name))
                        })?
                        .read_to_end(&mut payload)?;
                    let elements = decode_payload(&payload, space.element_count(), &node.path)?;
                    tree.insert_dataset(
                        &node.path,
                        DatasetNode {
                            layout: layout.clone(),
                            space: space.clone(),
                            elements,
                        },
                    )?;
                }
            }
        }

        Ok((manifest, tree))
    }

    fn write_archive<W: Write + io::Seek>(&self, writer: W) -> BackendResult<W> {
        let mut zip = ZipWriter::new(writer);

        // mimetype MUST be first and uncompressed
        let stored = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .unix_permissions(0o644);
        zip.start_file(MIMETYPE_ENTRY, stored)?;
        zip.write_all(CONTAINER_MIMETYPE.as_bytes())?;

        let options = SimpleFileOptions::default()
            .compression_method(self.compression)
            .unix_permissions(0o644);

        zip.start_file(MANIFEST_ENTRY, options)?;
        serde_json::to_writer_pretty(&mut zip, &self.manifest)?;

        for (path, node) in self.tree.nodes() {
            if let Node::Dataset(dataset) = node {
                zip.start_file(payload_entry_name(&path), options)?;
                zip.write_all(&encode_payload(&dataset.elements, &path)?)?;
            }
        }

        Ok(zip.finish()?)
    }
}

fn node_table(tree: &MemoryContainer) -> Vec<NodeEntry> {
    tree.nodes()
        .into_iter()
        .map(|(path, node)| NodeEntry {
            path,
            kind: match node {
                Node::Group(_) => NodeKindEntry::Group,
                Node::Dataset(dataset) => NodeKindEntry::Dataset {
                    layout: dataset.layout.clone(),
                    space: dataset.space.clone(),
                },
            },
        })
        .collect()
}

fn encode_payload(elements: &[Option<Bytes>], path: &str) -> BackendResult<Vec<u8>> {
    let total: usize = elements.iter().flatten().map(|b| b.len() + 4).sum();
    let mut out = Vec::with_capacity(total + 4 * elements.len());
    for element in elements {
        match element {
            Some(bytes) => {
                let len = u32::try_from(bytes.len())
                    .ok()
                    .filter(|len| *len != UNWRITTEN_FRAME)
                    .ok_or_else(|| {
                        BackendError::InvalidArgument(format!(
                            "element of {} exceeds the maximum frame size",
                            path
                        ))
                    })?;
                out.write_u32::<LittleEndian>(len)?;
                out.extend_from_slice(bytes);
            }
            None => out.write_u32::<LittleEndian>(UNWRITTEN_FRAME)?,
        }
    }
    Ok(out)
}

fn decode_payload(payload: &[u8], expected: u64, path: &str) -> BackendResult<Vec<Option<Bytes>>> {
    let truncated = || BackendError::InvalidFormat(format!("truncated payload for {}", path));
    let payload = Bytes::copy_from_slice(payload);
    let mut cursor = Cursor::new(&payload[..]);
    let mut elements = Vec::new();

    while (cursor.position() as usize) < payload.len() {
        let len = cursor.read_u32::<LittleEndian>().map_err(|_| truncated())?;
        if len == UNWRITTEN_FRAME {
            elements.push(None);
            continue;
        }
        let start = cursor.position() as usize;
        let end = start.checked_add(len as usize).ok_or_else(truncated)?;
        if end > payload.len() {
            return Err(truncated());
        }
        elements.push(Some(payload.slice(start..end)));
        cursor.set_position(end as u64);
    }

    if elements.len() as u64 != expected {
        return Err(BackendError::InvalidFormat(format!(
            "payload for {} holds {} elements, manifest declares {}",
            path,
            elements.len(),
            expected
        )));
    }
    Ok(elements)
}

impl ContainerFile for ZipContainer {
    fn probe(path: &Path) -> BackendResult<Probe> {
        match fs::metadata(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Probe::Missing),
            Err(e) => return Err(e.into()),
            Ok(meta) if !meta.is_file() => return Ok(Probe::NotContainer),
            Ok(_) => {}
        }
        Ok(match Self::read_archive(path)? {
            Some(_) => Probe::Container,
            None => Probe::NotContainer,
        })
    }

    fn open(path: &Path, config: &DatasetConfig) -> BackendResult<Self> {
        let mut archive = Self::read_archive(path)?.ok_or_else(|| {
            BackendError::InvalidFormat(format!("{} is not a container", path.display()))
        })?;
        let (manifest, tree) = Self::load(&mut archive)?;
        log::debug!(
            "Loaded container {} ({} nodes)",
            path.display(),
            manifest.nodes.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            tree,
            manifest,
            compression: config.storage.compression.method(),
            dirty: false,
        })
    }

    fn create(path: &Path, config: &DatasetConfig) -> BackendResult<Self> {
        if config.storage.create_parent_dirs {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
            }
        }

        let mut container = Self {
            path: path.to_path_buf(),
            tree: MemoryContainer::new(),
            manifest: Manifest::new(),
            compression: config.storage.compression.method(),
            dirty: true,
        };
        if let Err(e) = container.flush() {
            container.dirty = false;
            return Err(e);
        }
        log::info!("Created container {}", path.display());
        Ok(container)
    }

    fn flush(&mut self) -> BackendResult<()> {
        if !self.dirty {
            return Ok(());
        }

        self.manifest.nodes = node_table(&self.tree);
        self.manifest.modified = chrono::Utc::now().to_rfc3339();
        self.manifest.writer = format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp_file = NamedTempFile::new_in(&dir)?;
        let mut writer = self.write_archive(BufWriter::new(temp_file.reopen()?))?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        match fs::metadata(&self.path) {
            Ok(existing) => temp_file.as_file().set_permissions(existing.permissions())?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                set_new_file_permissions(temp_file.as_file())?
            }
            Err(e) => return Err(e.into()),
        }

        temp_file.persist(&self.path).map_err(|e| e.error)?;
        self.dirty = false;
        log::info!(
            "Flushed container {} ({} nodes)",
            self.path.display(),
            self.manifest.nodes.len()
        );
        Ok(())
    }

    fn close(mut self) -> BackendResult<()> {
        let result = self.flush();
        // Nothing left for Drop to retry, whether or not the flush worked.
        self.dirty = false;
        result
    }
}

/// Temp files are created owner-only; a new container gets the usual
/// file mode instead.
#[cfg(unix)]
fn set_new_file_permissions(file: &File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_new_file_permissions(_file: &File) -> io::Result<()> {
    Ok(())
}

impl Drop for ZipContainer {
    fn drop(&mut self) {
        if self.dirty {
            if let Err(e) = self.flush() {
                log::warn!(
                    "Failed to persist container {} on drop: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

impl std::fmt::Debug for ZipContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipContainer")
            .field("path", &self.path)
            .field("container_id", &self.manifest.container_id)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl ContainerBackend for ZipContainer {
    fn link_exists(&self, path: &str) -> BackendResult<bool> {
        self.tree.link_exists(path)
    }

    fn node_kind(&self, path: &str) -> BackendResult<Option<NodeKind>> {
        self.tree.node_kind(path)
    }

    fn create_group(&mut self, path: &str, create_intermediate: bool) -> BackendResult<()> {
        let result = self.tree.create_group(path, create_intermediate);
        self.mark_dirty(result)
    }

    fn delete_link(&mut self, path: &str) -> BackendResult<()> {
        let result = self.tree.delete_link(path);
        self.mark_dirty(result)
    }

    fn move_link(&mut self, from: &str, to: &str) -> BackendResult<()> {
        let result = self.tree.move_link(from, to);
        self.mark_dirty(result)
    }

    fn children(&self, path: &str) -> BackendResult<Vec<String>> {
        self.tree.children(path)
    }

    fn create_dataset(
        &mut self,
        path: &str,
        layout: &ElementLayout,
        space: &Dataspace,
    ) -> BackendResult<()> {
        let result = self.tree.create_dataset(path, layout, space);
        self.mark_dirty(result)
    }

    fn dataset_info(&self, path: &str) -> BackendResult<DatasetInfo> {
        self.tree.dataset_info(path)
    }

    fn set_extent(&mut self, path: &str, len: u64) -> BackendResult<()> {
        let result = self.tree.set_extent(path, len);
        self.mark_dirty(result)
    }

    fn write_element(&mut self, path: &str, index: u64, bytes: &[u8]) -> BackendResult<()> {
        let result = self.tree.write_element(path, index, bytes);
        self.mark_dirty(result)
    }

    fn read_element(&self, path: &str, index: u64) -> BackendResult<Bytes> {
        self.tree.read_element(path, index)
    }
}

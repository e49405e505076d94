use std::collections::BTreeMap;

use bytes::Bytes;

use super::{
    BackendError, BackendResult, ContainerBackend, DatasetInfo, Dataspace, ElementLayout,
    NodeKind,
};

/// Dataset payload held in memory
#[derive(Debug, Clone)]
pub(super) struct DatasetNode {
    pub(super) layout: ElementLayout,
    pub(super) space: Dataspace,
    /// One slot per element; `None` until written
    pub(super) elements: Vec<Option<Bytes>>,
}

#[derive(Debug, Clone)]
pub(super) enum Node {
    Group(BTreeMap<String, Node>),
    Dataset(DatasetNode),
}

/// In-memory hierarchical container.
///
/// Groups are ordered maps of child nodes, so listings and persisted output
/// are deterministic. [`ZipContainer`](super::ZipContainer) loads a file into
/// one of these and writes it back out on flush.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    root: BTreeMap<String, Node>,
}

/// Split a path into its components, rejecting empty interior components.
fn components(path: &str) -> BackendResult<Vec<&str>> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let parts: Vec<&str> = trimmed.split('/').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(BackendError::InvalidArgument(format!(
            "empty component in path '{}'",
            path
        )));
    }
    Ok(parts)
}

fn joined(parts: &[&str]) -> String {
    format!("/{}", parts.join("/"))
}

impl MemoryContainer {
    /// Create an empty container holding only the root group
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, parts: &[&str]) -> BackendResult<Option<&Node>> {
        let mut group = &self.root;
        for (depth, part) in parts.iter().enumerate() {
            match group.get(*part) {
                None => return Ok(None),
                Some(node) if depth + 1 == parts.len() => return Ok(Some(node)),
                Some(Node::Group(children)) => group = children,
                Some(Node::Dataset(_)) => {
                    return Err(BackendError::NotAGroup(joined(&parts[..=depth])))
                }
            }
        }
        Ok(None)
    }

    /// Walk to the group named by `parts`, optionally creating missing groups.
    fn group_mut(
        &mut self,
        parts: &[&str],
        create: bool,
    ) -> BackendResult<&mut BTreeMap<String, Node>> {
        let mut group = &mut self.root;
        for (depth, part) in parts.iter().enumerate() {
            if !group.contains_key(*part) {
                if !create {
                    return Err(BackendError::NotFound(joined(&parts[..=depth])));
                }
                group.insert(part.to_string(), Node::Group(BTreeMap::new()));
            }
            group = match group.get_mut(*part) {
                Some(Node::Group(children)) => children,
                Some(Node::Dataset(_)) => {
                    return Err(BackendError::NotAGroup(joined(&parts[..=depth])))
                }
                None => return Err(BackendError::NotFound(joined(&parts[..=depth]))),
            };
        }
        Ok(group)
    }

    fn dataset(&self, path: &str) -> BackendResult<&DatasetNode> {
        let parts = components(path)?;
        match self.lookup(&parts)? {
            Some(Node::Dataset(dataset)) => Ok(dataset),
            Some(Node::Group(_)) => Err(BackendError::NotADataset(path.to_string())),
            None if parts.is_empty() => Err(BackendError::NotADataset(path.to_string())),
            None => Err(BackendError::NotFound(path.to_string())),
        }
    }

    fn dataset_mut(&mut self, path: &str) -> BackendResult<&mut DatasetNode> {
        let parts = components(path)?;
        let Some((last, parents)) = parts.split_last() else {
            return Err(BackendError::NotADataset(path.to_string()));
        };
        let group = self.group_mut(parents, false)?;
        match group.get_mut(*last) {
            Some(Node::Dataset(dataset)) => Ok(dataset),
            Some(Node::Group(_)) => Err(BackendError::NotADataset(path.to_string())),
            None => Err(BackendError::NotFound(path.to_string())),
        }
    }

    /// Every node in depth-first order, parents before children.
    pub(super) fn nodes(&self) -> Vec<(String, &Node)> {
        fn walk<'a>(prefix: &str, group: &'a BTreeMap<String, Node>, out: &mut Vec<(String, &'a Node)>) {
            for (name, node) in group {
                let path = format!("{}/{}", prefix, name);
                out.push((path.clone(), node));
                if let Node::Group(children) = node {
                    walk(&path, children, out);
                }
            }
        }

        let mut out = Vec::new();
        walk("", &self.root, &mut out);
        out
    }

    /// Install a dataset with pre-existing element slots.
    pub(super) fn insert_dataset(&mut self, path: &str, dataset: DatasetNode) -> BackendResult<()> {
        let parts = components(path)?;
        let Some((last, parents)) = parts.split_last() else {
            return Err(BackendError::InvalidArgument("dataset at root".to_string()));
        };
        let group = self.group_mut(parents, true)?;
        if group.contains_key(*last) {
            return Err(BackendError::AlreadyExists(path.to_string()));
        }
        group.insert(last.to_string(), Node::Dataset(dataset));
        Ok(())
    }
}

impl ContainerBackend for MemoryContainer {
    fn link_exists(&self, path: &str) -> BackendResult<bool> {
        let parts = components(path)?;
        if parts.is_empty() {
            return Ok(true);
        }
        Ok(self.lookup(&parts)?.is_some())
    }

    fn node_kind(&self, path: &str) -> BackendResult<Option<NodeKind>> {
        let parts = components(path)?;
        if parts.is_empty() {
            return Ok(Some(NodeKind::Group));
        }
        Ok(self.lookup(&parts)?.map(|node| match node {
            Node::Group(_) => NodeKind::Group,
            Node::Dataset(_) => NodeKind::Dataset,
        }))
    }

    fn create_group(&mut self, path: &str, create_intermediate: bool) -> BackendResult<()> {
        let parts = components(path)?;
        let Some((last, parents)) = parts.split_last() else {
            return Err(BackendError::AlreadyExists("/".to_string()));
        };
        let group = self.group_mut(parents, create_intermediate)?;
        if group.contains_key(*last) {
            return Err(BackendError::AlreadyExists(path.to_string()));
        }
        group.insert(last.to_string(), Node::Group(BTreeMap::new()));
        Ok(())
    }

    fn delete_link(&mut self, path: &str) -> BackendResult<()> {
        let parts = components(path)?;
        let Some((last, parents)) = parts.split_last() else {
            return Err(BackendError::InvalidArgument("cannot delete root group".to_string()));
        };
        let group = self.group_mut(parents, false)?;
        group
            .remove(*last)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(path.to_string()))
    }

    fn move_link(&mut self, from: &str, to: &str) -> BackendResult<()> {
        let from_parts = components(from)?;
        let to_parts = components(to)?;
        let (Some((from_last, from_parents)), Some((to_last, to_parents))) =
            (from_parts.split_last(), to_parts.split_last())
        else {
            return Err(BackendError::InvalidArgument("cannot move root group".to_string()));
        };
        if to_parts.starts_with(&from_parts) {
            return Err(BackendError::InvalidArgument(format!(
                "cannot move {} below itself",
                from
            )));
        }

        // Validate the destination before detaching the source.
        match self.lookup(to_parents)? {
            Some(Node::Group(children)) if children.contains_key(*to_last) => {
                return Err(BackendError::AlreadyExists(to.to_string()))
            }
            Some(Node::Group(_)) => {}
            Some(Node::Dataset(_)) => return Err(BackendError::NotAGroup(joined(to_parents))),
            None if to_parents.is_empty() => {
                if self.root.contains_key(*to_last) {
                    return Err(BackendError::AlreadyExists(to.to_string()));
                }
            }
            None => return Err(BackendError::NotFound(joined(to_parents))),
        }

        let node = self
            .group_mut(from_parents, false)?
            .remove(*from_last)
            .ok_or_else(|| BackendError::NotFound(from.to_string()))?;
        self.group_mut(to_parents, false)?
            .insert(to_last.to_string(), node);
        Ok(())
    }

    fn children(&self, path: &str) -> BackendResult<Vec<String>> {
        let parts = components(path)?;
        let group = if parts.is_empty() {
            &self.root
        } else {
            match self.lookup(&parts)? {
                Some(Node::Group(children)) => children,
                Some(Node::Dataset(_)) => return Err(BackendError::NotAGroup(path.to_string())),
                None => return Err(BackendError::NotFound(path.to_string())),
            }
        };
        Ok(group.keys().cloned().collect())
    }

    fn create_dataset(
        &mut self,
        path: &str,
        layout: &ElementLayout,
        space: &Dataspace,
    ) -> BackendResult<()> {
        if !space.is_valid() {
            return Err(BackendError::InvalidArgument(format!(
                "invalid dataspace {:?}",
                space
            )));
        }
        let parts = components(path)?;
        let Some((last, parents)) = parts.split_last() else {
            return Err(BackendError::InvalidArgument("dataset at root".to_string()));
        };
        let group = self.group_mut(parents, false)?;
        if group.contains_key(*last) {
            return Err(BackendError::AlreadyExists(path.to_string()));
        }
        let slots = usize::try_from(space.element_count())
            .map_err(|_| BackendError::InvalidArgument("dataspace too large".to_string()))?;
        group.insert(
            last.to_string(),
            Node::Dataset(DatasetNode {
                layout: layout.clone(),
                space: space.clone(),
                elements: vec![None; slots],
            }),
        );
        Ok(())
    }

    fn dataset_info(&self, path: &str) -> BackendResult<DatasetInfo> {
        let dataset = self.dataset(path)?;
        Ok(DatasetInfo {
            layout: dataset.layout.clone(),
            space: dataset.space.clone(),
        })
    }

    fn set_extent(&mut self, path: &str, len: u64) -> BackendResult<()> {
        let dataset = self.dataset_mut(path)?;
        if let Some(Some(max)) = dataset.space.max_dims.first() {
            if len > *max {
                return Err(BackendError::NotExtendible {
                    path: path.to_string(),
                    max: *max,
                });
            }
        }
        let row = dataset.space.dims.iter().skip(1).fold(1u64, |acc, &d| acc.saturating_mul(d));
        let slots = usize::try_from(len.saturating_mul(row))
            .map_err(|_| BackendError::InvalidArgument("extent too large".to_string()))?;
        dataset.elements.resize(slots, None);
        if let Some(dim) = dataset.space.dims.first_mut() {
            *dim = len;
        }
        Ok(())
    }

    fn write_element(&mut self, path: &str, index: u64, bytes: &[u8]) -> BackendResult<()> {
        let dataset = self.dataset_mut(path)?;
        let len = dataset.elements.len() as u64;
        if index >= len {
            return Err(BackendError::OutOfBounds {
                path: path.to_string(),
                index,
                len,
            });
        }
        if let Some(expected) = dataset.layout.fixed_size() {
            if bytes.len() != expected {
                return Err(BackendError::ElementSize {
                    path: path.to_string(),
                    expected,
                    actual: bytes.len(),
                });
            }
        }
        dataset.elements[index as usize] = Some(Bytes::copy_from_slice(bytes));
        Ok(())
    }

    fn read_element(&self, path: &str, index: u64) -> BackendResult<Bytes> {
        let dataset = self.dataset(path)?;
        let len = dataset.elements.len() as u64;
        if index >= len {
            return Err(BackendError::OutOfBounds {
                path: path.to_string(),
                index,
                len,
            });
        }
        dataset.elements[index as usize]
            .clone()
            .ok_or_else(|| BackendError::Unwritten {
                path: path.to_string(),
                index,
            })
    }
}

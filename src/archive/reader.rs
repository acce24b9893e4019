//! Read side of the named-node archive.

use std::path::Path;

use super::{Attribute, NodeKind, NODE_FIRST_CHILD, NODE_KIND_INDEX, NODE_NAME_INDEX};
use crate::ogawa::{IArchive, IGroup};
use crate::util::{Error, Result};

/// Read the name and kind blocks of a node.
fn read_node_header(node: &IGroup) -> Result<(String, NodeKind)> {
    if node.num_children() < NODE_FIRST_CHILD {
        return Err(Error::invalid(format!(
            "node at {} has {} children, expected at least {}",
            node.pos(),
            node.num_children(),
            NODE_FIRST_CHILD
        )));
    }
    let name = node.data(NODE_NAME_INDEX)?.read_string()?;
    let kind_bytes = node.data(NODE_KIND_INDEX)?.read_all()?;
    let kind = match kind_bytes.as_slice() {
        [b] => NodeKind::from_u8(*b),
        _ => None,
    }
    .ok_or_else(|| Error::invalid(format!("node '{}' has an invalid kind", name)))?;
    Ok((name, kind))
}

/// Archive reader over an Ogawa container.
pub struct ArchiveReader {
    root: GroupReader,
    version: u16,
}

impl ArchiveReader {
    /// Open an archive and index its root group.
    pub fn open(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let archive = IArchive::open(path, use_mmap)?;
        let root = GroupReader::new(archive.root().clone())?;
        Ok(Self { root, version: archive.version() })
    }

    /// Container format version.
    #[inline]
    pub fn version(&self) -> u16 {
        self.version
    }

    /// The root group.
    #[inline]
    pub fn root(&self) -> &GroupReader {
        &self.root
    }
}

/// A named group, with its children indexed by name.
///
/// Child order is the order in which the writer created them.
#[derive(Clone)]
pub struct GroupReader {
    name: String,
    groups: Vec<(String, IGroup)>,
    attributes: Vec<(String, IGroup)>,
}

impl GroupReader {
    /// Index a group node.
    pub fn new(node: IGroup) -> Result<Self> {
        let (name, kind) = read_node_header(&node)?;
        if kind != NodeKind::Group {
            return Err(Error::TypeMismatch {
                expected: "group".to_string(),
                actual: "attribute".to_string(),
            });
        }

        let mut groups = Vec::new();
        let mut attributes = Vec::new();
        for i in NODE_FIRST_CHILD..node.num_children() {
            let child = node.group(i)?;
            let (child_name, child_kind) = read_node_header(&child)?;
            match child_kind {
                NodeKind::Group => groups.push((child_name, child)),
                NodeKind::Attribute => attributes.push((child_name, child)),
            }
        }

        Ok(Self { name, groups, attributes })
    }

    /// Name of this group (empty for the root).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of all child groups, in creation order.
    pub fn child_group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Open a child group by name.
    pub fn child_group(&self, name: &str) -> Result<Option<GroupReader>> {
        match self.groups.iter().find(|(n, _)| n == name) {
            Some((_, node)) => Ok(Some(GroupReader::new(node.clone())?)),
            None => Ok(None),
        }
    }

    /// Names of all attributes, in creation order.
    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Check if an attribute exists.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|(n, _)| n == name)
    }

    /// Read and decode an attribute.
    pub fn attribute(&self, name: &str) -> Result<Option<Attribute>> {
        let Some((_, node)) = self.attributes.iter().find(|(n, _)| n == name) else {
            return Ok(None);
        };
        let bytes = node.data(NODE_FIRST_CHILD)?.read_all()?;
        Attribute::decode(&bytes).map(Some)
    }

    /// Read an attribute that must be present.
    pub fn required_attribute(&self, name: &str) -> Result<Attribute> {
        self.attribute(name)?.ok_or_else(|| {
            Error::invalid(format!("group '{}' is missing attribute '{}'", self.name, name))
        })
    }
}

//! Write side of the named-node archive.
//!
//! Attributes are encoded and appended to the container the moment they are
//! set. Groups only record their children in memory; [`ArchiveWriter::close`]
//! writes them depth-first once every child position is known.

use std::path::Path;

use super::{Attribute, NodeKind};
use crate::ogawa::OArchive;
use crate::util::{Error, Result};

/// Handle to a group created by an [`ArchiveWriter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroupId(usize);

#[derive(Debug)]
enum PendingChild {
    Group(GroupId),
    Attribute { name: String, pointer: u64 },
}

#[derive(Debug)]
struct PendingGroup {
    name: String,
    children: Vec<PendingChild>,
}

/// Archive writer over an Ogawa container.
pub struct ArchiveWriter {
    archive: OArchive,
    groups: Vec<PendingGroup>,
    /// Shared data blocks for the two node kinds.
    kind_pointers: [Option<u64>; 2],
}

impl ArchiveWriter {
    /// Create the archive file. See [`OArchive::create`] for `overwrite`.
    pub fn create(path: impl AsRef<Path>, overwrite: bool) -> Result<Self> {
        let archive = OArchive::create(path, overwrite)?;
        let root = PendingGroup { name: String::new(), children: Vec::new() };
        Ok(Self {
            archive,
            groups: vec![root],
            kind_pointers: [None; 2],
        })
    }

    /// The root group.
    #[inline]
    pub fn root(&self) -> GroupId {
        GroupId(0)
    }

    fn pending(&self, id: GroupId) -> Result<&PendingGroup> {
        self.groups
            .get(id.0)
            .ok_or_else(|| Error::invalid(format!("unknown group handle {}", id.0)))
    }

    fn pending_mut(&mut self, id: GroupId) -> Result<&mut PendingGroup> {
        self.groups
            .get_mut(id.0)
            .ok_or_else(|| Error::invalid(format!("unknown group handle {}", id.0)))
    }

    /// Find an existing child group by name.
    pub fn find_group(&self, parent: GroupId, name: &str) -> Option<GroupId> {
        self.pending(parent).ok()?.children.iter().find_map(|c| match c {
            PendingChild::Group(g) if self.groups[g.0].name == name => Some(*g),
            _ => None,
        })
    }

    /// Create a child group. Child group names are unique per parent.
    pub fn create_group(&mut self, parent: GroupId, name: &str) -> Result<GroupId> {
        if self.archive.is_frozen() {
            return Err(Error::Frozen);
        }
        if self.find_group(parent, name).is_some() {
            return Err(Error::invalid_name(name, "group already exists"));
        }
        self.pending(parent)?;

        let id = GroupId(self.groups.len());
        self.groups.push(PendingGroup { name: name.to_string(), children: Vec::new() });
        self.pending_mut(parent)?.children.push(PendingChild::Group(id));
        Ok(id)
    }

    /// Return the named child group, creating it if needed.
    pub fn group_or_create(&mut self, parent: GroupId, name: &str) -> Result<GroupId> {
        match self.find_group(parent, name) {
            Some(id) => Ok(id),
            None => self.create_group(parent, name),
        }
    }

    /// Detach a child group from `parent`. Anything already written for it
    /// stays in the file but is no longer referenced.
    pub fn remove_group(&mut self, parent: GroupId, child: GroupId) -> Result<()> {
        let children = &mut self.pending_mut(parent)?.children;
        let before = children.len();
        children.retain(|c| !matches!(c, PendingChild::Group(g) if *g == child));
        if children.len() == before {
            return Err(Error::invalid(format!("group handle {} is not a child", child.0)));
        }
        Ok(())
    }

    /// Write an attribute on a group. Writing the same key again replaces
    /// the earlier value.
    pub fn write_attribute(&mut self, group: GroupId, key: &str, value: &Attribute) -> Result<()> {
        self.pending(group)?;

        let name_ptr = self.archive.write_data(key.as_bytes())?;
        let kind_ptr = self.kind_pointer(NodeKind::Attribute)?;
        let value_ptr = self.archive.write_data(&value.encode())?;
        let pointer = self.archive.write_group(&[name_ptr, kind_ptr, value_ptr])?;

        let children = &mut self.pending_mut(group)?.children;
        let entry = PendingChild::Attribute { name: key.to_string(), pointer };
        let existing = children
            .iter()
            .position(|c| matches!(c, PendingChild::Attribute { name, .. } if name == key));
        match existing {
            Some(i) => children[i] = entry,
            None => children.push(entry),
        }
        Ok(())
    }

    /// Drop every attribute of a group. Their data stays in the file but is
    /// no longer referenced.
    pub fn clear_attributes(&mut self, group: GroupId) -> Result<()> {
        self.pending_mut(group)?
            .children
            .retain(|c| matches!(c, PendingChild::Group(_)));
        Ok(())
    }

    fn kind_pointer(&mut self, kind: NodeKind) -> Result<u64> {
        let slot = kind as usize;
        if let Some(ptr) = self.kind_pointers[slot] {
            return Ok(ptr);
        }
        let ptr = self.archive.write_data(&[kind as u8])?;
        self.kind_pointers[slot] = Some(ptr);
        Ok(ptr)
    }

    /// Node children of a group: name, kind, then every child pointer.
    fn node_children(&mut self, id: GroupId) -> Result<Vec<u64>> {
        let name = self.pending(id)?.name.clone();
        let children = std::mem::take(&mut self.pending_mut(id)?.children);

        let mut pointers = Vec::with_capacity(children.len() + 2);
        pointers.push(self.archive.write_data(name.as_bytes())?);
        pointers.push(self.kind_pointer(NodeKind::Group)?);
        for child in children {
            match child {
                PendingChild::Group(g) => {
                    let grandchildren = self.node_children(g)?;
                    pointers.push(self.archive.write_group(&grandchildren)?);
                }
                PendingChild::Attribute { pointer, .. } => pointers.push(pointer),
            }
        }
        Ok(pointers)
    }

    /// Write every pending group and freeze the container.
    pub fn close(mut self) -> Result<()> {
        let root_children = self.node_children(self.root())?;
        self.archive.finalize(&root_children)?;
        self.archive.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveReader;
    use tempfile::NamedTempFile;

    #[test]
    fn test_nested_groups_and_attributes() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let path = temp.path();

        let mut writer = ArchiveWriter::create(path, true)?;
        let root = writer.root();
        writer.write_attribute(root, "version", &Attribute::Ints(vec![1, 2, 3]))?;
        let smoke = writer.create_group(root, "smoke")?;
        let density = writer.create_group(smoke, "density")?;
        writer.write_attribute(density, "data_type", &"float".into())?;
        writer.create_group(root, "water")?;
        writer.close()?;

        let reader = ArchiveReader::open(path, false)?;
        assert_eq!(reader.version(), crate::ogawa::CURRENT_VERSION);
        let root = reader.root();
        assert_eq!(root.child_group_names(), vec!["smoke", "water"]);
        assert!(root.has_attribute("version"));
        assert!(!root.has_attribute("smoke"));
        assert_eq!(root.attribute("version")?, Some(Attribute::Ints(vec![1, 2, 3])));

        let smoke = root.child_group("smoke")?.expect("smoke group");
        let density = smoke.child_group("density")?.expect("density group");
        assert_eq!(density.name(), "density");
        assert_eq!(density.attribute("data_type")?, Some(Attribute::from("float")));
        assert_eq!(density.attribute("missing")?, None);
        Ok(())
    }

    #[test]
    fn test_attribute_rewrite_replaces() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let path = temp.path();

        let mut writer = ArchiveWriter::create(path, true)?;
        let root = writer.root();
        writer.write_attribute(root, "key", &"first".into())?;
        writer.write_attribute(root, "key", &"second".into())?;
        writer.close()?;

        let reader = ArchiveReader::open(path, true)?;
        assert_eq!(reader.root().attribute_names(), vec!["key"]);
        assert_eq!(reader.root().attribute("key")?, Some(Attribute::from("second")));
        Ok(())
    }

    #[test]
    fn test_clear_attributes_keeps_groups() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let mut writer = ArchiveWriter::create(temp.path(), true)?;
        let root = writer.root();
        writer.write_attribute(root, "stale", &Attribute::Ints(vec![1]))?;
        writer.create_group(root, "child")?;
        writer.clear_attributes(root)?;
        writer.write_attribute(root, "fresh", &Attribute::Ints(vec![2]))?;
        writer.close()?;

        let reader = ArchiveReader::open(temp.path(), true)?;
        assert_eq!(reader.root().attribute_names(), vec!["fresh"]);
        assert_eq!(reader.root().child_group_names(), vec!["child"]);
        Ok(())
    }

    #[test]
    fn test_remove_group() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let mut writer = ArchiveWriter::create(temp.path(), true)?;
        let root = writer.root();
        writer.create_group(root, "keep")?;
        let scrap = writer.create_group(root, "drop")?;
        writer.write_attribute(scrap, "half", &Attribute::Ints(vec![1]))?;
        writer.remove_group(root, scrap)?;
        assert!(writer.remove_group(root, scrap).is_err());
        assert_eq!(writer.find_group(root, "drop"), None);
        // The name is free again.
        writer.create_group(root, "drop")?;
        writer.close()?;

        let reader = ArchiveReader::open(temp.path(), false)?;
        assert_eq!(reader.root().child_group_names(), vec!["keep", "drop"]);
        assert!(reader.root().child_group("drop")?.unwrap().attribute_names().is_empty());
        Ok(())
    }

    #[test]
    fn test_duplicate_group_rejected() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let mut writer = ArchiveWriter::create(temp.path(), true)?;
        let root = writer.root();
        let a = writer.create_group(root, "a")?;
        assert!(matches!(writer.create_group(root, "a"), Err(Error::InvalidName { .. })));
        assert_eq!(writer.group_or_create(root, "a")?, a);
        assert_eq!(writer.find_group(root, "b"), None);
        Ok(())
    }
}

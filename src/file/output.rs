//! Writing Field3D files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use super::{
    format_membership, layers_group_name, validate_name, validate_partition_name, CreateMode,
    Field3DFile, FileIndex, GroupMembership, Partition, PartitionSlot, DEFAULT_PARTITION, FORMAT_VERSION,
    GLOBAL_METADATA_GROUP, GROUP_MEMBERSHIP_GROUP, MAPPING_ATTR, VERSION_ATTR,
};
use crate::archive::{ArchiveWriter, Attribute, GroupId};
use crate::field::codec;
use crate::field::{DenseField, FieldValue};
use crate::util::{Error, Result};

/// A Field3D file opened for writing.
///
/// Layers are placed into partitions as they are written: a layer joins an
/// existing partition of the requested name when the mappings match and the
/// partition has no layer of that name and kind yet, otherwise a new
/// internal partition (`name.1`, `name.2`, ...) is started.
///
/// Group membership and global metadata are written on [`close`](Field3DFile::close),
/// which also runs on drop.
///
/// # Example
///
/// ```ignore
/// use field3d::prelude::*;
///
/// let mut file = Field3DOutputFile::new();
/// file.create("smoke.f3d", CreateMode::OverwriteMode)?;
/// let density = DenseField::<f32>::new(Box3i::from_resolution(IVec3::splat(64)));
/// file.write_layer("smoke", "density", &density)?;
/// file.close()?;
/// ```
#[derive(Default)]
pub struct Field3DOutputFile {
    index: FileIndex,
    archive: Option<ArchiveWriter>,
    filename: Option<PathBuf>,
    /// Internal partition name to its archive group.
    partition_groups: HashMap<String, GroupId>,
    metadata_dirty: bool,
    written_membership: GroupMembership,
}

impl Field3DOutputFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `path`, closing any file that is already open.
    ///
    /// With [`CreateMode::FailOnExisting`] an existing file is left alone
    /// and [`Error::FileAlreadyExists`] returned.
    pub fn create(&mut self, path: impl AsRef<Path>, mode: CreateMode) -> Result<()> {
        let path = path.as_ref();
        if self.is_open() {
            self.close()?;
        }

        let overwrite = mode == CreateMode::OverwriteMode;
        let mut archive = ArchiveWriter::create(path, overwrite)?;
        let root = archive.root();
        archive.write_attribute(root, VERSION_ATTR, &Attribute::Ints(FORMAT_VERSION.to_vec()))?;

        debug!("Created {}", path.display());
        self.archive = Some(archive);
        self.filename = Some(path.to_path_buf());
        Ok(())
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.archive.is_some()
    }

    /// Path of the file being written.
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Write `field` as layer `layer` of partition `partition`.
    ///
    /// Fails with [`Error::NullField`] when `field` is `None` and with
    /// [`Error::FileNotOpen`] before [`create`](Self::create) or after close.
    /// Neither touches the file.
    pub fn write_layer<'a, T: FieldValue>(
        &mut self,
        partition: &str,
        layer: &str,
        field: impl Into<Option<&'a DenseField<T>>>,
    ) -> Result<()> {
        let Some(field) = field.into() else {
            warn!("write_layer called with no field for {}:{}", partition, layer);
            return Err(Error::NullField);
        };
        let Some(archive) = self.archive.as_mut() else {
            warn!("write_layer called on a closed file for {}:{}", partition, layer);
            return Err(Error::FileNotOpen);
        };
        validate_partition_name(partition)?;
        validate_name(layer)?;

        // The index only learns about the partition and layer once the
        // archive holds them.
        let kind = T::kind();
        let slot = self.index.find_int_partition(partition, layer, field.mapping(), kind);
        let int_name = slot.name();
        let root = archive.root();

        let part_group = match &slot {
            PartitionSlot::Existing(_) => *self
                .partition_groups
                .get(int_name)
                .ok_or_else(|| Error::other(format!("partition '{}' has no group", int_name)))?,
            PartitionSlot::New(_) => {
                let group = archive.create_group(root, int_name)?;
                if let Err(e) = archive.write_attribute(group, MAPPING_ATTR, &field.mapping().serialize()) {
                    discard(archive, root, group);
                    return Err(e);
                }
                group
            }
        };

        let created = archive
            .group_or_create(part_group, layers_group_name(kind))
            .and_then(|layers| Ok((layers, archive.create_group(layers, layer)?)));
        let written = created.and_then(|(layers, group)| {
            codec::encode_dense(archive, group, field).inspect_err(|_| discard(archive, layers, group))
        });
        if let Err(e) = written {
            if matches!(slot, PartitionSlot::New(_)) {
                discard(archive, root, part_group);
            }
            return Err(e);
        }

        if let PartitionSlot::New(name) = &slot {
            self.index.add_partition(Partition::new(name.clone(), Arc::clone(field.mapping())))?;
            self.partition_groups.insert(name.clone(), part_group);
            debug!("Created partition {} ({})", name, field.mapping().class_name());
        }
        self.index.add_layer(int_name, layer, kind)?;
        debug!("Wrote {} layer {}:{} ({})", kind, int_name, layer, T::DATA_TYPE);
        Ok(())
    }

    /// [`write_layer`](Self::write_layer) into the `"default"` partition.
    pub fn write_layer_default<'a, T: FieldValue>(
        &mut self,
        layer: &str,
        field: impl Into<Option<&'a DenseField<T>>>,
    ) -> Result<()> {
        self.write_layer(DEFAULT_PARTITION, layer, field)
    }

    /// Write a field under its own name (partition) and attribute (layer).
    pub fn write_field<T: FieldValue>(&mut self, field: &DenseField<T>) -> Result<()> {
        self.write_layer(&field.name, &field.attribute, field)
    }

    /// Store the file metadata, replacing anything written before.
    pub fn write_global_metadata(&mut self) -> Result<()> {
        let archive = self.archive.as_mut().ok_or(Error::FileNotOpen)?;
        let root = archive.root();
        let group = archive.group_or_create(root, GLOBAL_METADATA_GROUP)?;
        archive.clear_attributes(group)?;
        self.index.metadata().write(archive, group)?;
        self.metadata_dirty = false;
        Ok(())
    }

    /// Store the group membership table as one `"part:layer ..."` string
    /// per group.
    pub fn write_group_membership(&mut self) -> Result<()> {
        let archive = self.archive.as_mut().ok_or(Error::FileNotOpen)?;
        let root = archive.root();
        let group = archive.group_or_create(root, GROUP_MEMBERSHIP_GROUP)?;
        archive.clear_attributes(group)?;
        for (name, refs) in self.index.group_membership() {
            archive.write_attribute(group, name, &Attribute::String(format_membership(refs)))?;
        }
        self.written_membership = self.index.group_membership().clone();
        Ok(())
    }

    /// Records that changed since they were last written.
    fn write_pending(&mut self) -> Result<()> {
        if self.index.group_membership() != &self.written_membership {
            self.write_group_membership()?;
        }
        if self.metadata_dirty {
            self.write_global_metadata()?;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.archive = None;
        self.filename = None;
        self.partition_groups.clear();
        self.metadata_dirty = false;
        self.written_membership.clear();
        self.index.clear();
    }
}

/// Unhook a partly written group.
fn discard(archive: &mut ArchiveWriter, parent: GroupId, child: GroupId) {
    if let Err(e) = archive.remove_group(parent, child) {
        warn!("Failed to discard partial group: {}", e);
    }
}

impl Field3DFile for Field3DOutputFile {
    fn index(&self) -> &FileIndex {
        &self.index
    }

    fn index_mut(&mut self) -> &mut FileIndex {
        &mut self.index
    }

    /// Write pending records, finalize the archive and clear the index.
    /// The file counts as closed even when this fails.
    fn close(&mut self) -> Result<()> {
        if !self.is_open() {
            return Ok(());
        }
        let pending = self.write_pending();
        let closed = match self.archive.take() {
            Some(archive) => archive.close(),
            None => Ok(()),
        };
        if let Some(path) = &self.filename {
            debug!("Closed {}", path.display());
        }
        self.reset();
        pending.and(closed)
    }

    fn metadata_has_changed(&mut self, _name: &str) {
        self.metadata_dirty = true;
    }
}

impl Drop for Field3DOutputFile {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close Field3D file: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{Box3i, IVec3};
    use tempfile::tempdir;

    #[test]
    fn test_rejected_writes() -> Result<()> {
        let dir = tempdir()?;
        let field = DenseField::<f32>::new(Box3i::from_resolution(IVec3::ONE));
        let mut file = Field3DOutputFile::new();

        assert!(matches!(file.write_layer("smoke", "density", &field), Err(Error::FileNotOpen)));

        file.create(dir.path().join("a.f3d"), CreateMode::OverwriteMode)?;
        let none: Option<&DenseField<f32>> = None;
        assert!(matches!(file.write_layer("smoke", "density", none), Err(Error::NullField)));
        assert!(file.partition_names().is_empty());

        assert!(matches!(
            file.write_layer("smoke", "bad name", &field),
            Err(Error::InvalidName { .. })
        ));
        assert!(matches!(
            file.write_layer("field3d_version", "density", &field),
            Err(Error::InvalidName { .. })
        ));
        assert!(file.index().layer_info().is_empty());

        file.close()?;
        assert!(matches!(file.write_layer("smoke", "density", &field), Err(Error::FileNotOpen)));
        assert!(matches!(file.write_global_metadata(), Err(Error::FileNotOpen)));
        Ok(())
    }

    #[test]
    fn test_failed_write_leaves_index_untouched() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("clash.f3d");
        let field = DenseField::<f32>::new(Box3i::from_resolution(IVec3::splat(2)));

        let mut file = Field3DOutputFile::new();
        file.create(&path, CreateMode::OverwriteMode)?;
        // A stray group already holds the partition name.
        let archive = file.archive.as_mut().unwrap();
        let root = archive.root();
        archive.create_group(root, "smoke")?;

        assert!(file.write_layer("smoke", "density", &field).is_err());
        assert!(file.partition_names().is_empty());
        assert!(file.index().layer_info().is_empty());
        assert!(file.partition_groups.is_empty());

        file.write_layer("fire", "heat", &field)?;
        assert_eq!(file.partition_names(), vec!["fire"]);
        file.close()?;
        Ok(())
    }

    #[test]
    fn test_fail_on_existing() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("exists.f3d");
        std::fs::write(&path, b"keep me")?;

        let mut file = Field3DOutputFile::new();
        let err = file.create(&path, CreateMode::FailOnExisting).unwrap_err();
        assert!(matches!(err, Error::FileAlreadyExists(_)));
        assert!(!file.is_open());
        assert_eq!(std::fs::read(&path)?, b"keep me");
        Ok(())
    }

    #[test]
    fn test_metadata_hook_marks_dirty() -> Result<()> {
        let dir = tempdir()?;
        let mut file = Field3DOutputFile::new();
        file.create(dir.path().join("m.f3d"), CreateMode::OverwriteMode)?;
        assert!(!file.metadata_dirty);
        file.set_metadata("author", "fx");
        assert!(file.metadata_dirty);
        file.write_global_metadata()?;
        assert!(!file.metadata_dirty);
        Ok(())
    }
}

//! Reading Field3D files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::{
    layers_group_name, parse_membership, Field3DFile, FileIndex, GroupMembership, Partition,
    ReadOptions, FORMAT_VERSION, GLOBAL_METADATA_GROUP, GROUP_MEMBERSHIP_GROUP, MAPPING_ATTR,
    RESERVED_PREFIX, VERSION_ATTR,
};
use crate::archive::{ArchiveReader, GroupReader};
use crate::field::codec;
use crate::field::{DenseField, EmptyField, FieldMapping, FieldMetadata, FieldRes, FieldValue, LayerKind};
use crate::util::{Error, Result};

/// A Field3D file opened for reading.
///
/// The partition hierarchy is read on [`open`](Self::open); layer samples
/// are decoded only when asked for.
///
/// # Example
///
/// ```ignore
/// use field3d::prelude::*;
///
/// let mut file = Field3DInputFile::new();
/// file.open("smoke.f3d")?;
/// for density in file.read_layers::<f32>("density") {
///     println!("{}: {:?}", density.name, density.data_window());
/// }
/// ```
#[derive(Default)]
pub struct Field3DInputFile {
    index: FileIndex,
    archive: Option<ArchiveReader>,
    filename: Option<PathBuf>,
}

impl Field3DInputFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open with [`ReadOptions::default`].
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.open_with(path, ReadOptions::default())
    }

    /// Open `path`, closing any file that is already open.
    ///
    /// Fails with [`Error::ArchiveNotFound`] for a missing file and
    /// [`Error::ArchiveCorrupt`] for anything that is not a Field3D archive.
    /// On failure the file stays closed.
    pub fn open_with(&mut self, path: impl AsRef<Path>, options: ReadOptions) -> Result<()> {
        let path = path.as_ref();
        if self.is_open() {
            self.close()?;
        }

        let archive = ArchiveReader::open(path, options.use_mmap).map_err(Error::into_corrupt)?;
        let index = read_index(archive.root()).map_err(Error::into_corrupt)?;

        debug!(
            "Opened {} ({} partitions, {} layers)",
            path.display(),
            index.partitions().len(),
            index.layer_info().len()
        );
        self.index = index;
        self.archive = Some(archive);
        self.filename = Some(path.to_path_buf());
        Ok(())
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.archive.is_some()
    }

    /// Path of the open file.
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Internal partition names.
    pub fn int_partition_names(&self) -> Vec<&str> {
        self.index.int_partition_names()
    }

    pub fn int_scalar_layer_names(&self, int_partition: &str) -> Vec<&str> {
        self.index.int_scalar_layer_names(int_partition)
    }

    pub fn int_vector_layer_names(&self, int_partition: &str) -> Vec<&str> {
        self.index.int_vector_layer_names(int_partition)
    }

    fn layer_group(&self, partition: &Partition, layer: &str, kind: LayerKind) -> Result<GroupReader> {
        let archive = self.archive.as_ref().ok_or(Error::FileNotOpen)?;
        let missing = || Error::invalid(format!("layer '{}:{}' not in archive", partition.name, layer));
        archive
            .root()
            .child_group(&partition.name)?
            .ok_or_else(missing)?
            .child_group(layers_group_name(kind))?
            .ok_or_else(missing)?
            .child_group(layer)?
            .ok_or_else(missing)
    }

    /// Name the field after the partition and layer it came from.
    fn attach(res: &mut FieldRes, partition: &Partition, layer: &str) {
        res.name = FileIndex::remove_unique_id(&partition.name).to_string();
        res.attribute = layer.to_string();
        res.set_mapping(Arc::clone(partition.mapping()));
    }

    fn read_layer<T: FieldValue>(&self, partition: &Partition, layer: &str) -> Result<DenseField<T>> {
        let group = self
            .layer_group(partition, layer, T::kind())
            .map_err(|e| Error::decode(layer, e.to_string()))?;
        let mut field = codec::decode_dense::<T>(&group, layer)?;
        Self::attach(field.res_mut(), partition, layer);
        Ok(field)
    }

    fn read_proxy<T: FieldValue>(
        &self,
        partition: &Partition,
        layer: &str,
        kind: LayerKind,
    ) -> Result<EmptyField<T>> {
        let group = self
            .layer_group(partition, layer, kind)
            .map_err(|e| Error::decode(layer, e.to_string()))?;
        let mut field = codec::decode_proxy::<T>(&group, layer)?;
        Self::attach(&mut field, partition, layer);
        Ok(field)
    }

    /// Decode matching layers of every partition, skipping failures.
    fn collect_layers<'a, T: FieldValue>(
        &self,
        partitions: impl IntoIterator<Item = &'a Partition>,
        layer_name: &str,
    ) -> Vec<DenseField<T>> {
        let mut fields = Vec::new();
        for partition in partitions {
            for name in partition.layer_names(T::kind()) {
                if !layer_name.is_empty() && name != layer_name {
                    continue;
                }
                match self.read_layer::<T>(partition, name) {
                    Ok(field) => fields.push(field),
                    Err(e) => debug!("Skipping layer {}:{}: {}", partition.name, name, e),
                }
            }
        }
        fields
    }

    /// Every layer of `T`'s kind named `layer_name` (all of them when it
    /// is empty), across all partitions. Layers that fail to decode as `T`
    /// are left out.
    pub fn read_layers<T: FieldValue>(&self, layer_name: &str) -> Vec<DenseField<T>> {
        self.collect_layers(self.index.partitions().iter(), layer_name)
    }

    /// Layers named `layer_name` in the partitions whose external name is
    /// `partition`. Empty names give an empty result.
    pub fn read_partition_layers<T: FieldValue>(
        &self,
        partition: &str,
        layer_name: &str,
    ) -> Vec<DenseField<T>> {
        if partition.is_empty() || layer_name.is_empty() {
            return Vec::new();
        }
        self.collect_layers(self.index.int_partitions(partition), layer_name)
    }

    fn collect_proxies<T: FieldValue>(
        &self,
        partition: Option<&str>,
        layer_name: &str,
        kind: LayerKind,
    ) -> Vec<EmptyField<T>> {
        let partitions = match partition {
            Some(name) => self.index.int_partitions(name),
            None => self.index.partitions().iter().collect(),
        };
        let mut fields = Vec::new();
        for p in partitions {
            for name in p.layer_names(kind) {
                if !layer_name.is_empty() && name != layer_name {
                    continue;
                }
                match self.read_proxy::<T>(p, name, kind) {
                    Ok(field) => fields.push(field),
                    Err(e) => debug!("Skipping proxy {}:{}: {}", p.name, name, e),
                }
            }
        }
        fields
    }

    /// Envelopes of the `layer_name` layers in the partitions named
    /// `partition`. The stored data type is not checked against `T`.
    pub fn read_proxy_layer<T: FieldValue>(
        &self,
        partition: &str,
        layer_name: &str,
        is_vector: bool,
    ) -> Vec<EmptyField<T>> {
        if partition.is_empty() || layer_name.is_empty() {
            return Vec::new();
        }
        let kind = if is_vector { LayerKind::Vector } else { LayerKind::Scalar };
        self.collect_proxies(Some(partition), layer_name, kind)
    }

    /// Envelopes of every scalar layer named `layer_name`, or of all scalar
    /// layers when it is empty.
    pub fn read_proxy_scalar_layers<T: FieldValue>(&self, layer_name: &str) -> Vec<EmptyField<T>> {
        self.collect_proxies(None, layer_name, LayerKind::Scalar)
    }

    /// Vector counterpart of [`read_proxy_scalar_layers`](Self::read_proxy_scalar_layers).
    pub fn read_proxy_vector_layers<T: FieldValue>(&self, layer_name: &str) -> Vec<EmptyField<T>> {
        self.collect_proxies(None, layer_name, LayerKind::Vector)
    }
}

impl Field3DFile for Field3DInputFile {
    fn index(&self) -> &FileIndex {
        &self.index
    }

    fn index_mut(&mut self) -> &mut FileIndex {
        &mut self.index
    }

    fn close(&mut self) -> Result<()> {
        if let Some(path) = self.filename.take() {
            debug!("Closing {}", path.display());
        }
        self.archive = None;
        self.index.clear();
        Ok(())
    }
}

/// Rebuild the index from the archive root.
fn read_index(root: &GroupReader) -> Result<FileIndex> {
    if !root.has_attribute(VERSION_ATTR) {
        return Err(Error::ArchiveCorrupt(format!("missing '{}', not a Field3D file", VERSION_ATTR)));
    }
    let version = root.required_attribute(VERSION_ATTR)?;
    match version.as_ints() {
        Some([major, ..]) if *major <= FORMAT_VERSION[0] => {}
        Some(v) => return Err(Error::ArchiveCorrupt(format!("unsupported format version {:?}", v))),
        None => return Err(Error::invalid(format!("malformed '{}'", VERSION_ATTR))),
    }

    let mut index = FileIndex::new();
    for name in root.child_group_names() {
        if name.starts_with(RESERVED_PREFIX) {
            continue;
        }
        let Some(group) = root.child_group(name)? else { continue };
        read_partition(&mut index, &group);
    }

    if let Some(group) = root.child_group(GLOBAL_METADATA_GROUP)? {
        *index.metadata_mut() = FieldMetadata::read(&group)?;
    }

    if let Some(group) = root.child_group(GROUP_MEMBERSHIP_GROUP)? {
        let mut membership = GroupMembership::new();
        for key in group.attribute_names() {
            if let Some(value) = group.attribute(key)?.as_ref().and_then(|a| a.as_str().map(parse_membership)) {
                membership.insert(key.to_string(), value);
            }
        }
        index.add_group_membership(&membership)?;
    }

    Ok(index)
}

/// Index one partition group. A partition without a readable mapping is
/// left out, as is any layer whose header is unreadable or filed under the
/// wrong kind.
fn read_partition(index: &mut FileIndex, group: &GroupReader) {
    let name = group.name();
    let mapping = group
        .required_attribute(MAPPING_ATTR)
        .and_then(|attr| FieldMapping::deserialize(&attr));
    let added = mapping.and_then(|m| index.add_partition(Partition::new(name, Arc::new(m))));
    if let Err(e) = added {
        debug!("Skipping partition {}: {}", name, e);
        return;
    }

    for kind in [LayerKind::Scalar, LayerKind::Vector] {
        let layers = match group.child_group(layers_group_name(kind)) {
            Ok(Some(layers)) => layers,
            Ok(None) => continue,
            Err(e) => {
                debug!("Skipping {} layers of {}: {}", kind, name, e);
                continue;
            }
        };
        for layer in layers.child_group_names() {
            if let Err(e) = check_layer(&layers, layer, kind).and_then(|_| index.add_layer(name, layer, kind)) {
                debug!("Skipping layer {}:{}: {}", name, layer, e);
            }
        }
    }
}

fn check_layer(layers: &GroupReader, name: &str, kind: LayerKind) -> Result<()> {
    let group = layers
        .child_group(name)?
        .ok_or_else(|| Error::invalid(format!("layer '{}' vanished", name)))?;
    let components = codec::read_components(&group)?;
    if components != kind.components() {
        return Err(Error::invalid(format!(
            "{} components in the {} layers",
            components, kind
        )));
    }
    Ok(())
}

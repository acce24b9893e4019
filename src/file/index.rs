//! Partition and layer bookkeeping shared by readers and writers.
//!
//! Callers address partitions by their *external* name (`"smoke"`). A file
//! may hold several *internal* partitions for one external name
//! (`"smoke"`, `"smoke.1"`, ...) when layers written under that name carry
//! different mappings, or when the same layer name is written twice.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{validate_name, Layer, LayerInfo, Partition};
use crate::field::{FieldMapping, FieldMetadata, LayerKind};
use crate::util::{Error, Result};

/// A `(partition, layer)` pair referenced by a membership group.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerRef {
    pub partition: String,
    pub layer: String,
}

impl LayerRef {
    pub fn new(partition: impl Into<String>, layer: impl Into<String>) -> Self {
        Self { partition: partition.into(), layer: layer.into() }
    }

    /// Parse a `partition:layer` token.
    pub fn parse(token: &str) -> Option<Self> {
        let (partition, layer) = token.split_once(':')?;
        let r = Self::new(partition, layer);
        r.validate().ok().map(|_| r)
    }

    /// Both names must survive the `partition:layer` token form.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.partition)?;
        validate_name(&self.layer)
    }
}

impl fmt::Display for LayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.partition, self.layer)
    }
}

/// Where [`FileIndex::find_int_partition`] places a layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartitionSlot {
    Existing(String),
    New(String),
}

impl PartitionSlot {
    pub fn name(&self) -> &str {
        match self {
            Self::Existing(name) | Self::New(name) => name,
        }
    }
}

/// Group name to its ordered set of layer references.
pub type GroupMembership = BTreeMap<String, Vec<LayerRef>>;

/// Join references into the space separated form stored on disk.
pub fn format_membership(refs: &[LayerRef]) -> String {
    refs.iter().map(LayerRef::to_string).collect::<Vec<_>>().join(" ")
}

/// Parse the on-disk form. Malformed tokens are dropped.
pub fn parse_membership(value: &str) -> Vec<LayerRef> {
    let mut refs: Vec<LayerRef> = Vec::new();
    for r in value.split_whitespace().filter_map(LayerRef::parse) {
        if !refs.contains(&r) {
            refs.push(r);
        }
    }
    refs
}

/// Everything a file knows about its partitions, independent of whether it
/// is being read or written.
#[derive(Debug, Default)]
pub struct FileIndex {
    partitions: Vec<Partition>,
    partition_name_index: HashMap<String, usize>,
    /// External name to the next unused numeric suffix.
    partition_suffix_counters: HashMap<String, usize>,
    layer_info: Vec<LayerInfo>,
    group_membership: GroupMembership,
    metadata: FieldMetadata,
}

impl FileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// `"<external>"` for `i == 0`, `"<external>.<i>"` otherwise.
    pub fn make_int_partition_name(external: &str, i: usize) -> String {
        if i == 0 {
            external.to_string()
        } else {
            format!("{}.{}", external, i)
        }
    }

    /// Strip a trailing `.<digits>` suffix, if any.
    pub fn remove_unique_id(name: &str) -> &str {
        match name.rsplit_once('.') {
            Some((base, suffix))
                if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) =>
            {
                base
            }
            _ => name,
        }
    }

    /// Numeric suffix of an internal name, 0 when there is none.
    fn unique_id(name: &str) -> usize {
        let base = Self::remove_unique_id(name);
        if base.len() == name.len() {
            return 0;
        }
        name[base.len() + 1..].parse().unwrap_or(0)
    }

    #[inline]
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Partition by internal name.
    pub fn partition(&self, int_name: &str) -> Option<&Partition> {
        self.partition_name_index.get(int_name).map(|&i| &self.partitions[i])
    }

    fn partition_mut(&mut self, int_name: &str) -> Option<&mut Partition> {
        let i = *self.partition_name_index.get(int_name)?;
        self.partitions.get_mut(i)
    }

    /// Partition by internal name, falling back to the first internal
    /// partition of an external name.
    pub fn get_partition(&self, name: &str) -> Option<&Partition> {
        self.partition(name).or_else(|| {
            self.partitions
                .iter()
                .find(|p| Self::remove_unique_id(&p.name) == name)
        })
    }

    /// Internal partitions behind an external name, in creation order.
    pub fn int_partitions<'a>(&'a self, external: &str) -> Vec<&'a Partition> {
        self.partitions
            .iter()
            .filter(|p| Self::remove_unique_id(&p.name) == external)
            .collect()
    }

    /// Number of internal partitions behind an external name.
    pub fn num_int_partitions(&self, external: &str) -> usize {
        self.int_partitions(external).len()
    }

    /// External partition names, first-seen order, no duplicates.
    pub fn partition_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for p in &self.partitions {
            let name = Self::remove_unique_id(&p.name);
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Internal partition names in creation order.
    pub fn int_partition_names(&self) -> Vec<&str> {
        self.partitions.iter().map(|p| p.name.as_str()).collect()
    }

    /// Union of layer names of `kind` over every internal partition of
    /// `external`, first-seen order.
    pub fn layer_names(&self, external: &str, kind: LayerKind) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for p in self.int_partitions(external) {
            for name in p.layer_names(kind) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn scalar_layer_names(&self, external: &str) -> Vec<&str> {
        self.layer_names(external, LayerKind::Scalar)
    }

    pub fn vector_layer_names(&self, external: &str) -> Vec<&str> {
        self.layer_names(external, LayerKind::Vector)
    }

    /// Layer names of one internal partition. Empty if it does not exist.
    pub fn int_layer_names(&self, int_name: &str, kind: LayerKind) -> Vec<&str> {
        self.partition(int_name)
            .map(|p| p.layer_names(kind))
            .unwrap_or_default()
    }

    pub fn int_scalar_layer_names(&self, int_name: &str) -> Vec<&str> {
        self.int_layer_names(int_name, LayerKind::Scalar)
    }

    pub fn int_vector_layer_names(&self, int_name: &str) -> Vec<&str> {
        self.int_layer_names(int_name, LayerKind::Vector)
    }

    /// Register a partition under its (internal) name and keep the suffix
    /// counter of its external name past its suffix.
    pub fn add_partition(&mut self, partition: Partition) -> Result<()> {
        if self.partition_name_index.contains_key(&partition.name) {
            return Err(Error::invalid(format!("duplicate partition '{}'", partition.name)));
        }
        let external = Self::remove_unique_id(&partition.name).to_string();
        let next = Self::unique_id(&partition.name) + 1;
        let counter = self.partition_suffix_counters.entry(external).or_insert(0);
        *counter = (*counter).max(next);

        debug!("Adding partition {}", partition.name);
        self.partition_name_index
            .insert(partition.name.clone(), self.partitions.len());
        self.partitions.push(partition);
        Ok(())
    }

    /// Pick the internal partition a layer written under `external` goes
    /// into without changing the index.
    ///
    /// An existing partition is reused when its mapping is identical to
    /// `mapping` and it has no `kind` layer named `layer`. Otherwise the
    /// name of a new partition is returned: `external` itself if nothing
    /// uses it yet, else `"<external>.<n>"`.
    pub fn find_int_partition(
        &self,
        external: &str,
        layer: &str,
        mapping: &FieldMapping,
        kind: LayerKind,
    ) -> PartitionSlot {
        if self.partition(external).is_none() {
            return PartitionSlot::New(external.to_string());
        }

        let counter = self
            .partition_suffix_counters
            .get(external)
            .copied()
            .unwrap_or(1);
        for i in 0..counter {
            let name = Self::make_int_partition_name(external, i);
            if let Some(p) = self.partition(&name) {
                if p.mapping().is_identical(mapping) && !p.has_layer(layer, kind) {
                    return PartitionSlot::Existing(name);
                }
            }
        }

        let mut i = counter.max(1);
        while self.partition(&Self::make_int_partition_name(external, i)).is_some() {
            i += 1;
        }
        PartitionSlot::New(Self::make_int_partition_name(external, i))
    }

    /// [`find_int_partition`](Self::find_int_partition), registering the
    /// partition when it is new.
    pub fn int_partition_name(
        &mut self,
        external: &str,
        layer: &str,
        mapping: &FieldMapping,
        kind: LayerKind,
    ) -> Result<String> {
        match self.find_int_partition(external, layer, mapping, kind) {
            PartitionSlot::Existing(name) => Ok(name),
            PartitionSlot::New(name) => {
                self.add_partition(Partition::new(name.clone(), Arc::new(*mapping)))?;
                Ok(name)
            }
        }
    }

    /// Add a layer to an existing internal partition and log it.
    pub fn add_layer(&mut self, int_name: &str, name: &str, kind: LayerKind) -> Result<()> {
        let partition = self
            .partition_mut(int_name)
            .ok_or_else(|| Error::invalid(format!("no partition '{}'", int_name)))?;
        partition.add_layer(Layer::new(name, int_name), kind)?;
        self.layer_info
            .push(LayerInfo::new(int_name, name, kind.components()));
        Ok(())
    }

    /// Every layer registered so far, in registration order.
    #[inline]
    pub fn layer_info(&self) -> &[LayerInfo] {
        &self.layer_info
    }

    #[inline]
    pub fn group_membership(&self) -> &GroupMembership {
        &self.group_membership
    }

    /// Merge `membership` into the table. References already listed for a
    /// group are not repeated. Returns whether anything was added.
    ///
    /// Every reference is checked first; on [`Error::InvalidName`] the
    /// table is left unchanged.
    pub fn add_group_membership(&mut self, membership: &GroupMembership) -> Result<bool> {
        for refs in membership.values() {
            for r in refs {
                r.validate()?;
            }
        }

        let mut changed = false;
        for (group, refs) in membership {
            let entry = self.group_membership.entry(group.clone()).or_default();
            for r in refs {
                if !entry.contains(r) {
                    entry.push(r.clone());
                    changed = true;
                }
            }
        }
        Ok(changed)
    }

    #[inline]
    pub fn metadata(&self) -> &FieldMetadata {
        &self.metadata
    }

    #[inline]
    pub fn metadata_mut(&mut self) -> &mut FieldMetadata {
        &mut self.metadata
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.partitions.clear();
        self.partition_name_index.clear();
        self.partition_suffix_counters.clear();
        self.layer_info.clear();
        self.group_membership.clear();
        self.metadata.clear();
    }
}

impl fmt::Display for FileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.partitions {
            writeln!(f, "Partition: {} ({})", p.name, p.mapping().class_name())?;
            for name in p.scalar_layer_names() {
                writeln!(f, "  Scalar layer: {}", name)?;
            }
            for name in p.vector_layer_names() {
                writeln!(f, "  Vector layer: {}", name)?;
            }
        }
        for (group, refs) in &self.group_membership {
            writeln!(f, "Group: {} -> {}", group, format_membership(refs))?;
        }
        Ok(())
    }
}

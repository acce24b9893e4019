//! Field3D files: partitions, layers and the reader/writer pair.
//!
//! On-disk layout below the archive root:
//!
//! ```text
//! /field3d_version              attribute, [major, minor, micro]
//! /field3d_global_metadata/     one attribute per file metadata entry
//! /field3d_group_membership/    one string attribute per group
//! /<partition>/                 internal partition name, e.g. "smoke.1"
//!     mapping                   attribute, serialized FieldMapping
//!     scalar_layers/<layer>/    layer payload, see field::codec
//!     vector_layers/<layer>/
//! ```

mod index;
mod input;
mod layer;
mod output;
mod partition;

pub use index::*;
pub use input::*;
pub use layer::*;
pub use output::*;
pub use partition::*;

use crate::field::{LayerKind, MetaValue};
use crate::util::{Error, Result};

/// Format version written to new files.
pub const FORMAT_VERSION: [i32; 3] = [1, 7, 3];

/// Names under the root starting with this prefix are not partitions.
pub const RESERVED_PREFIX: &str = "field3d_";
pub const VERSION_ATTR: &str = "field3d_version";
pub const GLOBAL_METADATA_GROUP: &str = "field3d_global_metadata";
pub const GROUP_MEMBERSHIP_GROUP: &str = "field3d_group_membership";

pub const MAPPING_ATTR: &str = "mapping";
pub const SCALAR_LAYERS_GROUP: &str = "scalar_layers";
pub const VECTOR_LAYERS_GROUP: &str = "vector_layers";

/// Partition used by [`Field3DOutputFile::write_layer_default`].
pub const DEFAULT_PARTITION: &str = "default";

/// Group holding the layers of one kind inside a partition group.
pub(crate) fn layers_group_name(kind: LayerKind) -> &'static str {
    match kind {
        LayerKind::Scalar => SCALAR_LAYERS_GROUP,
        LayerKind::Vector => VECTOR_LAYERS_GROUP,
    }
}

/// What [`Field3DOutputFile::create`] does when the path exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CreateMode {
    /// Replace the existing file.
    #[default]
    OverwriteMode,
    /// Fail with [`Error::FileAlreadyExists`].
    FailOnExisting,
}

/// Options for [`Field3DInputFile::open_with`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadOptions {
    /// Memory-map the file instead of buffered reads.
    pub use_mmap: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { use_mmap: cfg!(feature = "mmap") }
    }
}

/// Check a layer or partition name.
///
/// Names end up as archive group names and as `partition:layer` tokens, so
/// they must be non-empty and free of `/`, `:` and whitespace.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name(name, "name is empty"));
    }
    if let Some(c) = name.chars().find(|c| *c == '/' || *c == ':' || c.is_whitespace()) {
        return Err(Error::invalid_name(name, format!("contains {:?}", c)));
    }
    Ok(())
}

/// Check an external partition name. Besides [`validate_name`], it must
/// not use the reserved prefix and must not look like an internal name
/// (`<name>.<digits>`), which would not survive a round trip.
pub fn validate_partition_name(name: &str) -> Result<()> {
    validate_name(name)?;
    if name.starts_with(RESERVED_PREFIX) {
        return Err(Error::invalid_name(name, format!("'{}' prefix is reserved", RESERVED_PREFIX)));
    }
    if FileIndex::remove_unique_id(name) != name {
        return Err(Error::invalid_name(name, "numeric suffix is reserved for internal names"));
    }
    Ok(())
}

/// Behaviour shared by [`Field3DInputFile`] and [`Field3DOutputFile`].
///
/// Everything except [`close`](Field3DFile::close) works on the in-memory
/// [`FileIndex`], so it behaves the same for both directions.
pub trait Field3DFile {
    fn index(&self) -> &FileIndex;

    fn index_mut(&mut self) -> &mut FileIndex;

    /// Release the archive and clear the index.
    fn close(&mut self) -> Result<()>;

    /// Called after [`set_metadata`](Field3DFile::set_metadata) changed `name`.
    fn metadata_has_changed(&mut self, _name: &str) {}

    /// External partition names.
    fn partition_names(&self) -> Vec<&str> {
        self.index().partition_names()
    }

    fn scalar_layer_names(&self, partition: &str) -> Vec<&str> {
        self.index().scalar_layer_names(partition)
    }

    fn vector_layer_names(&self, partition: &str) -> Vec<&str> {
        self.index().vector_layer_names(partition)
    }

    fn get_partition(&self, name: &str) -> Option<&Partition> {
        self.index().get_partition(name)
    }

    /// File-level metadata.
    fn metadata(&self) -> &crate::field::FieldMetadata {
        self.index().metadata()
    }

    fn set_metadata(&mut self, key: &str, value: impl Into<MetaValue>)
    where
        Self: Sized,
    {
        self.index_mut().metadata_mut().set(key, value);
        self.metadata_has_changed(key);
    }

    fn group_membership(&self) -> &GroupMembership {
        self.index().group_membership()
    }

    /// Merge `membership` into the group table. See
    /// [`FileIndex::add_group_membership`].
    fn add_group_membership(&mut self, membership: &GroupMembership) -> Result<bool> {
        self.index_mut().add_group_membership(membership)
    }

    /// Dump partitions, layers and groups to stdout.
    fn print_hierarchy(&self) {
        print!("{}", self.index());
    }
}

//! # Field3D
//!
//! Rust implementation of the Field3D (.f3d) volumetric data file format.
//!
//! A Field3D file stores named voxel fields ("layers") grouped into
//! partitions. All layers of a partition share one spatial mapping; layers
//! written under the same partition name with different mappings end up in
//! separate internal partitions (`smoke`, `smoke.1`, ...) that callers still
//! address as `smoke`.
//!
//! ## Modules
//!
//! - [`util`] - Basic types (data types, boxes, errors)
//! - [`ogawa`] - Low-level Ogawa binary container
//! - [`archive`] - Named groups and attributes over Ogawa
//! - [`field`] - Fields, mappings, metadata and the layer codec
//! - [`file`] - Partitions, layers, reader and writer
//!
//! ## Example
//!
//! ```ignore
//! use field3d::prelude::*;
//!
//! let mut out = Field3DOutputFile::new();
//! out.create("smoke.f3d", CreateMode::OverwriteMode)?;
//! let mut density = DenseField::<f32>::new(Box3i::from_resolution(IVec3::splat(32)));
//! density.fill(0.5);
//! out.write_layer("smoke", "density", &density)?;
//! out.close()?;
//!
//! let mut input = Field3DInputFile::new();
//! input.open("smoke.f3d")?;
//! for field in input.read_layers::<f32>("density") {
//!     println!("{}:{}", field.name, field.attribute);
//! }
//! ```

pub mod util;
pub mod ogawa;
pub mod archive;
pub mod field;
pub mod file;

// Re-export commonly used types
pub use util::{DataTypeEnum, Error, Result};
pub use field::{DenseField, EmptyField, FieldMapping, FieldMetadata, FieldRes, FieldValue};
pub use file::{CreateMode, Field3DFile, Field3DInputFile, Field3DOutputFile, ReadOptions};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Box3i, DataTypeEnum, DMat4, DVec3, Error, IVec3, Result, Vec3};
    pub use crate::field::{
        DenseField, EmptyField, FieldMapping, FieldMetadata, FieldRes, FieldValue, LayerKind,
        MetaValue, V3h,
    };
    pub use crate::file::{
        CreateMode, Field3DFile, Field3DInputFile, Field3DOutputFile, GroupMembership, LayerRef,
        ReadOptions,
    };
}

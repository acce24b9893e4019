//! Utility types and functions for Field3D.
//!
//! This module contains fundamental types used throughout the library:
//! - [`DataTypeEnum`] - Voxel storage types
//! - [`Box3i`] - Voxel-space boxes, plus glam re-exports
//! - [`Error`] / [`Result`] - Error handling

mod data_type;
mod error;
mod math;

pub use data_type::*;
pub use error::*;
pub use math::*;

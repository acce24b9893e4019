//! Spatial mappings - how a field's local space sits in world space.
//!
//! Every partition owns exactly one mapping, and every layer in a partition
//! shares it. Two layers may only share a partition if their mappings are
//! [identical](FieldMapping::is_identical).

use byteorder::{ByteOrder, LittleEndian};

use crate::archive::Attribute;
use crate::util::{DMat4, DVec3, Error, Result};

/// Absolute tolerance used when comparing mapping matrices.
pub const MATRIX_TOLERANCE: f64 = 1e-10;

/// Mapping that places the field at the origin with unit size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NullFieldMapping;

/// Mapping given by a local-to-world matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatrixFieldMapping {
    local_to_world: DMat4,
    world_to_local: DMat4,
}

impl MatrixFieldMapping {
    /// Create from a local-to-world transform.
    pub fn new(local_to_world: DMat4) -> Self {
        Self {
            local_to_world,
            world_to_local: local_to_world.inverse(),
        }
    }

    /// The local-to-world transform.
    #[inline]
    pub fn local_to_world(&self) -> DMat4 {
        self.local_to_world
    }

    /// The world-to-local transform.
    #[inline]
    pub fn world_to_local(&self) -> DMat4 {
        self.world_to_local
    }
}

impl Default for MatrixFieldMapping {
    fn default() -> Self {
        Self::new(DMat4::IDENTITY)
    }
}

/// The closed set of mapping kinds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldMapping {
    Null(NullFieldMapping),
    Matrix(MatrixFieldMapping),
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self::Null(NullFieldMapping)
    }
}

impl From<NullFieldMapping> for FieldMapping {
    fn from(m: NullFieldMapping) -> Self {
        Self::Null(m)
    }
}

impl From<MatrixFieldMapping> for FieldMapping {
    fn from(m: MatrixFieldMapping) -> Self {
        Self::Matrix(m)
    }
}

impl FieldMapping {
    const TAG_NULL: u8 = 0;
    const TAG_MATRIX: u8 = 1;

    /// Matrix mapping from a local-to-world transform.
    pub fn matrix(local_to_world: DMat4) -> Self {
        Self::Matrix(MatrixFieldMapping::new(local_to_world))
    }

    /// Name of the mapping kind.
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Null(_) => "NullFieldMapping",
            Self::Matrix(_) => "MatrixFieldMapping",
        }
    }

    /// Structural comparison: same kind and, for matrices, every element
    /// within [`MATRIX_TOLERANCE`].
    pub fn is_identical(&self, other: &FieldMapping) -> bool {
        match (self, other) {
            (Self::Null(_), Self::Null(_)) => true,
            (Self::Matrix(a), Self::Matrix(b)) => a
                .local_to_world
                .to_cols_array()
                .iter()
                .zip(b.local_to_world.to_cols_array().iter())
                .all(|(x, y)| (x - y).abs() <= MATRIX_TOLERANCE),
            _ => false,
        }
    }

    /// Transform a point from local space (unit cube) to world space.
    pub fn local_to_world(&self, p: DVec3) -> DVec3 {
        match self {
            Self::Null(_) => p,
            Self::Matrix(m) => m.local_to_world.transform_point3(p),
        }
    }

    /// Transform a point from world space to local space.
    pub fn world_to_local(&self, p: DVec3) -> DVec3 {
        match self {
            Self::Null(_) => p,
            Self::Matrix(m) => m.world_to_local.transform_point3(p),
        }
    }

    /// Serialize to the partition's `mapping` attribute.
    pub fn serialize(&self) -> Attribute {
        let mut buf = Vec::with_capacity(1 + 16 * 8);
        match self {
            Self::Null(_) => buf.push(Self::TAG_NULL),
            Self::Matrix(m) => {
                buf.push(Self::TAG_MATRIX);
                for x in m.local_to_world.to_cols_array() {
                    buf.extend_from_slice(&x.to_le_bytes());
                }
            }
        }
        Attribute::Bytes(buf)
    }

    /// Parse the partition's `mapping` attribute.
    pub fn deserialize(attr: &Attribute) -> Result<Self> {
        let bytes = attr.as_bytes().ok_or_else(|| Error::TypeMismatch {
            expected: "bytes".to_string(),
            actual: attr.type_name().to_string(),
        })?;

        match bytes.split_first() {
            Some((&Self::TAG_NULL, [])) => Ok(Self::Null(NullFieldMapping)),
            Some((&Self::TAG_MATRIX, rest)) if rest.len() == 16 * 8 => {
                let mut cols = [0f64; 16];
                LittleEndian::read_f64_into(rest, &mut cols);
                Ok(Self::matrix(DMat4::from_cols_array(&cols)))
            }
            _ => Err(Error::invalid("unrecognized mapping record")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical() {
        let a = FieldMapping::matrix(DMat4::from_scale(DVec3::splat(2.0)));
        let b = FieldMapping::matrix(DMat4::from_scale(DVec3::splat(2.0)));
        let c = FieldMapping::matrix(DMat4::from_translation(DVec3::X));

        assert!(a.is_identical(&b));
        assert!(!a.is_identical(&c));
        assert!(!a.is_identical(&FieldMapping::default()));
        assert!(FieldMapping::default().is_identical(&NullFieldMapping.into()));
    }

    #[test]
    fn test_identical_within_tolerance() {
        let a = FieldMapping::matrix(DMat4::IDENTITY);
        let b = FieldMapping::matrix(DMat4::from_translation(DVec3::splat(MATRIX_TOLERANCE / 2.0)));
        assert!(a.is_identical(&b));
    }

    #[test]
    fn test_serialize() {
        let m = FieldMapping::matrix(DMat4::from_translation(DVec3::new(1.0, 2.0, 3.0)));
        let back = FieldMapping::deserialize(&m.serialize()).unwrap();
        assert!(back.is_identical(&m));
        assert_eq!(back.class_name(), "MatrixFieldMapping");

        let null = FieldMapping::deserialize(&FieldMapping::default().serialize()).unwrap();
        assert_eq!(null, FieldMapping::Null(NullFieldMapping));

        assert!(FieldMapping::deserialize(&Attribute::Bytes(vec![1, 2, 3])).is_err());
        assert!(FieldMapping::deserialize(&Attribute::from("matrix")).is_err());
    }

    #[test]
    fn test_point_transforms() {
        let m = FieldMapping::matrix(DMat4::from_translation(DVec3::new(10.0, 0.0, 0.0)));
        let w = m.local_to_world(DVec3::new(0.5, 0.5, 0.5));
        assert_eq!(w, DVec3::new(10.5, 0.5, 0.5));
        assert!((m.world_to_local(w) - DVec3::splat(0.5)).length() < 1e-12);
    }
}

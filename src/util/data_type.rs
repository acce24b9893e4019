//! Voxel data types - the value types a layer can be stored as.

use std::fmt;

/// Storage type of a single voxel.
///
/// Scalar types have one component, vector types three. The name strings
/// are what ends up in the `data_type` attribute of every layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum DataTypeEnum {
    /// 16-bit floating point
    Half = 0,
    /// Unsigned 8-bit integer
    UnsignedChar = 1,
    /// Signed 32-bit integer
    Int = 2,
    /// 32-bit floating point
    Float = 3,
    /// 64-bit floating point
    Double = 4,
    /// Three 16-bit floats
    VecHalf = 5,
    /// Three 32-bit floats
    VecFloat = 6,
    /// Three 64-bit floats
    VecDouble = 7,
    /// Unknown/invalid type
    #[default]
    Unknown = 127,
}

impl DataTypeEnum {
    /// Size in bytes of one voxel of this type.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Half => 2,
            Self::UnsignedChar => 1,
            Self::Int => 4,
            Self::Float => 4,
            Self::Double => 8,
            Self::VecHalf => 6,
            Self::VecFloat => 12,
            Self::VecDouble => 24,
            Self::Unknown => 0,
        }
    }

    /// Number of components per voxel.
    #[inline]
    pub const fn components(self) -> usize {
        match self {
            Self::VecHalf | Self::VecFloat | Self::VecDouble => 3,
            Self::Unknown => 0,
            _ => 1,
        }
    }

    /// Returns true for three-component types.
    #[inline]
    pub const fn is_vector(self) -> bool {
        self.components() == 3
    }

    /// Returns the on-disk name of this type.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Half => "half",
            Self::UnsignedChar => "uint8",
            Self::Int => "int",
            Self::Float => "float",
            Self::Double => "double",
            Self::VecHalf => "vec3_half",
            Self::VecFloat => "vec3_float",
            Self::VecDouble => "vec3_double",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse a type from its on-disk name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "half" => Self::Half,
            "uint8" => Self::UnsignedChar,
            "int" => Self::Int,
            "float" => Self::Float,
            "double" => Self::Double,
            "vec3_half" => Self::VecHalf,
            "vec3_float" => Self::VecFloat,
            "vec3_double" => Self::VecDouble,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for DataTypeEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for dt in [
            DataTypeEnum::Half,
            DataTypeEnum::UnsignedChar,
            DataTypeEnum::Int,
            DataTypeEnum::Float,
            DataTypeEnum::Double,
            DataTypeEnum::VecHalf,
            DataTypeEnum::VecFloat,
            DataTypeEnum::VecDouble,
        ] {
            assert_eq!(DataTypeEnum::from_name(dt.name()), dt);
        }
        assert_eq!(DataTypeEnum::from_name("quaternion"), DataTypeEnum::Unknown);
    }

    #[test]
    fn test_components() {
        assert_eq!(DataTypeEnum::Float.components(), 1);
        assert_eq!(DataTypeEnum::VecHalf.components(), 3);
        assert!(DataTypeEnum::VecDouble.is_vector());
        assert!(!DataTypeEnum::Half.is_vector());
        assert_eq!(DataTypeEnum::VecFloat.num_bytes(), 3 * DataTypeEnum::Float.num_bytes());
    }
}

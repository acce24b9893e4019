//! Typed metadata for fields and files.
//!
//! Metadata is a small ordered list of key/value pairs. Values are strings,
//! integers, floats, or three-component integer and float vectors.

use smallvec::SmallVec;
use std::fmt;

use crate::archive::{Attribute, ArchiveWriter, GroupId, GroupReader};
use crate::util::{IVec3, Result, Vec3};

/// A single metadata value.
#[derive(Clone, Debug, PartialEq)]
pub enum MetaValue {
    Str(String),
    Int(i32),
    Float(f32),
    VecInt(IVec3),
    VecFloat(Vec3),
}

impl MetaValue {
    /// Convert to the attribute stored on disk.
    pub fn to_attribute(&self) -> Attribute {
        match self {
            Self::Str(s) => Attribute::String(s.clone()),
            Self::Int(v) => Attribute::Ints(vec![*v]),
            Self::Float(v) => Attribute::Floats(vec![*v]),
            Self::VecInt(v) => Attribute::Ints(v.to_array().to_vec()),
            Self::VecFloat(v) => Attribute::Floats(v.to_array().to_vec()),
        }
    }

    /// Convert from a stored attribute. Returns `None` for shapes metadata
    /// cannot hold.
    pub fn from_attribute(attr: &Attribute) -> Option<Self> {
        match attr {
            Attribute::String(s) => Some(Self::Str(s.clone())),
            Attribute::Ints(v) => match v.as_slice() {
                [x] => Some(Self::Int(*x)),
                [x, y, z] => Some(Self::VecInt(IVec3::new(*x, *y, *z))),
                _ => None,
            },
            Attribute::Floats(v) => match v.as_slice() {
                [x] => Some(Self::Float(*x)),
                [x, y, z] => Some(Self::VecFloat(Vec3::new(*x, *y, *z))),
                _ => None,
            },
            Attribute::Doubles(_) | Attribute::Bytes(_) => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<i32> for MetaValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for MetaValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<IVec3> for MetaValue {
    fn from(v: IVec3) -> Self {
        Self::VecInt(v)
    }
}

impl From<Vec3> for MetaValue {
    fn from(v: Vec3) -> Self {
        Self::VecFloat(v)
    }
}

/// Metadata storage - ordered key/value pairs.
///
/// Uses SmallVec optimization for common case of few entries.
#[derive(Clone, Default, PartialEq)]
pub struct FieldMetadata {
    entries: SmallVec<[(String, MetaValue); 4]>,
}

impl FieldMetadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing an existing entry in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) {
        let key = key.into();
        let value = value.into();

        for (k, v) in &mut self.entries {
            if k == &key {
                *v = value;
                return;
            }
        }
        self.entries.push((key, value));
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// String value, or `default` if missing or of another type.
    pub fn str_metadata<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.get(key) {
            Some(MetaValue::Str(s)) => s.as_str(),
            _ => default,
        }
    }

    /// Integer value, or `default`.
    pub fn int_metadata(&self, key: &str, default: i32) -> i32 {
        match self.get(key) {
            Some(MetaValue::Int(v)) => *v,
            _ => default,
        }
    }

    /// Float value, or `default`.
    pub fn float_metadata(&self, key: &str, default: f32) -> f32 {
        match self.get(key) {
            Some(MetaValue::Float(v)) => *v,
            _ => default,
        }
    }

    /// Integer vector value, or `default`.
    pub fn vec_int_metadata(&self, key: &str, default: IVec3) -> IVec3 {
        match self.get(key) {
            Some(MetaValue::VecInt(v)) => *v,
            _ => default,
        }
    }

    /// Float vector value, or `default`.
    pub fn vec_float_metadata(&self, key: &str, default: Vec3) -> Vec3 {
        match self.get(key) {
            Some(MetaValue::VecFloat(v)) => *v,
            _ => default,
        }
    }

    /// Check if a key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Remove a key and return its value.
    pub fn remove(&mut self, key: &str) -> Option<MetaValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over key/value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Write every entry as an attribute of `group`.
    pub fn write(&self, writer: &mut ArchiveWriter, group: GroupId) -> Result<()> {
        for (key, value) in self.iter() {
            writer.write_attribute(group, key, &value.to_attribute())?;
        }
        Ok(())
    }

    /// Read every attribute of `group`. Attributes with shapes metadata
    /// cannot hold are skipped.
    pub fn read(group: &GroupReader) -> Result<Self> {
        let mut meta = Self::new();
        for key in group.attribute_names() {
            if let Some(value) = group.attribute(key)?.as_ref().and_then(MetaValue::from_attribute) {
                meta.set(key, value);
            }
        }
        Ok(meta)
    }
}

impl fmt::Debug for FieldMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl FromIterator<(String, MetaValue)> for FieldMetadata {
    fn from_iter<T: IntoIterator<Item = (String, MetaValue)>>(iter: T) -> Self {
        let mut meta = Self::new();
        for (k, v) in iter {
            meta.set(k, v);
        }
        meta
    }
}

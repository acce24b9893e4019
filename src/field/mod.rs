//! Fields - typed voxel data and the envelope every layer carries.
//!
//! - [`FieldValue`] - the voxel types a layer can hold
//! - [`FieldRes`] - name, mapping, extents and metadata shared by all fields
//! - [`DenseField`] - a fully materialized layer
//! - [`EmptyField`] - a proxy layer: the envelope without samples
//! - [`FieldMapping`] - spatial mapping shared per partition

pub mod codec;
mod mapping;
mod metadata;

pub use mapping::*;
pub use metadata::*;

use std::fmt;
use std::sync::Arc;

use bytemuck::Pod;
use half::f16;

use crate::util::{Box3i, DVec3, DataTypeEnum, IVec3, Vec3};

/// Three-component half-precision vector.
pub type V3h = [f16; 3];

/// Whether a layer holds one or three components per voxel.
///
/// Scalar and vector layers live in separate collections of a partition,
/// so a scalar and a vector layer may share a name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Scalar,
    Vector,
}

impl LayerKind {
    /// Kind for a component count.
    pub const fn from_components(components: usize) -> Option<Self> {
        match components {
            1 => Some(Self::Scalar),
            3 => Some(Self::Vector),
            _ => None,
        }
    }

    /// Number of components per voxel.
    pub const fn components(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vector => 3,
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => f.write_str("scalar"),
            Self::Vector => f.write_str("vector"),
        }
    }
}

/// A voxel value type that can be stored in a layer.
pub trait FieldValue: Pod + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// On-disk data type.
    const DATA_TYPE: DataTypeEnum;

    /// Scalar or vector, from the component count.
    fn kind() -> LayerKind {
        if Self::DATA_TYPE.is_vector() {
            LayerKind::Vector
        } else {
            LayerKind::Scalar
        }
    }
}

impl FieldValue for f16 {
    const DATA_TYPE: DataTypeEnum = DataTypeEnum::Half;
}

impl FieldValue for u8 {
    const DATA_TYPE: DataTypeEnum = DataTypeEnum::UnsignedChar;
}

impl FieldValue for i32 {
    const DATA_TYPE: DataTypeEnum = DataTypeEnum::Int;
}

impl FieldValue for f32 {
    const DATA_TYPE: DataTypeEnum = DataTypeEnum::Float;
}

impl FieldValue for f64 {
    const DATA_TYPE: DataTypeEnum = DataTypeEnum::Double;
}

impl FieldValue for V3h {
    const DATA_TYPE: DataTypeEnum = DataTypeEnum::VecHalf;
}

impl FieldValue for Vec3 {
    const DATA_TYPE: DataTypeEnum = DataTypeEnum::VecFloat;
}

impl FieldValue for DVec3 {
    const DATA_TYPE: DataTypeEnum = DataTypeEnum::VecDouble;
}

/// Envelope shared by every field.
///
/// When writing with [`Field3DOutputFile::write_field`](crate::Field3DOutputFile::write_field)
/// `name` selects the partition and `attribute` the layer. Fields read back
/// from a file get the external partition name and the layer name.
#[derive(Clone, Debug)]
pub struct FieldRes {
    pub name: String,
    pub attribute: String,
    mapping: Arc<FieldMapping>,
    extents: Box3i,
    data_window: Box3i,
    metadata: FieldMetadata,
}

impl FieldRes {
    /// Envelope whose data window equals its extents.
    pub fn new(extents: Box3i) -> Self {
        Self::with_data_window(extents, extents)
    }

    /// Envelope with a data window different from its extents.
    pub fn with_data_window(extents: Box3i, data_window: Box3i) -> Self {
        Self {
            name: String::new(),
            attribute: String::new(),
            mapping: Arc::new(FieldMapping::default()),
            extents,
            data_window,
            metadata: FieldMetadata::new(),
        }
    }

    /// The spatial mapping.
    #[inline]
    pub fn mapping(&self) -> &Arc<FieldMapping> {
        &self.mapping
    }

    /// Replace the spatial mapping.
    pub fn set_mapping(&mut self, mapping: impl Into<Arc<FieldMapping>>) {
        self.mapping = mapping.into();
    }

    /// Full extents of the field.
    #[inline]
    pub fn extents(&self) -> Box3i {
        self.extents
    }

    /// Region that actually holds samples.
    #[inline]
    pub fn data_window(&self) -> Box3i {
        self.data_window
    }

    /// Per-field metadata.
    #[inline]
    pub fn metadata(&self) -> &FieldMetadata {
        &self.metadata
    }

    /// Mutable per-field metadata.
    #[inline]
    pub fn metadata_mut(&mut self) -> &mut FieldMetadata {
        &mut self.metadata
    }
}

/// A field holding one value per voxel of its data window.
///
/// Samples are stored x-fastest, then y, then z.
#[derive(Clone, Debug)]
pub struct DenseField<T: FieldValue> {
    res: FieldRes,
    data: Vec<T>,
}

impl<T: FieldValue> DenseField<T> {
    /// Field covering `extents`, filled with `T::default()`.
    pub fn new(extents: Box3i) -> Self {
        Self::from_res(FieldRes::new(extents))
    }

    /// Field over `res`, filled with `T::default()`.
    pub fn from_res(res: FieldRes) -> Self {
        let data = vec![T::default(); res.data_window.num_voxels()];
        Self { res, data }
    }

    /// Field over `res` with existing samples. Returns `None` when the
    /// sample count does not match the data window.
    pub fn from_data(res: FieldRes, data: Vec<T>) -> Option<Self> {
        (data.len() == res.data_window.num_voxels()).then_some(Self { res, data })
    }

    /// Builder-style mapping assignment.
    pub fn with_mapping(mut self, mapping: impl Into<FieldMapping>) -> Self {
        self.res.set_mapping(Arc::new(mapping.into()));
        self
    }

    /// The envelope.
    #[inline]
    pub fn res(&self) -> &FieldRes {
        &self.res
    }

    /// Mutable envelope.
    #[inline]
    pub fn res_mut(&mut self) -> &mut FieldRes {
        &mut self.res
    }

    /// All samples.
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    fn index(&self, p: IVec3) -> Option<usize> {
        let dw = self.res.data_window;
        if !dw.contains(p) {
            return None;
        }
        let offset = |v: i32, lo: i32| (i64::from(v) - i64::from(lo)) as usize;
        let (nx, ny) = (offset(dw.max.x, dw.min.x) + 1, offset(dw.max.y, dw.min.y) + 1);
        let (x, y, z) = (offset(p.x, dw.min.x), offset(p.y, dw.min.y), offset(p.z, dw.min.z));
        Some(x + nx * (y + ny * z))
    }

    /// Value at voxel `(i, j, k)`, if inside the data window.
    pub fn value(&self, i: i32, j: i32, k: i32) -> Option<T> {
        self.index(IVec3::new(i, j, k)).map(|idx| self.data[idx])
    }

    /// Mutable reference to voxel `(i, j, k)`, if inside the data window.
    pub fn lvalue(&mut self, i: i32, j: i32, k: i32) -> Option<&mut T> {
        let idx = self.index(IVec3::new(i, j, k))?;
        self.data.get_mut(idx)
    }

    /// Set every voxel to `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl<T: FieldValue> std::ops::Deref for DenseField<T> {
    type Target = FieldRes;

    fn deref(&self) -> &FieldRes {
        &self.res
    }
}

impl<T: FieldValue> std::ops::DerefMut for DenseField<T> {
    fn deref_mut(&mut self) -> &mut FieldRes {
        &mut self.res
    }
}

/// Proxy field: the envelope of a layer without its samples.
///
/// Every voxel reads as the same constant value.
#[derive(Clone, Debug)]
pub struct EmptyField<T: FieldValue> {
    res: FieldRes,
    constant: T,
}

impl<T: FieldValue> EmptyField<T> {
    /// Proxy over `res` with a default constant.
    pub fn new(res: FieldRes) -> Self {
        Self { res, constant: T::default() }
    }

    /// The envelope.
    #[inline]
    pub fn res(&self) -> &FieldRes {
        &self.res
    }

    /// The constant value.
    #[inline]
    pub fn constant_value(&self) -> T {
        self.constant
    }

    /// Set the constant value.
    pub fn set_constant_value(&mut self, value: T) {
        self.constant = value;
    }
}

impl<T: FieldValue> std::ops::Deref for EmptyField<T> {
    type Target = FieldRes;

    fn deref(&self) -> &FieldRes {
        &self.res
    }
}

impl<T: FieldValue> std::ops::DerefMut for EmptyField<T> {
    fn deref_mut(&mut self) -> &mut FieldRes {
        &mut self.res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(f32::kind(), LayerKind::Scalar);
        assert_eq!(f16::kind(), LayerKind::Scalar);
        assert_eq!(Vec3::kind(), LayerKind::Vector);
        assert_eq!(V3h::kind(), LayerKind::Vector);
        assert_eq!(LayerKind::from_components(3), Some(LayerKind::Vector));
        assert_eq!(LayerKind::from_components(2), None);
    }

    #[test]
    fn test_dense_access() {
        let dw = Box3i::new(IVec3::new(-1, 0, 0), IVec3::new(1, 1, 1));
        let mut field = DenseField::<f32>::from_res(FieldRes::new(dw));
        assert_eq!(field.data().len(), 12);

        *field.lvalue(-1, 0, 0).unwrap() = 1.0;
        *field.lvalue(1, 1, 1).unwrap() = 2.0;
        assert_eq!(field.value(-1, 0, 0), Some(1.0));
        assert_eq!(field.value(1, 1, 1), Some(2.0));
        assert_eq!(field.data()[11], 2.0);
        assert_eq!(field.value(2, 0, 0), None);
        assert!(field.lvalue(0, 2, 0).is_none());
    }

    #[test]
    fn test_dense_access_at_i32_limits() {
        let dw = Box3i::new(IVec3::new(i32::MAX - 1, i32::MIN, 0), IVec3::new(i32::MAX, i32::MIN, 0));
        let mut field = DenseField::<f32>::from_res(FieldRes::new(dw));
        assert_eq!(field.data().len(), 2);
        *field.lvalue(i32::MAX, i32::MIN, 0).unwrap() = 3.0;
        assert_eq!(field.data()[1], 3.0);
        assert_eq!(field.value(i32::MAX - 1, i32::MIN, 0), Some(0.0));
    }

    #[test]
    fn test_empty_field_constant() {
        let mut proxy = EmptyField::<f32>::new(FieldRes::new(Box3i::from_resolution(IVec3::splat(4))));
        assert_eq!(proxy.constant_value(), 0.0);
        proxy.set_constant_value(0.25);
        assert_eq!(proxy.constant_value(), 0.25);
    }

    #[test]
    fn test_from_data_checks_size() {
        let res = FieldRes::new(Box3i::from_resolution(IVec3::splat(2)));
        assert!(DenseField::from_data(res.clone(), vec![0.0f32; 8]).is_some());
        assert!(DenseField::from_data(res, vec![0.0f32; 7]).is_none());
    }

    #[test]
    fn test_deref_to_res() {
        let mut field = DenseField::<Vec3>::new(Box3i::from_resolution(IVec3::ONE))
            .with_mapping(FieldMapping::matrix(crate::util::DMat4::IDENTITY));
        field.name = "smoke".into();
        field.metadata_mut().set("units", "m");
        assert_eq!(field.res().name, "smoke");
        assert_eq!(field.mapping().class_name(), "MatrixFieldMapping");
        assert_eq!(field.metadata().str_metadata("units", ""), "m");
    }
}

//! Layer payload encoding.
//!
//! A layer is a group under its partition holding:
//!
//! | attribute     | value                                  |
//! |---------------|----------------------------------------|
//! | `class_type`  | `"DenseField"`                         |
//! | `data_type`   | [`DataTypeEnum`] name                  |
//! | `components`  | `[1]` or `[3]`                         |
//! | `extents`     | 6 ints, see [`Box3i::to_array`]        |
//! | `data_window` | 6 ints                                 |
//! | `data`        | samples as raw bytes, host byte order  |
//!
//! plus a `metadata` child group with the field's metadata.

use super::{DenseField, EmptyField, FieldMetadata, FieldRes, FieldValue};
use crate::archive::{ArchiveWriter, Attribute, GroupId, GroupReader};
use crate::util::{Box3i, DataTypeEnum, Error, Result};

/// Class written for dense layers.
pub const DENSE_FIELD_CLASS: &str = "DenseField";

pub const CLASS_TYPE_ATTR: &str = "class_type";
pub const DATA_TYPE_ATTR: &str = "data_type";
pub const COMPONENTS_ATTR: &str = "components";
pub const EXTENTS_ATTR: &str = "extents";
pub const DATA_WINDOW_ATTR: &str = "data_window";
pub const DATA_ATTR: &str = "data";
pub const METADATA_GROUP: &str = "metadata";

/// Write a dense field into an (empty) layer group.
pub fn encode_dense<T: FieldValue>(
    writer: &mut ArchiveWriter,
    group: GroupId,
    field: &DenseField<T>,
) -> Result<()> {
    writer.write_attribute(group, CLASS_TYPE_ATTR, &DENSE_FIELD_CLASS.into())?;
    writer.write_attribute(group, DATA_TYPE_ATTR, &T::DATA_TYPE.name().into())?;
    writer.write_attribute(
        group,
        COMPONENTS_ATTR,
        &Attribute::Ints(vec![T::DATA_TYPE.components() as i32]),
    )?;
    writer.write_attribute(group, EXTENTS_ATTR, &Attribute::Ints(field.extents().to_array().to_vec()))?;
    writer.write_attribute(
        group,
        DATA_WINDOW_ATTR,
        &Attribute::Ints(field.data_window().to_array().to_vec()),
    )?;
    writer.write_attribute(
        group,
        DATA_ATTR,
        &Attribute::Bytes(bytemuck::cast_slice(field.data()).to_vec()),
    )?;

    let meta_group = writer.create_group(group, METADATA_GROUP)?;
    field.metadata().write(writer, meta_group)
}

/// Component count recorded on a layer group.
pub fn read_components(group: &GroupReader) -> Result<usize> {
    match group.required_attribute(COMPONENTS_ATTR)?.as_ints() {
        Some([n]) if *n > 0 => Ok(*n as usize),
        _ => Err(Error::invalid(format!(
            "layer '{}' has a malformed '{}' attribute",
            group.name(),
            COMPONENTS_ATTR
        ))),
    }
}

fn read_box(group: &GroupReader, key: &str) -> Result<Box3i> {
    group
        .required_attribute(key)?
        .as_ints()
        .and_then(Box3i::from_slice)
        .ok_or_else(|| Error::invalid(format!("malformed '{}' attribute", key)))
}

/// Read the envelope (everything except samples) of a layer group.
fn read_res(group: &GroupReader) -> Result<FieldRes> {
    let extents = read_box(group, EXTENTS_ATTR)?;
    let data_window = read_box(group, DATA_WINDOW_ATTR)?;
    let mut res = FieldRes::with_data_window(extents, data_window);
    if let Some(meta_group) = group.child_group(METADATA_GROUP)? {
        *res.metadata_mut() = FieldMetadata::read(&meta_group)?;
    }
    Ok(res)
}

fn decode_dense_inner<T: FieldValue>(group: &GroupReader) -> Result<DenseField<T>> {
    let class = group.required_attribute(CLASS_TYPE_ATTR)?;
    if class.as_str() != Some(DENSE_FIELD_CLASS) {
        return Err(Error::TypeMismatch {
            expected: DENSE_FIELD_CLASS.to_string(),
            actual: class.as_str().unwrap_or("<non-string>").to_string(),
        });
    }

    let data_type = group.required_attribute(DATA_TYPE_ATTR)?;
    let stored = DataTypeEnum::from_name(data_type.as_str().unwrap_or_default());
    if stored != T::DATA_TYPE {
        return Err(Error::TypeMismatch {
            expected: T::DATA_TYPE.name().to_string(),
            actual: stored.name().to_string(),
        });
    }

    let res = read_res(group)?;
    let bytes = group.required_attribute(DATA_ATTR)?;
    let bytes = bytes
        .as_bytes()
        .ok_or_else(|| Error::invalid("sample data is not a byte attribute"))?;

    let expected = res
        .data_window()
        .checked_num_voxels()
        .and_then(|n| n.checked_mul(T::DATA_TYPE.num_bytes()))
        .ok_or_else(|| Error::invalid(format!("data window {:?} is too large", res.data_window())))?;
    if bytes.len() != expected {
        return Err(Error::invalid(format!(
            "expected {} bytes of samples, found {}",
            expected,
            bytes.len()
        )));
    }

    let data: Vec<T> = bytemuck::pod_collect_to_vec(bytes);
    DenseField::from_data(res, data).ok_or_else(|| Error::invalid("sample count mismatch"))
}

/// Materialize a dense layer as `T`.
///
/// Any failure, including a stored type other than `T`, is reported as
/// [`Error::LayerDecodeFailure`] for `layer_name`.
pub fn decode_dense<T: FieldValue>(group: &GroupReader, layer_name: &str) -> Result<DenseField<T>> {
    decode_dense_inner(group).map_err(|e| Error::decode(layer_name, e.to_string()))
}

/// Materialize only the envelope of a layer. The stored data type is not
/// checked against `T`.
pub fn decode_proxy<T: FieldValue>(group: &GroupReader, layer_name: &str) -> Result<EmptyField<T>> {
    read_res(group)
        .map(EmptyField::new)
        .map_err(|e| Error::decode(layer_name, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveReader;
    use crate::util::{IVec3, Vec3};
    use tempfile::NamedTempFile;

    fn write_layer<T: FieldValue>(path: &std::path::Path, field: &DenseField<T>) -> Result<()> {
        let mut writer = ArchiveWriter::create(path, true)?;
        let root = writer.root();
        let layer = writer.create_group(root, "layer")?;
        encode_dense(&mut writer, layer, field)?;
        writer.close()
    }

    #[test]
    fn test_dense_scalar() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let mut field = DenseField::<f32>::new(Box3i::from_resolution(IVec3::new(3, 2, 1)));
        for (i, v) in [0.0, 1.0, 2.0, 3.0, 4.0, 5.0].into_iter().enumerate() {
            *field.lvalue(i as i32 % 3, i as i32 / 3, 0).unwrap() = v;
        }
        field.metadata_mut().set("source", "sim");
        write_layer(temp.path(), &field)?;

        let reader = ArchiveReader::open(temp.path(), true)?;
        let group = reader.root().child_group("layer")?.unwrap();
        assert_eq!(read_components(&group)?, 1);

        let back = decode_dense::<f32>(&group, "layer")?;
        assert_eq!(back.data(), field.data());
        assert_eq!(back.extents(), field.extents());
        assert_eq!(back.metadata().str_metadata("source", ""), "sim");
        Ok(())
    }

    #[test]
    fn test_type_mismatch_is_decode_failure() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let field = DenseField::<f32>::new(Box3i::from_resolution(IVec3::ONE));
        write_layer(temp.path(), &field)?;

        let reader = ArchiveReader::open(temp.path(), true)?;
        let group = reader.root().child_group("layer")?.unwrap();
        let err = decode_dense::<f64>(&group, "layer").unwrap_err();
        assert!(matches!(err, Error::LayerDecodeFailure { ref layer, .. } if layer == "layer"));
        Ok(())
    }

    #[test]
    fn test_oversized_data_window_is_decode_failure() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let mut writer = ArchiveWriter::create(temp.path(), true)?;
        let root = writer.root();
        let layer = writer.create_group(root, "layer")?;
        encode_dense(&mut writer, layer, &DenseField::<f32>::new(Box3i::from_resolution(IVec3::ONE)))?;
        let huge = Box3i::new(IVec3::splat(i32::MIN), IVec3::splat(i32::MAX));
        writer.write_attribute(layer, DATA_WINDOW_ATTR, &Attribute::Ints(huge.to_array().to_vec()))?;
        writer.close()?;

        let reader = ArchiveReader::open(temp.path(), true)?;
        let group = reader.root().child_group("layer")?.unwrap();
        let err = decode_dense::<f32>(&group, "layer").unwrap_err();
        assert!(matches!(err, Error::LayerDecodeFailure { .. }));
        // The envelope alone is still readable.
        assert_eq!(decode_proxy::<f32>(&group, "layer")?.data_window(), huge);
        Ok(())
    }

    #[test]
    fn test_proxy_has_no_samples() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let extents = Box3i::from_resolution(IVec3::new(8, 8, 8));
        let data_window = Box3i::new(IVec3::ZERO, IVec3::new(3, 3, 3));
        let mut field = DenseField::<Vec3>::from_res(FieldRes::with_data_window(extents, data_window));
        field.fill(Vec3::ONE);
        write_layer(temp.path(), &field)?;

        let reader = ArchiveReader::open(temp.path(), false)?;
        let group = reader.root().child_group("layer")?.unwrap();
        assert_eq!(read_components(&group)?, 3);

        // Proxies ignore the stored precision.
        let proxy = decode_proxy::<crate::field::V3h>(&group, "layer")?;
        assert_eq!(proxy.extents(), extents);
        assert_eq!(proxy.data_window(), data_window);
        Ok(())
    }
}

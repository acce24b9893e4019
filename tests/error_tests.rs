//! Integration tests for failure paths.

mod common;

use common::{init_tracing, ramp};
use field3d::archive::{ArchiveWriter, Attribute};
use field3d::field::codec;
use field3d::file::{FORMAT_VERSION, MAPPING_ATTR, SCALAR_LAYERS_GROUP, VERSION_ATTR};
use field3d::prelude::*;
use tempfile::{tempdir, NamedTempFile};

#[test]
fn test_open_missing_file() {
    init_tracing();
    let dir = tempdir().expect("Failed to create temp dir");
    let mut input = Field3DInputFile::new();
    let err = input.open(dir.path().join("missing.f3d")).unwrap_err();
    assert!(matches!(err, Error::ArchiveNotFound(_)), "{err}");
    assert!(!input.is_open());
}

#[test]
fn test_open_garbage() {
    init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    std::fs::write(temp.path(), b"this is not an archive at all").expect("write");

    let mut input = Field3DInputFile::new();
    let err = input.open(temp.path()).unwrap_err();
    assert!(matches!(err, Error::ArchiveCorrupt(_)), "{err}");
    assert!(!input.is_open());
    assert!(input.index().partitions().is_empty());
}

#[test]
fn test_open_archive_without_version() {
    init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    {
        let mut writer = ArchiveWriter::create(temp.path(), true).expect("create");
        let root = writer.root();
        writer.write_attribute(root, "note", &Attribute::from("plain archive")).expect("attr");
        writer.close().expect("close");
    }

    let mut input = Field3DInputFile::new();
    let err = input.open(temp.path()).unwrap_err();
    assert!(matches!(err, Error::ArchiveCorrupt(_)), "{err}");
}

#[test]
fn test_failed_open_closes_previous() {
    init_tracing();
    let dir = tempdir().expect("Failed to create temp dir");
    let good = dir.path().join("good.f3d");
    {
        let mut out = Field3DOutputFile::new();
        out.create(&good, CreateMode::OverwriteMode).expect("create");
        out.write_layer("smoke", "density", &ramp(2, 0.0)).expect("density");
        out.close().expect("close");
    }

    let mut input = Field3DInputFile::new();
    input.open(&good).expect("open");
    assert!(input.open(dir.path().join("missing.f3d")).is_err());
    assert!(!input.is_open());
    assert!(input.partition_names().is_empty());
}

#[test]
fn test_fail_on_existing() {
    init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let mut out = Field3DOutputFile::new();
    let err = out.create(temp.path(), CreateMode::FailOnExisting).unwrap_err();
    assert!(matches!(err, Error::FileAlreadyExists(_)), "{err}");
    assert!(!out.is_open());

    out.create(temp.path(), CreateMode::OverwriteMode).expect("overwrite");
    assert!(out.is_open());
}

#[test]
fn test_write_after_close() {
    init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let field = ramp(2, 0.0);

    let mut out = Field3DOutputFile::new();
    out.create(temp.path(), CreateMode::OverwriteMode).expect("create");
    out.write_layer("smoke", "density", &field).expect("density");
    out.close().expect("close");

    assert!(matches!(out.write_layer("smoke", "density", &field), Err(Error::FileNotOpen)));
    assert!(matches!(out.write_group_membership(), Err(Error::FileNotOpen)));
    assert!(out.partition_names().is_empty());
    // Closing twice is harmless.
    out.close().expect("second close");
}

#[test]
fn test_null_field_does_not_touch_file() {
    init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    {
        let mut out = Field3DOutputFile::new();
        out.create(temp.path(), CreateMode::OverwriteMode).expect("create");
        let err = out.write_layer("smoke", "density", None::<&DenseField<f32>>).unwrap_err();
        assert!(matches!(err, Error::NullField));
        out.write_layer("smoke", "fuel", &ramp(2, 0.0)).expect("fuel");
        out.close().expect("close");
    }

    let mut input = Field3DInputFile::new();
    input.open(temp.path()).expect("open");
    assert_eq!(input.scalar_layer_names("smoke"), vec!["fuel"]);
}

#[test]
fn test_damaged_layers_are_skipped() {
    init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    {
        let mut w = ArchiveWriter::create(temp.path(), true).expect("create");
        let root = w.root();
        w.write_attribute(root, VERSION_ATTR, &Attribute::Ints(FORMAT_VERSION.to_vec()))
            .expect("version");

        let smoke = w.create_group(root, "smoke").expect("smoke");
        w.write_attribute(smoke, MAPPING_ATTR, &FieldMapping::default().serialize())
            .expect("mapping");
        let layers = w.create_group(smoke, SCALAR_LAYERS_GROUP).expect("layers");

        let good = w.create_group(layers, "good").expect("good");
        codec::encode_dense(&mut w, good, &ramp(2, 0.0)).expect("good layer");

        let huge = w.create_group(layers, "huge").expect("huge");
        codec::encode_dense(&mut w, huge, &ramp(2, 0.0)).expect("huge layer");
        let window = Box3i::new(IVec3::splat(i32::MIN), IVec3::splat(i32::MAX));
        w.write_attribute(huge, codec::DATA_WINDOW_ATTR, &Attribute::Ints(window.to_array().to_vec()))
            .expect("window");

        let short = w.create_group(layers, "short").expect("short");
        codec::encode_dense(&mut w, short, &ramp(2, 0.0)).expect("short layer");
        w.write_attribute(short, codec::DATA_ATTR, &Attribute::Bytes(vec![0; 3])).expect("data");

        let broken = w.create_group(layers, "broken").expect("broken");
        w.write_attribute(broken, codec::COMPONENTS_ATTR, &Attribute::from("oops"))
            .expect("components");

        // A partition group without a mapping.
        let fire = w.create_group(root, "fire").expect("fire");
        w.create_group(fire, SCALAR_LAYERS_GROUP).expect("fire layers");
        w.close().expect("close");
    }

    let mut input = Field3DInputFile::new();
    input.open(temp.path()).expect("open");
    assert_eq!(input.partition_names(), vec!["smoke"]);
    assert_eq!(input.scalar_layer_names("smoke"), vec!["good", "huge", "short"]);

    let fields = input.read_layers::<f32>("");
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].attribute, "good");
    assert_eq!(fields[0].data(), ramp(2, 0.0).data());
    assert!(input.read_partition_layers::<f32>("smoke", "huge").is_empty());

    // Envelopes do not need the samples.
    assert_eq!(input.read_proxy_layer::<f32>("smoke", "huge", false).len(), 1);
}

#[test]
fn test_open_directory() {
    init_tracing();
    let dir = tempdir().expect("Failed to create temp dir");
    for use_mmap in [true, false] {
        let mut input = Field3DInputFile::new();
        let err = input.open_with(dir.path(), ReadOptions { use_mmap }).unwrap_err();
        assert!(matches!(err, Error::ArchiveNotFound(_)), "{err}");
        assert!(!input.is_open());
    }
}

#[test]
fn test_invalid_group_membership_rejected() {
    init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let mut out = Field3DOutputFile::new();
    out.create(temp.path(), CreateMode::OverwriteMode).expect("create");

    let mut membership = GroupMembership::new();
    membership.insert("hero".into(), vec![LayerRef::new("smoke", "a b")]);
    let err = out.add_group_membership(&membership).unwrap_err();
    assert!(matches!(err, Error::InvalidName { .. }), "{err}");
    assert!(out.group_membership().is_empty());
}

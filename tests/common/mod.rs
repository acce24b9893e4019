//! Helpers shared by the integration tests.

#![allow(dead_code)]

use field3d::prelude::*;
use tracing_subscriber::EnvFilter;

/// Route library logs to the test output. Set `RUST_LOG=field3d=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Scalar field over `res^3` with `value(i, j, k) = i + 10 j + 100 k + offset`.
pub fn ramp(res: i32, offset: f32) -> DenseField<f32> {
    let mut field = DenseField::<f32>::new(Box3i::from_resolution(IVec3::splat(res)));
    for k in 0..res {
        for j in 0..res {
            for i in 0..res {
                if let Some(v) = field.lvalue(i, j, k) {
                    *v = i as f32 + 10.0 * j as f32 + 100.0 * k as f32 + offset;
                }
            }
        }
    }
    field
}

pub fn scaled(s: f64) -> FieldMapping {
    FieldMapping::matrix(DMat4::from_scale(DVec3::splat(s)))
}

//! Math type re-exports and Field3D-specific voxel-space types.
//!
//! This module re-exports the `glam` types used by mappings and vector
//! fields, and provides the integer box used for extents and data windows.

pub use glam::{DMat4, DVec3, IVec3, Vec3};

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// Inclusive integer box in voxel space.
///
/// Both `min` and `max` are part of the box, so a box with `min == max`
/// holds exactly one voxel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Box3i {
    pub min: IVec3,
    pub max: IVec3,
}

impl Box3i {
    /// Empty box (inverted).
    pub const EMPTY: Self = Self {
        min: IVec3::splat(0),
        max: IVec3::splat(-1),
    };

    /// Create a box from its inclusive corners.
    #[inline]
    pub const fn new(min: IVec3, max: IVec3) -> Self {
        Self { min, max }
    }

    /// Box covering `[0, res - 1]` on every axis.
    #[inline]
    pub fn from_resolution(res: IVec3) -> Self {
        Self { min: IVec3::ZERO, max: res - IVec3::ONE }
    }

    /// Check if this box contains no voxels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Number of voxels along each axis, computed without overflow.
    #[inline]
    fn extent(&self) -> [i64; 3] {
        if self.is_empty() {
            return [0; 3];
        }
        let d = |lo: i32, hi: i32| i64::from(hi) - i64::from(lo) + 1;
        [d(self.min.x, self.max.x), d(self.min.y, self.max.y), d(self.min.z, self.max.z)]
    }

    /// Number of voxels along each axis. Axes wider than `i32::MAX`
    /// saturate.
    #[inline]
    pub fn size(&self) -> IVec3 {
        let clamp = |v: i64| v.min(i64::from(i32::MAX)) as i32;
        let [x, y, z] = self.extent();
        IVec3::new(clamp(x), clamp(y), clamp(z))
    }

    /// Total number of voxels, or `None` when it does not fit in `usize`.
    pub fn checked_num_voxels(&self) -> Option<usize> {
        self.extent()
            .into_iter()
            .try_fold(1usize, |acc, n| acc.checked_mul(usize::try_from(n).ok()?))
    }

    /// Total number of voxels in the box, saturating at `usize::MAX`.
    #[inline]
    pub fn num_voxels(&self) -> usize {
        self.checked_num_voxels().unwrap_or(usize::MAX)
    }

    /// Check if a voxel coordinate is inside the box.
    #[inline]
    pub fn contains(&self, p: IVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Flatten to `[min.x, min.y, min.z, max.x, max.y, max.z]`.
    pub fn to_array(&self) -> [i32; 6] {
        [self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z]
    }

    /// Inverse of [`Box3i::to_array`].
    pub fn from_slice(v: &[i32]) -> Option<Self> {
        match v {
            [a, b, c, d, e, f] => Some(Self::new(IVec3::new(*a, *b, *c), IVec3::new(*d, *e, *f))),
            _ => None,
        }
    }
}

impl Default for Box3i {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Box3i {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Box3i([{}, {}, {}] - [{}, {}, {}])",
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4Swizzles};

use crate::{pack_unorm4x8, unpack_unorm4x8, Normal};

/// Per-pixel snapshot of the primary visible surface, written once per frame
/// and kept for one extra frame as history.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SurfaceInfo {
    pub position: [f32; 3],
    pub depth: f32,
    pub normal: u32,
    pub albedo: u32,
    pub diffuse_probability: f32,
    pub flags: u32,
}

impl SurfaceInfo {
    const FLAG_VALID: u32 = 1;

    pub fn new(
        position: Vec3,
        depth: f32,
        normal: Vec3,
        albedo: Vec3,
        diffuse_probability: f32,
    ) -> Self {
        Self {
            position: position.into(),
            depth,
            normal: Normal::pack(normal),
            albedo: pack_unorm4x8(albedo.extend(1.0)),
            diffuse_probability,
            flags: Self::FLAG_VALID,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.flags & Self::FLAG_VALID > 0
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }

    pub fn normal(&self) -> Vec3 {
        Normal::unpack(self.normal)
    }

    pub fn albedo(&self) -> Vec3 {
        unpack_unorm4x8(self.albedo).xyz()
    }

    /// Returns whether `other` (a temporal or spatial neighbor) describes a
    /// surface similar enough to this one for its reservoir to be reused.
    pub fn is_similar_to(
        &self,
        other: &Self,
        thresholds: &SimilarityThresholds,
    ) -> bool {
        if !self.is_valid() || !other.is_valid() {
            return false;
        }

        if (other.depth - self.depth).abs()
            > thresholds.depth * self.depth.max(1e-6)
        {
            return false;
        }

        if self.normal().dot(other.normal()) < thresholds.normal {
            return false;
        }

        if thresholds.use_material != 0
            && (other.diffuse_probability - self.diffuse_probability).abs()
                > thresholds.material
        {
            return false;
        }

        true
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SimilarityThresholds {
    /// Maximum relative depth difference.
    pub depth: f32,

    /// Minimum cosine between normals.
    pub normal: f32,

    /// Maximum difference between diffuse probabilities.
    pub material: f32,

    pub use_material: u32,
}

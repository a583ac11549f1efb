use glam::{UVec2, Vec2, Vec3};

use crate::Ray;

/// Pinhole camera; used to produce primary visibility for the reference
/// scene and to measure view depth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub origin: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    pub tan_half_fov: f32,
    pub dims: UVec2,
}

impl Camera {
    pub fn look_at(
        origin: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y: f32,
        dims: UVec2,
    ) -> Self {
        let forward = (target - origin).normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);

        Self {
            origin,
            forward,
            right,
            up,
            tan_half_fov: (fov_y * 0.5).tan(),
            dims,
        }
    }

    pub fn ray(&self, pos: UVec2) -> Ray {
        let dims = self.dims.as_vec2();
        let ndc = (pos.as_vec2() + Vec2::splat(0.5)) / dims * 2.0 - 1.0;
        let aspect = dims.x / dims.y;

        let dir = self.forward
            + self.right * ndc.x * self.tan_half_fov * aspect
            - self.up * ndc.y * self.tan_half_fov;

        Ray::new(self.origin, dir.normalize())
    }

    pub fn contains(&self, pos: UVec2) -> bool {
        pos.x < self.dims.x && pos.y < self.dims.y
    }
}

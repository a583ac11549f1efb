use bytemuck::{Pod, Zeroable};
use glam::{vec3, Vec3};

use crate::{Ray, RAY_EPSILON};

/// Reference scene geometry: a single triangle with a diffuse albedo and an
/// optional mirror-like specular probability.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Triangle {
    pub positions: [[f32; 3]; 3],
    pub albedo: [f32; 3],
    pub specular: f32,
}

impl Triangle {
    pub fn new(p0: Vec3, p1: Vec3, p2: Vec3, albedo: Vec3) -> Self {
        Self {
            positions: [p0.into(), p1.into(), p2.into()],
            albedo: albedo.into(),
            specular: 0.0,
        }
    }

    pub fn with_specular(mut self, specular: f32) -> Self {
        self.specular = specular.clamp(0.0, 1.0);
        self
    }

    /// Creates two triangles covering the parallelogram spanned by `u` and
    /// `v` at `corner`.
    pub fn quad(corner: Vec3, u: Vec3, v: Vec3, albedo: Vec3) -> [Self; 2] {
        [
            Self::new(corner, corner + u, corner + u + v, albedo),
            Self::new(corner, corner + u + v, corner + v, albedo),
        ]
    }

    pub fn position(&self, idx: usize) -> Vec3 {
        Vec3::from(self.positions[idx])
    }

    pub fn albedo(&self) -> Vec3 {
        Vec3::from(self.albedo)
    }

    pub fn normal(&self) -> Vec3 {
        let e1 = self.position(1) - self.position(0);
        let e2 = self.position(2) - self.position(0);

        e1.cross(e2).normalize_or_zero()
    }

    pub fn is_specular(&self) -> bool {
        self.specular > 0.0
    }

    pub fn position_at(&self, u: f32, v: f32) -> Vec3 {
        self.position(0) * (1.0 - u - v)
            + self.position(1) * u
            + self.position(2) * v
    }

    /// Möller-Trumbore intersection; returns `(t, u, v)`.
    pub fn intersect(&self, ray: Ray, t_max: f32) -> Option<(f32, f32, f32)> {
        let e1 = self.position(1) - self.position(0);
        let e2 = self.position(2) - self.position(0);
        let pvec = ray.direction().cross(e2);
        let det = e1.dot(pvec);

        if det.abs() < 1e-8 {
            return None;
        }

        let inv_det = 1.0 / det;
        let tvec = ray.origin() - self.position(0);
        let u = tvec.dot(pvec) * inv_det;

        if u < 0.0 || u > 1.0 {
            return None;
        }

        let qvec = tvec.cross(e1);
        let v = ray.direction().dot(qvec) * inv_det;

        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = e2.dot(qvec) * inv_det;

        if t > RAY_EPSILON && t < t_max {
            Some((t, u, v))
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    pub triangle_id: u32,
    pub u: f32,
    pub v: f32,
}

impl TriangleHit {
    /// Encodes the hit as a visibility-buffer texel: `[triangle_id + 1, u,
    /// v, 0]`, with zero meaning "no hit". The distance is not kept.
    pub fn pack(hit: Option<Self>) -> [u32; 4] {
        match hit {
            Some(hit) => {
                [hit.triangle_id + 1, hit.u.to_bits(), hit.v.to_bits(), 0]
            }
            None => [0; 4],
        }
    }

    pub fn unpack(texel: [u32; 4]) -> Option<Self> {
        if texel[0] == 0 {
            return None;
        }

        Some(Self {
            t: 0.0,
            triangle_id: texel[0] - 1,
            u: f32::from_bits(texel[1]),
            v: f32::from_bits(texel[2]),
        })
    }
}

/// Read-only view over the scene's triangles; brute-force ray casting is
/// enough for the scenes the reference kernels deal with.
#[derive(Clone, Copy)]
pub struct SceneView<'a> {
    triangles: &'a [Triangle],
}

impl<'a> SceneView<'a> {
    pub fn new(triangles: &'a [Triangle]) -> Self {
        Self { triangles }
    }

    pub fn triangle(&self, id: u32) -> Triangle {
        self.triangles[id as usize]
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn trace(&self, ray: Ray, t_max: f32) -> Option<TriangleHit> {
        let mut closest: Option<TriangleHit> = None;

        for (triangle_id, triangle) in self.triangles.iter().enumerate() {
            let t_max = closest.map(|hit| hit.t).unwrap_or(t_max);

            if let Some((t, u, v)) = triangle.intersect(ray, t_max) {
                closest = Some(TriangleHit {
                    t,
                    triangle_id: triangle_id as u32,
                    u,
                    v,
                });
            }
        }

        closest
    }

    /// Returns whether the segment `from -> to` is unoccluded.
    pub fn is_visible(&self, from: Vec3, to: Vec3) -> bool {
        let dir = to - from;
        let dist = dir.length();

        if dist <= RAY_EPSILON {
            return true;
        }

        let ray = Ray::new(from, dir / dist);

        self.trace(ray, dist - RAY_EPSILON).is_none()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn floor() -> [Triangle; 2] {
        Triangle::quad(
            vec3(-1.0, 0.0, -1.0),
            vec3(0.0, 0.0, 2.0),
            vec3(2.0, 0.0, 0.0),
            Vec3::splat(0.5),
        )
    }

    #[test]
    fn trace() {
        let tris = floor();
        let scene = SceneView::new(&tris);
        let hit = scene
            .trace(Ray::new(vec3(0.2, 1.0, 0.3), -Vec3::Y), f32::MAX)
            .unwrap();

        assert_relative_eq!(hit.t, 1.0, epsilon = 1e-5);

        let pos = scene.triangle(hit.triangle_id).position_at(hit.u, hit.v);

        assert_relative_eq!(pos.x, 0.2, epsilon = 1e-5);
        assert_relative_eq!(pos.z, 0.3, epsilon = 1e-5);

        assert!(scene
            .trace(Ray::new(vec3(3.0, 1.0, 0.0), -Vec3::Y), f32::MAX)
            .is_none());
    }

    #[test]
    fn visibility() {
        let tris = floor();
        let scene = SceneView::new(&tris);

        assert!(!scene.is_visible(vec3(0.0, 1.0, 0.0), vec3(0.0, -1.0, 0.0)));
        assert!(scene.is_visible(vec3(0.0, 1.0, 0.0), vec3(0.5, 2.0, 0.0)));
    }
}

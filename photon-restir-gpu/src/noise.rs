use core::f32::consts::PI;

use glam::{vec2, vec3, UVec2, Vec2, Vec3};

use crate::orthonormal_basis;

/// PCG-based white noise, one independent stream per thread.
#[derive(Clone, Copy, Debug)]
pub struct WhiteNoise {
    state: u32,
}

impl WhiteNoise {
    pub fn new(seed: u32, id: UVec2) -> Self {
        Self {
            state: seed
                ^ 48619u32.wrapping_mul(id.x)
                ^ 95461u32.wrapping_mul(id.y),
        }
    }

    /// Generates a uniform sample in range `<0.0, 1.0>`.
    pub fn sample(&mut self) -> f32 {
        (self.sample_int() as f32) / (u32::MAX as f32)
    }

    /// Generates a uniform sample in range `<0, u32::MAX>`.
    pub fn sample_int(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(747796405).wrapping_add(2891336453);

        let word = ((self.state >> ((self.state >> 28) + 4)) ^ self.state)
            .wrapping_mul(277803737);

        (word >> 22) ^ word
    }

    /// Generates a uniform index in range `<0, len)`; `len` must be positive.
    pub fn sample_index(&mut self, len: u32) -> u32 {
        ((self.sample() * len as f32) as u32).min(len - 1)
    }

    /// Generates a uniform sample on a circle.
    pub fn sample_circle(&mut self) -> Vec2 {
        let angle = self.sample() * PI * 2.0;

        vec2(angle.cos(), angle.sin())
    }

    /// Generates a uniform sample inside of a disk.
    pub fn sample_disk(&mut self) -> Vec2 {
        let radius = self.sample().sqrt();

        self.sample_circle() * radius
    }

    /// Generates a uniform sample on a sphere.
    pub fn sample_sphere(&mut self) -> Vec3 {
        let z = 1.0 - 2.0 * self.sample();
        let r = (1.0 - z * z).max(0.0).sqrt();
        let xy = self.sample_circle() * r;

        vec3(xy.x, xy.y, z)
    }

    /// Generates a cosine-weighted sample on a hemisphere around given
    /// normal; pdf is `cos(theta) / PI`.
    pub fn sample_cosine_hemisphere(&mut self, normal: Vec3) -> Vec3 {
        let disk = self.sample_disk();
        let z = (1.0 - disk.length_squared()).max(0.0).sqrt();
        let (t, b) = orthonormal_basis(normal);

        (t * disk.x + b * disk.y + normal * z).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streams_are_independent() {
        let mut a = WhiteNoise::new(1234, UVec2::new(0, 0));
        let mut b = WhiteNoise::new(1234, UVec2::new(1, 0));

        let a: Vec<_> = (0..8).map(|_| a.sample_int()).collect();
        let b: Vec<_> = (0..8).map(|_| b.sample_int()).collect();

        assert_ne!(a, b);
    }

    #[test]
    fn uniform_mean() {
        let mut noise = WhiteNoise::new(42, UVec2::new(3, 7));
        let n = 100_000;
        let mean = (0..n).map(|_| noise.sample()).sum::<f32>() / n as f32;

        assert!((mean - 0.5).abs() < 0.01, "mean = {mean}");
    }

    #[test]
    fn cosine_hemisphere() {
        let mut noise = WhiteNoise::new(7, UVec2::new(1, 2));
        let normal = vec3(0.0, 1.0, 0.0);

        for _ in 0..1000 {
            let dir = noise.sample_cosine_hemisphere(normal);

            assert!(dir.dot(normal) >= -1e-4);
            assert!((dir.length() - 1.0).abs() < 1e-4);
        }
    }
}

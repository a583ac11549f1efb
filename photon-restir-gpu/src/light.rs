use core::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4, Vec4Swizzles};

use crate::{luminance, Normal, SurfaceInfo, WhiteNoise};

/// Analytic or emissive light, encoded as four Vec4s:
///
/// - `d0.xyz` - position (point light) or corner (quad light); `d0.w` - kind,
/// - `d1.xyz` - first edge of the quad,
/// - `d2.xyz` - second edge of the quad,
/// - `d3.xyz` - intensity (point light) or radiance (quad light).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Light {
    pub d0: Vec4,
    pub d1: Vec4,
    pub d2: Vec4,
    pub d3: Vec4,
}

impl Light {
    pub const KIND_POINT: u32 = 0;
    pub const KIND_QUAD: u32 = 1;

    pub fn point(position: Vec3, intensity: Vec3) -> Self {
        Self {
            d0: position.extend(f32::from_bits(Self::KIND_POINT)),
            d1: Vec4::ZERO,
            d2: Vec4::ZERO,
            d3: intensity.extend(0.0),
        }
    }

    /// Creates a one-sided quad light emitting along `edge_u x edge_v`.
    pub fn quad(corner: Vec3, edge_u: Vec3, edge_v: Vec3, radiance: Vec3) -> Self {
        Self {
            d0: corner.extend(f32::from_bits(Self::KIND_QUAD)),
            d1: edge_u.extend(0.0),
            d2: edge_v.extend(0.0),
            d3: radiance.extend(0.0),
        }
    }

    pub fn kind(&self) -> u32 {
        self.d0.w.to_bits()
    }

    pub fn is_point(&self) -> bool {
        self.kind() == Self::KIND_POINT
    }

    pub fn position(&self) -> Vec3 {
        self.d0.xyz()
    }

    pub fn emission(&self) -> Vec3 {
        self.d3.xyz()
    }

    pub fn normal(&self) -> Vec3 {
        self.d1.xyz().cross(self.d2.xyz()).normalize_or_zero()
    }

    pub fn area(&self) -> f32 {
        if self.is_point() {
            0.0
        } else {
            self.d1.xyz().cross(self.d2.xyz()).length()
        }
    }

    /// Total emitted power (luminance), used by power-based light sampling.
    pub fn power(&self) -> f32 {
        if self.is_point() {
            4.0 * PI * luminance(self.emission())
        } else {
            PI * self.area() * luminance(self.emission())
        }
    }

    /// Samples a point on the light; returns the sample together with its
    /// area-measure pdf (1.0 for point lights).
    pub fn sample(&self, wnoise: &mut WhiteNoise) -> (LightSample, f32) {
        if self.is_point() {
            (LightSample::point(self.position(), self.emission()), 1.0)
        } else {
            let position = self.position()
                + self.d1.xyz() * wnoise.sample()
                + self.d2.xyz() * wnoise.sample();

            let sample =
                LightSample::area(position, self.normal(), self.emission());

            (sample, 1.0 / self.area())
        }
    }

    /// Emits a photon; returns its origin, direction and flux (already
    /// divided by the pdf of the emitted ray).
    pub fn emit(&self, wnoise: &mut WhiteNoise) -> (Vec3, Vec3, Vec3) {
        if self.is_point() {
            let dir = wnoise.sample_sphere();

            (self.position(), dir, self.emission() * 4.0 * PI)
        } else {
            let (sample, _) = self.sample(wnoise);
            let normal = self.normal();
            let dir = wnoise.sample_cosine_hemisphere(normal);

            (
                sample.position(),
                dir,
                self.emission() * PI * self.area(),
            )
        }
    }
}

/// Light sample a reservoir can select: a point on a light, or a photon
/// acting as a virtual point light.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LightSample {
    pub position: [f32; 3],
    pub kind: u32,
    pub emission: [f32; 3],
    pub normal: u32,
}

impl LightSample {
    pub const KIND_POINT: u32 = 0;
    pub const KIND_AREA: u32 = 1;
    pub const KIND_PHOTON: u32 = 2;

    pub fn point(position: Vec3, intensity: Vec3) -> Self {
        Self {
            position: position.into(),
            kind: Self::KIND_POINT,
            emission: intensity.into(),
            normal: 0,
        }
    }

    pub fn area(position: Vec3, normal: Vec3, radiance: Vec3) -> Self {
        Self {
            position: position.into(),
            kind: Self::KIND_AREA,
            emission: radiance.into(),
            normal: Normal::pack(normal),
        }
    }

    pub fn photon(position: Vec3, normal: Vec3, flux: Vec3) -> Self {
        Self {
            position: position.into(),
            kind: Self::KIND_PHOTON,
            emission: flux.into(),
            normal: Normal::pack(normal),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }

    pub fn emission(&self) -> Vec3 {
        Vec3::from(self.emission)
    }

    pub fn normal(&self) -> Vec3 {
        Normal::unpack(self.normal)
    }

    /// Returns the unshadowed radiance this sample reflects off given
    /// surface towards the camera (diffuse BRDF).
    ///
    /// Samples closer than `sqrt(band)` are rejected to avoid the singularity
    /// of the geometry term.
    pub fn contribution(&self, surface: &SurfaceInfo, band: f32) -> Vec3 {
        if !surface.is_valid() {
            return Vec3::ZERO;
        }

        let to_light = self.position() - surface.position();
        let dist2 = to_light.length_squared();

        if dist2 <= band.max(1e-8) {
            return Vec3::ZERO;
        }

        let dir = to_light / dist2.sqrt();
        let cos_surface = surface.normal().dot(dir);

        if cos_surface <= 0.0 {
            return Vec3::ZERO;
        }

        let irradiance = match self.kind {
            Self::KIND_POINT => self.emission() * cos_surface / dist2,

            Self::KIND_AREA => {
                let cos_light = self.normal().dot(-dir);

                if cos_light <= 0.0 {
                    return Vec3::ZERO;
                }

                self.emission() * cos_surface * cos_light / dist2
            }

            _ => {
                let cos_light = self.normal().dot(-dir);

                if cos_light <= 0.0 {
                    return Vec3::ZERO;
                }

                self.emission() * (cos_light / PI) * cos_surface / dist2
            }
        };

        surface.albedo() / PI * irradiance
    }

    /// Target function used for resampling.
    pub fn target_pdf(&self, surface: &SurfaceInfo, band: f32) -> f32 {
        luminance(self.contribution(surface, band))
    }
}

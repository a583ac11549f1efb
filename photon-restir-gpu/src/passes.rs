use bytemuck::{Pod, Zeroable};
use glam::{uvec2, UVec2, Vec3};

use crate::{CullingGrid, PdfTextureSize, ReservoirLayout, SimilarityThresholds};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SurfacePassParams {
    pub width: u32,
    pub height: u32,
    pub camera: [f32; 3],
    pub use_vbuffer: u32,
}

impl SurfacePassParams {
    pub fn dims(&self) -> UVec2 {
        uvec2(self.width, self.height)
    }

    pub fn camera(&self) -> Vec3 {
        Vec3::from(self.camera)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PhotonCullingPassParams {
    pub width: u32,
    pub height: u32,
    pub hash_bits: u32,
    pub cell_size: f32,
    pub radius: f32,
}

impl PhotonCullingPassParams {
    pub fn dims(&self) -> UVec2 {
        uvec2(self.width, self.height)
    }

    pub fn grid(&self) -> CullingGrid {
        CullingGrid::new(self.cell_size, self.hash_bits)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PhotonGenerationPassParams {
    pub seed: u32,
    pub grid_width: u32,
    pub grid_height: u32,
    pub max_bounces: u32,
    pub store_probability: f32,
    pub radius: [f32; 2],
    pub capacity: [u32; 2],
    pub use_culling: u32,
    pub hash_bits: u32,
    pub cell_size: f32,
}

impl PhotonGenerationPassParams {
    pub fn dispatched(&self) -> u32 {
        self.grid_width * self.grid_height
    }

    pub fn grid(&self) -> CullingGrid {
        CullingGrid::new(self.cell_size, self.hash_bits)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PhotonPdfPassParams {
    pub pdf_width: u32,
    pub pdf_height: u32,
    pub pdf_levels: u32,

    /// Level being written; level 0 is filled from photon luminances, the
    /// rest are reduced from the level below.
    pub level: u32,

    pub capacity: u32,
    pub seed: u32,
    pub tile_count: u32,
    pub tile_size: u32,
}

impl PhotonPdfPassParams {
    pub fn size(&self) -> PdfTextureSize {
        PdfTextureSize {
            width: self.pdf_width,
            height: self.pdf_height,
            levels: self.pdf_levels,
        }
    }
}

/// Presampled photon: index into the global photon buffer plus the
/// probability of it being picked.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PresampledPhoton {
    pub index: u32,
    pub pmf: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CandidatePassParams {
    pub width: u32,
    pub height: u32,
    pub seed: u32,
    pub light_candidates: u32,
    pub photon_candidates: u32,
    pub photon_capacity: u32,
    pub use_presampling: u32,
    pub tile_count: u32,
    pub tile_size: u32,
    pub geometry_band: f32,
    pub layout: u32,
}

impl CandidatePassParams {
    pub fn dims(&self) -> UVec2 {
        uvec2(self.width, self.height)
    }

    pub fn layout(&self) -> ReservoirLayout {
        ReservoirLayout::from_u32(self.layout)
    }
}

/// Bias correction applied when combining reservoirs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BiasCorrection {
    /// Normalizes by the total number of candidates; cheap but biased when
    /// neighbors' domains differ.
    Off,

    /// Normalizes only by candidates whose domain yields a non-zero target
    /// pdf for the selected sample.
    #[default]
    Basic,

    /// Like [`Self::Basic`], but additionally traces a visibility ray from
    /// each neighbor's surface to the selected sample.
    RayTraced,
}

impl BiasCorrection {
    pub fn to_u32(self) -> u32 {
        match self {
            BiasCorrection::Off => 0,
            BiasCorrection::Basic => 1,
            BiasCorrection::RayTraced => 2,
        }
    }

    pub fn from_u32(val: u32) -> Self {
        match val {
            0 => BiasCorrection::Off,
            2 => BiasCorrection::RayTraced,
            _ => BiasCorrection::Basic,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ResamplingPassParams {
    pub width: u32,
    pub height: u32,
    pub seed: u32,
    pub max_age: u32,
    pub spatial_samples: u32,
    pub boost_samples: u32,
    pub radius: f32,
    pub geometry_band: f32,
    pub thresholds: SimilarityThresholds,
    pub bias_correction: u32,
    pub layout: u32,
}

impl ResamplingPassParams {
    pub fn dims(&self) -> UVec2 {
        uvec2(self.width, self.height)
    }

    pub fn layout(&self) -> ReservoirLayout {
        ReservoirLayout::from_u32(self.layout)
    }

    pub fn bias_correction(&self) -> BiasCorrection {
        BiasCorrection::from_u32(self.bias_correction)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CollectionPassParams {
    pub width: u32,
    pub height: u32,
    pub capacity: u32,
    pub normal_threshold: f32,
}

impl CollectionPassParams {
    pub fn dims(&self) -> UVec2 {
        uvec2(self.width, self.height)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ShadingPassParams {
    pub width: u32,
    pub height: u32,
    pub layout: u32,
    pub visibility_ray: u32,
    pub use_caustics: u32,
    pub geometry_band: f32,
}

impl ShadingPassParams {
    pub fn dims(&self) -> UVec2 {
        uvec2(self.width, self.height)
    }

    pub fn layout(&self) -> ReservoirLayout {
        ReservoirLayout::from_u32(self.layout)
    }
}

//! Records, packed layouts and resampling algorithms shared by photon ReSTIR's
//! kernels and its host-side orchestration.

#![allow(clippy::len_without_is_empty)]
#![allow(clippy::manual_range_contains)]
#![allow(clippy::too_many_arguments)]

mod camera;
mod culling;
mod light;
mod light_sampler;
mod neighbor_offsets;
mod noise;
mod normal;
mod passes;
mod pdf_chain;
mod photon;
mod ray;
mod reprojection;
mod reservoir;
mod scene;
mod surface;
mod utils;

pub use self::camera::*;
pub use self::culling::*;
pub use self::light::*;
pub use self::light_sampler::*;
pub use self::neighbor_offsets::*;
pub use self::noise::*;
pub use self::normal::*;
pub use self::passes::*;
pub use self::pdf_chain::*;
pub use self::photon::*;
pub use self::ray::*;
pub use self::reprojection::*;
pub use self::reservoir::*;
pub use self::scene::*;
pub use self::surface::*;
pub use self::utils::*;

pub mod prelude {
    pub use core::f32::consts::PI;

    pub use glam::*;

    pub use crate::*;
}

/// Number of photon kinds (global and caustic); each kind gets its own
/// storage, capacity and bottom-level acceleration structure.
pub const PHOTON_KINDS: usize = 2;

/// Number of entries in the neighbor-offset table used by spatial resampling.
pub const NEIGHBOR_OFFSET_COUNT: usize = 8192;

/// Maximum number of reservoirs combined by a single resampling invocation
/// (canonical + temporal + spatial neighbors).
pub const MAX_RESAMPLING_INPUTS: usize = 34;

/// Maximum number of spatial neighbors visited per pixel.
pub const MAX_SPATIAL_SAMPLES: u32 = (MAX_RESAMPLING_INPUTS - 2) as u32;

/// Offset applied along the surface normal when spawning secondary rays.
pub const RAY_EPSILON: f32 = 1e-3;

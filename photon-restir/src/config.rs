use log::warn;
use photon_restir_gpu::{
    BiasCorrection, ReservoirLayout, SimilarityThresholds, MAX_SPATIAL_SAMPLES,
    PHOTON_KINDS,
};

use crate::{Error, Result};

/// Complete, immutable configuration of a frame.
///
/// Edits are made to a pending copy (see [`crate::Engine::config_mut()`]) and
/// committed at the beginning of the next frame, where the pending config is
/// diffed against the active one to find out what has to be rebuilt.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineConfig {
    pub photons: PhotonConfig,
    pub resampling: ResamplingConfig,
    pub candidates: CandidateConfig,
    pub shading: ShadingConfig,

    /// Seed of the per-frame random number generator.
    pub seed: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PhotonConfig {
    pub max_bounces: u32,

    /// Probability of storing a photon at a diffuse hit.
    pub store_probability: f32,

    /// Capacities of the photon buffers, indexed by [`PhotonKind::index()`].
    ///
    /// [`PhotonKind::index()`]: photon_restir_gpu::PhotonKind::index
    pub capacities: [u32; PHOTON_KINDS],

    /// Collection radii, indexed by photon kind.
    pub radii: [f32; PHOTON_KINDS],

    /// Number of photon paths traced per frame (when dynamic dispatch is
    /// disabled, or as its starting point).
    pub dispatched: u32,

    /// Height of the photon dispatch grid; the width is derived from it.
    pub dispatch_y_extent: u32,

    pub dynamic_dispatch: DynamicDispatchConfig,

    /// Factor applied to last frame's photon counts when sizing the
    /// acceleration-structure builds.
    pub accel_overestimate: f32,

    pub culling: CullingConfig,
    pub light_sampler: LightSamplerKind,
}

impl Default for PhotonConfig {
    fn default() -> Self {
        Self {
            max_bounces: 10,
            store_probability: 0.3,
            capacities: [400_000, 100_000],
            radii: [0.02, 0.01],
            dispatched: 524_288,
            dispatch_y_extent: 512,
            dynamic_dispatch: Default::default(),
            accel_overestimate: 1.15,
            culling: Default::default(),
            light_sampler: Default::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DynamicDispatchConfig {
    pub enabled: bool,
    pub max: u32,

    /// Fraction of the capacity kept free before the dispatch is allowed to
    /// grow.
    pub guard_percentage: f32,

    /// Fraction of the capacity the dispatch changes by per frame.
    pub change_percentage: f32,
}

impl Default for DynamicDispatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max: 4_000_000,
            guard_percentage: 0.1,
            change_percentage: 0.05,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CullingConfig {
    pub enabled: bool,
    pub hash_bits: u32,
    pub cell_size: f32,
}

impl Default for CullingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            hash_bits: 20,
            cell_size: 0.04,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LightSamplerKind {
    /// Lights are picked proportionally to their power.
    #[default]
    Power,

    Uniform,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResamplingMode {
    Temporal,
    Spatial,
    #[default]
    SpatioTemporal,
    NoResampling,
}

impl ResamplingMode {
    pub const ALL: [Self; 4] = [
        Self::Temporal,
        Self::Spatial,
        Self::SpatioTemporal,
        Self::NoResampling,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ResamplingMode::Temporal => "Temporal",
            ResamplingMode::Spatial => "Spatial",
            ResamplingMode::SpatioTemporal => "SpatioTemporal",
            ResamplingMode::NoResampling => "NoResampling",
        }
    }

    pub fn uses_history(self) -> bool {
        matches!(self, Self::Temporal | Self::SpatioTemporal)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResamplingConfig {
    pub mode: ResamplingMode,
    pub bias_correction: BiasCorrection,
    pub layout: ReservoirLayout,
    pub max_age: u32,
    pub spatial_samples: u32,

    /// Number of spatial samples used on disocclusion.
    pub boost_samples: u32,

    /// Spatial sampling radius, in pixels.
    pub radius: f32,

    pub depth_threshold: f32,
    pub normal_threshold: f32,
    pub material_threshold: f32,
    pub use_material_threshold: bool,
}

impl Default for ResamplingConfig {
    fn default() -> Self {
        Self {
            mode: Default::default(),
            bias_correction: Default::default(),
            layout: Default::default(),
            max_age: 20,
            spatial_samples: 1,
            boost_samples: 2,
            radius: 20.0,
            depth_threshold: 0.1,
            normal_threshold: 0.6,
            material_threshold: 0.2,
            use_material_threshold: false,
        }
    }
}

impl ResamplingConfig {
    pub fn thresholds(&self) -> SimilarityThresholds {
        SimilarityThresholds {
            depth: self.depth_threshold,
            normal: self.normal_threshold,
            material: self.material_threshold,
            use_material: self.use_material_threshold as u32,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CandidateConfig {
    pub light_candidates: u32,
    pub photon_candidates: u32,
    pub presampling: PresamplingConfig,

    /// Candidates closer than this (squared distance) are rejected.
    pub geometry_band: f32,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            light_candidates: 32,
            photon_candidates: 1,
            presampling: Default::default(),
            geometry_band: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresamplingConfig {
    pub enabled: bool,
    pub tile_count: u32,
    pub tile_size: u32,
}

impl Default for PresamplingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tile_count: 128,
            tile_size: 1024,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShadingConfig {
    pub visibility_ray: bool,
    pub caustics: bool,

    /// Minimum cosine between a caustic photon's normal and the surface's
    /// normal for the photon to be collected.
    pub caustic_normal_threshold: f32,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            visibility_ray: true,
            caustics: true,
            caustic_normal_threshold: 0.6,
        }
    }
}

/// What has to be rebuilt after switching from one config to another.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Invalidation {
    /// Photon buffers and acceleration structures have to be reallocated.
    pub photon_buffers: bool,

    /// Presampling buffers have to be released; they get reallocated on
    /// demand if presampling stays enabled.
    pub presampling: bool,

    /// Culling mask has to be released; it gets reallocated on demand if
    /// culling stays enabled.
    pub culling: bool,

    /// Per-pixel reservoirs have to be reallocated.
    pub reservoirs: bool,

    /// Compiled kernels have to be dropped.
    pub kernels: bool,

    /// Light sampler has to be rebuilt.
    pub light_sampler: bool,

    /// Dynamic dispatch controller has to start over.
    pub dispatch: bool,

    /// Reservoirs left by previous frames must not be reused.
    pub history: bool,
}

impl Invalidation {
    pub fn any(&self) -> bool {
        *self != Self::default()
    }
}

impl PipelineConfig {
    /// Compares this (active) config with `next` and returns what switching
    /// to `next` invalidates.
    pub fn diff(&self, next: &Self) -> Invalidation {
        let (prev_ph, next_ph) = (&self.photons, &next.photons);
        let (prev_rs, next_rs) = (&self.resampling, &next.resampling);
        let (prev_cd, next_cd) = (&self.candidates, &next.candidates);

        let photon_buffers = prev_ph.capacities != next_ph.capacities;

        let presampling = prev_cd.presampling.enabled
            != next_cd.presampling.enabled
            || prev_cd.presampling.tile_count != next_cd.presampling.tile_count
            || prev_cd.presampling.tile_size != next_cd.presampling.tile_size
            || prev_ph.capacities[0] != next_ph.capacities[0];

        let culling = prev_ph.culling.enabled != next_ph.culling.enabled
            || prev_ph.culling.hash_bits != next_ph.culling.hash_bits;

        let reservoirs = prev_rs.layout != next_rs.layout;

        let kernels = reservoirs
            || prev_rs.mode != next_rs.mode
            || prev_rs.bias_correction != next_rs.bias_correction
            || prev_cd.presampling.enabled != next_cd.presampling.enabled
            || prev_ph.culling.enabled != next_ph.culling.enabled
            || self.shading.visibility_ray != next.shading.visibility_ray
            || self.shading.caustics != next.shading.caustics;

        let history = reservoirs
            || prev_rs.mode != next_rs.mode
            || prev_rs.bias_correction != next_rs.bias_correction;

        Invalidation {
            photon_buffers,
            presampling,
            culling,
            reservoirs,
            kernels,
            light_sampler: prev_ph.light_sampler != next_ph.light_sampler,
            dispatch: prev_ph.dispatched != next_ph.dispatched
                || prev_ph.dispatch_y_extent != next_ph.dispatch_y_extent
                || prev_ph.dynamic_dispatch != next_ph.dynamic_dispatch
                || photon_buffers,
            history,
        }
    }

    /// Clamps values that have a usable fallback and rejects the ones that
    /// don't.
    pub fn sanitize(mut self) -> Result<Self> {
        let photons = &mut self.photons;

        for capacity in &mut photons.capacities {
            if *capacity == 0 {
                warn!("Photon capacity must be positive; clamping to 1");
                *capacity = 1;
            }
        }

        if photons.dispatch_y_extent == 0 {
            warn!("Photon dispatch's y-extent must be positive; clamping to 1");
            photons.dispatch_y_extent = 1;
        }

        if photons.dispatched == 0 {
            warn!("Number of dispatched photons must be positive; clamping to 1");
            photons.dispatched = 1;
        }

        photons.culling.hash_bits = photons.culling.hash_bits.clamp(10, 27);

        if self.resampling.spatial_samples > MAX_SPATIAL_SAMPLES
            || self.resampling.boost_samples > MAX_SPATIAL_SAMPLES
        {
            warn!(
                "Number of spatial samples must be at most {}; clamping",
                MAX_SPATIAL_SAMPLES
            );

            self.resampling.spatial_samples =
                self.resampling.spatial_samples.min(MAX_SPATIAL_SAMPLES);

            self.resampling.boost_samples =
                self.resampling.boost_samples.min(MAX_SPATIAL_SAMPLES);
        }

        if !(self.photons.store_probability > 0.0
            && self.photons.store_probability <= 1.0)
        {
            return Err(Error::configuration(format!(
                "photon store probability must be in (0, 1], got {}",
                self.photons.store_probability
            )));
        }

        if self.photons.radii.iter().any(|radius| *radius <= 0.0) {
            return Err(Error::configuration(format!(
                "photon radii must be positive, got {:?}",
                self.photons.radii
            )));
        }

        if self.photons.culling.cell_size <= 0.0 {
            return Err(Error::configuration(
                "culling cell size must be positive",
            ));
        }

        let presampling = self.candidates.presampling;

        if presampling.enabled
            && (presampling.tile_count == 0 || presampling.tile_size == 0)
        {
            return Err(Error::configuration(
                "presampling requires a positive number of tiles and samples",
            ));
        }

        Ok(self)
    }
}

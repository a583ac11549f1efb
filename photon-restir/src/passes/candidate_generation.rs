use photon_restir_gpu::{CandidatePassParams, PhotonKind};

use crate::kernels::entry_points::CANDIDATE_GENERATION;
use crate::passes::reservoir_defines;
use crate::{
    Bindings, KernelKey, PassContext, PhotonBuffers, PipelineConfig, Result,
    Scene, StorageBuffer,
};

/// Builds the initial reservoir of each pixel out of light and photon
/// candidates.
#[derive(Debug)]
pub struct CandidateGenerationPass {
    kernel: KernelKey,
}

impl CandidateGenerationPass {
    pub fn new(config: &PipelineConfig) -> Self {
        let kernel = KernelKey::new(CANDIDATE_GENERATION).define(
            "USE_PRESAMPLING",
            config.candidates.presampling.enabled as u32,
        );

        Self {
            kernel: reservoir_defines(kernel, config),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &self,
        ctx: &mut PassContext,
        scene: &dyn Scene,
        light_sampler: &StorageBuffer,
        buffers: &PhotonBuffers,
        surfaces: &StorageBuffer,
        reservoirs: &StorageBuffer,
        samples: &StorageBuffer,
        seed: u32,
    ) -> Result<()> {
        let dims = ctx.dims;
        let config = ctx.config;
        let global = PhotonKind::Global;
        let presampled = buffers
            .presampled()
            .filter(|_| config.candidates.presampling.enabled);

        let params = CandidatePassParams {
            width: dims.x,
            height: dims.y,
            seed,
            light_candidates: config.candidates.light_candidates,
            photon_candidates: config.candidates.photon_candidates,
            photon_capacity: buffers.capacity(global),
            use_presampling: presampled.is_some() as u32,
            tile_count: presampled.map_or(0, |p| p.tile_count),
            tile_size: presampled.map_or(0, |p| p.tile_size),
            geometry_band: config.candidates.geometry_band,
            layout: config.resampling.layout.to_u32(),
        };

        let bindings = scene
            .bind(Bindings::new())
            .buffer("light_sampler", light_sampler.id())
            .buffer("surfaces", surfaces.id())
            .buffer("photon_counters", buffers.counters().id())
            .buffer("global_aabbs", buffers.aabbs(global).id())
            .buffer("global_data", buffers.data(global).id())
            .buffer_opt("presampled_photons", presampled.map(|p| p.tiles.id()))
            .buffer("curr_reservoirs", reservoirs.id())
            .buffer("curr_samples", samples.id())
            .params(&params);

        ctx.dispatch(&self.kernel, &bindings, dims)
    }
}

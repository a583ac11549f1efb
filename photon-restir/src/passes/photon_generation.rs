use glam::UVec2;
use photon_restir_gpu::{PhotonGenerationPassParams, PhotonKind};

use crate::kernels::entry_points::PHOTON_GENERATION;
use crate::{
    Bindings, KernelKey, PassContext, PhotonBuffers, PipelineConfig, Result,
    Scene, StorageBuffer, Texture,
};

/// Traces light paths and stores photons into [`PhotonBuffers`].
#[derive(Debug)]
pub struct PhotonGenerationPass {
    kernel: KernelKey,
}

impl PhotonGenerationPass {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            kernel: KernelKey::new(PHOTON_GENERATION)
                .define("USE_PHOTON_CULLING", config.photons.culling.enabled as u32),
        }
    }

    /// Clears the counters and dispatches `grid.x * grid.y` light paths.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &self,
        ctx: &mut PassContext,
        scene: &dyn Scene,
        light_sampler: &StorageBuffer,
        buffers: &PhotonBuffers,
        culling_mask: Option<&Texture>,
        grid: UVec2,
        seed: u32,
    ) -> Result<()> {
        let config = ctx.config;
        let photons = &config.photons;
        let [global, caustic] = PhotonKind::ALL;

        let params = PhotonGenerationPassParams {
            seed,
            grid_width: grid.x,
            grid_height: grid.y,
            max_bounces: photons.max_bounces,
            store_probability: photons.store_probability,
            radius: photons.radii,
            capacity: buffers.capacities(),
            use_culling: culling_mask.is_some() as u32,
            hash_bits: photons.culling.hash_bits,
            cell_size: photons.culling.cell_size,
        };

        buffers.clear(ctx.device)?;

        let bindings = scene
            .bind(Bindings::new())
            .buffer("light_sampler", light_sampler.id())
            .texture_opt("culling_mask", culling_mask.map(|mask| mask.id()))
            .buffer("photon_counters", buffers.counters().id())
            .buffer("global_aabbs", buffers.aabbs(global).id())
            .buffer("global_data", buffers.data(global).id())
            .buffer("caustic_aabbs", buffers.aabbs(caustic).id())
            .buffer("caustic_data", buffers.data(caustic).id())
            .params(&params);

        ctx.dispatch(&self.kernel, &bindings, grid)
    }
}

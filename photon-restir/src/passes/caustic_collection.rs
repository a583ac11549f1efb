use photon_restir_gpu::{CollectionPassParams, PhotonKind};

use crate::kernels::entry_points::CAUSTIC_COLLECTION;
use crate::{
    Bindings, KernelKey, PassContext, PhotonAccel, PhotonBuffers,
    PipelineConfig, Result, StorageBuffer, Texture,
};

/// Gathers caustic photons around each pixel's surface through the photon
/// acceleration structure.
#[derive(Debug)]
pub struct CausticCollectionPass {
    kernel: KernelKey,
}

impl CausticCollectionPass {
    pub fn new(_: &PipelineConfig) -> Self {
        Self {
            kernel: KernelKey::new(CAUSTIC_COLLECTION),
        }
    }

    pub fn run(
        &self,
        ctx: &mut PassContext,
        buffers: &PhotonBuffers,
        accel: &PhotonAccel,
        surfaces: &StorageBuffer,
        caustics: &Texture,
    ) -> Result<()> {
        let dims = ctx.dims;
        let caustic = PhotonKind::Caustic;

        let params = CollectionPassParams {
            width: dims.x,
            height: dims.y,
            capacity: buffers.capacity(caustic),
            normal_threshold: ctx.config.shading.caustic_normal_threshold,
        };

        let bindings = Bindings::new()
            .buffer("surfaces", surfaces.id())
            .buffer("photon_counters", buffers.counters().id())
            .buffer("caustic_aabbs", buffers.aabbs(caustic).id())
            .buffer("caustic_data", buffers.data(caustic).id())
            .accel("photon_accel", accel.tlas())
            .texture("caustics", caustics.id())
            .params(&params);

        ctx.dispatch(&self.kernel, &bindings, dims)
    }
}

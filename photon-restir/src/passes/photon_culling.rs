use photon_restir_gpu::{PhotonCullingPassParams, PhotonKind};

use crate::kernels::entry_points::PHOTON_CULLING;
use crate::{
    Bindings, KernelKey, PassContext, PipelineConfig, Result, StorageBuffer,
    Texture,
};

/// Marks hash-grid cells around visible surfaces, so that photon generation
/// only stores photons where they can be collected.
#[derive(Debug)]
pub struct PhotonCullingPass {
    kernel: KernelKey,
}

impl PhotonCullingPass {
    pub fn new(_: &PipelineConfig) -> Self {
        Self {
            kernel: KernelKey::new(PHOTON_CULLING),
        }
    }

    pub fn run(
        &self,
        ctx: &mut PassContext,
        surfaces: &StorageBuffer,
        mask: &Texture,
    ) -> Result<()> {
        let dims = ctx.dims;
        let config = ctx.config;
        let photons = &config.photons;

        let params = PhotonCullingPassParams {
            width: dims.x,
            height: dims.y,
            hash_bits: photons.culling.hash_bits,
            cell_size: photons.culling.cell_size,
            radius: photons.radii[PhotonKind::Global.index()]
                .max(photons.radii[PhotonKind::Caustic.index()]),
        };

        ctx.device.clear_texture(mask.id())?;

        let bindings = Bindings::new()
            .buffer("surfaces", surfaces.id())
            .texture("culling_mask", mask.id())
            .params(&params);

        ctx.dispatch(&self.kernel, &bindings, dims)
    }
}

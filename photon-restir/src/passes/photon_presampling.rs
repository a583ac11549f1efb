use glam::uvec2;
use photon_restir_gpu::{PhotonKind, PhotonPdfPassParams};

use crate::kernels::entry_points::{
    PHOTON_PDF_BUILD, PHOTON_PDF_REDUCE, PHOTON_PRESAMPLING,
};
use crate::{
    Bindings, KernelKey, PassContext, PhotonBuffers, PipelineConfig,
    Presampling, Result,
};

/// Builds the luminance PDF of global photons, reduces it into a mip chain
/// (one dispatch per level) and draws presampled tiles out of it.
#[derive(Debug)]
pub struct PhotonPresamplingPass {
    build: KernelKey,
    reduce: KernelKey,
    presample: KernelKey,
}

impl PhotonPresamplingPass {
    pub fn new(_: &PipelineConfig) -> Self {
        Self {
            build: KernelKey::new(PHOTON_PDF_BUILD),
            reduce: KernelKey::new(PHOTON_PDF_REDUCE),
            presample: KernelKey::new(PHOTON_PRESAMPLING),
        }
    }

    pub fn run(
        &self,
        ctx: &mut PassContext,
        buffers: &PhotonBuffers,
        presampling: &Presampling,
        seed: u32,
    ) -> Result<()> {
        let global = PhotonKind::Global;
        let size = presampling.size;

        let mut params = PhotonPdfPassParams {
            pdf_width: size.width,
            pdf_height: size.height,
            pdf_levels: size.levels,
            level: 0,
            capacity: buffers.capacity(global),
            seed,
            tile_count: presampling.tile_count,
            tile_size: presampling.tile_size,
        };

        let bindings = Bindings::new()
            .buffer("photon_counters", buffers.counters().id())
            .buffer("global_data", buffers.data(global).id())
            .buffer("photon_pdf", presampling.pdf.id());

        ctx.dispatch(
            &self.build,
            &bindings.clone().params(&params),
            uvec2(size.width, size.height),
        )?;

        ctx.device.barrier();

        for level in 1..size.levels {
            params.level = level;

            let bindings = Bindings::new()
                .buffer("photon_pdf", presampling.pdf.id())
                .params(&params);

            ctx.dispatch(&self.reduce, &bindings, size.level_dims(level))?;
            ctx.device.barrier();
        }

        let bindings = Bindings::new()
            .buffer("photon_pdf", presampling.pdf.id())
            .buffer("presampled_photons", presampling.tiles.id())
            .params(&params);

        ctx.dispatch(
            &self.presample,
            &bindings,
            uvec2(presampling.tile_size, presampling.tile_count),
        )
    }
}

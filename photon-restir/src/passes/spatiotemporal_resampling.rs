use crate::kernels::entry_points::SPATIOTEMPORAL_RESAMPLING;
use crate::passes::{resampling_kernel, resampling_params};
use crate::reflection::{MOTION, VIEW};
use crate::{
    Bindings, Frame, FrameResources, KernelKey, PassContext, PipelineConfig,
    RenderData, Result, Scene, Texture, TextureId,
};

/// Temporal and spatial reuse in a single dispatch.
#[derive(Debug)]
pub struct SpatiotemporalResamplingPass {
    kernel: KernelKey,
}

impl SpatiotemporalResamplingPass {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            kernel: resampling_kernel(SPATIOTEMPORAL_RESAMPLING, config),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &self,
        ctx: &mut PassContext,
        scene: &dyn Scene,
        data: &RenderData,
        resources: &FrameResources,
        neighbor_offsets: &Texture,
        prev_view: Option<TextureId>,
        frame: Frame,
        seed: u32,
    ) -> Result<()> {
        let dims = ctx.dims;
        let (curr, prev) = (frame.current(), frame.previous());

        let bindings = scene
            .bind(Bindings::new())
            .texture("neighbor_offsets", neighbor_offsets.id())
            .texture_opt(MOTION.name, data.input(MOTION.name))
            .texture_opt(VIEW.name, data.input(VIEW.name))
            .texture_opt("prev_view", prev_view)
            .buffer("surfaces", resources.surfaces.get(curr).id())
            .buffer("prev_surfaces", resources.surfaces.get(prev).id())
            .buffer("prev_reservoirs", resources.reservoirs.get(prev).id())
            .buffer("prev_samples", resources.samples.get(prev).id())
            .buffer("curr_reservoirs", resources.reservoirs.get(curr).id())
            .buffer("curr_samples", resources.samples.get(curr).id())
            .params(&resampling_params(ctx.config, dims, seed));

        ctx.dispatch(&self.kernel, &bindings, dims)
    }
}

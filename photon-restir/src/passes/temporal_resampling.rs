use crate::kernels::entry_points::TEMPORAL_RESAMPLING;
use crate::passes::{resampling_kernel, resampling_params};
use crate::reflection::{MOTION, VIEW};
use crate::{
    Bindings, Frame, FrameResources, KernelKey, PassContext, PipelineConfig,
    RenderData, Result, Scene, TextureId,
};

/// Merges each pixel's fresh reservoir with last frame's reservoir at the
/// reprojected location.
#[derive(Debug)]
pub struct TemporalResamplingPass {
    kernel: KernelKey,
}

impl TemporalResamplingPass {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            kernel: resampling_kernel(TEMPORAL_RESAMPLING, config),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &self,
        ctx: &mut PassContext,
        scene: &dyn Scene,
        data: &RenderData,
        resources: &FrameResources,
        prev_view: Option<TextureId>,
        frame: Frame,
        seed: u32,
    ) -> Result<()> {
        let dims = ctx.dims;
        let (curr, prev) = (frame.current(), frame.previous());

        let bindings = scene
            .bind(Bindings::new())
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

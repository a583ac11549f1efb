use crate::kernels::entry_points::SPATIAL_RESAMPLING;
use crate::passes::{resampling_kernel, resampling_params};
use crate::{
    Bindings, Frame, FrameResources, KernelKey, PassContext, PipelineConfig,
    Result, Scene, Texture,
};

/// Merges each pixel's reservoir with reservoirs of similar neighbors.
///
/// Reads the current slot and writes the other one, which is where the
/// frame's result ends up (see [`crate::result_slot()`]).
#[derive(Debug)]
pub struct SpatialResamplingPass {
    kernel: KernelKey,
}

impl SpatialResamplingPass {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            kernel: resampling_kernel(SPATIAL_RESAMPLING, config),
        }
    }

    pub fn run(
        &self,
        ctx: &mut PassContext,
        scene: &dyn Scene,
        resources: &FrameResources,
        neighbor_offsets: &Texture,
        frame: Frame,
        seed: u32,
    ) -> Result<()> {
        let dims = ctx.dims;
        let (input, output) = (frame.current(), frame.current().other());

        let bindings = scene
            .bind(Bindings::new())
            .texture("neighbor_offsets", neighbor_offsets.id())
            .buffer("surfaces", resources.surfaces.get(input).id())
            .buffer("input_reservoirs", resources.reservoirs.get(input).id())
            .buffer("input_samples", resources.samples.get(input).id())
            .buffer("output_reservoirs", resources.reservoirs.get(output).id())
            .buffer("output_samples", resources.samples.get(output).id())
            .params(&resampling_params(ctx.config, dims, seed));

        ctx.dispatch(&self.kernel, &bindings, dims)
    }
}

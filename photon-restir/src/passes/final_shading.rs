use photon_restir_gpu::ShadingPassParams;

use crate::kernels::entry_points::FINAL_SHADING;
use crate::passes::reservoir_defines;
use crate::reflection::{COLOR, DIFFUSE_ILLUMINATION, DIFFUSE_REFLECTANCE};
use crate::{
    Bindings, FrameResources, KernelKey, PassContext, PipelineConfig,
    RenderData, Result, Scene, Slot,
};

/// Shades each pixel with the sample selected by its resolved reservoir.
#[derive(Debug)]
pub struct FinalShadingPass {
    kernel: KernelKey,
}

impl FinalShadingPass {
    pub fn new(config: &PipelineConfig) -> Self {
        let kernel = KernelKey::new(FINAL_SHADING)
            .define("USE_VISIBILITY_RAY", config.shading.visibility_ray as u32)
            .define("USE_CAUSTICS", config.shading.caustics as u32);

        Self {
            kernel: reservoir_defines(kernel, config),
        }
    }

    /// Shades pixels using reservoirs from `result` (which depends on the
    /// resampling mode, see [`crate::result_slot()`]) and surfaces of
    /// `surfaces`.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &self,
        ctx: &mut PassContext,
        scene: &dyn Scene,
        data: &RenderData,
        resources: &FrameResources,
        surfaces: Slot,
        result: Slot,
    ) -> Result<()> {
        let dims = ctx.dims;
        let config = ctx.config;
        let color = data.required_output(&COLOR)?;

        let params = ShadingPassParams {
            width: dims.x,
            height: dims.y,
            layout: config.resampling.layout.to_u32(),
            visibility_ray: config.shading.visibility_ray as u32,
            use_caustics: config.shading.caustics as u32,
            geometry_band: config.candidates.geometry_band,
        };

        let caustics = config.shading.caustics.then(|| resources.caustics.id());

        let bindings = scene
            .bind(Bindings::new())
            .buffer("surfaces", resources.surfaces.get(surfaces).id())
            .buffer("reservoirs", resources.reservoirs.get(result).id())
            .buffer("samples", resources.samples.get(result).id())
            .texture_opt("caustics", caustics)
            .texture(COLOR.name, color)
            .texture_opt(
                DIFFUSE_ILLUMINATION.name,
                data.output(DIFFUSE_ILLUMINATION.name),
            )
            .texture_opt(
                DIFFUSE_REFLECTANCE.name,
                data.output(DIFFUSE_REFLECTANCE.name),
            )
            .params(&params);

        ctx.dispatch(&self.kernel, &bindings, dims)
    }
}

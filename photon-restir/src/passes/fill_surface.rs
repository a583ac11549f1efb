use photon_restir_gpu::SurfacePassParams;

use crate::kernels::entry_points::FILL_SURFACE_INFO;
use crate::reflection::{ALBEDO, NORMAL, POSITION, VBUFFER};
use crate::{
    Bindings, InputBundle, KernelKey, PassContext, PipelineConfig, RenderData,
    Result, Scene, StorageBuffer,
};

/// Snapshots the primary surface of each pixel, either from the visibility
/// buffer or from the G-buffer.
#[derive(Debug)]
pub struct FillSurfacePass {
    kernel: KernelKey,
}

impl FillSurfacePass {
    pub fn new(_: &PipelineConfig) -> Self {
        Self {
            kernel: KernelKey::new(FILL_SURFACE_INFO),
        }
    }

    pub fn run(
        &self,
        ctx: &mut PassContext,
        scene: &dyn Scene,
        data: &RenderData,
        bundle: InputBundle,
        surfaces: &StorageBuffer,
    ) -> Result<()> {
        let dims = ctx.dims;

        let params = SurfacePassParams {
            width: dims.x,
            height: dims.y,
            camera: data.camera_position.into(),
            use_vbuffer: (bundle == InputBundle::Complex) as u32,
        };

        let bindings = match bundle {
            InputBundle::Complex => scene
                .bind(Bindings::new())
                .texture_opt(VBUFFER.name, data.input(VBUFFER.name)),

            InputBundle::Simplified => Bindings::new()
                .texture_opt(POSITION.name, data.input(POSITION.name))
                .texture_opt(NORMAL.name, data.input(NORMAL.name))
                .texture_opt(ALBEDO.name, data.input(ALBEDO.name)),
        };

        let bindings = bindings.buffer("surfaces", surfaces.id()).params(&params);

        ctx.dispatch(&self.kernel, &bindings, dims)
    }
}

use glam::UVec2;
use log::debug;

use crate::{Bindings, Device, KernelCache, KernelKey, PipelineConfig, Result};

macro_rules! passes {
    ([ $( $name:ident => $class:ident, )* ]) => {
        $( mod $name; )*
        $( pub use self::$name::*; )*

        #[derive(Debug)]
        pub struct Passes {
            $( pub $name: $class, )*
        }

        impl Passes {
            pub fn new(config: &PipelineConfig) -> Self {
                debug!("Initializing passes");

                Self {
                    $( $name: $class::new(config), )*
                }
            }
        }
    };
}

passes!([
    candidate_generation => CandidateGenerationPass,
    caustic_collection => CausticCollectionPass,
    fill_surface => FillSurfacePass,
    final_shading => FinalShadingPass,
    photon_culling => PhotonCullingPass,
    photon_generation => PhotonGenerationPass,
    photon_presampling => PhotonPresamplingPass,
    spatial_resampling => SpatialResamplingPass,
    spatiotemporal_resampling => SpatiotemporalResamplingPass,
    temporal_resampling => TemporalResamplingPass,
]);

/// State shared by all passes of a frame.
pub struct PassContext<'a> {
    pub device: &'a mut dyn Device,
    pub kernels: &'a mut KernelCache,
    pub config: &'a PipelineConfig,
    pub dims: UVec2,
}

impl PassContext<'_> {
    /// Compiles the kernel (unless it's already cached) and dispatches it.
    pub fn dispatch(
        &mut self,
        kernel: &KernelKey,
        bindings: &Bindings,
        size: UVec2,
    ) -> Result<()> {
        let id = self.kernels.get_or_compile(self.device, kernel.clone())?;

        self.device.dispatch(id, bindings, size)
    }
}

/// Defines shared by kernels reading or writing reservoirs.
fn reservoir_defines(kernel: KernelKey, config: &PipelineConfig) -> KernelKey {
    kernel.define("RESERVOIR_LAYOUT", config.resampling.layout.to_u32())
}

/// Defines of the resampling kernels.
fn resampling_kernel(entry_point: &'static str, config: &PipelineConfig) -> KernelKey {
    reservoir_defines(KernelKey::new(entry_point), config).define(
        "BIAS_CORRECTION_MODE",
        config.resampling.bias_correction.to_u32(),
    )
}

fn resampling_params(
    config: &PipelineConfig,
    dims: UVec2,
    seed: u32,
) -> photon_restir_gpu::ResamplingPassParams {
    let resampling = &config.resampling;

    photon_restir_gpu::ResamplingPassParams {
        width: dims.x,
        height: dims.y,
        seed,
        max_age: resampling.max_age,
        spatial_samples: resampling.spatial_samples,
        boost_samples: resampling.boost_samples,
        radius: resampling.radius,
        geometry_band: config.candidates.geometry_band,
        thresholds: resampling.thresholds(),
        bias_correction: resampling.bias_correction.to_u32(),
        layout: resampling.layout.to_u32(),
    }
}

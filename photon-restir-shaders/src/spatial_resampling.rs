use photon_restir_gpu::prelude::*;

use crate::resampling::{self, LightReservoir, ResamplingInputs, ReservoirsView};

/// Combines each pixel's reservoir with reservoirs of up to
/// `spatial_samples` similar neighbors.
///
/// Reads from one parity slot and writes into the other one, so that no
/// invocation observes a neighbor's already-resampled reservoir.
pub fn main(
    global_id: UVec2,
    params: &ResamplingPassParams,
    scene: SceneView,
    offsets: &[[i8; 2]],
    surfaces: &[SurfaceInfo],
    input: ReservoirsView,
    output_reservoirs: &mut [u32],
    output_samples: &mut [LightSample],
) {
    let dims = params.dims();

    if global_id.x >= dims.x || global_id.y >= dims.y {
        return;
    }

    let idx = screen_to_idx(global_id, dims);
    let surface = surfaces[idx];
    let canonical = input.get(idx);

    if !surface.is_valid() {
        canonical.write(output_reservoirs, output_samples, input.layout, idx);
        return;
    }

    let mut wnoise = WhiteNoise::new(params.seed, global_id);
    let mut out = LightReservoir::default();
    let mut inputs = ResamplingInputs::default();

    resampling::merge(
        &mut out,
        &mut inputs,
        &mut wnoise,
        &canonical,
        surface,
        &surface,
        params.geometry_band,
    );

    let count = params.spatial_samples.min(MAX_SPATIAL_SAMPLES);

    let start = if offsets.is_empty() {
        0
    } else {
        wnoise.sample_index(offsets.len() as u32)
    };

    for n in 0..count {
        let Some(pos) =
            resampling::neighbor(global_id, dims, offsets, start, n, params.radius)
        else {
            continue;
        };

        let neighbor_idx = screen_to_idx(pos, dims);
        let neighbor_surface = surfaces[neighbor_idx];

        if !surface.is_similar_to(&neighbor_surface, &params.thresholds) {
            continue;
        }

        resampling::merge(
            &mut out,
            &mut inputs,
            &mut wnoise,
            &input.get(neighbor_idx),
            neighbor_surface,
            &surface,
            params.geometry_band,
        );
    }

    resampling::finalize(
        &mut out,
        &inputs,
        params.bias_correction(),
        params.geometry_band,
        scene,
    );

    out.write(output_reservoirs, output_samples, input.layout, idx);
}

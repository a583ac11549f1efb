use photon_restir_gpu::prelude::*;

use crate::resampling::{self, LightReservoir, ResamplingInputs, ReservoirsView};

/// Combines each pixel's fresh reservoir with the one left behind by the
/// previous frame at the reprojected location, provided both surfaces are
/// similar enough.
pub fn main(
    global_id: UVec2,
    params: &ResamplingPassParams,
    scene: SceneView,
    motion: &[Vec2],
    curr_surfaces: &[SurfaceInfo],
    prev_surfaces: &[SurfaceInfo],
    prev_reservoirs: ReservoirsView,
    curr_reservoirs: &mut [u32],
    curr_samples: &mut [LightSample],
) {
    let dims = params.dims();

    if global_id.x >= dims.x || global_id.y >= dims.y {
        return;
    }

    let idx = screen_to_idx(global_id, dims);
    let surface = curr_surfaces[idx];
    let layout = params.layout();

    let canonical = Reservoir::read(curr_reservoirs, curr_samples, layout, idx);

    if !surface.is_valid() {
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

    if let Some((_, prev_surface, prev)) = temporal_neighbor(
        global_id,
        params,
        motion[idx],
        &surface,
        prev_surfaces,
        prev_reservoirs,
    ) {
        resampling::merge(
            &mut out,
            &mut inputs,
            &mut wnoise,
            &prev,
            prev_surface,
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

    out.write(curr_reservoirs, curr_samples, layout, idx);
}

/// Looks up the previous frame's reservoir for given pixel, together with its
/// position and surface; returns `None` on disocclusion.
///
/// The history is capped at `max_age` candidates so that a sample cannot
/// dominate the pixel indefinitely.
pub fn temporal_neighbor(
    global_id: UVec2,
    params: &ResamplingPassParams,
    motion: Vec2,
    surface: &SurfaceInfo,
    prev_surfaces: &[SurfaceInfo],
    prev_reservoirs: ReservoirsView,
) -> Option<(UVec2, SurfaceInfo, LightReservoir)> {
    let dims = params.dims();
    let prev_pos = reproject(global_id, motion, dims)?;
    let prev_idx = screen_to_idx(prev_pos, dims);
    let prev_surface = prev_surfaces[prev_idx];

    if !surface.is_similar_to(&prev_surface, &params.thresholds) {
        return None;
    }

    let mut prev = prev_reservoirs.get(prev_idx);

    prev.clamp_m(params.max_age as f32);

    Some((prev_pos, prev_surface, prev))
}

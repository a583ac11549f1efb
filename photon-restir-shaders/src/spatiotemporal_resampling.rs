use photon_restir_gpu::prelude::*;

use crate::resampling::{self, LightReservoir, ResamplingInputs, ReservoirsView};
use crate::temporal_resampling::temporal_neighbor;

/// Temporal and spatial reuse fused into a single pass: after merging the
/// reprojected history, reservoirs of the previous frame around the
/// reprojected pixel are merged as spatial neighbors.
///
/// On disocclusion the neighborhood is centered at the current pixel and
/// visited with `max(spatial_samples, boost_samples)` samples instead.
pub fn main(
    global_id: UVec2,
    params: &ResamplingPassParams,
    scene: SceneView,
    offsets: &[[i8; 2]],
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

    if !surface.is_valid() {
        return;
    }

    let canonical = Reservoir::read(curr_reservoirs, curr_samples, layout, idx);
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

    let temporal = temporal_neighbor(
        global_id,
        params,
        motion[idx],
        &surface,
        prev_surfaces,
        prev_reservoirs,
    );

    let (center, count) = match temporal {
        Some((prev_pos, prev_surface, prev)) => {
            resampling::merge(
                &mut out,
                &mut inputs,
                &mut wnoise,
                &prev,
                prev_surface,
                &surface,
                params.geometry_band,
            );

            (prev_pos, params.spatial_samples)
        }

        None => (
            global_id,
            params.spatial_samples.max(params.boost_samples),
        ),
    };

    let count = count.min(MAX_SPATIAL_SAMPLES);

    let start = if offsets.is_empty() {
        0
    } else {
        wnoise.sample_index(offsets.len() as u32)
    };

    for n in 0..count {
        let Some(pos) =
            resampling::neighbor(center, dims, offsets, start, n, params.radius)
        else {
            continue;
        };

        let neighbor_idx = screen_to_idx(pos, dims);
        let neighbor_surface = prev_surfaces[neighbor_idx];

        if !surface.is_similar_to(&neighbor_surface, &params.thresholds) {
            continue;
        }

        let mut neighbor = prev_reservoirs.get(neighbor_idx);

        neighbor.clamp_m(params.max_age as f32);

        resampling::merge(
            &mut out,
            &mut inputs,
            &mut wnoise,
            &neighbor,
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

    out.write(curr_reservoirs, curr_samples, layout, idx);
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const LAYOUT: ReservoirLayout = ReservoirLayout::Full;

    fn params(spatial_samples: u32, boost_samples: u32) -> ResamplingPassParams {
        ResamplingPassParams {
            width: 3,
            height: 1,
            seed: 7,
            max_age: 20,
            spatial_samples,
            boost_samples,
            radius: 1.0,
            geometry_band: 0.0,
            thresholds: SimilarityThresholds {
                depth: 0.1,
                normal: 0.6,
                material: 0.2,
                use_material: 0,
            },
            bias_correction: BiasCorrection::Basic.to_u32(),
            layout: LAYOUT.to_u32(),
        }
    }

    fn surface(depth: f32) -> SurfaceInfo {
        SurfaceInfo::new(Vec3::ZERO, depth, Vec3::Y, Vec3::ONE, 1.0)
    }

    fn light() -> LightSample {
        LightSample::point(vec3(0.0, 1.0, 0.0), Vec3::ONE)
    }

    fn write(ms: &[f32]) -> (Vec<u32>, Vec<LightSample>) {
        let mut words = vec![0; ms.len() * LAYOUT.words()];
        let mut samples = vec![LightSample::default(); ms.len()];

        for (idx, &m) in ms.iter().enumerate() {
            let res = Reservoir {
                sample: light(),
                sample_id: 0,
                w_sum: 0.0,
                m,
                w: 1.0,
                p_hat: 0.0,
            };

            res.write(&mut words, &mut samples, LAYOUT, idx);
        }

        (words, samples)
    }

    fn run(
        params: &ResamplingPassParams,
        curr_surfaces: &[SurfaceInfo],
        prev_surfaces: &[SurfaceInfo],
        curr_ms: &[f32],
        prev_ms: &[f32],
    ) -> Vec<LightReservoir> {
        let (prev_words, prev_samples) = write(prev_ms);
        let (mut curr_words, mut curr_samples) = write(curr_ms);
        let motion = vec![Vec2::ZERO; curr_ms.len()];

        let prev = ReservoirsView {
            words: &prev_words,
            samples: &prev_samples,
            layout: LAYOUT,
        };

        for x in 0..params.width {
            main(
                uvec2(x, 0),
                params,
                SceneView::new(&[]),
                &[[127, 0], [-127, 0]],
                &motion,
                curr_surfaces,
                prev_surfaces,
                prev,
                &mut curr_words,
                &mut curr_samples,
            );
        }

        (0..curr_ms.len())
            .map(|idx| Reservoir::read(&curr_words, &curr_samples, LAYOUT, idx))
            .collect()
    }

    #[test]
    fn merges_history_and_its_neighborhood() {
        let out = run(
            &params(2, 2),
            &[surface(1.0); 3],
            &[surface(1.0); 3],
            &[1.0; 3],
            &[10.0, 30.0, 5.0],
        );

        // Neighbors come from the previous frame, capped at `max_age`
        assert_eq!(1.0 + 10.0 + 20.0, out[0].m);
        assert_eq!(1.0 + 20.0 + 10.0 + 5.0, out[1].m);
        assert_eq!(1.0 + 5.0 + 20.0, out[2].m);

        let expected = light().target_pdf(&surface(1.0), 0.0);

        for res in out {
            assert_relative_eq!(expected, res.w * res.p_hat, epsilon = 1e-5);
        }
    }

    #[test]
    fn boosts_spatial_reuse_on_disocclusion() {
        // The middle pixel got disoccluded: its history is dissimilar, but
        // the previous frame's neighbors still describe the same surface
        let prev_surfaces = [surface(1.0), surface(4.0), surface(1.0)];

        let with_boost = run(
            &params(0, 2),
            &[surface(1.0); 3],
            &prev_surfaces,
            &[1.0; 3],
            &[3.0; 3],
        );

        assert_eq!(1.0 + 3.0 + 3.0, with_boost[1].m);

        // Pixels with valid history don't visit any neighbors
        assert_eq!(1.0 + 3.0, with_boost[0].m);
        assert_eq!(1.0 + 3.0, with_boost[2].m);

        let without_boost = run(
            &params(0, 0),
            &[surface(1.0); 3],
            &prev_surfaces,
            &[1.0; 3],
            &[3.0; 3],
        );

        assert_eq!(1.0, without_boost[1].m);
    }
}

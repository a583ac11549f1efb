use photon_restir_gpu::prelude::*;

/// Global photons, as seen by candidate generation.
pub struct PhotonCandidates<'a> {
    pub counters: &'a [u32],
    pub aabbs: &'a [PhotonAabb],
    pub data: &'a [PhotonData],

    /// Presampled tiles; when missing, photons are picked uniformly.
    pub presampled: Option<&'a [PresampledPhoton]>,
}

/// Builds the initial reservoir of each pixel out of `light_candidates`
/// samples drawn from the light sampler and `photon_candidates` photons.
///
/// Both strategies feed one streaming reservoir; a candidate coming from a
/// strategy with `n_s` out of `n` draws is weighted by `f / ((n_s / n) * p_s)`,
/// which keeps `w_sum / (m * p_hat)` an unbiased contribution weight.
pub fn main(
    global_id: UVec2,
    params: &CandidatePassParams,
    surfaces: &[SurfaceInfo],
    lights: &[Light],
    light_sampler: LightSamplerView,
    photons: &PhotonCandidates,
    reservoirs: &mut [u32],
    samples: &mut [LightSample],
) {
    let dims = params.dims();

    if global_id.x >= dims.x || global_id.y >= dims.y {
        return;
    }

    let idx = screen_to_idx(global_id, dims);
    let surface = surfaces[idx];
    let mut res = Reservoir::<LightSample>::default();

    if surface.is_valid() {
        let mut wnoise = WhiteNoise::new(params.seed, global_id);

        let photon_count = clamp_photon_count(
            photons.counters[PhotonKind::Global.index()],
            params.photon_capacity,
        );

        let light_candidates = if light_sampler.len() > 0 {
            params.light_candidates
        } else {
            0
        };

        let photon_candidates = if photon_count > 0 {
            params.photon_candidates
        } else {
            0
        };

        let total = (light_candidates + photon_candidates) as f32;

        // ---

        for _ in 0..light_candidates {
            let Some((light_id, light_pmf)) = light_sampler.sample(&mut wnoise)
            else {
                res.update(&mut wnoise, 0, LightSample::default(), 0.0, 0.0);
                continue;
            };

            let (sample, area_pdf) = lights[light_id as usize].sample(&mut wnoise);
            let pdf = (light_candidates as f32 / total) * light_pmf * area_pdf;
            let p_hat = sample.target_pdf(&surface, params.geometry_band);

            res.update(&mut wnoise, light_id, sample, p_hat / pdf, p_hat);
        }

        // ---

        let tile = if photons.presampled.is_some() && params.tile_count > 0 {
            wnoise.sample_index(params.tile_count)
        } else {
            0
        };

        for _ in 0..photon_candidates {
            let (photon_id, photon_pmf) = match photons.presampled {
                Some(tiles) if params.tile_size > 0 => {
                    let entry = tiles[(tile * params.tile_size
                        + wnoise.sample_index(params.tile_size))
                        as usize];

                    (entry.index, entry.pmf)
                }

                _ => (
                    wnoise.sample_index(photon_count),
                    1.0 / photon_count as f32,
                ),
            };

            if photon_pmf <= 0.0 || photon_id >= photon_count {
                res.update(&mut wnoise, 0, LightSample::default(), 0.0, 0.0);
                continue;
            }

            let sample = Photon::read(photons.aabbs, photons.data, photon_id)
                .as_light_sample();

            let pdf = (photon_candidates as f32 / total) * photon_pmf;
            let p_hat = sample.target_pdf(&surface, params.geometry_band);

            res.update(&mut wnoise, photon_id, sample, p_hat / pdf, p_hat);
        }

        res.finalize();
    }

    res.write(reservoirs, samples, params.layout(), idx);
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn params(light_candidates: u32, photon_candidates: u32) -> CandidatePassParams {
        CandidatePassParams {
            width: 1,
            height: 1,
            seed: 0,
            light_candidates,
            photon_candidates,
            photon_capacity: 16,
            use_presampling: 0,
            tile_count: 0,
            tile_size: 0,
            geometry_band: 0.0,
            layout: ReservoirLayout::Full.to_u32(),
        }
    }

    fn surface() -> SurfaceInfo {
        SurfaceInfo::new(Vec3::ZERO, 1.0, Vec3::Y, Vec3::ONE, 1.0)
    }

    fn estimate(
        params: &CandidatePassParams,
        lights: &[Light],
        photons: &PhotonCandidates,
        frames: u32,
    ) -> f32 {
        let distribution =
            build_light_distribution(lights.iter().map(|light| light.power()));

        let mut sum = 0.0;

        for frame in 0..frames {
            let mut reservoirs = [0u32; 4];
            let mut samples = [LightSample::default()];

            main(
                UVec2::ZERO,
                &CandidatePassParams {
                    seed: frame,
                    ..*params
                },
                &[surface()],
                lights,
                LightSamplerView::new(&distribution),
                photons,
                &mut reservoirs,
                &mut samples,
            );

            let res = Reservoir::read(
                &reservoirs,
                &samples,
                ReservoirLayout::Full,
                0,
            );

            sum += res.sample.target_pdf(&surface(), 0.0) * res.w;
        }

        sum / frames as f32
    }

    #[test]
    fn point_light_is_exact() {
        let lights = [Light::point(vec3(0.0, 2.0, 0.0), Vec3::splat(4.0))];

        let photons = PhotonCandidates {
            counters: &[0, 0],
            aabbs: &[],
            data: &[],
            presampled: None,
        };

        let actual = estimate(&params(4, 0), &lights, &photons, 1);

        assert_relative_eq!(actual, 1.0 / PI, epsilon = 1e-5);
    }

    #[test]
    fn mixed_strategies_are_unbiased() {
        let lights = [Light::point(vec3(0.0, 2.0, 0.0), Vec3::splat(4.0))];

        let photons: Vec<_> = (0..4)
            .map(|i| Photon {
                position: vec3(i as f32 * 0.5 - 0.75, 1.0, 0.0),
                radius: 0.1,
                flux: Vec3::splat(1.0 + i as f32),
                direction: -Vec3::Y,
                normal: -Vec3::Y,
            })
            .collect();

        let (aabbs, data): (Vec<_>, Vec<_>) =
            photons.iter().map(|photon| photon.pack()).unzip();

        let expected = 1.0 / PI
            + photons
                .iter()
                .map(|photon| photon.as_light_sample().target_pdf(&surface(), 0.0))
                .sum::<f32>();

        let candidates = PhotonCandidates {
            counters: &[4, 0],
            aabbs: &aabbs,
            data: &data,
            presampled: None,
        };

        let actual = estimate(&params(2, 2), &lights, &candidates, 20_000);

        assert!(
            (actual - expected).abs() / expected < 0.03,
            "actual={actual}, expected={expected}"
        );
    }

    #[test]
    fn invalid_surfaces_get_empty_reservoirs() {
        let lights = [Light::point(vec3(0.0, 2.0, 0.0), Vec3::ONE)];
        let distribution = build_light_distribution([1.0]);
        let mut reservoirs = [7u32; 4];
        let mut samples = [LightSample::default()];

        main(
            UVec2::ZERO,
            &params(4, 0),
            &[SurfaceInfo::default()],
            &lights,
            LightSamplerView::new(&distribution),
            &PhotonCandidates {
                counters: &[0, 0],
                aabbs: &[],
                data: &[],
                presampled: None,
            },
            &mut reservoirs,
            &mut samples,
        );

        let res =
            Reservoir::read(&reservoirs, &samples, ReservoirLayout::Full, 0);

        assert!(res.is_empty());
    }
}

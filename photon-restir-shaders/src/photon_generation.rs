use photon_restir_gpu::prelude::*;

/// Traces one light path per thread and stores photons at diffuse bounces.
///
/// Each photon is stored with probability `store_probability` (its flux is
/// scaled up accordingly); photons arriving through a specular bounce land in
/// the caustic store, the rest in the global one. Global photons carry the
/// flux reflected off their surface, so that they can be used directly as
/// virtual point lights.
pub fn main(
    global_id: UVec2,
    params: &PhotonGenerationPassParams,
    scene: SceneView,
    lights: &[Light],
    light_sampler: LightSamplerView,
    culling_mask: Option<&[u8]>,
    photons: &mut PhotonWriter,
) {
    if global_id.x >= params.grid_width || global_id.y >= params.grid_height {
        return;
    }

    let mut wnoise = WhiteNoise::new(params.seed, global_id);

    let Some((light_id, light_pmf)) = light_sampler.sample(&mut wnoise) else {
        return;
    };

    let (origin, dir, flux) = lights[light_id as usize].emit(&mut wnoise);
    let mut flux = flux / (light_pmf * params.dispatched() as f32);
    let mut ray = Ray::new(origin, dir);
    let mut through_specular = false;
    let mut through_diffuse = false;
    let grid = params.grid();

    for _ in 0..params.max_bounces {
        let Some(hit) = scene.trace(ray, f32::MAX) else {
            break;
        };

        let triangle = scene.triangle(hit.triangle_id);
        let position = ray.at(hit.t);
        let mut normal = triangle.normal();

        if normal.dot(ray.direction()) > 0.0 {
            normal = -normal;
        }

        if wnoise.sample() < triangle.specular {
            let dir = ray.direction();

            flux *= triangle.albedo();
            through_specular = true;

            ray = Ray::new(
                position + normal * RAY_EPSILON,
                dir - 2.0 * dir.dot(normal) * normal,
            );

            continue;
        }

        let kind = if through_specular && !through_diffuse {
            PhotonKind::Caustic
        } else {
            PhotonKind::Global
        };

        let is_stored = params.store_probability > 0.0
            && wnoise.sample() < params.store_probability
            && culling_mask.map_or(true, |mask| grid.is_marked(mask, position));

        if is_stored {
            let stored_flux = match kind {
                PhotonKind::Global => flux * triangle.albedo(),
                PhotonKind::Caustic => flux,
            } / params.store_probability;

            photons.store(
                kind,
                &Photon {
                    position,
                    radius: params.radius[kind.index()],
                    flux: stored_flux,
                    direction: -ray.direction(),
                    normal,
                },
            );
        }

        through_diffuse = true;

        // Russian roulette
        let albedo = triangle.albedo();
        let survival = albedo.max_element().clamp(0.0, 1.0);

        if survival <= 0.0 || wnoise.sample() >= survival {
            break;
        }

        flux *= albedo / survival;

        ray = Ray::new(
            position + normal * RAY_EPSILON,
            wnoise.sample_cosine_hemisphere(normal),
        );
    }
}

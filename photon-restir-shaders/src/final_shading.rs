use photon_restir_gpu::prelude::*;

use crate::resampling::ReservoirsView;

pub struct ShadingOutputs<'a> {
    pub color: &'a mut [Vec4],

    /// Radiance demodulated by the surface's albedo.
    pub diffuse_illumination: Option<&'a mut [Vec4]>,

    pub diffuse_reflectance: Option<&'a mut [Vec4]>,
}

/// Shades each pixel with the sample selected by its resolved reservoir,
/// optionally confirming visibility with one extra ray, and adds the caustic
/// estimate on top.
pub fn main(
    global_id: UVec2,
    params: &ShadingPassParams,
    scene: SceneView,
    surfaces: &[SurfaceInfo],
    reservoirs: ReservoirsView,
    caustics: Option<&[Vec4]>,
    outputs: &mut ShadingOutputs,
) {
    let dims = params.dims();

    if global_id.x >= dims.x || global_id.y >= dims.y {
        return;
    }

    let idx = screen_to_idx(global_id, dims);
    let surface = surfaces[idx];

    let (radiance, albedo) = if surface.is_valid() {
        (shade(params, scene, &surface, reservoirs, idx, caustics), surface.albedo())
    } else {
        (Vec3::ZERO, Vec3::ZERO)
    };

    outputs.color[idx] = radiance.extend(1.0);

    if let Some(diffuse_illumination) = &mut outputs.diffuse_illumination {
        diffuse_illumination[idx] = demodulate(radiance, albedo).extend(1.0);
    }

    if let Some(diffuse_reflectance) = &mut outputs.diffuse_reflectance {
        diffuse_reflectance[idx] = albedo.extend(1.0);
    }
}

fn shade(
    params: &ShadingPassParams,
    scene: SceneView,
    surface: &SurfaceInfo,
    reservoirs: ReservoirsView,
    idx: usize,
    caustics: Option<&[Vec4]>,
) -> Vec3 {
    let res = reservoirs.get(idx);
    let mut radiance = Vec3::ZERO;

    if !res.is_empty() && res.w > 0.0 {
        let is_visible = params.visibility_ray == 0
            || scene.is_visible(
                surface.position() + surface.normal() * RAY_EPSILON,
                res.sample.position(),
            );

        if is_visible {
            radiance +=
                res.sample.contribution(surface, params.geometry_band) * res.w;
        }
    }

    if params.use_caustics != 0 {
        if let Some(caustics) = caustics {
            radiance += caustics[idx].truncate();
        }
    }

    radiance
}

fn demodulate(radiance: Vec3, albedo: Vec3) -> Vec3 {
    Vec3::select(albedo.cmpgt(Vec3::ZERO), radiance / albedo, Vec3::ZERO)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const LAYOUT: ReservoirLayout = ReservoirLayout::Reduced;

    fn params(visibility_ray: bool) -> ShadingPassParams {
        ShadingPassParams {
            width: 2,
            height: 1,
            layout: LAYOUT.to_u32(),
            visibility_ray: visibility_ray as u32,
            use_caustics: 1,
            geometry_band: 0.0,
        }
    }

    struct Output {
        color: Vec<Vec4>,
        illumination: Vec<Vec4>,
        reflectance: Vec<Vec4>,
    }

    fn run(params: &ShadingPassParams, scene: SceneView) -> Output {
        let albedo = vec3(0.5, 0.25, 1.0);

        let surfaces = [
            SurfaceInfo::new(Vec3::ZERO, 1.0, Vec3::Y, albedo, 1.0),
            SurfaceInfo::default(),
        ];

        let res = Reservoir {
            sample: LightSample::point(vec3(0.0, 2.0, 0.0), Vec3::splat(4.0)),
            sample_id: 0,
            w_sum: 0.0,
            m: 10.0,
            w: 2.0,
            p_hat: 0.0,
        };

        let mut words = vec![0; 2 * LAYOUT.words()];
        let mut samples = vec![LightSample::default(); 2];

        res.write(&mut words, &mut samples, LAYOUT, 0);
        res.write(&mut words, &mut samples, LAYOUT, 1);

        let caustics = [vec4(0.1, 0.1, 0.1, 1.0), vec4(5.0, 5.0, 5.0, 1.0)];
        let mut color = vec![Vec4::ZERO; 2];
        let mut illumination = vec![Vec4::ZERO; 2];
        let mut reflectance = vec![Vec4::ZERO; 2];

        let mut outputs = ShadingOutputs {
            color: &mut color,
            diffuse_illumination: Some(&mut illumination),
            diffuse_reflectance: Some(&mut reflectance),
        };

        for x in 0..2 {
            main(
                uvec2(x, 0),
                params,
                scene,
                &surfaces,
                ReservoirsView {
                    words: &words,
                    samples: &samples,
                    layout: LAYOUT,
                },
                Some(&caustics),
                &mut outputs,
            );
        }

        Output {
            color,
            illumination,
            reflectance,
        }
    }

    #[test]
    fn shading() {
        let out = run(&params(true), SceneView::new(&[]));

        // albedo / pi * I / d^2 * W + caustics
        let direct = 1.0 / PI * 4.0 / 4.0 * 2.0;

        assert_relative_eq!(0.5 * direct + 0.1, out.color[0].x, epsilon = 1e-2);
        assert_relative_eq!(0.25 * direct + 0.1, out.color[0].y, epsilon = 1e-2);
        assert_relative_eq!(direct + 0.1, out.color[0].z, epsilon = 1e-2);

        assert_relative_eq!(direct + 0.2, out.illumination[0].x, epsilon = 1e-2);
        assert_relative_eq!(0.5, out.reflectance[0].x, epsilon = 1e-2);

        // Background
        assert_eq!(vec4(0.0, 0.0, 0.0, 1.0), out.color[1]);
        assert_eq!(vec4(0.0, 0.0, 0.0, 1.0), out.illumination[1]);
    }

    #[test]
    fn visibility_ray() {
        let occluder = Triangle::quad(
            vec3(-1.0, 1.0, -1.0),
            vec3(2.0, 0.0, 0.0),
            vec3(0.0, 0.0, 2.0),
            Vec3::ONE,
        );

        let scene = SceneView::new(&occluder);

        let occluded = run(&params(true), scene);

        assert_relative_eq!(0.1, occluded.color[0].x, epsilon = 1e-3);

        let unoccluded = run(&params(false), scene);

        assert!(unoccluded.color[0].x > 0.1);
    }
}

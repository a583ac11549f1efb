use photon_restir_gpu::prelude::*;

/// Inputs the primary surface can be reconstructed from.
pub enum SurfaceInputs<'a> {
    /// Visibility buffer (triangle id + barycentrics) plus the scene.
    VBuffer {
        vbuffer: &'a [[u32; 4]],
        scene: SceneView<'a>,
    },

    /// Explicit world-space position (`w > 0` marks a hit), normal and
    /// albedo; albedo's alpha carries the diffuse probability.
    Simplified {
        positions: &'a [Vec4],
        normals: &'a [Vec4],
        albedos: &'a [Vec4],
    },
}

pub fn main(
    global_id: UVec2,
    params: &SurfacePassParams,
    inputs: &SurfaceInputs,
    surfaces: &mut [SurfaceInfo],
) {
    let dims = params.dims();

    if global_id.x >= dims.x || global_id.y >= dims.y {
        return;
    }

    let idx = screen_to_idx(global_id, dims);

    surfaces[idx] = match inputs {
        SurfaceInputs::VBuffer { vbuffer, scene } => {
            from_vbuffer(params, scene, vbuffer[idx])
        }

        SurfaceInputs::Simplified {
            positions,
            normals,
            albedos,
        } => from_gbuffer(params, positions[idx], normals[idx], albedos[idx]),
    };
}

fn from_vbuffer(
    params: &SurfacePassParams,
    scene: &SceneView,
    texel: [u32; 4],
) -> SurfaceInfo {
    let Some(hit) = TriangleHit::unpack(texel) else {
        return SurfaceInfo::default();
    };

    let triangle = scene.triangle(hit.triangle_id);
    let position = triangle.position_at(hit.u, hit.v);
    let mut normal = triangle.normal();

    if normal.dot(params.camera() - position) < 0.0 {
        normal = -normal;
    }

    SurfaceInfo::new(
        position,
        position.distance(params.camera()),
        normal,
        triangle.albedo(),
        1.0 - triangle.specular,
    )
}

fn from_gbuffer(
    params: &SurfacePassParams,
    position: Vec4,
    normal: Vec4,
    albedo: Vec4,
) -> SurfaceInfo {
    if position.w <= 0.0 {
        return SurfaceInfo::default();
    }

    let position = position.xyz();

    SurfaceInfo::new(
        position,
        position.distance(params.camera()),
        normal.xyz().normalize_or_zero(),
        albedo.xyz(),
        albedo.w,
    )
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn vbuffer_and_simplified_inputs_agree() {
        let triangles = Triangle::quad(
            vec3(-1.0, 0.0, -1.0),
            vec3(0.0, 0.0, 2.0),
            vec3(2.0, 0.0, 0.0),
            Vec3::splat(0.5),
        );

        let scene = SceneView::new(&triangles);
        let camera = vec3(0.0, 2.0, 0.0);
        let ray = Ray::new(camera, vec3(0.1, -1.0, 0.2).normalize());
        let hit = scene.trace(ray, f32::MAX);
        let position = ray.at(hit.unwrap().t);

        let params = SurfacePassParams {
            width: 1,
            height: 1,
            camera: camera.into(),
            use_vbuffer: 1,
        };

        let vbuffer = [TriangleHit::pack(hit)];
        let mut vbuffer_surfaces = [SurfaceInfo::default()];

        main(
            UVec2::ZERO,
            &params,
            &SurfaceInputs::VBuffer {
                vbuffer: &vbuffer,
                scene,
            },
            &mut vbuffer_surfaces,
        );

        let positions = [position.extend(1.0)];
        let normals = [Vec4::Y];
        let albedos = [Vec4::new(0.5, 0.5, 0.5, 1.0)];
        let mut gbuffer_surfaces = [SurfaceInfo::default()];

        main(
            UVec2::ZERO,
            &params,
            &SurfaceInputs::Simplified {
                positions: &positions,
                normals: &normals,
                albedos: &albedos,
            },
            &mut gbuffer_surfaces,
        );

        let [a] = vbuffer_surfaces;
        let [b] = gbuffer_surfaces;

        assert!(a.is_valid() && b.is_valid());
        assert_relative_eq!(a.depth, b.depth, epsilon = 1e-4);
        assert_relative_eq!(a.normal().dot(b.normal()), 1.0, epsilon = 1e-4);
        assert_relative_eq!(a.albedo().x, b.albedo().x, epsilon = 1e-2);
        assert_relative_eq!(a.diffuse_probability, b.diffuse_probability);
    }

    #[test]
    fn misses_produce_invalid_surfaces() {
        let params = SurfacePassParams {
            width: 1,
            height: 1,
            ..Default::default()
        };

        let positions = [Vec4::ZERO];
        let normals = [Vec4::ZERO];
        let albedos = [Vec4::ZERO];
        let mut surfaces = [SurfaceInfo::new(Vec3::ONE, 1.0, Vec3::Y, Vec3::ONE, 1.0)];

        main(
            UVec2::ZERO,
            &params,
            &SurfaceInputs::Simplified {
                positions: &positions,
                normals: &normals,
                albedos: &albedos,
            },
            &mut surfaces,
        );

        assert!(!surfaces[0].is_valid());
    }
}

use photon_restir_gpu::prelude::*;

/// Caustic photons, as seen by the collection kernel.
pub struct CausticPhotons<'a> {
    pub counters: &'a [u32],
    pub aabbs: &'a [PhotonAabb],
    pub data: &'a [PhotonData],
    pub accel: &'a dyn PhotonQuery,
}

/// Estimates the radiance caustic photons reflect off each pixel's surface
/// with a density estimate over photons whose collection sphere contains
/// the surface point.
pub fn main(
    global_id: UVec2,
    params: &CollectionPassParams,
    surfaces: &[SurfaceInfo],
    photons: &CausticPhotons,
    caustics: &mut [Vec4],
) {
    let dims = params.dims();

    if global_id.x >= dims.x || global_id.y >= dims.y {
        return;
    }

    let idx = screen_to_idx(global_id, dims);
    let surface = surfaces[idx];

    if !surface.is_valid() {
        caustics[idx] = Vec4::ZERO;
        return;
    }

    let kind = PhotonKind::Caustic;
    let count =
        clamp_photon_count(photons.counters[kind.index()], params.capacity);

    let point = surface.position();
    let normal = surface.normal();
    let mut flux = Vec3::ZERO;

    photons.accel.query(point, kind.mask(), &mut |instance_id, photon_id| {
        if instance_id as usize != kind.index() || photon_id >= count {
            return;
        }

        let photon = Photon::read(photons.aabbs, photons.data, photon_id);
        let radius2 = photon.radius * photon.radius;

        if radius2 <= 0.0 || photon.position.distance_squared(point) > radius2 {
            return;
        }

        if photon.normal.dot(normal) < params.normal_threshold {
            return;
        }

        flux += photon.flux / (PI * radius2);
    });

    caustics[idx] = (surface.albedo() / PI * flux).extend(1.0);
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    struct BruteForce<'a> {
        aabbs: &'a [PhotonAabb],
    }

    impl PhotonQuery for BruteForce<'_> {
        fn query(&self, point: Vec3, mask: u32, f: &mut dyn FnMut(u32, u32)) {
            if mask & PhotonKind::Caustic.mask() == 0 {
                return;
            }

            for (id, aabb) in self.aabbs.iter().enumerate() {
                if aabb.contains(point) {
                    f(PhotonKind::Caustic.index() as u32, id as u32);
                }
            }
        }
    }

    fn photon(position: Vec3, normal: Vec3, flux: f32) -> Photon {
        Photon {
            position,
            radius: 0.5,
            flux: Vec3::splat(flux),
            direction: Vec3::Y,
            normal,
        }
    }

    fn collect(photons: &[Photon], counter: u32, capacity: u32) -> Vec3 {
        let (aabbs, data): (Vec<_>, Vec<_>) =
            photons.iter().map(Photon::pack).unzip();

        let accel = BruteForce { aabbs: &aabbs };
        let surfaces = [SurfaceInfo::new(Vec3::ZERO, 1.0, Vec3::Y, Vec3::ONE, 1.0)];
        let mut caustics = [Vec4::ZERO];

        let params = CollectionPassParams {
            width: 1,
            height: 1,
            capacity,
            normal_threshold: 0.9,
        };

        main(
            UVec2::ZERO,
            &params,
            &surfaces,
            &CausticPhotons {
                counters: &[0, counter],
                aabbs: &aabbs,
                data: &data,
                accel: &accel,
            },
            &mut caustics,
        );

        caustics[0].truncate()
    }

    #[test]
    fn density_estimate() {
        let photons = [
            photon(vec3(0.1, 0.0, 0.0), Vec3::Y, 2.0),
            photon(vec3(0.0, 0.0, 0.3), Vec3::Y, 1.0),
            // Outside of the collection sphere, but inside its box
            photon(vec3(0.4, 0.0, 0.4), Vec3::Y, 100.0),
            // Opposite side of a thin wall
            photon(vec3(0.0, 0.0, 0.1), -Vec3::Y, 100.0),
            // Far away
            photon(vec3(5.0, 0.0, 0.0), Vec3::Y, 100.0),
        ];

        let actual = collect(&photons, 5, 5);
        let expected = 3.0 / (PI * 0.25) / PI;

        assert_relative_eq!(expected, actual.x, epsilon = 1e-4);
        assert_eq!(actual.x, actual.y);
        assert_eq!(actual.x, actual.z);
    }

    #[test]
    fn clamps_to_capacity() {
        let photons = [
            photon(vec3(0.1, 0.0, 0.0), Vec3::Y, 2.0),
            photon(vec3(0.0, 0.0, 0.3), Vec3::Y, 1.0),
        ];

        // Counter overflown past capacity: only the first photon counts
        let actual = collect(&photons, 10, 1);
        let expected = 2.0 / (PI * 0.25) / PI;

        assert_relative_eq!(expected, actual.x, epsilon = 1e-4);
        assert_eq!(actual.x, actual.y);
        assert_eq!(actual.x, actual.z);

        assert_eq!(Vec3::ZERO, collect(&photons, 0, 2));
    }
}

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::{LightSample, Normal, PHOTON_KINDS};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhotonKind {
    /// Photon stored after diffuse-only bounces; acts as a virtual point
    /// light during candidate generation.
    Global,

    /// Photon stored after at least one specular bounce; gathered directly
    /// through the acceleration structure.
    Caustic,
}

impl PhotonKind {
    pub const ALL: [Self; PHOTON_KINDS] = [Self::Global, Self::Caustic];

    pub fn index(self) -> usize {
        match self {
            PhotonKind::Global => 0,
            PhotonKind::Caustic => 1,
        }
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    /// Instance mask of this kind's bottom-level structure.
    pub fn mask(self) -> u32 {
        instance_mask(self.index(), PHOTON_KINDS)
    }
}

/// Returns the instance mask assigned to the `idx`-th bottom-level structure
/// out of `count`; up to 8 structures get a distinct bit, past that all of
/// them share the full mask.
pub fn instance_mask(idx: usize, count: usize) -> u32 {
    if count < 8 {
        1 << idx
    } else {
        0xff
    }
}

/// Number of photons downstream consumers may read, given the (possibly
/// overflown) counter value and the buffer's capacity.
pub fn clamp_photon_count(counter: u32, capacity: u32) -> u32 {
    counter.min(capacity)
}

/// Bounding box of a single photon's collection radius, laid out as the
/// procedural-primitive records consumed by acceleration-structure builds.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PhotonAabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl PhotonAabb {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            min: (center - radius).into(),
            max: (center + radius).into(),
        }
    }

    pub fn center(&self) -> Vec3 {
        (Vec3::from(self.min) + Vec3::from(self.max)) * 0.5
    }

    pub fn radius(&self) -> f32 {
        (self.max[0] - self.min[0]) * 0.5
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(Vec3::from(self.min)).all()
            && point.cmple(Vec3::from(self.max)).all()
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PhotonData {
    pub flux: [f32; 3],
    pub direction: u32,
    pub normal: u32,
    pub _padding: [u32; 3],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Photon {
    pub position: Vec3,
    pub radius: f32,
    pub flux: Vec3,

    /// Direction the photon arrived from (pointing away from the surface).
    pub direction: Vec3,

    pub normal: Vec3,
}

impl Photon {
    pub fn read(aabbs: &[PhotonAabb], data: &[PhotonData], idx: u32) -> Self {
        let aabb = aabbs[idx as usize];
        let data = data[idx as usize];

        Self {
            position: aabb.center(),
            radius: aabb.radius(),
            flux: Vec3::from(data.flux),
            direction: Normal::unpack(data.direction),
            normal: Normal::unpack(data.normal),
        }
    }

    pub fn pack(&self) -> (PhotonAabb, PhotonData) {
        (
            PhotonAabb::new(self.position, self.radius),
            PhotonData {
                flux: self.flux.into(),
                direction: Normal::pack(self.direction),
                normal: Normal::pack(self.normal),
                _padding: Default::default(),
            },
        )
    }

    pub fn as_light_sample(&self) -> LightSample {
        LightSample::photon(self.position, self.normal, self.flux)
    }
}

/// Spatial index over stored photons, as exposed to collection kernels.
pub trait PhotonQuery {
    /// Invokes `f(instance_id, primitive_id)` for every photon whose bounding
    /// box contains `point`, restricted to instances matching `mask`.
    fn query(&self, point: Vec3, mask: u32, f: &mut dyn FnMut(u32, u32));
}

/// Write side of the photon store, as seen by the generation kernel.
///
/// `counters` holds one counter per kind; a counter keeps growing past the
/// capacity, photons that don't fit are dropped.
pub struct PhotonWriter<'a> {
    pub counters: &'a mut [u32],
    pub aabbs: [&'a mut [PhotonAabb]; PHOTON_KINDS],
    pub data: [&'a mut [PhotonData]; PHOTON_KINDS],
    pub capacities: [u32; PHOTON_KINDS],
}

impl PhotonWriter<'_> {
    /// Reserves a slot and stores the photon there; returns whether the
    /// photon fit into the buffer.
    pub fn store(&mut self, kind: PhotonKind, photon: &Photon) -> bool {
        let kind = kind.index();
        let slot = self.counters[kind];

        self.counters[kind] = slot.wrapping_add(1);

        if slot >= self.capacities[kind] {
            return false;
        }

        let (aabb, data) = photon.pack();

        self.aabbs[kind][slot as usize] = aabb;
        self.data[kind][slot as usize] = data;

        true
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec3;

    use super::*;

    #[test]
    fn aabb_layout() {
        assert_eq!(24, std::mem::size_of::<PhotonAabb>());
        assert_eq!(32, std::mem::size_of::<PhotonData>());

        let aabb = PhotonAabb::new(vec3(1.0, 2.0, 3.0), 0.5);

        assert_eq!(vec3(1.0, 2.0, 3.0), aabb.center());
        assert_relative_eq!(aabb.radius(), 0.5);
        assert!(aabb.contains(vec3(1.4, 2.0, 2.6)));
        assert!(!aabb.contains(vec3(1.6, 2.0, 3.0)));
    }

    #[test]
    fn clamp() {
        for counter in [0, 1, 99, 100] {
            assert_eq!(counter, clamp_photon_count(counter, 100));
        }

        assert_eq!(100, clamp_photon_count(101, 100));
        assert_eq!(100, clamp_photon_count(u32::MAX, 100));
    }

    #[test]
    fn instance_masks() {
        assert_eq!(1, PhotonKind::Global.mask());
        assert_eq!(2, PhotonKind::Caustic.mask());
        assert_eq!(1 << 6, instance_mask(6, 7));
        assert_eq!(0xff, instance_mask(3, 8));
    }

    #[test]
    fn writer_drops_overflowing_photons() {
        let mut counters = [0u32; 2];
        let mut global_aabbs = [PhotonAabb::default(); 2];
        let mut caustic_aabbs = [PhotonAabb::default(); 1];
        let mut global_data = [PhotonData::default(); 2];
        let mut caustic_data = [PhotonData::default(); 1];

        let mut writer = PhotonWriter {
            counters: &mut counters,
            aabbs: [&mut global_aabbs, &mut caustic_aabbs],
            data: [&mut global_data, &mut caustic_data],
            capacities: [2, 1],
        };

        let photon = Photon {
            position: vec3(0.0, 1.0, 0.0),
            radius: 0.1,
            flux: Vec3::ONE,
            direction: Vec3::Y,
            normal: Vec3::Y,
        };

        assert!(writer.store(PhotonKind::Global, &photon));
        assert!(writer.store(PhotonKind::Global, &photon));
        assert!(!writer.store(PhotonKind::Global, &photon));
        assert!(writer.store(PhotonKind::Caustic, &photon));
        assert!(!writer.store(PhotonKind::Caustic, &photon));

        assert_eq!([3, 2], counters);

        let actual = Photon::read(&global_aabbs, &global_data, 1);

        assert_relative_eq!(actual.position.y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(actual.normal.y, 1.0, epsilon = 1e-4);
    }
}

use glam::Vec3;
use photon_restir_gpu::{PhotonAabb, PhotonQuery};

use crate::AccelSizes;

/// Acceleration structure of the software device; bottom levels keep a copy
/// of their AABBs, top levels a snapshot of their instances.
#[derive(Debug)]
pub struct Accel {
    pub size: u64,
    pub data: AccelData,
}

#[derive(Debug)]
pub enum AccelData {
    Empty,
    Bottom(Vec<PhotonAabb>),
    Top(TopLevel),
}

#[derive(Debug, Default)]
pub struct TopLevel {
    instances: Vec<Instance>,
}

#[derive(Debug)]
struct Instance {
    id: u32,
    mask: u32,
    aabbs: Vec<PhotonAabb>,
}

impl TopLevel {
    pub fn push(&mut self, id: u32, mask: u32, aabbs: Vec<PhotonAabb>) {
        self.instances.push(Instance { id, mask, aabbs });
    }
}

impl PhotonQuery for TopLevel {
    fn query(&self, point: Vec3, mask: u32, f: &mut dyn FnMut(u32, u32)) {
        for instance in &self.instances {
            if instance.mask & mask == 0 {
                continue;
            }

            for (primitive_id, aabb) in instance.aabbs.iter().enumerate() {
                if aabb.contains(point) {
                    f(instance.id, primitive_id as u32);
                }
            }
        }
    }
}

pub const ALIGNMENT: u64 = 256;

pub fn bottom_sizes(primitives: u32) -> AccelSizes {
    AccelSizes {
        result: 64 + 32 * primitives as u64,
        scratch: 256 + 16 * primitives as u64,
    }
}

pub fn top_sizes(instances: u32) -> AccelSizes {
    AccelSizes {
        result: 64 + 64 * instances as u64,
        scratch: 256 + 16 * instances as u64,
    }
}

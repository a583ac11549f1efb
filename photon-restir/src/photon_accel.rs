use std::mem;

use log::debug;
use photon_restir_gpu::{
    clamp_photon_count, instance_mask, PhotonAabb, PhotonKind, PHOTON_KINDS,
};

use crate::{
    AccelId, AccelInstance, AccelLevel, BottomAccelBuild, Device, Error,
    PhotonBuffers, Result, StorageBuffer, TopAccelBuild,
};

/// Two-level acceleration structure over stored photons: one bottom-level
/// structure per photon kind (over the kind's AABB buffer) and a top-level
/// structure instancing all of them.
///
/// Photons are regenerated every frame, so both levels are rebuilt from
/// scratch every frame instead of being updated.
#[derive(Debug)]
pub struct PhotonAccel {
    blas: [AccelId; PHOTON_KINDS],
    tlas: AccelId,
    scratch: StorageBuffer,
    instances: [AccelInstance; PHOTON_KINDS],
    capacities: [u32; PHOTON_KINDS],
}

impl PhotonAccel {
    pub fn new(
        device: &mut dyn Device,
        capacities: [u32; PHOTON_KINDS],
    ) -> Result<Self> {
        if !device.features().ray_tracing {
            return Err(Error::RayTracingUnsupported);
        }

        let alignment = device.acceleration_alignment().max(1);
        let mut scratch_size = 0;
        let mut blas = Vec::with_capacity(PHOTON_KINDS);

        for kind in PhotonKind::ALL {
            let sizes = device.acceleration_prebuild_info(AccelLevel::Bottom {
                primitives: capacities[kind.index()],
            });

            let result_size = align(sizes.result, alignment);

            scratch_size = scratch_size.max(align(sizes.scratch, alignment));

            debug!(
                "Allocating photon BLAS; kind={:?}, capacity={}, size={}",
                kind,
                capacities[kind.index()],
                result_size
            );

            blas.push(device.create_acceleration(
                &format!("photon_blas_{}", kind.index()),
                result_size,
            )?);
        }

        let blas = [blas[0], blas[1]];

        let instances = PhotonKind::ALL.map(|kind| AccelInstance {
            blas: blas[kind.index()],
            instance_id: kind.index() as u32,
            mask: instance_mask(kind.index(), PHOTON_KINDS),
        });

        let sizes = device.acceleration_prebuild_info(AccelLevel::Top {
            instances: PHOTON_KINDS as u32,
        });

        scratch_size = scratch_size.max(align(sizes.scratch, alignment));

        let tlas = device
            .create_acceleration("photon_tlas", align(sizes.result, alignment))?;

        // All builds run one after another, so they can share one scratch
        // buffer
        let scratch = StorageBuffer::new(device, "photon_accel_scratch", scratch_size)?;

        Ok(Self {
            blas,
            tlas,
            scratch,
            instances,
            capacities,
        })
    }

    pub fn tlas(&self) -> AccelId {
        self.tlas
    }

    /// Rebuilds both levels; `counts` is the number of photons to include
    /// per kind (see [`build_count()`]).
    pub fn build(
        &self,
        device: &mut dyn Device,
        buffers: &PhotonBuffers,
        counts: [u32; PHOTON_KINDS],
    ) -> Result<()> {
        if !device.features().ray_tracing {
            return Err(Error::RayTracingUnsupported);
        }

        for kind in PhotonKind::ALL {
            device.build_bottom_acceleration(&BottomAccelBuild {
                dst: self.blas[kind.index()],
                aabbs: buffers.aabbs(kind).id(),
                stride: mem::size_of::<PhotonAabb>() as u64,
                count: counts[kind.index()].min(self.capacities[kind.index()]),
                scratch: self.scratch.id(),
            })?;

            device.barrier();
        }

        device.build_top_acceleration(&TopAccelBuild {
            dst: self.tlas,
            instances: &self.instances,
            scratch: self.scratch.id(),
        })
    }

    pub fn destroy(self, device: &mut dyn Device) {
        for blas in self.blas {
            device.destroy_acceleration(blas);
        }

        device.destroy_acceleration(self.tlas);
        self.scratch.destroy(device);
    }
}

/// Number of photons of one kind to include in this frame's build.
///
/// The exact count of this frame isn't known on the host, so the build uses
/// last frame's count times `overestimate` (clamped to the capacity); the
/// very first frame, lacking any feedback, builds over the whole buffer.
pub fn build_count(
    is_first_frame: bool,
    last_count: u32,
    capacity: u32,
    overestimate: f32,
) -> u32 {
    if is_first_frame {
        capacity
    } else {
        let estimate = (last_count as f64 * overestimate.max(1.0) as f64).ceil();

        clamp_photon_count(estimate.min(u32::MAX as f64) as u32, capacity)
    }
}

fn align(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

use log::debug;
use photon_restir_gpu::PHOTON_KINDS;

use crate::{Device, Result, Slot, StorageBuffer};

const SIZE: u64 = (PHOTON_KINDS * 4) as u64;

/// Host-side view of the photon counters.
///
/// Every frame copies the device counters into one of two staging buffers;
/// the next frame reads that copy back, so the displayed counts lag one frame
/// behind but reading them never waits for the current frame's work.
#[derive(Debug)]
pub struct PhotonCounter {
    staging: [StorageBuffer; 2],
    pending: [bool; 2],
    latest: Option<Slot>,
    counts: [u32; PHOTON_KINDS],
}

impl PhotonCounter {
    pub fn new(device: &mut dyn Device) -> Result<Self> {
        Ok(Self {
            staging: [
                StorageBuffer::staging(device, "photon_counter_staging_a", SIZE)?,
                StorageBuffer::staging(device, "photon_counter_staging_b", SIZE)?,
            ],
            pending: [false; 2],
            latest: None,
            counts: [0; PHOTON_KINDS],
        })
    }

    /// Records a copy of the device counters into the staging buffer that
    /// isn't holding the most recent copy.
    ///
    /// Staging slots alternate on their own, independently of the frame
    /// parity, which restarts whenever history gets reset.
    pub fn copy(
        &mut self,
        device: &mut dyn Device,
        counters: &StorageBuffer,
    ) -> Result<Slot> {
        let slot = self.latest.map_or(Slot::A, Slot::other);

        device.copy_buffer(counters.id(), self.staging[slot.index()].id(), SIZE)?;

        self.pending[slot.index()] = true;
        self.latest = Some(slot);

        Ok(slot)
    }

    /// Reads back the most recent copy; returns the last known counts if it
    /// has been read already.
    ///
    /// Called before the current frame's [`PhotonCounter::copy()`], this
    /// yields the previous frame's counts without waiting for the device.
    pub fn read(
        &mut self,
        device: &mut dyn Device,
    ) -> Result<[u32; PHOTON_KINDS]> {
        let Some(slot) = self.latest else {
            return Ok(self.counts);
        };

        if self.pending[slot.index()] {
            let mut bytes = [0u8; SIZE as usize];

            device.read_buffer(self.staging[slot.index()].id(), &mut bytes)?;

            self.counts = bytemuck::cast(bytes);
            self.pending[slot.index()] = false;

            debug!("Photon counters: {:?}", self.counts);
        }

        Ok(self.counts)
    }

    /// Reads back the copy recorded by the current frame, waiting for the
    /// frame to finish.
    pub fn force_flush(
        &mut self,
        device: &mut dyn Device,
    ) -> Result<[u32; PHOTON_KINDS]> {
        self.read(device)
    }

    /// Forgets all copies, e.g. after photon buffers have been reallocated.
    pub fn reset(&mut self) {
        self.pending = [false; 2];
        self.latest = None;
        self.counts = [0; PHOTON_KINDS];
    }

    pub fn counts(&self) -> [u32; PHOTON_KINDS] {
        self.counts
    }

    pub fn destroy(self, device: &mut dyn Device) {
        for staging in self.staging {
            staging.destroy(device);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SoftwareDevice;

    fn counters(device: &mut SoftwareDevice, counts: [u32; 2]) -> StorageBuffer {
        let counters = StorageBuffer::new(device, "counters", SIZE).unwrap();

        device
            .write_buffer(counters.id(), 0, bytemuck::cast_slice(&counts))
            .unwrap();

        counters
    }

    #[test]
    fn delayed_read() {
        let mut device = SoftwareDevice::new();
        let mut target = PhotonCounter::new(&mut device).unwrap();

        let a = counters(&mut device, [10, 1]);
        let b = counters(&mut device, [20, 2]);

        // Nothing has been copied yet
        assert_eq!([0, 0], target.read(&mut device).unwrap());

        assert_eq!(Slot::A, target.copy(&mut device, &a).unwrap());
        assert_eq!([10, 1], target.read(&mut device).unwrap());

        assert_eq!(Slot::B, target.copy(&mut device, &b).unwrap());
        assert_eq!([20, 2], target.read(&mut device).unwrap());

        // Already consumed, so the last known counts are returned
        device
            .write_buffer(target.staging[1].id(), 0, &[0; SIZE as usize])
            .unwrap();

        assert_eq!([20, 2], target.read(&mut device).unwrap());

        assert_eq!(Slot::A, target.copy(&mut device, &a).unwrap());
        assert_eq!([10, 1], target.force_flush(&mut device).unwrap());

        target.reset();

        assert_eq!([0, 0], target.force_flush(&mut device).unwrap());
        assert_eq!(Slot::A, target.copy(&mut device, &b).unwrap());
    }
}

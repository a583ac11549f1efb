use log::info;

use crate::{BufferDesc, BufferId, Device, Result};

/// Buffer living on the device.
#[derive(Debug)]
pub struct StorageBuffer {
    id: BufferId,
    size: u64,
}

impl StorageBuffer {
    pub fn new(
        device: &mut dyn Device,
        label: impl AsRef<str>,
        size: u64,
    ) -> Result<Self> {
        let label = label.as_ref();
        let size = pad_size(size);

        info!("Allocating storage buffer `{label}`; size={size}");

        Self::create(
            device,
            label,
            size,
            wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
        )
    }

    /// Creates a host-readable buffer, used as a copy destination for
    /// readbacks.
    pub fn staging(
        device: &mut dyn Device,
        label: impl AsRef<str>,
        size: u64,
    ) -> Result<Self> {
        let label = label.as_ref();
        let size = pad_size(size);

        info!("Allocating staging buffer `{label}`; size={size}");

        Self::create(
            device,
            label,
            size,
            wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        )
    }

    fn create(
        device: &mut dyn Device,
        label: &str,
        size: u64,
        usage: wgpu::BufferUsages,
    ) -> Result<Self> {
        let id = device.create_buffer(&BufferDesc { label, size, usage })?;

        Ok(Self { id, size })
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn destroy(self, device: &mut dyn Device) {
        device.destroy_buffer(self.id);
    }
}

/// Pads the size to a multiple of 16 bytes (and at least 16 bytes), so that
/// every buffer can be bound as an array of 16-byte records.
pub fn pad_size(size: u64) -> u64 {
    size.max(1).div_ceil(16) * 16
}

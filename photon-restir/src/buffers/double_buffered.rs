use glam::UVec2;

use crate::{Device, Result, Slot, StorageBuffer, Texture};

/// Two copies of the same resource, indexed by [`Slot`].
#[derive(Debug)]
pub struct DoubleBuffered<T> {
    a: T,
    b: T,
}

impl DoubleBuffered<Texture> {
    /// Creates a double-buffered texture.
    ///
    /// See: [`Texture::new()`].
    pub fn texture(
        device: &mut dyn Device,
        label: impl AsRef<str>,
        size: UVec2,
        format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let label = label.as_ref();

        Ok(Self {
            a: Texture::new(device, format!("{}_a", label), size, format)?,
            b: Texture::new(device, format!("{}_b", label), size, format)?,
        })
    }

    pub fn destroy(self, device: &mut dyn Device) {
        self.a.destroy(device);
        self.b.destroy(device);
    }
}

impl DoubleBuffered<StorageBuffer> {
    /// Creates a double-buffered storage buffer.
    ///
    /// See: [`StorageBuffer::new()`].
    pub fn storage(
        device: &mut dyn Device,
        label: impl AsRef<str>,
        size: u64,
    ) -> Result<Self> {
        let label = label.as_ref();

        Ok(Self {
            a: StorageBuffer::new(device, format!("{}_a", label), size)?,
            b: StorageBuffer::new(device, format!("{}_b", label), size)?,
        })
    }

    pub fn destroy(self, device: &mut dyn Device) {
        self.a.destroy(device);
        self.b.destroy(device);
    }
}

impl<T> DoubleBuffered<T> {
    pub fn get(&self, slot: Slot) -> &T {
        match slot {
            Slot::A => &self.a,
            Slot::B => &self.b,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        [&self.a, &self.b].into_iter()
    }
}

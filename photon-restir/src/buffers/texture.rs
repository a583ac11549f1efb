use glam::UVec2;
use log::info;

use crate::{Device, Result, TextureDesc, TextureId};

#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    size: UVec2,
    format: wgpu::TextureFormat,
}

impl Texture {
    pub fn new(
        device: &mut dyn Device,
        label: impl AsRef<str>,
        size: UVec2,
        format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let label = label.as_ref();
        let size = size.max(UVec2::ONE);

        info!("Allocating texture `{label}`; size={size:?}, format={format:?}");

        let id = device.create_texture(&TextureDesc {
            label,
            size,
            format,
        })?;

        Ok(Self { id, size, format })
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn destroy(self, device: &mut dyn Device) {
        device.destroy_texture(self.id);
    }
}

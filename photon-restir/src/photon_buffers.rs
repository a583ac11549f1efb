use std::mem;

use glam::uvec2;
use log::debug;
use photon_restir_gpu::{
    PdfTextureSize, PhotonAabb, PhotonData, PhotonKind, PresampledPhoton,
    PHOTON_KINDS,
};

use crate::{Device, PresamplingConfig, Result, StorageBuffer, Texture};

/// Photon storage: AABB and payload buffers of each photon kind, their
/// counters and the auxiliary buffers used by culling and presampling.
#[derive(Debug)]
pub struct PhotonBuffers {
    capacities: [u32; PHOTON_KINDS],
    aabbs: [StorageBuffer; PHOTON_KINDS],
    data: [StorageBuffer; PHOTON_KINDS],
    counters: StorageBuffer,
    culling_mask: Option<(u32, Texture)>,
    presampling: Option<Presampling>,
}

#[derive(Debug)]
pub struct Presampling {
    pub size: PdfTextureSize,
    pub tile_count: u32,
    pub tile_size: u32,
    pub pdf: StorageBuffer,
    pub tiles: StorageBuffer,
}

impl PhotonBuffers {
    pub fn new(
        device: &mut dyn Device,
        capacities: [u32; PHOTON_KINDS],
    ) -> Result<Self> {
        debug!("Allocating photon buffers; capacities={:?}", capacities);

        let mut alloc = |kind: PhotonKind, label: &str, stride: usize| {
            StorageBuffer::new(
                &mut *device,
                format!("photon_{}_{}", kind_name(kind), label),
                (stride * capacities[kind.index()] as usize) as u64,
            )
        };

        let aabbs = [
            alloc(PhotonKind::Global, "aabbs", mem::size_of::<PhotonAabb>())?,
            alloc(PhotonKind::Caustic, "aabbs", mem::size_of::<PhotonAabb>())?,
        ];

        let data = [
            alloc(PhotonKind::Global, "data", mem::size_of::<PhotonData>())?,
            alloc(PhotonKind::Caustic, "data", mem::size_of::<PhotonData>())?,
        ];

        let counters = StorageBuffer::new(
            device,
            "photon_counters",
            (PHOTON_KINDS * mem::size_of::<u32>()) as u64,
        )?;

        Ok(Self {
            capacities,
            aabbs,
            data,
            counters,
            culling_mask: None,
            presampling: None,
        })
    }

    pub fn capacities(&self) -> [u32; PHOTON_KINDS] {
        self.capacities
    }

    pub fn capacity(&self, kind: PhotonKind) -> u32 {
        self.capacities[kind.index()]
    }

    pub fn aabbs(&self, kind: PhotonKind) -> &StorageBuffer {
        &self.aabbs[kind.index()]
    }

    pub fn data(&self, kind: PhotonKind) -> &StorageBuffer {
        &self.data[kind.index()]
    }

    pub fn counters(&self) -> &StorageBuffer {
        &self.counters
    }

    /// Zeroes the counters ahead of photon generation.
    ///
    /// AABB and payload regions are left as they are: everything past the
    /// counter is ignored by readers.
    pub fn clear(&self, device: &mut dyn Device) -> Result<()> {
        device.clear_buffer(self.counters.id())
    }

    /// Returns the culling mask, (re)allocating it if it's missing or sized
    /// for a different number of hash bits.
    ///
    /// The mask holds one byte per hash-grid cell, laid out in a texture
    /// sized the same way PDF textures are.
    pub fn culling_mask(
        &mut self,
        device: &mut dyn Device,
        hash_bits: u32,
    ) -> Result<&Texture> {
        let mask = match self.culling_mask.take() {
            Some((bits, mask)) if bits == hash_bits => mask,

            stale => {
                if let Some((_, mask)) = stale {
                    mask.destroy(device);
                }

                let size = PdfTextureSize::for_count(1 << hash_bits);

                Texture::new(
                    device,
                    "photon_culling_mask",
                    uvec2(size.width, size.height),
                    wgpu::TextureFormat::R8Uint,
                )?
            }
        };

        Ok(&self.culling_mask.insert((hash_bits, mask)).1)
    }

    /// Returns the culling mask allocated by the last call to
    /// [`Self::culling_mask()`], if any.
    pub fn allocated_culling_mask(&self) -> Option<&Texture> {
        self.culling_mask.as_ref().map(|(_, mask)| mask)
    }

    /// Returns buffers used by photon presampling, (re)allocating them if
    /// they're missing or sized for a different configuration.
    pub fn presampling(
        &mut self,
        device: &mut dyn Device,
        config: &PresamplingConfig,
    ) -> Result<&Presampling> {
        let size = PdfTextureSize::for_count(self.capacity(PhotonKind::Global));

        let presampling = match self.presampling.take() {
            Some(curr)
                if curr.size == size
                    && curr.tile_count == config.tile_count
                    && curr.tile_size == config.tile_size =>
            {
                curr
            }

            stale => {
                if let Some(stale) = stale {
                    stale.pdf.destroy(device);
                    stale.tiles.destroy(device);
                }

                let pdf = StorageBuffer::new(
                    device,
                    "photon_pdf",
                    (size.chain_len() * mem::size_of::<f32>()) as u64,
                )?;

                let tiles = StorageBuffer::new(
                    device,
                    "photon_presampled_tiles",
                    (config.tile_count as usize
                        * config.tile_size as usize
                        * mem::size_of::<PresampledPhoton>())
                        as u64,
                )?;

                Presampling {
                    size,
                    tile_count: config.tile_count,
                    tile_size: config.tile_size,
                    pdf,
                    tiles,
                }
            }
        };

        Ok(self.presampling.insert(presampling))
    }

    pub fn presampled(&self) -> Option<&Presampling> {
        self.presampling.as_ref()
    }

    /// Frees the culling mask; the next [`Self::culling_mask()`] allocates
    /// it again.
    pub fn release_culling_mask(&mut self, device: &mut dyn Device) {
        if let Some((_, mask)) = self.culling_mask.take() {
            debug!("Releasing photon culling mask");
            mask.destroy(device);
        }
    }

    /// Frees the presampling buffers; the next [`Self::presampling()`]
    /// allocates them again.
    pub fn release_presampling(&mut self, device: &mut dyn Device) {
        if let Some(presampling) = self.presampling.take() {
            debug!("Releasing photon presampling buffers");
            presampling.pdf.destroy(device);
            presampling.tiles.destroy(device);
        }
    }

    pub fn destroy(mut self, device: &mut dyn Device) {
        self.release_culling_mask(device);
        self.release_presampling(device);

        for buffer in self.aabbs.into_iter().chain(self.data) {
            buffer.destroy(device);
        }

        self.counters.destroy(device);
    }
}

pub fn kind_name(kind: PhotonKind) -> &'static str {
    match kind {
        PhotonKind::Global => "global",
        PhotonKind::Caustic => "caustic",
    }
}

use std::mem;

use glam::UVec2;
use log::debug;
use photon_restir_gpu::{LightSample, ReservoirLayout, SurfaceInfo};

use crate::{Device, DoubleBuffered, Result, StorageBuffer, Texture, TextureId};

/// Per-pixel resources: double-buffered reservoirs, their samples and
/// surface snapshots, plus the single-buffered caustics and previous-frame
/// view direction.
#[derive(Debug)]
pub struct FrameResources {
    dims: UVec2,
    layout: ReservoirLayout,
    pub reservoirs: DoubleBuffered<StorageBuffer>,
    pub samples: DoubleBuffered<StorageBuffer>,
    pub surfaces: DoubleBuffered<StorageBuffer>,
    pub caustics: Texture,
    prev_view: Option<Texture>,
}

impl FrameResources {
    pub fn new(
        device: &mut dyn Device,
        dims: UVec2,
        layout: ReservoirLayout,
    ) -> Result<Self> {
        debug!("Allocating frame resources; dims={:?}, layout={:?}", dims, layout);

        let pixels = (dims.x as u64) * (dims.y as u64);

        let reservoirs = DoubleBuffered::storage(
            device,
            "reservoirs",
            pixels * (layout.words() * mem::size_of::<u32>()) as u64,
        )?;

        let samples = DoubleBuffered::storage(
            device,
            "reservoir_samples",
            pixels * mem::size_of::<LightSample>() as u64,
        )?;

        let surfaces = DoubleBuffered::storage(
            device,
            "surfaces",
            pixels * mem::size_of::<SurfaceInfo>() as u64,
        )?;

        let caustics = Texture::new(
            device,
            "caustics",
            dims,
            wgpu::TextureFormat::Rgba32Float,
        )?;

        Ok(Self {
            dims,
            layout,
            reservoirs,
            samples,
            surfaces,
            caustics,
            prev_view: None,
        })
    }

    /// Makes sure `resources` match given dimensions and layout,
    /// reallocating them otherwise; returns whether they've been
    /// (re)allocated, in which case no history must be reused.
    pub fn prepare(
        resources: &mut Option<Self>,
        device: &mut dyn Device,
        dims: UVec2,
        layout: ReservoirLayout,
    ) -> Result<bool> {
        if let Some(curr) = resources {
            if curr.dims == dims && curr.layout == layout {
                return Ok(false);
            }
        }

        if let Some(stale) = resources.take() {
            stale.destroy(device);
        }

        *resources = Some(Self::new(device, dims, layout)?);

        Ok(true)
    }

    pub fn dims(&self) -> UVec2 {
        self.dims
    }

    pub fn layout(&self) -> ReservoirLayout {
        self.layout
    }

    /// Returns the texture holding last frame's view directions, allocating
    /// it to match the current view texture.
    pub fn prev_view(
        &mut self,
        device: &mut dyn Device,
        format: wgpu::TextureFormat,
    ) -> Result<TextureId> {
        let prev_view = match self.prev_view.take() {
            Some(curr) if curr.format() == format => curr,

            stale => {
                if let Some(stale) = stale {
                    stale.destroy(device);
                }

                Texture::new(device, "prev_view", self.dims, format)?
            }
        };

        Ok(self.prev_view.insert(prev_view).id())
    }

    pub fn destroy(self, device: &mut dyn Device) {
        self.reservoirs.destroy(device);
        self.samples.destroy(device);
        self.surfaces.destroy(device);
        self.caustics.destroy(device);

        if let Some(prev_view) = self.prev_view {
            prev_view.destroy(device);
        }
    }
}

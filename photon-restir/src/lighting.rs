use std::mem;

use log::debug;
use photon_restir_gpu::{build_light_distribution, LightSamplerEntry};

use crate::{Device, LightSamplerKind, Result, Scene, StorageBuffer};

/// Maintains the light sampler (the distribution lights are picked from by
/// photon generation and candidate generation).
#[derive(Debug, Default)]
pub struct LightingPreparer {
    sampler: Option<StorageBuffer>,
    state: Option<State>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct State {
    generation: u64,
    kind: LightSamplerKind,
    lights: usize,
    emissive: bool,
}

impl LightingPreparer {
    /// Rebuilds the sampler if the scene's lights or the sampler kind have
    /// changed since the last call; returns whether it has been rebuilt.
    pub fn update(
        &mut self,
        device: &mut dyn Device,
        scene: &dyn Scene,
        kind: LightSamplerKind,
    ) -> Result<bool> {
        let lights = scene.lights();

        let state = State {
            generation: scene.lights_generation(),
            kind,
            lights: lights.len(),
            emissive: scene.uses_emissive_lights(),
        };

        if self.sampler.is_some() && self.state == Some(state) {
            return Ok(false);
        }

        debug!(
            "Rebuilding light sampler; lights={}, kind={:?}, emissive={}",
            state.lights, kind, state.emissive
        );

        let entries = build_light_distribution(lights.iter().map(|light| {
            if !state.emissive && !light.is_point() {
                return 0.0;
            }

            match kind {
                LightSamplerKind::Power => light.power(),
                LightSamplerKind::Uniform => 1.0,
            }
        }));

        let size = (entries.len() * mem::size_of::<LightSamplerEntry>()) as u64;

        let sampler = match self.sampler.take() {
            Some(sampler) if sampler.size() >= size => sampler,

            stale => {
                if let Some(stale) = stale {
                    stale.destroy(device);
                }

                StorageBuffer::new(device, "light_sampler", size)?
            }
        };

        device.clear_buffer(sampler.id())?;
        device.write_buffer(sampler.id(), 0, bytemuck::cast_slice(&entries))?;

        self.sampler = Some(sampler);
        self.state = Some(state);

        Ok(true)
    }

    /// Forces the next [`Self::update()`] to rebuild the sampler.
    pub fn invalidate(&mut self) {
        self.state = None;
    }

    pub fn sampler(&self) -> Option<&StorageBuffer> {
        self.sampler.as_ref()
    }

    pub fn destroy(self, device: &mut dyn Device) {
        if let Some(sampler) = self.sampler {
            sampler.destroy(device);
        }
    }
}

use std::collections::BTreeMap;

use fxhash::FxHashMap;
use log::debug;

use crate::{Device, KernelDesc, KernelId, Result};

/// Entry points of all kernels the pipeline dispatches.
pub mod entry_points {
    pub const FILL_SURFACE_INFO: &str = "fill_surface_info";
    pub const PHOTON_CULLING: &str = "photon_culling";
    pub const PHOTON_GENERATION: &str = "photon_generation";
    pub const PHOTON_PDF_BUILD: &str = "photon_pdf_build";
    pub const PHOTON_PDF_REDUCE: &str = "photon_pdf_reduce";
    pub const PHOTON_PRESAMPLING: &str = "photon_presampling";
    pub const CANDIDATE_GENERATION: &str = "candidate_generation";
    pub const CAUSTIC_COLLECTION: &str = "caustic_collection";
    pub const TEMPORAL_RESAMPLING: &str = "temporal_resampling";
    pub const SPATIAL_RESAMPLING: &str = "spatial_resampling";
    pub const SPATIOTEMPORAL_RESAMPLING: &str = "spatiotemporal_resampling";
    pub const FINAL_SHADING: &str = "final_shading";
}

/// Identifies a compiled kernel: entry point plus the defines it has been
/// compiled with.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KernelKey {
    pub entry_point: &'static str,
    pub defines: BTreeMap<String, String>,
}

impl KernelKey {
    pub fn new(entry_point: &'static str) -> Self {
        Self {
            entry_point,
            defines: Default::default(),
        }
    }

    pub fn define(mut self, name: &str, value: impl ToString) -> Self {
        self.defines.insert(name.to_owned(), value.to_string());
        self
    }
}

/// Kernels compiled on demand, keyed by [`KernelKey`].
///
/// Kernels not used during a frame are destroyed at the end of that frame,
/// so switching e.g. resampling modes frees kernels of the mode that's no
/// longer in use.
#[derive(Debug, Default)]
pub struct KernelCache {
    entries: FxHashMap<KernelKey, Entry>,
}

#[derive(Debug)]
struct Entry {
    id: KernelId,
    used: bool,
}

impl KernelCache {
    pub fn get_or_compile(
        &mut self,
        device: &mut dyn Device,
        key: KernelKey,
    ) -> Result<KernelId> {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.used = true;
            return Ok(entry.id);
        }

        debug!(
            "Compiling kernel `{}`; defines={:?}",
            key.entry_point, key.defines
        );

        let id = device.compile(&KernelDesc {
            entry_point: key.entry_point,
            defines: &key.defines,
        })?;

        self.entries.insert(key, Entry { id, used: true });

        Ok(id)
    }

    /// Destroys kernels that haven't been used since the previous call.
    pub fn end_frame(&mut self, device: &mut dyn Device) {
        self.entries.retain(|key, entry| {
            if entry.used {
                entry.used = false;
                true
            } else {
                debug!("Evicting kernel `{}`", key.entry_point);
                device.destroy_kernel(entry.id);
                false
            }
        });
    }

    /// Destroys all kernels.
    pub fn clear(&mut self, device: &mut dyn Device) {
        debug!("Invalidating {} kernel(s)", self.entries.len());

        for (_, entry) in self.entries.drain() {
            device.destroy_kernel(entry.id);
        }
    }

    pub fn contains(&self, key: &KernelKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry points of all cached kernels, sorted.
    pub fn entry_points(&self) -> Vec<&'static str> {
        let mut entry_points: Vec<_> =
            self.entries.keys().map(|key| key.entry_point).collect();

        entry_points.sort_unstable();
        entry_points.dedup();
        entry_points
    }
}

#[cfg(test)]
mod tests {
    use super::entry_points::*;
    use super::*;
    use crate::SoftwareDevice;

    #[test]
    fn compiles_once() {
        let mut device = SoftwareDevice::new();
        let mut cache = KernelCache::default();

        let key = KernelKey::new(TEMPORAL_RESAMPLING).define("BIAS_CORRECTION", 1);
        let a = cache.get_or_compile(&mut device, key.clone()).unwrap();
        let b = cache.get_or_compile(&mut device, key).unwrap();

        assert_eq!(a, b);
        assert_eq!(1, device.compiled_kernels());

        // Different defines yield a different kernel
        let key = KernelKey::new(TEMPORAL_RESAMPLING).define("BIAS_CORRECTION", 2);
        let c = cache.get_or_compile(&mut device, key).unwrap();

        assert_ne!(a, c);
        assert_eq!(2, device.compiled_kernels());
    }

    #[test]
    fn evicts_unused_kernels() {
        let mut device = SoftwareDevice::new();
        let mut cache = KernelCache::default();
        let temporal = KernelKey::new(TEMPORAL_RESAMPLING);
        let spatial = KernelKey::new(SPATIAL_RESAMPLING);

        cache.get_or_compile(&mut device, temporal.clone()).unwrap();
        cache.get_or_compile(&mut device, spatial.clone()).unwrap();
        cache.end_frame(&mut device);

        assert_eq!(2, cache.len());

        // Next frame only uses the spatial kernel
        cache.get_or_compile(&mut device, spatial.clone()).unwrap();
        cache.end_frame(&mut device);

        assert!(!cache.contains(&temporal));
        assert!(cache.contains(&spatial));
        assert_eq!(1, device.live_kernels());

        cache.clear(&mut device);

        assert!(cache.is_empty());
        assert_eq!(0, device.live_kernels());
    }

    #[test]
    fn unknown_entry_point() {
        let mut device = SoftwareDevice::new();
        let mut cache = KernelCache::default();

        let result =
            cache.get_or_compile(&mut device, KernelKey::new("does_not_exist"));

        assert!(matches!(result, Err(crate::Error::Compilation { .. })));
        assert!(cache.is_empty());
    }
}

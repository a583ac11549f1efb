use std::ops::RangeInclusive;

use photon_restir_gpu::{BiasCorrection, PhotonKind, ReservoirLayout};

use crate::{LightSamplerKind, PipelineConfig, ResamplingMode};

/// Immediate-mode widgets the pipeline's settings are edited with.
///
/// Every editing widget returns whether the user has changed the value.
pub trait Widgets {
    fn header(&mut self, label: &str);
    fn text(&mut self, text: &str);
    fn checkbox(&mut self, label: &str, value: &mut bool) -> bool;

    fn slider_u32(
        &mut self,
        label: &str,
        value: &mut u32,
        range: RangeInclusive<u32>,
    ) -> bool;

    fn slider_f32(
        &mut self,
        label: &str,
        value: &mut f32,
        range: RangeInclusive<f32>,
    ) -> bool;

    fn dropdown(&mut self, label: &str, options: &[&str], selected: &mut usize) -> bool;
}

/// Read-only statistics shown next to the settings.
#[derive(Clone, Copy, Debug, Default)]
pub struct UiStats {
    pub frame: u32,
    pub photon_counts: [u32; 2],
    pub dispatched: u32,
}

/// Draws widgets for all settings of `config`; returns whether anything has
/// been changed.
pub fn render_ui(
    config: &mut PipelineConfig,
    stats: &UiStats,
    ui: &mut dyn Widgets,
) -> bool {
    let mut changed = false;

    ui.header("Photons");

    for kind in PhotonKind::ALL {
        let idx = kind.index();
        let count = stats.photon_counts[idx];
        let capacity = config.photons.capacities[idx];

        ui.text(&format!(
            "{:?} photons: {} / {} ({:.1}%)",
            kind,
            count.min(capacity),
            capacity,
            100.0 * count.min(capacity) as f32 / capacity.max(1) as f32,
        ));
    }

    ui.text(&format!("Dispatched paths: {}", stats.dispatched));

    let photons = &mut config.photons;

    changed |= ui.slider_u32("Max bounces", &mut photons.max_bounces, 1..=32);

    changed |= ui.slider_f32(
        "Store probability",
        &mut photons.store_probability,
        0.01..=1.0,
    );

    changed |= ui.slider_u32(
        "Global capacity",
        &mut photons.capacities[PhotonKind::Global.index()],
        1..=4_000_000,
    );

    changed |= ui.slider_u32(
        "Caustic capacity",
        &mut photons.capacities[PhotonKind::Caustic.index()],
        1..=4_000_000,
    );

    changed |= ui.slider_f32(
        "Global radius",
        &mut photons.radii[PhotonKind::Global.index()],
        0.001..=1.0,
    );

    changed |= ui.slider_f32(
        "Caustic radius",
        &mut photons.radii[PhotonKind::Caustic.index()],
        0.001..=1.0,
    );

    changed |= ui.checkbox(
        "Dynamic dispatch",
        &mut photons.dynamic_dispatch.enabled,
    );

    if !photons.dynamic_dispatch.enabled {
        changed |= ui.slider_u32(
            "Dispatched paths",
            &mut photons.dispatched,
            photons.dispatch_y_extent..=photons.dynamic_dispatch.max,
        );
    }

    changed |= ui.checkbox("Photon culling", &mut photons.culling.enabled);

    if photons.culling.enabled {
        changed |= ui.slider_u32(
            "Hash bits",
            &mut photons.culling.hash_bits,
            10..=27,
        );
    }

    let mut sampler = match photons.light_sampler {
        LightSamplerKind::Power => 0,
        LightSamplerKind::Uniform => 1,
    };

    if ui.dropdown("Light sampler", &["Power", "Uniform"], &mut sampler) {
        photons.light_sampler = if sampler == 0 {
            LightSamplerKind::Power
        } else {
            LightSamplerKind::Uniform
        };

        changed = true;
    }

    ui.header("Candidates");

    let candidates = &mut config.candidates;

    changed |= ui.slider_u32(
        "Light candidates",
        &mut candidates.light_candidates,
        0..=64,
    );

    changed |= ui.slider_u32(
        "Photon candidates",
        &mut candidates.photon_candidates,
        0..=64,
    );

    changed |= ui.checkbox("Presampling", &mut candidates.presampling.enabled);

    ui.header("Resampling");

    let resampling = &mut config.resampling;
    let names = ResamplingMode::ALL.map(ResamplingMode::name);

    let mut mode = ResamplingMode::ALL
        .iter()
        .position(|mode| *mode == resampling.mode)
        .unwrap_or_default();

    if ui.dropdown("Mode", &names, &mut mode) {
        if let Some(&next) = ResamplingMode::ALL.get(mode) {
            resampling.mode = next;
            changed = true;
        }
    }

    let mut bias = resampling.bias_correction.to_u32() as usize;

    if ui.dropdown("Bias correction", &["Off", "Basic", "Ray traced"], &mut bias)
    {
        resampling.bias_correction = BiasCorrection::from_u32(bias as u32);
        changed = true;
    }

    let mut layout = resampling.layout.to_u32() as usize;

    if ui.dropdown("Reservoir layout", &["Full", "Reduced"], &mut layout) {
        resampling.layout = ReservoirLayout::from_u32(layout as u32);
        changed = true;
    }

    if resampling.mode.uses_history() {
        changed |= ui.slider_u32("Max age", &mut resampling.max_age, 1..=100);
    }

    if resampling.mode != ResamplingMode::Temporal
        && resampling.mode != ResamplingMode::NoResampling
    {
        changed |= ui.slider_u32(
            "Spatial samples",
            &mut resampling.spatial_samples,
            0..=photon_restir_gpu::MAX_SPATIAL_SAMPLES,
        );

        changed |= ui.slider_u32(
            "Disocclusion boost",
            &mut resampling.boost_samples,
            0..=photon_restir_gpu::MAX_SPATIAL_SAMPLES,
        );

        changed |= ui.slider_f32("Radius", &mut resampling.radius, 0.0..=200.0);
    }

    changed |= ui.slider_f32(
        "Depth threshold",
        &mut resampling.depth_threshold,
        0.0..=1.0,
    );

    changed |= ui.slider_f32(
        "Normal threshold",
        &mut resampling.normal_threshold,
        0.0..=1.0,
    );

    changed |= ui.checkbox(
        "Material threshold",
        &mut resampling.use_material_threshold,
    );

    if resampling.use_material_threshold {
        changed |= ui.slider_f32(
            "Material threshold value",
            &mut resampling.material_threshold,
            0.0..=1.0,
        );
    }

    ui.header("Shading");

    changed |= ui.checkbox("Visibility ray", &mut config.shading.visibility_ray);
    changed |= ui.checkbox("Caustics", &mut config.shading.caustics);

    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Widgets that flip every checkbox labelled `toggle` and pick option
    /// `pick` in every dropdown labelled `choose`.
    #[derive(Default)]
    struct Scripted {
        toggle: &'static str,
        choose: &'static str,
        pick: usize,
        lines: Vec<String>,
    }

    impl Widgets for Scripted {
        fn header(&mut self, label: &str) {
            self.lines.push(format!("# {label}"));
        }

        fn text(&mut self, text: &str) {
            self.lines.push(text.to_owned());
        }

        fn checkbox(&mut self, label: &str, value: &mut bool) -> bool {
            if label == self.toggle {
                *value = !*value;
                true
            } else {
                false
            }
        }

        fn slider_u32(
            &mut self,
            _: &str,
            _: &mut u32,
            _: RangeInclusive<u32>,
        ) -> bool {
            false
        }

        fn slider_f32(
            &mut self,
            _: &str,
            _: &mut f32,
            _: RangeInclusive<f32>,
        ) -> bool {
            false
        }

        fn dropdown(
            &mut self,
            label: &str,
            options: &[&str],
            selected: &mut usize,
        ) -> bool {
            if label == self.choose && self.pick < options.len() {
                *selected = self.pick;
                true
            } else {
                false
            }
        }
    }

    #[test]
    fn untouched() {
        let mut config = PipelineConfig::default();
        let mut ui = Scripted::default();

        assert!(!render_ui(&mut config, &UiStats::default(), &mut ui));
        assert_eq!(PipelineConfig::default(), config);
        assert!(ui.lines.iter().any(|line| line == "# Resampling"));
    }

    #[test]
    fn switches_mode() {
        let mut config = PipelineConfig::default();

        let mut ui = Scripted {
            choose: "Mode",
            pick: 0,
            ..Default::default()
        };

        assert!(render_ui(&mut config, &UiStats::default(), &mut ui));
        assert_eq!(ResamplingMode::Temporal, config.resampling.mode);
    }

    #[test]
    fn toggles_caustics() {
        let mut config = PipelineConfig::default();

        let mut ui = Scripted {
            toggle: "Caustics",
            ..Default::default()
        };

        assert!(render_ui(&mut config, &UiStats::default(), &mut ui));
        assert!(!config.shading.caustics);
    }

    #[test]
    fn shows_counts() {
        let mut config = PipelineConfig::default();
        let mut ui = Scripted::default();

        let stats = UiStats {
            photon_counts: [500_000, 50_000],
            ..Default::default()
        };

        render_ui(&mut config, &stats, &mut ui);

        assert!(ui
            .lines
            .iter()
            .any(|line| line == "Global photons: 400000 / 400000 (100.0%)"));

        assert!(ui
            .lines
            .iter()
            .any(|line| line == "Caustic photons: 50000 / 100000 (50.0%)"));
    }
}

//! Building blocks shared by the temporal, spatial and spatio-temporal
//! resampling kernels.

use photon_restir_gpu::prelude::*;

pub type LightReservoir = Reservoir<LightSample>;

/// Read-only view over a reservoir buffer together with its samples.
#[derive(Clone, Copy)]
pub struct ReservoirsView<'a> {
    pub words: &'a [u32],
    pub samples: &'a [LightSample],
    pub layout: ReservoirLayout,
}

impl ReservoirsView<'_> {
    pub fn get(&self, idx: usize) -> LightReservoir {
        Reservoir::read(self.words, self.samples, self.layout, idx)
    }
}

/// Reservoirs combined so far by a single invocation, remembered for bias
/// correction.
pub struct ResamplingInputs {
    surfaces: [SurfaceInfo; MAX_RESAMPLING_INPUTS],
    ms: [f32; MAX_RESAMPLING_INPUTS],
    len: usize,
}

impl Default for ResamplingInputs {
    fn default() -> Self {
        Self {
            surfaces: [SurfaceInfo::default(); MAX_RESAMPLING_INPUTS],
            ms: [0.0; MAX_RESAMPLING_INPUTS],
            len: 0,
        }
    }
}

impl ResamplingInputs {
    /// Registers an input; the first one is assumed to be the canonical
    /// (current pixel's) reservoir.
    pub fn push(&mut self, surface: SurfaceInfo, m: f32) {
        if self.len < MAX_RESAMPLING_INPUTS {
            self.surfaces[self.len] = surface;
            self.ms[self.len] = m;
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

/// Re-evaluates reservoir's target pdf on given surface and merges it into
/// `out`.
pub fn merge(
    out: &mut LightReservoir,
    inputs: &mut ResamplingInputs,
    wnoise: &mut WhiteNoise,
    rhs: &LightReservoir,
    rhs_surface: SurfaceInfo,
    surface: &SurfaceInfo,
    geometry_band: f32,
) {
    if rhs.is_empty() {
        inputs.push(rhs_surface, 0.0);
        return;
    }

    let p_hat = rhs.sample.target_pdf(surface, geometry_band);

    out.merge(wnoise, rhs, p_hat);
    inputs.push(rhs_surface, rhs.m);
}

/// Computes `out.w` according to the bias correction mode.
pub fn finalize(
    out: &mut LightReservoir,
    inputs: &ResamplingInputs,
    bias_correction: BiasCorrection,
    geometry_band: f32,
    scene: SceneView,
) {
    if out.is_empty() {
        out.w = 0.0;
        return;
    }

    if bias_correction == BiasCorrection::Off {
        out.finalize();
        return;
    }

    let mut z = 0.0;

    for idx in 0..inputs.len {
        let surface = inputs.surfaces[idx];
        let m = inputs.ms[idx];

        if m <= 0.0 || out.sample.target_pdf(&surface, geometry_band) <= 0.0 {
            continue;
        }

        if bias_correction == BiasCorrection::RayTraced
            && idx > 0
            && !scene.is_visible(
                surface.position() + surface.normal() * RAY_EPSILON,
                out.sample.position(),
            )
        {
            continue;
        }

        z += m;
    }

    out.finalize_with(z);
}

/// Picks the `n`-th neighbor around `center`, walking the offset table from a
/// random starting point; returns `None` for off-screen neighbors and for the
/// center itself.
pub fn neighbor(
    center: UVec2,
    dims: UVec2,
    offsets: &[[i8; 2]],
    start: u32,
    n: u32,
    radius: f32,
) -> Option<UVec2> {
    if offsets.is_empty() {
        return None;
    }

    let offset = offsets[(start as usize + n as usize) % offsets.len()];
    let pos = (center.as_vec2() + neighbor_offset(offset, radius)).round();

    if pos.x < 0.0 || pos.y < 0.0 {
        return None;
    }

    let pos = pos.as_uvec2();

    if pos.x >= dims.x || pos.y >= dims.y || pos == center {
        None
    } else {
        Some(pos)
    }
}

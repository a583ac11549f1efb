use crate::WhiteNoise;

/// Weighted reservoir summarizing a stream of candidate samples.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Reservoir<T> {
    pub sample: T,
    pub sample_id: u32,

    /// Running sum of candidate weights; only meaningful while the reservoir
    /// is being built, read-back reservoirs carry just `w`.
    pub w_sum: f32,

    /// Number of candidates this reservoir summarizes.
    pub m: f32,

    /// Unbiased contribution weight of the selected sample.
    pub w: f32,

    /// Target pdf of the selected sample, in the domain it was last
    /// evaluated at.
    pub p_hat: f32,
}

impl<T> Reservoir<T>
where
    T: Clone + Copy,
{
    /// Streams a single candidate with given resampling weight (`f / p`).
    pub fn update(
        &mut self,
        wnoise: &mut WhiteNoise,
        sample_id: u32,
        sample: T,
        weight: f32,
        p_hat: f32,
    ) -> bool {
        self.m += 1.0;
        self.add(wnoise, sample_id, sample, weight, p_hat)
    }

    /// Combines `rhs` into this reservoir; `p_hat` is the target pdf of
    /// `rhs.sample` evaluated in this reservoir's domain.
    pub fn merge(
        &mut self,
        wnoise: &mut WhiteNoise,
        rhs: &Self,
        p_hat: f32,
    ) -> bool {
        if rhs.is_empty() {
            return false;
        }

        self.m += rhs.m;
        self.add(wnoise, rhs.sample_id, rhs.sample, p_hat * rhs.w * rhs.m, p_hat)
    }

    fn add(
        &mut self,
        wnoise: &mut WhiteNoise,
        sample_id: u32,
        sample: T,
        weight: f32,
        p_hat: f32,
    ) -> bool {
        let weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };

        self.w_sum += weight;

        if wnoise.sample() * self.w_sum <= weight && weight > 0.0 {
            self.sample = sample;
            self.sample_id = sample_id;
            self.p_hat = p_hat;
            true
        } else {
            false
        }
    }

    /// Turns the weight sum into the selected sample's contribution weight,
    /// `w_sum / (m * p_hat)`.
    pub fn finalize(&mut self) {
        self.finalize_with(self.m);
    }

    /// Like [`Self::finalize()`], but normalizes by `z` instead of `m`; used
    /// by bias correction, where `z` counts only the candidates whose domain
    /// could have produced the selected sample.
    pub fn finalize_with(&mut self, z: f32) {
        let denom = z * self.p_hat;

        self.w = if denom > 0.0 { self.w_sum / denom } else { 0.0 };
    }

    pub fn clamp_m(&mut self, max: f32) {
        self.m = self.m.min(max);
    }

    pub fn is_empty(&self) -> bool {
        self.m <= 0.0
    }
}

/// Memory layout of reservoirs inside a `u32` buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReservoirLayout {
    /// `[sample_id, w, m, p_hat]`
    #[default]
    Full,

    /// `[sample_id:24 | m:8, w]`; the target pdf is not stored and has to be
    /// re-evaluated after reading.
    ///
    /// Only the reservoir words shrink: the selected
    /// [`LightSample`](crate::LightSample) is still stored in full, in a
    /// separate per-pixel buffer, so the overall saving is 8 bytes per pixel.
    Reduced,
}

impl ReservoirLayout {
    pub const REDUCED_MAX_M: u32 = 255;
    pub const REDUCED_MAX_ID: u32 = (1 << 24) - 1;

    pub fn words(self) -> usize {
        match self {
            ReservoirLayout::Full => 4,
            ReservoirLayout::Reduced => 2,
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            ReservoirLayout::Full => 0,
            ReservoirLayout::Reduced => 1,
        }
    }

    pub fn from_u32(val: u32) -> Self {
        if val == 1 {
            ReservoirLayout::Reduced
        } else {
            ReservoirLayout::Full
        }
    }
}

impl<T> Reservoir<T>
where
    T: Clone + Copy,
{
    pub fn read(
        words: &[u32],
        samples: &[T],
        layout: ReservoirLayout,
        idx: usize,
    ) -> Self {
        let sample = samples[idx];

        match layout {
            ReservoirLayout::Full => {
                let d = &words[4 * idx..4 * idx + 4];

                Self {
                    sample,
                    sample_id: d[0],
                    w_sum: 0.0,
                    m: d[2] as f32,
                    w: f32::from_bits(d[1]),
                    p_hat: f32::from_bits(d[3]),
                }
            }

            ReservoirLayout::Reduced => {
                let d = &words[2 * idx..2 * idx + 2];

                Self {
                    sample,
                    sample_id: d[0] & ReservoirLayout::REDUCED_MAX_ID,
                    w_sum: 0.0,
                    m: (d[0] >> 24) as f32,
                    w: f32::from_bits(d[1]),
                    p_hat: 0.0,
                }
            }
        }
    }

    pub fn write(
        &self,
        words: &mut [u32],
        samples: &mut [T],
        layout: ReservoirLayout,
        idx: usize,
    ) {
        let m = self.m.max(0.0).round() as u32;

        samples[idx] = self.sample;

        match layout {
            ReservoirLayout::Full => {
                words[4 * idx..4 * idx + 4].copy_from_slice(&[
                    self.sample_id,
                    self.w.to_bits(),
                    m,
                    self.p_hat.to_bits(),
                ]);
            }

            ReservoirLayout::Reduced => {
                let m = m.min(ReservoirLayout::REDUCED_MAX_M);
                let id = self.sample_id & ReservoirLayout::REDUCED_MAX_ID;

                words[2 * idx..2 * idx + 2]
                    .copy_from_slice(&[id | (m << 24), self.w.to_bits()]);
            }
        }
    }
}

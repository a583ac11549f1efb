use bytemuck::{Pod, Zeroable};

use crate::WhiteNoise;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LightSamplerEntry {
    pub pmf: f32,

    /// Inclusive cumulative probability up to (and including) this entry.
    pub cdf: f32,
}

/// Builds a discrete light distribution proportional to given weights;
/// falls back to a uniform distribution when all weights are zero.
pub fn build_light_distribution(
    weights: impl IntoIterator<Item = f32>,
) -> Vec<LightSamplerEntry> {
    let weights: Vec<_> = weights.into_iter().map(|w| w.max(0.0)).collect();
    let total: f32 = weights.iter().sum();
    let len = weights.len() as f32;
    let mut cdf = 0.0;

    weights
        .iter()
        .enumerate()
        .map(|(idx, &weight)| {
            let pmf = if total > 0.0 { weight / total } else { 1.0 / len };

            cdf += pmf;

            LightSamplerEntry {
                pmf,
                cdf: if idx + 1 == weights.len() { 1.0 } else { cdf },
            }
        })
        .collect()
}

#[derive(Clone, Copy)]
pub struct LightSamplerView<'a> {
    entries: &'a [LightSamplerEntry],
}

impl<'a> LightSamplerView<'a> {
    pub fn new(entries: &'a [LightSamplerEntry]) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn pmf(&self, light_id: u32) -> f32 {
        self.entries
            .get(light_id as usize)
            .map(|entry| entry.pmf)
            .unwrap_or(0.0)
    }

    /// Picks a light; returns its id and probability.
    pub fn sample(&self, wnoise: &mut WhiteNoise) -> Option<(u32, f32)> {
        if self.entries.is_empty() {
            return None;
        }

        let u = wnoise.sample();

        let idx = self
            .entries
            .partition_point(|entry| entry.cdf <= u)
            .min(self.entries.len() - 1);

        let pmf = self.entries[idx].pmf;

        if pmf > 0.0 {
            Some((idx as u32, pmf))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::uvec2;

    use super::*;

    #[test]
    fn distribution() {
        let entries = build_light_distribution([1.0, 3.0, 0.0, 4.0]);

        assert_relative_eq!(entries[0].pmf, 0.125);
        assert_relative_eq!(entries[1].pmf, 0.375);
        assert_relative_eq!(entries[2].pmf, 0.0);
        assert_relative_eq!(entries[3].pmf, 0.5);
        assert_relative_eq!(entries[3].cdf, 1.0);
    }

    #[test]
    fn uniform_fallback() {
        let entries = build_light_distribution([0.0, 0.0]);

        assert_relative_eq!(entries[0].pmf, 0.5);
        assert_relative_eq!(entries[1].pmf, 0.5);
    }

    #[test]
    fn sampling_follows_pmf() {
        let entries = build_light_distribution([1.0, 3.0, 0.0, 4.0]);
        let sampler = LightSamplerView::new(&entries);
        let mut wnoise = WhiteNoise::new(123, uvec2(4, 5));
        let mut histogram = [0u32; 4];
        let n = 80_000;

        for _ in 0..n {
            let (id, pmf) = sampler.sample(&mut wnoise).unwrap();

            assert_relative_eq!(pmf, sampler.pmf(id));
            histogram[id as usize] += 1;
        }

        assert_eq!(0, histogram[2]);

        for (id, count) in histogram.iter().enumerate() {
            let expected = entries[id].pmf;
            let actual = *count as f32 / n as f32;

            assert!((expected - actual).abs() < 0.01, "id={id}");
        }
    }
}

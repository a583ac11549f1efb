use glam::{uvec2, UVec2};

use crate::WhiteNoise;

/// Dimensions of a power-of-two texture able to hold one texel per item,
/// together with the number of levels in its full mip chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PdfTextureSize {
    pub width: u32,
    pub height: u32,
    pub levels: u32,
}

impl PdfTextureSize {
    pub fn for_count(count: u32) -> Self {
        let width = ((count.max(1) as f32).sqrt().ceil() as u32)
            .max(1)
            .next_power_of_two();

        let height = count.div_ceil(width).max(1).next_power_of_two();

        Self {
            width,
            height,
            levels: width.max(height).ilog2() + 1,
        }
    }

    pub fn texels(&self) -> u32 {
        self.width * self.height
    }

    pub fn level_dims(&self, level: u32) -> UVec2 {
        uvec2((self.width >> level).max(1), (self.height >> level).max(1))
    }

    /// Offset of given level inside a flat buffer holding the whole chain.
    pub fn level_offset(&self, level: u32) -> usize {
        (0..level)
            .map(|level| {
                let dims = self.level_dims(level);

                (dims.x * dims.y) as usize
            })
            .sum()
    }

    pub fn chain_len(&self) -> usize {
        self.level_offset(self.levels)
    }

    /// Sums the (up to) four texels of `level - 1` that map onto `texel` of
    /// `level`.
    pub fn reduce(&self, chain: &[f32], level: u32, texel: UVec2) -> f32 {
        let below = self.level_dims(level - 1);
        let offset = self.level_offset(level - 1);
        let mut sum = 0.0;

        for dy in 0..2 {
            for dx in 0..2 {
                let child = texel * 2 + uvec2(dx, dy);

                if child.x < below.x && child.y < below.y {
                    sum += chain[offset + (child.y * below.x + child.x) as usize];
                }
            }
        }

        sum
    }

    /// Walks the mip chain from its top texel down to level 0, picking each
    /// child proportionally to its value; returns the item's index and its
    /// probability.
    pub fn sample(
        &self,
        chain: &[f32],
        wnoise: &mut WhiteNoise,
    ) -> Option<(u32, f32)> {
        let top = self.levels - 1;
        let total = chain[self.level_offset(top)];

        if total <= 0.0 {
            return None;
        }

        let mut texel = UVec2::ZERO;

        for level in (0..top).rev() {
            let dims = self.level_dims(level);
            let offset = self.level_offset(level);
            let mut children = [(UVec2::ZERO, 0.0f32); 4];
            let mut sum = 0.0;

            for (idx, child) in children.iter_mut().enumerate() {
                let pos = texel * 2 + uvec2(idx as u32 % 2, idx as u32 / 2);

                if pos.x < dims.x && pos.y < dims.y {
                    let value = chain[offset + (pos.y * dims.x + pos.x) as usize];

                    *child = (pos, value);
                    sum += value;
                }
            }

            if sum <= 0.0 {
                return None;
            }

            let mut u = wnoise.sample() * sum;

            texel = children
                .iter()
                .filter(|(_, value)| *value > 0.0)
                .find(|(_, value)| {
                    if u < *value {
                        true
                    } else {
                        u -= value;
                        false
                    }
                })
                .or_else(|| children.iter().rev().find(|(_, value)| *value > 0.0))
                .map(|(pos, _)| *pos)?;
        }

        let value = chain[(texel.y * self.width + texel.x) as usize];

        Some((texel.y * self.width + texel.x, value / total))
    }
}

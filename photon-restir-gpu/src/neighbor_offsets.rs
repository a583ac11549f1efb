use glam::{vec2, Vec2};

/// Generates the neighbor-offset table used by spatial resampling: points of
/// the R2 low-discrepancy sequence that fall inside the unit disk, quantized
/// to signed 8-bit pairs (as stored in an `Rg8Snorm` texture).
pub fn neighbor_offsets(count: usize) -> Vec<[i8; 2]> {
    const RADIUS: f32 = 250.0;
    const PHI2: f32 = 1.0 / 1.324_717_957_244_7;

    let mut offsets = Vec::with_capacity(count);
    let mut u = 0.5f32;
    let mut v = 0.5f32;

    while offsets.len() < count {
        u += PHI2;
        v += PHI2 * PHI2;

        if u >= 1.0 {
            u -= 1.0;
        }

        if v >= 1.0 {
            v -= 1.0;
        }

        let du = u - 0.5;
        let dv = v - 0.5;

        if du * du + dv * dv > 0.25 {
            continue;
        }

        offsets.push([(du * RADIUS) as i8, (dv * RADIUS) as i8]);
    }

    offsets
}

/// Decodes a table entry into a pixel-space offset of at most `radius`.
pub fn neighbor_offset(offset: [i8; 2], radius: f32) -> Vec2 {
    vec2(offset[0] as f32, offset[1] as f32) / 127.0 * radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NEIGHBOR_OFFSET_COUNT;

    #[test]
    fn deterministic() {
        let a = neighbor_offsets(NEIGHBOR_OFFSET_COUNT);
        let b = neighbor_offsets(NEIGHBOR_OFFSET_COUNT);

        assert_eq!(NEIGHBOR_OFFSET_COUNT, a.len());
        assert_eq!(
            bytemuck::cast_slice::<_, u8>(&a),
            bytemuck::cast_slice::<_, u8>(&b)
        );
    }

    #[test]
    fn offsets_stay_inside_disk() {
        for offset in neighbor_offsets(NEIGHBOR_OFFSET_COUNT) {
            let offset = neighbor_offset(offset, 1.0);

            assert!(offset.length() <= 1.0 + 1e-3, "{offset:?}");
        }
    }

    #[test]
    fn offsets_cover_the_disk() {
        let offsets = neighbor_offsets(NEIGHBOR_OFFSET_COUNT);
        let mean = offsets
            .iter()
            .map(|&offset| neighbor_offset(offset, 1.0))
            .sum::<Vec2>()
            / offsets.len() as f32;

        assert!(mean.length() < 0.05, "{mean:?}");

        let quadrants = offsets.iter().fold([0; 4], |mut acc, offset| {
            let idx = (offset[0] >= 0) as usize + 2 * (offset[1] >= 0) as usize;

            acc[idx] += 1;
            acc
        });

        for count in quadrants {
            assert!(count > NEIGHBOR_OFFSET_COUNT / 5);
        }
    }
}

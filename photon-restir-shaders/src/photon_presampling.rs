use photon_restir_gpu::prelude::*;

/// Draws `tile_count * tile_size` photons proportionally to their luminance;
/// thread `(x, y)` writes entry `x` of tile `y`.
pub fn main(
    global_id: UVec2,
    params: &PhotonPdfPassParams,
    chain: &[f32],
    tiles: &mut [PresampledPhoton],
) {
    if global_id.x >= params.tile_size || global_id.y >= params.tile_count {
        return;
    }

    let mut wnoise = WhiteNoise::new(params.seed, global_id);
    let idx = (global_id.y * params.tile_size + global_id.x) as usize;

    tiles[idx] = params
        .size()
        .sample(chain, &mut wnoise)
        .map(|(index, pmf)| PresampledPhoton { index, pmf })
        .unwrap_or_default();
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{photon_pdf_build, photon_pdf_reduce};

    #[test]
    fn presampled_photons_follow_luminance() {
        let fluxes = [1.0, 0.0, 3.0, 4.0, 2.0];
        let data: Vec<_> = fluxes
            .iter()
            .map(|&flux| PhotonData {
                flux: [flux; 3],
                ..Default::default()
            })
            .collect();

        // Counter overflowed past the capacity; only 4 photons are readable
        let counters = [9, 0];
        let size = PdfTextureSize::for_count(4);

        let mut params = PhotonPdfPassParams {
            pdf_width: size.width,
            pdf_height: size.height,
            pdf_levels: size.levels,
            level: 0,
            capacity: 4,
            seed: 5,
            tile_count: 4,
            tile_size: 1024,
        };

        let mut chain = vec![0.0; size.chain_len()];

        for y in 0..size.height {
            for x in 0..size.width {
                photon_pdf_build::main(uvec2(x, y), &params, &counters, &data, &mut chain);
            }
        }

        for level in 1..size.levels {
            params.level = level;

            let dims = size.level_dims(level);

            for y in 0..dims.y {
                for x in 0..dims.x {
                    photon_pdf_reduce::main(uvec2(x, y), &params, &mut chain);
                }
            }
        }

        let mut tiles = vec![PresampledPhoton::default(); 4 * 1024];

        for y in 0..params.tile_count {
            for x in 0..params.tile_size {
                main(uvec2(x, y), &params, &chain, &mut tiles);
            }
        }

        let mut histogram = [0u32; 5];

        for tile in &tiles {
            assert_relative_eq!(tile.pmf, fluxes[tile.index as usize] / 8.0, epsilon = 1e-5);
            histogram[tile.index as usize] += 1;
        }

        assert_eq!(0, histogram[1]);
        assert_eq!(0, histogram[4]);

        let n = tiles.len() as f32;

        assert!((histogram[0] as f32 / n - 0.125).abs() < 0.02);
        assert!((histogram[2] as f32 / n - 0.375).abs() < 0.02);
        assert!((histogram[3] as f32 / n - 0.5).abs() < 0.02);
    }
}

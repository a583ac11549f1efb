use photon_restir_gpu::prelude::*;

/// Computes one texel of `params.level` by summing its children one level
/// below.
pub fn main(global_id: UVec2, params: &PhotonPdfPassParams, chain: &mut [f32]) {
    let size = params.size();

    if params.level == 0 || params.level >= size.levels {
        return;
    }

    let dims = size.level_dims(params.level);

    if global_id.x >= dims.x || global_id.y >= dims.y {
        return;
    }

    let value = size.reduce(chain, params.level, global_id);
    let offset = size.level_offset(params.level);

    chain[offset + (global_id.y * dims.x + global_id.x) as usize] = value;
}

use photon_restir_gpu::prelude::*;

/// Marks hash-grid cells around visible surfaces; photon generation only
/// stores photons that land in marked cells.
pub fn main(
    global_id: UVec2,
    params: &PhotonCullingPassParams,
    surfaces: &[SurfaceInfo],
    mask: &mut [u8],
) {
    let dims = params.dims();

    if global_id.x >= dims.x || global_id.y >= dims.y {
        return;
    }

    let surface = surfaces[screen_to_idx(global_id, dims)];

    if surface.is_valid() {
        params.grid().mark(mask, surface.position(), params.radius);
    }
}

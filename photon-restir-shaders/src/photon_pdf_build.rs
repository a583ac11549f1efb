use photon_restir_gpu::prelude::*;

/// Fills level 0 of the photon PDF chain with global photons' luminance;
/// texels past the photon count are zeroed.
pub fn main(
    global_id: UVec2,
    params: &PhotonPdfPassParams,
    counters: &[u32],
    data: &[PhotonData],
    chain: &mut [f32],
) {
    let size = params.size();

    if global_id.x >= size.width || global_id.y >= size.height {
        return;
    }

    let idx = global_id.y * size.width + global_id.x;
    let count = clamp_photon_count(counters[PhotonKind::Global.index()], params.capacity);

    chain[idx as usize] = if idx < count {
        luminance(Vec3::from(data[idx as usize].flux)).max(0.0)
    } else {
        0.0
    };
}

use glam::{vec2, vec3, vec4, UVec2, Vec2, Vec3, Vec4};

/// Returns the relative luminance of given linear color.
pub fn luminance(rgb: Vec3) -> f32 {
    rgb.dot(vec3(0.2126, 0.7152, 0.0722))
}

pub fn screen_to_idx(pos: UVec2, dims: UVec2) -> usize {
    (pos.y * dims.x + pos.x) as usize
}

pub fn pack_unorm2x16(v: Vec2) -> u32 {
    let v = v.clamp(Vec2::ZERO, Vec2::ONE) * 65535.0;

    ((v.y.round() as u32) << 16) | (v.x.round() as u32)
}

pub fn unpack_unorm2x16(v: u32) -> Vec2 {
    vec2((v & 0xffff) as f32, (v >> 16) as f32) / 65535.0
}

pub fn pack_unorm4x8(v: Vec4) -> u32 {
    let v = v.clamp(Vec4::ZERO, Vec4::ONE) * 255.0;

    (v.x.round() as u32)
        | ((v.y.round() as u32) << 8)
        | ((v.z.round() as u32) << 16)
        | ((v.w.round() as u32) << 24)
}

pub fn unpack_unorm4x8(v: u32) -> Vec4 {
    vec4(
        (v & 0xff) as f32,
        ((v >> 8) & 0xff) as f32,
        ((v >> 16) & 0xff) as f32,
        (v >> 24) as f32,
    ) / 255.0
}

/// Builds an orthonormal basis around given unit vector (Duff et al. 2017).
pub fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let sign = 1.0f32.copysign(n.z);
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;

    (
        vec3(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x),
        vec3(b, sign + n.y * n.y * a, -n.y),
    )
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn unorm4x8() {
        let v = vec4(0.0, 0.25, 0.5, 1.0);
        let actual = unpack_unorm4x8(pack_unorm4x8(v));

        assert_relative_eq!(actual.x, v.x, epsilon = 1.0 / 255.0);
        assert_relative_eq!(actual.y, v.y, epsilon = 1.0 / 255.0);
        assert_relative_eq!(actual.z, v.z, epsilon = 1.0 / 255.0);
        assert_relative_eq!(actual.w, v.w, epsilon = 1.0 / 255.0);
    }

    #[test]
    fn basis() {
        for n in [Vec3::X, Vec3::Y, Vec3::Z, -Vec3::Z, vec3(1.0, 2.0, 3.0)] {
            let n = n.normalize();
            let (t, b) = orthonormal_basis(n);

            assert_relative_eq!(t.dot(n), 0.0, epsilon = 1e-5);
            assert_relative_eq!(b.dot(n), 0.0, epsilon = 1e-5);
            assert_relative_eq!(t.dot(b), 0.0, epsilon = 1e-5);
            assert_relative_eq!(t.length(), 1.0, epsilon = 1e-5);
        }
    }
}

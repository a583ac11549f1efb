use glam::{UVec2, Vec2};

/// Maps a pixel into the previous frame using a screen-space motion vector
/// (expressed in UV units, `prev_uv - curr_uv`); returns `None` when the
/// pixel falls off-screen.
pub fn reproject(pos: UVec2, motion: Vec2, dims: UVec2) -> Option<UVec2> {
    let prev = (pos.as_vec2() + Vec2::splat(0.5)) + motion * dims.as_vec2();

    if prev.x < 0.0 || prev.y < 0.0 {
        return None;
    }

    let prev = prev.floor().as_uvec2();

    if prev.x >= dims.x || prev.y >= dims.y {
        None
    } else {
        Some(prev)
    }
}

#[cfg(test)]
mod tests {
    use glam::{uvec2, vec2};

    use super::*;

    #[test]
    fn static_pixels_stay_in_place() {
        let dims = uvec2(16, 8);

        assert_eq!(Some(uvec2(3, 4)), reproject(uvec2(3, 4), Vec2::ZERO, dims));
        assert_eq!(Some(uvec2(0, 0)), reproject(uvec2(0, 0), Vec2::ZERO, dims));
    }

    #[test]
    fn moving_pixels() {
        let dims = uvec2(16, 8);

        assert_eq!(
            Some(uvec2(5, 4)),
            reproject(uvec2(3, 4), vec2(2.0 / 16.0, 0.0), dims)
        );

        assert_eq!(None, reproject(uvec2(0, 0), vec2(-2.0 / 16.0, 0.0), dims));
        assert_eq!(None, reproject(uvec2(15, 0), vec2(1.0 / 16.0, 0.0), dims));
    }
}

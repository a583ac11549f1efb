use glam::{IVec3, Vec3};

/// Coarse spatial hash grid used to restrict photon storage to regions the
/// camera can actually see.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CullingGrid {
    pub cell_size: f32,
    pub hash_bits: u32,
}

impl CullingGrid {
    pub const MIN_HASH_BITS: u32 = 10;
    pub const MAX_HASH_BITS: u32 = 27;

    pub fn new(cell_size: f32, hash_bits: u32) -> Self {
        Self {
            cell_size,
            hash_bits: hash_bits.clamp(Self::MIN_HASH_BITS, Self::MAX_HASH_BITS),
        }
    }

    pub fn cell_count(&self) -> u32 {
        1 << self.hash_bits
    }

    pub fn cell_of(&self, point: Vec3) -> IVec3 {
        (point / self.cell_size).floor().as_ivec3()
    }

    pub fn hash(&self, cell: IVec3) -> u32 {
        let h = (cell.x as u32).wrapping_mul(73856093)
            ^ (cell.y as u32).wrapping_mul(19349663)
            ^ (cell.z as u32).wrapping_mul(83492791);

        h & (self.cell_count() - 1)
    }

    /// Marks all cells overlapped by a sphere of given radius.
    pub fn mark(&self, mask: &mut [u8], point: Vec3, radius: f32) {
        let min = self.cell_of(point - radius);
        let max = self.cell_of(point + radius);

        for z in min.z..=max.z {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    let idx = self.hash(IVec3::new(x, y, z)) as usize;

                    if let Some(cell) = mask.get_mut(idx) {
                        *cell = 1;
                    }
                }
            }
        }
    }

    pub fn is_marked(&self, mask: &[u8], point: Vec3) -> bool {
        let idx = self.hash(self.cell_of(point)) as usize;

        mask.get(idx).map_or(false, |cell| *cell > 0)
    }
}

#[cfg(test)]
mod tests {
    use glam::vec3;

    use super::*;

    #[test]
    fn hash_bits_are_clamped() {
        assert_eq!(10, CullingGrid::new(1.0, 4).hash_bits);
        assert_eq!(27, CullingGrid::new(1.0, 40).hash_bits);
    }

    #[test]
    fn mark_and_query() {
        let grid = CullingGrid::new(0.5, 12);
        let mut mask = vec![0u8; grid.cell_count() as usize];

        grid.mark(&mut mask, vec3(1.0, 0.0, 1.0), 0.1);

        assert!(grid.is_marked(&mask, vec3(1.05, 0.05, 0.95)));
        assert!(!grid.is_marked(&mask, vec3(9.0, 9.0, 9.0)));
    }
}

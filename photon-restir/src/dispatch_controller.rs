use glam::{uvec2, UVec2};

use crate::DynamicDispatchConfig;

/// Feedback controller adjusting the number of traced photon paths so that
/// the global photon buffer ends up almost (but not entirely) full.
///
/// Counts below `capacity * (1 - guard)` grow the dispatch by
/// `capacity * change`, counts at or over the capacity shrink it by the same
/// amount; counts in between (the guard band) keep it as is. The dispatch is
/// always a multiple of the grid's y-extent.
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchController {
    initial: u32,
    current: u32,
    y_extent: u32,
    config: DynamicDispatchConfig,
}

impl DispatchController {
    pub fn new(
        dispatched: u32,
        y_extent: u32,
        config: DynamicDispatchConfig,
    ) -> Self {
        let y_extent = y_extent.max(1);
        let initial = (dispatched / y_extent).max(1) * y_extent;

        Self {
            initial,
            current: initial,
            y_extent,
            config,
        }
    }

    pub fn dispatched(&self) -> u32 {
        self.current
    }

    /// Dimensions of the photon dispatch grid.
    pub fn grid(&self) -> UVec2 {
        uvec2(self.current / self.y_extent, self.y_extent)
    }

    /// Feeds back the number of global photons stored during a previous
    /// frame.
    pub fn update(&mut self, count: u32, capacity: u32) {
        if !self.config.enabled {
            return;
        }

        // Zero usually means the counter hasn't been read back yet
        if count == 0 {
            self.current = self.initial;
        }

        let comp =
            (capacity as f32 * (1.0 - self.config.guard_percentage)).round() as u32;

        let change =
            (capacity as f32 * self.config.change_percentage).round() as u32;
        let y = self.y_extent;

        if count < comp {
            let next = (self.current.saturating_add(change) / y) * y;
            let max = (self.config.max / y).max(1) * y;

            self.current = next.min(max);
        } else if count >= capacity {
            let next = (self.current.saturating_sub(change) / y) * y;

            self.current = next.max(y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> DispatchController {
        DispatchController::new(
            1000,
            10,
            DynamicDispatchConfig {
                enabled: true,
                max: 2000,
                guard_percentage: 0.1,
                change_percentage: 0.05,
            },
        )
    }

    #[test]
    fn grows_when_underfilled() {
        let mut target = controller();

        target.update(100, 1000);
        assert_eq!(1050, target.dispatched());

        target.update(899, 1000);
        assert_eq!(1100, target.dispatched());
        assert_eq!(uvec2(110, 10), target.grid());
    }

    #[test]
    fn keeps_within_guard_band() {
        let mut target = controller();

        target.update(900, 1000);
        target.update(950, 1000);
        target.update(999, 1000);

        assert_eq!(1000, target.dispatched());
    }

    #[test]
    fn shrinks_when_full() {
        let mut target = controller();

        target.update(1000, 1000);
        assert_eq!(950, target.dispatched());

        target.update(5000, 1000);
        assert_eq!(900, target.dispatched());
    }

    #[test]
    fn respects_bounds() {
        let mut target = controller();

        for _ in 0..100 {
            target.update(1, 1000);
        }

        assert_eq!(2000, target.dispatched());

        for _ in 0..100 {
            target.update(1000, 1000);
        }

        assert_eq!(10, target.dispatched());
    }

    #[test]
    fn restarts_on_zero() {
        let mut target = controller();

        target.update(1000, 1000);
        target.update(1000, 1000);
        assert_eq!(900, target.dispatched());

        target.update(0, 1000);
        assert_eq!(1050, target.dispatched());
    }

    #[test]
    fn disabled() {
        let mut target = DispatchController::new(
            1005,
            10,
            DynamicDispatchConfig {
                enabled: false,
                ..Default::default()
            },
        );

        target.update(1, 1000);

        assert_eq!(1000, target.dispatched());
    }
}

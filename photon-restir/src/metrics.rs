//! Per-stage CPU timings of a frame, logged at the `debug` level when the
//! `metrics` feature is enabled.

#[cfg(feature = "metrics")]
mod imp {
    use std::time::{Duration, Instant};

    use log::debug;

    #[derive(Debug)]
    pub struct Metrics {
        started_at: Instant,
        last_at: Instant,
        stages: Vec<(&'static str, Duration)>,
    }

    impl Default for Metrics {
        fn default() -> Self {
            let now = Instant::now();

            Self {
                started_at: now,
                last_at: now,
                stages: Default::default(),
            }
        }
    }

    impl Metrics {
        /// Records the time elapsed since the previous stage.
        pub fn stage(&mut self, name: &'static str) {
            let now = Instant::now();

            self.stages.push((name, now - self.last_at));
            self.last_at = now;
        }

        pub fn finish(self, frame: u32) {
            let stages: Vec<_> = self
                .stages
                .iter()
                .map(|(name, took)| {
                    format!("{}={}", name, humantime::format_duration(*took))
                })
                .collect();

            debug!(
                "Frame {} took {}: {}",
                frame,
                humantime::format_duration(self.started_at.elapsed()),
                stages.join(", ")
            );
        }
    }
}

#[cfg(not(feature = "metrics"))]
mod imp {
    #[derive(Debug, Default)]
    pub struct Metrics;

    impl Metrics {
        pub fn stage(&mut self, _name: &'static str) {
            //
        }

        pub fn finish(self, _frame: u32) {
            //
        }
    }
}

pub use self::imp::*;

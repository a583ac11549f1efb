use crate::ResamplingMode;

/// One of the two physical copies of a double-buffered resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub fn other(self) -> Self {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
        }
    }
}

/// Index of the frame being rendered, counted since the last reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Frame(pub u32);

impl Frame {
    /// Slot written by this frame.
    pub fn current(self) -> Slot {
        if self.0 % 2 == 0 {
            Slot::A
        } else {
            Slot::B
        }
    }

    /// Slot written by the previous frame, i.e. `(frame - 1) % 2`.
    pub fn previous(self) -> Slot {
        self.current().other()
    }

    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Returns the slot holding the resolved reservoirs once resampling in given
/// mode has finished.
///
/// Spatial resampling reads the current slot and writes into the other one;
/// every other mode resolves in place.
pub fn result_slot(mode: ResamplingMode, frame: Frame) -> Slot {
    match mode {
        ResamplingMode::Spatial => frame.current().other(),
        _ => frame.current(),
    }
}

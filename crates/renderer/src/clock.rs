use tiles::AnimationPhase;

pub const TICKS_PER_ANIMATION_FRAME: u64 = 30;

/// Tick counter driving water and waterfall cycling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnimationClock {
    ticks: u64,
}

impl AnimationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances one tick; returns true when the animation frame changed.
    pub fn tick(&mut self) -> bool {
        let previous = self.frame();
        self.ticks = self.ticks.checked_add(1).expect("animation tick overflow");
        self.frame() != previous
    }

    pub fn set_ticks(&mut self, ticks: u64) {
        self.ticks = ticks;
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn frame(&self) -> u64 {
        self.ticks / TICKS_PER_ANIMATION_FRAME
    }

    pub fn phase(&self) -> AnimationPhase {
        AnimationPhase::from_frame(self.frame())
    }
}

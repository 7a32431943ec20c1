/// What gets compared between passes. Equal signatures mean the previous
/// output is still valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSignature {
    pub start_cell: (i32, i32),
    pub tileset_generation: u64,
    pub ready_mask: u16,
    pub refresh_epoch: u64,
    /// `None` for painters whose output does not depend on the animation frame.
    pub animation_frame: Option<u64>,
}

impl FrameSignature {
    /// Differences that invalidate every cached cell, not just the moved ones.
    pub fn invalidates_cache(&self, previous: &FrameSignature) -> bool {
        self.tileset_generation != previous.tileset_generation
            || self.ready_mask != previous.ready_mask
            || self.refresh_epoch != previous.refresh_epoch
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation<S> {
    First,
    Unchanged,
    Changed { previous: S },
}

#[derive(Debug, Clone, Default)]
pub struct ChangeDetector<S> {
    last: Option<S>,
}

impl<S: Copy + PartialEq> ChangeDetector<S> {
    pub fn new() -> Self {
        Self { last: None }
    }

    pub fn observe(&mut self, current: S) -> Observation<S> {
        match self.last.replace(current) {
            None => Observation::First,
            Some(previous) if previous == current => Observation::Unchanged,
            Some(previous) => Observation::Changed { previous },
        }
    }

    pub fn last(&self) -> Option<&S> {
        self.last.as_ref()
    }

    /// The next observation reports `First`.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(start_cell: (i32, i32), animation_frame: Option<u64>) -> FrameSignature {
        FrameSignature {
            start_cell,
            tileset_generation: 1,
            ready_mask: 0b1,
            refresh_epoch: 0,
            animation_frame,
        }
    }

    #[test]
    fn observe_reports_first_then_changes() {
        let mut detector = ChangeDetector::new();
        assert_eq!(detector.observe(signature((0, 0), Some(0))), Observation::First);
        assert_eq!(
            detector.observe(signature((0, 0), Some(0))),
            Observation::Unchanged
        );
        assert_eq!(
            detector.observe(signature((1, 0), Some(0))),
            Observation::Changed {
                previous: signature((0, 0), Some(0))
            }
        );

        detector.reset();
        assert_eq!(detector.observe(signature((1, 0), Some(0))), Observation::First);
    }

    #[test]
    fn only_binding_and_refresh_changes_invalidate_cache() {
        let base = signature((0, 0), Some(0));
        assert!(!signature((3, 4), Some(9)).invalidates_cache(&base));
        let rebound = FrameSignature {
            tileset_generation: 2,
            ..base
        };
        assert!(rebound.invalidates_cache(&base));
        let ready = FrameSignature {
            ready_mask: 0b11,
            ..base
        };
        assert!(ready.invalidates_cache(&base));
    }
}

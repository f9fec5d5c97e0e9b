//! Monotonic progress tracker.
//!
//! Published progress is feedback only, never a control input, but it must
//! not move backwards within a run. All notifications take their value from
//! here instead of hardcoding it at the call site.

/// Non-decreasing progress percentage, saturating at 100.
#[derive(Debug, Clone, Copy, Default)]
pub struct Progress(u32);

impl Progress {
    pub fn new() -> Self {
        Self(0)
    }

    /// Move to `target` if that is forward; otherwise stay put. Returns the
    /// effective value.
    pub fn advance_to(&mut self, target: u32) -> u32 {
        self.0 = self.0.max(target.min(100));
        self.0
    }

    pub fn current(&self) -> u32 {
        self.0
    }
}

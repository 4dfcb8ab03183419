//! Fake platform implementation for testing.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::pal::abstractions::Platform;

/// Internal state for the fake platform that can be shared between clones.
#[derive(Debug)]
struct FakePlatformState {
    origin: Instant,
    elapsed: Duration,

    /// Added to `elapsed` after every read, to simulate time passing between reads.
    auto_advance: Duration,
}

/// Fake implementation of the platform abstraction for testing.
///
/// Multiple clones of the same `FakePlatform` share the same underlying time state,
/// allowing tests to move time forward after the platform was handed to a profiler.
#[derive(Clone, Debug)]
pub(crate) struct FakePlatform {
    state: Arc<Mutex<FakePlatformState>>,
}

impl FakePlatform {
    /// Creates a new fake platform whose time stands still until advanced.
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakePlatformState {
                origin: Instant::now(),
                elapsed: Duration::ZERO,
                auto_advance: Duration::ZERO,
            })),
        }
    }

    /// Moves the fake time forward by `by`.
    ///
    /// This affects all clones of this platform.
    pub(crate) fn advance(&self, by: Duration) {
        let mut state = self
            .state
            .lock()
            .expect("FakePlatform state lock should not be poisoned");

        state.elapsed = state
            .elapsed
            .checked_add(by)
            .expect("fake time never gets anywhere near Duration::MAX");
    }

    /// Makes every subsequent read move the fake time forward by `step` after returning.
    pub(crate) fn set_auto_advance(&self, step: Duration) {
        self.state
            .lock()
            .expect("FakePlatform state lock should not be poisoned")
            .auto_advance = step;
    }
}

impl Platform for FakePlatform {
    fn now(&self) -> Instant {
        let mut state = self
            .state
            .lock()
            .expect("FakePlatform state lock should not be poisoned");

        let now = state
            .origin
            .checked_add(state.elapsed)
            .expect("fake time never gets anywhere near the end of Instant");

        state.elapsed = state
            .elapsed
            .checked_add(state.auto_advance)
            .expect("fake time never gets anywhere near Duration::MAX");

        now
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn stands_still_by_default() {
        let platform = FakePlatform::new();

        assert_eq!(platform.now(), platform.now());
    }

    #[test]
    fn advances_on_request() {
        let platform = FakePlatform::new();
        let start = platform.now();

        platform.advance(Duration::from_millis(150));

        assert_eq!(platform.now().duration_since(start), Duration::from_millis(150));
    }

    #[test]
    fn auto_advance_applies_after_each_read() {
        let platform = FakePlatform::new();
        platform.set_auto_advance(Duration::from_millis(5));

        let first = platform.now();
        let second = platform.now();
        let third = platform.now();

        assert_eq!(second.duration_since(first), Duration::from_millis(5));
        assert_eq!(third.duration_since(first), Duration::from_millis(10));
    }

    #[test]
    fn shared_state_between_clones() {
        let platform1 = FakePlatform::new();
        let platform2 = platform1.clone();
        let start = platform2.now();

        platform1.advance(Duration::from_millis(100));

        assert_eq!(platform2.now().duration_since(start), Duration::from_millis(100));
    }
}

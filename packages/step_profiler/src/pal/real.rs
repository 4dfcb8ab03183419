//! Real platform implementation using the operating system monotonic clock.

use std::time::Instant;

use crate::pal::abstractions::Platform;

/// Real implementation of the platform abstraction using [`Instant::now()`].
#[derive(Debug, Clone)]
pub(crate) struct RealPlatform;

impl Platform for RealPlatform {
    #[cfg_attr(test, mutants::skip)] // Trivial fn, no meaningful mutation to detect.
    fn now(&self) -> Instant {
        Instant::now()
    }
}

//! The elapsed-time counter shared by all steps of one tree.

use std::sync::OnceLock;
use std::time::Instant;

use crate::pal::{Platform, PlatformFacade};

/// One running millisecond counter per measurement tree.
///
/// Created together with the root step and referenced by every step of the tree, so that
/// all offsets and durations in a report are readings of the same counter. The root stops
/// the clock when it finishes; readings taken after that return the frozen value.
#[derive(Debug)]
pub(crate) struct SharedClock {
    platform: PlatformFacade,
    started_at: Instant,

    /// Total elapsed milliseconds, set once when the root stops the clock.
    stopped_at: OnceLock<u64>,
}

impl SharedClock {
    /// Starts a new clock reading from `platform`.
    pub(crate) fn start(platform: PlatformFacade) -> Self {
        let started_at = platform.now();

        Self {
            platform,
            started_at,
            stopped_at: OnceLock::new(),
        }
    }

    /// Whole milliseconds elapsed since the clock was started, or the frozen total if stopped.
    pub(crate) fn elapsed_millis(&self) -> u64 {
        if let Some(stopped) = self.stopped_at.get() {
            return *stopped;
        }

        self.read()
    }

    /// Freezes the clock and returns the total elapsed milliseconds.
    ///
    /// Only the first call has an effect; later calls return the same total.
    pub(crate) fn stop(&self) -> u64 {
        *self.stopped_at.get_or_init(|| self.read())
    }

    fn read(&self) -> u64 {
        let elapsed = self
            .platform
            .now()
            .saturating_duration_since(self.started_at);

        // Truncated like a stopwatch millisecond counter. Saturates after ~584 million years.
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}

//! Platform abstraction trait definitions.

use std::fmt::Debug;
use std::time::Instant;

/// Provides the monotonic time source that step measurements are taken from.
///
/// Real code reads the operating system clock. Tests substitute a fake whose
/// time only moves when the test says so, which keeps rendered reports exact.
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// Gets the current monotonic timestamp.
    fn now(&self) -> Instant;
}

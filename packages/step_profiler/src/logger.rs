//! Destinations for reports and diagnostics.

use std::fmt::{self, Debug};
#[cfg(test)]
use std::sync::Mutex;

/// Receives the output of a profiler.
///
/// A profiler sends exactly one `info` message per finished root step, containing the whole
/// rendered report. Misuse warnings and recovered failures arrive as `debug` messages.
///
/// Implementations must be thread-safe because steps of one tree may finish on any thread.
///
/// # Examples
///
/// ```
/// use std::fmt;
/// use std::sync::Arc;
///
/// use step_profiler::{Logger, Profiler, StartProfiling};
///
/// #[derive(Debug)]
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn info(&self, message: fmt::Arguments<'_>) {
///         eprintln!("{message}");
///     }
///
///     fn debug(&self, _message: fmt::Arguments<'_>) {}
/// }
///
/// let profiler = Profiler::new(Arc::new(StderrLogger));
/// let _root = profiler.start_profiling("request");
/// ```
pub trait Logger: Debug + Send + Sync + 'static {
    /// Emits an informational message. Used for the final report.
    fn info(&self, message: fmt::Arguments<'_>);

    /// Emits a diagnostic message. Used for misuse warnings and recovered failures.
    fn debug(&self, message: fmt::Arguments<'_>);
}

/// Forwards profiler output to the [`log`] facade.
///
/// Reports are emitted at `Info` level and diagnostics at `Debug` level, both under the
/// configured target so they can be filtered independently of the host application's logs.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use step_profiler::{LogLogger, Profiler, StartProfiling};
///
/// let profiler = Profiler::new(Arc::new(LogLogger::new()));
///
/// {
///     let _root = profiler.start_profiling("startup");
/// } // The report goes to whatever `log` backend the application installed.
/// ```
#[derive(Clone, Debug)]
pub struct LogLogger {
    target: &'static str,
}

impl LogLogger {
    /// The target used unless another is configured.
    pub const DEFAULT_TARGET: &'static str = "step_profiler";

    /// Creates a logger that writes under [`DEFAULT_TARGET`][Self::DEFAULT_TARGET].
    #[must_use]
    pub fn new() -> Self {
        Self::with_target(Self::DEFAULT_TARGET)
    }

    /// Creates a logger that writes under a custom target.
    #[must_use]
    pub fn with_target(target: &'static str) -> Self {
        Self { target }
    }

    /// The target this logger writes under.
    #[must_use]
    pub fn target(&self) -> &'static str {
        self.target
    }
}

impl Default for LogLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for LogLogger {
    #[cfg_attr(test, mutants::skip)] // Delegates to the global `log` backend - manually tested.
    fn info(&self, message: fmt::Arguments<'_>) {
        log::info!(target: self.target, "{message}");
    }

    #[cfg_attr(test, mutants::skip)] // Delegates to the global `log` backend - manually tested.
    fn debug(&self, message: fmt::Arguments<'_>) {
        log::debug!(target: self.target, "{message}");
    }
}

/// Keeps every message in memory so tests can inspect what a profiler emitted.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingLogger {
    infos: Mutex<Vec<String>>,
    debugs: Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingLogger {
    pub(crate) fn infos(&self) -> Vec<String> {
        self.infos
            .lock()
            .expect("RecordingLogger lock should not be poisoned")
            .clone()
    }

    pub(crate) fn debugs(&self) -> Vec<String> {
        self.debugs
            .lock()
            .expect("RecordingLogger lock should not be poisoned")
            .clone()
    }
}

#[cfg(test)]
impl Logger for RecordingLogger {
    fn info(&self, message: fmt::Arguments<'_>) {
        self.infos
            .lock()
            .expect("RecordingLogger lock should not be poisoned")
            .push(message.to_string());
    }

    fn debug(&self, message: fmt::Arguments<'_>) {
        self.debugs
            .lock()
            .expect("RecordingLogger lock should not be poisoned")
            .push(message.to_string());
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(LogLogger: Send, Sync, Logger);

    #[test]
    fn default_target() {
        assert_eq!(LogLogger::new().target(), "step_profiler");
        assert_eq!(LogLogger::default().target(), LogLogger::DEFAULT_TARGET);
    }

    #[test]
    fn custom_target() {
        assert_eq!(LogLogger::with_target("perf").target(), "perf");
    }

    #[test]
    fn recording_logger_separates_levels() {
        let logger = RecordingLogger::default();

        logger.info(format_args!("report {}", 1));
        logger.debug(format_args!("warning {}", 2));

        assert_eq!(logger.infos(), vec!["report 1".to_string()]);
        assert_eq!(logger.debugs(), vec!["warning 2".to_string()]);
    }
}

use thiserror::Error;

/// Errors that can occur when configuring a profiler or nesting into an existing tree.
///
/// Measurement operations on a [`Step`][crate::Step] never return errors. These values only
/// surface from builders or are absorbed internally and reported through the logger.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A profiler builder was finished without a logger to deliver reports to.
    #[error("a logger is required to build a profiler")]
    MissingLogger,

    /// A new step was requested from a step that has already finished or been discarded.
    #[error("step '{name}' is already closed and cannot start new steps")]
    StepClosed {
        /// Name of the closed step.
        name: String,
    },

    /// The root step registered for the current thread no longer exists.
    #[error("the root step registered for this thread no longer exists")]
    RootGone,
}

/// A specialized `Result` type for profiler operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn step_closed_names_the_step() {
        let error = Error::StepClosed {
            name: "load config".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "step 'load config' is already closed and cannot start new steps"
        );
    }

    #[test]
    fn missing_logger_is_error() {
        let result: Result<()> = Err(Error::MissingLogger);

        assert!(matches!(result, Err(Error::MissingLogger)));
    }
}

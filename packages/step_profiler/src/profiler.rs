//! Creation of independent measurement trees.

use std::fmt::Display;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::pal::PlatformFacade;
use crate::step::{RootHooks, StepNode};
use crate::{Logger, Step, template};

/// Starts root steps, each of which produces one report when it finishes.
///
/// Implemented by [`Profiler`], which always starts a new tree, and by
/// [`ThreadProfiler`][crate::ThreadProfiler], which nests into a tree already running on the
/// current thread.
pub trait StartProfiling {
    /// Starts measuring an activity with the given name.
    fn start_profiling(&self, name: impl Into<String>) -> Step;

    /// Starts measuring an activity whose name is rendered from a positional template.
    ///
    /// See [`template::render()`][crate::template::render] for the template syntax.
    fn start_profiling_with(&self, template: &str, args: &[&dyn Display]) -> Step {
        self.start_profiling(template::render(template, args))
    }
}

/// Starts a brand-new, independent measurement tree for every call.
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
///     let root = profiler.start_profiling("Operation");
///
///     for i in 1..=3 {
///         let _step = root.start_step_with("step{0}", &[&i]);
///         // Work measured as part of this step.
///     }
/// } // The report for "Operation" is logged here.
/// ```
#[derive(Clone, Debug)]
pub struct Profiler {
    logger: Arc<dyn Logger>,
    platform: PlatformFacade,
}

impl Profiler {
    /// Creates a profiler that delivers reports to `logger`.
    #[must_use]
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            logger,
            platform: PlatformFacade::real(),
        }
    }

    /// Creates a builder for a profiler.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use step_profiler::{Error, LogLogger, Profiler};
    ///
    /// let profiler = Profiler::builder().logger(Arc::new(LogLogger::new())).build();
    /// assert!(profiler.is_ok());
    ///
    /// let missing = Profiler::builder().build();
    /// assert!(matches!(missing, Err(Error::MissingLogger)));
    /// ```
    #[must_use]
    pub fn builder() -> ProfilerBuilder {
        ProfilerBuilder::new()
    }

    /// Creates a profiler with a specific platform, for tests that need to control time.
    #[cfg(test)]
    pub(crate) fn with_platform(logger: Arc<dyn Logger>, platform: PlatformFacade) -> Self {
        Self { logger, platform }
    }

    pub(crate) fn logger(&self) -> &dyn Logger {
        &*self.logger
    }

    /// Starts a new root step that runs `hooks` when it closes.
    pub(crate) fn start_root(&self, name: String, hooks: RootHooks) -> Step {
        Step::from_node(StepNode::new_root(
            name,
            Arc::clone(&self.logger),
            self.platform.clone(),
            hooks,
        ))
    }
}

impl StartProfiling for Profiler {
    fn start_profiling(&self, name: impl Into<String>) -> Step {
        self.start_root(name.into(), RootHooks::default())
    }
}

/// Creates instances of [`Profiler`].
///
/// Required parameters:
/// * `logger`
///
/// Use `Profiler::builder()` to create a new instance of this builder.
#[derive(Debug, Default)]
#[must_use]
pub struct ProfilerBuilder {
    logger: Option<Arc<dyn Logger>>,
}

impl ProfilerBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sets the logger that receives reports and diagnostics. This is a required property.
    pub fn logger(self, logger: Arc<dyn Logger>) -> Self {
        Self {
            logger: Some(logger),
        }
    }

    /// Builds the profiler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingLogger`] if no logger was set.
    pub fn build(self) -> Result<Profiler> {
        self.logger.map(Profiler::new).ok_or(Error::MissingLogger)
    }
}

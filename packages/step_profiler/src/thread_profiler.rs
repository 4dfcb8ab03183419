//! Nesting of independent start calls into one tree per thread.

use std::cell::RefCell;
use std::ptr;
use std::sync::{Arc, Weak};

use crate::error::{Error, Result};
use crate::step::{RootHooks, StepNode};
use crate::{Logger, Profiler, StartProfiling, Step};

thread_local! {
    /// The root step that start calls on this thread nest into, shared by every
    /// `ThreadProfiler` in the process.
    static ACTIVE_ROOT: RefCell<Option<Weak<StepNode>>> = const { RefCell::new(None) };
}

/// Starts a new measurement tree only if the current thread is not already measuring one.
///
/// The first [`start_profiling()`][StartProfiling::start_profiling] call on a thread starts a
/// root step and registers it as the thread's active root. Further calls on the same thread,
/// made while that root is still running, start nested steps of it instead of new trees. This
/// lets independent layers of an application each "start profiling" without knowing whether a
/// caller already did, and still produce a single report.
///
/// When the root finishes or is discarded on the thread that started it, the thread is released
/// and the next call starts a new tree. A root closed on another thread is noticed by the next
/// call on this thread, which logs a debug diagnostic and starts a new tree.
/// Matching every start with a finish, in nesting order, is the caller's responsibility.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use step_profiler::{LogLogger, StartProfiling, ThreadProfiler};
///
/// fn load_settings(profiler: &ThreadProfiler) {
///     let _step = profiler.start_profiling("load settings");
///     // ...
/// }
///
/// let profiler = ThreadProfiler::new(Arc::new(LogLogger::new()));
///
/// {
///     let root = profiler.start_profiling("startup");
///     load_settings(&profiler); // Becomes a nested step of "startup".
///     assert!(root.is_active());
/// } // One report for "startup", including "load settings".
///
/// assert!(!ThreadProfiler::has_active_root());
/// ```
#[derive(Clone, Debug)]
pub struct ThreadProfiler {
    inner: Profiler,
}

impl ThreadProfiler {
    /// Creates a profiler that delivers reports to `logger`.
    #[must_use]
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            inner: Profiler::new(logger),
        }
    }

    /// Creates a builder for a thread-affine profiler.
    #[must_use]
    pub fn builder() -> ThreadProfilerBuilder {
        ThreadProfilerBuilder::new()
    }

    #[cfg(test)]
    pub(crate) fn with_profiler(inner: Profiler) -> Self {
        Self { inner }
    }

    /// Whether the current thread has a running root step that new start calls nest into.
    #[must_use]
    pub fn has_active_root() -> bool {
        ACTIVE_ROOT.with_borrow(|slot| {
            slot.as_ref()
                .and_then(Weak::upgrade)
                .is_some_and(|root| root.is_active())
        })
    }

    /// Starts a nested step of the thread's active root, if there is one.
    fn nest_into_active_root(name: &str) -> Result<Option<Step>> {
        let Some(registered) = ACTIVE_ROOT.with_borrow(Clone::clone) else {
            return Ok(None);
        };

        let root = registered.upgrade().ok_or(Error::RootGone)?;
        let child = root.try_start_step(name.to_owned())?;

        Ok(Some(Step::from_node(child)))
    }

    fn start_thread_root(&self, name: String) -> Step {
        let root = self.inner.start_root(
            name,
            RootHooks {
                on_finished: Some(Box::new(release_thread_root)),
                on_discarded: Some(Box::new(release_thread_root)),
            },
        );

        if let Some(node) = root.node() {
            let registered = Arc::downgrade(node);
            ACTIVE_ROOT.with_borrow_mut(|slot| *slot = Some(registered));
        }

        root
    }
}

impl StartProfiling for ThreadProfiler {
    fn start_profiling(&self, name: impl Into<String>) -> Step {
        let name = name.into();

        match Self::nest_into_active_root(&name) {
            Ok(Some(step)) => return step,
            Ok(None) => {}
            Err(error) => self.inner.logger().debug(format_args!(
                "could not nest [{name}] into the active root of this thread, starting a new root instead: {error}"
            )),
        }

        self.start_thread_root(name)
    }
}

/// Clears the active root of the current thread if it is `closed`.
fn release_thread_root(closed: &StepNode) {
    // Fails only while the thread is being torn down, when there is nothing left to release.
    _ = ACTIVE_ROOT.try_with(|slot| {
        let mut slot = slot.borrow_mut();

        if slot
            .as_ref()
            .is_some_and(|registered| ptr::eq(registered.as_ptr(), closed))
        {
            *slot = None;
        }
    });
}

/// Creates instances of [`ThreadProfiler`].
///
/// Required parameters:
/// * `logger`
///
/// Use `ThreadProfiler::builder()` to create a new instance of this builder.
#[derive(Debug, Default)]
#[must_use]
pub struct ThreadProfilerBuilder {
    logger: Option<Arc<dyn Logger>>,
}

impl ThreadProfilerBuilder {
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
    pub fn build(self) -> Result<ThreadProfiler> {
        self.logger
            .map(ThreadProfiler::new)
            .ok_or(Error::MissingLogger)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::thread;
    use std::time::Duration;

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::logger::RecordingLogger;
    use crate::pal::{FakePlatform, PlatformFacade};

    assert_impl_all!(ThreadProfiler: Send, Sync, Clone);

    // Every test runs on its own thread, so the thread-local slot starts out empty.
    fn fake_profiler() -> (FakePlatform, Arc<RecordingLogger>, ThreadProfiler) {
        let platform = FakePlatform::new();
        let logger = Arc::new(RecordingLogger::default());
        let profiler = ThreadProfiler::with_profiler(Profiler::with_platform(
            Arc::<RecordingLogger>::clone(&logger),
            PlatformFacade::fake(platform.clone()),
        ));

        (platform, logger, profiler)
    }

    #[test]
    fn builder_requires_logger() {
        let result = ThreadProfiler::builder().build();

        assert!(matches!(result, Err(Error::MissingLogger)));
    }

    #[test]
    fn builder_with_logger_builds() {
        let result = ThreadProfiler::builder()
            .logger(Arc::new(RecordingLogger::default()))
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn second_start_on_same_thread_nests() {
        let (platform, logger, profiler) = fake_profiler();

        let outer = profiler.start_profiling("outer");
        assert!(ThreadProfiler::has_active_root());

        {
            let inner = profiler.start_profiling("inner");
            assert_eq!(inner.name(), Some("inner"));
            platform.advance(Duration::from_millis(4));
        }

        // Finishing the nested step does not release the thread.
        assert!(ThreadProfiler::has_active_root());
        assert!(logger.infos().is_empty());

        drop(outer);

        assert!(!ThreadProfiler::has_active_root());
        assert_eq!(
            logger.infos(),
            vec!["outer :\t4 ms\n  -inner :\t4 ms".to_string()]
        );
    }

    #[test]
    fn nested_calls_attach_to_the_root() {
        let (_platform, logger, profiler) = fake_profiler();

        {
            let _outer = profiler.start_profiling("outer");
            let _middle = profiler.start_profiling("middle");
            let _inner = profiler.start_profiling("inner");
        }

        // The active root is the only thing the thread tracks, so both land at depth 1.
        assert_eq!(
            logger.infos(),
            vec!["outer :\t0 ms\n  -middle :\t0 ms\n  -inner :\t0 ms".to_string()]
        );
    }

    #[test]
    fn new_tree_after_root_finishes() {
        let (_platform, logger, profiler) = fake_profiler();

        drop(profiler.start_profiling("first"));
        drop(profiler.start_profiling("second"));

        assert_eq!(
            logger.infos(),
            vec!["first :\t0 ms".to_string(), "second :\t0 ms".to_string()]
        );
        assert!(logger.debugs().is_empty());
    }

    #[test]
    fn discarded_root_releases_the_thread() {
        let (_platform, logger, profiler) = fake_profiler();

        let abandoned = profiler.start_profiling("abandoned");
        abandoned.discard();

        assert!(!ThreadProfiler::has_active_root());

        let fresh = profiler.start_profiling("fresh");

        assert!(fresh.is_active());
        assert_eq!(fresh.start_offset(), Duration::ZERO);
        assert!(ThreadProfiler::has_active_root());
        assert!(logger.debugs().is_empty());

        drop(fresh);
        drop(abandoned);

        assert_eq!(logger.infos(), vec!["fresh :\t0 ms".to_string()]);
        assert!(!ThreadProfiler::has_active_root());
    }

    #[test]
    fn root_discarded_elsewhere_is_replaced_with_diagnostic() {
        let (_platform, logger, profiler) = fake_profiler();

        let abandoned = profiler.start_profiling("abandoned");
        thread::scope(|s| {
            s.spawn(|| abandoned.discard());
        });

        // Only the thread that started the root can release it, so this thread still points at it.
        assert!(!ThreadProfiler::has_active_root());

        let fresh = profiler.start_profiling("fresh");

        assert_eq!(fresh.start_offset(), Duration::ZERO);
        assert_eq!(logger.debugs().len(), 1);
        assert!(logger.debugs().iter().all(|d| d.contains("abandoned")));

        drop(fresh);
        drop(abandoned);

        assert_eq!(logger.infos(), vec!["fresh :\t0 ms".to_string()]);
    }

    #[test]
    fn root_finished_elsewhere_is_replaced() {
        let (_platform, logger, profiler) = fake_profiler();

        let root = profiler.start_profiling("moved");
        thread::spawn(move || drop(root))
            .join()
            .expect("finishing thread panicked");

        // The other thread could not release this thread's slot, but the root is gone now.
        assert!(!ThreadProfiler::has_active_root());

        drop(profiler.start_profiling("next"));

        assert_eq!(logger.infos().len(), 2);
        assert_eq!(logger.debugs().len(), 1);
    }

    #[test]
    fn threads_have_separate_roots() {
        let (_platform, logger, profiler) = fake_profiler();

        let main_root = profiler.start_profiling("main");

        thread::scope(|s| {
            s.spawn(|| {
                assert!(!ThreadProfiler::has_active_root());
                drop(profiler.start_profiling("worker"));
            });
        });

        drop(main_root);

        assert_eq!(
            logger.infos(),
            vec!["worker :\t0 ms".to_string(), "main :\t0 ms".to_string()]
        );
    }

    #[test]
    fn separate_profilers_share_the_thread_slot() {
        let (_platform, logger, profiler) = fake_profiler();
        let other = profiler.clone();

        {
            let _outer = profiler.start_profiling("outer");
            let _inner = other.start_profiling("inner");
        }

        assert_eq!(logger.infos().len(), 1);
    }
}

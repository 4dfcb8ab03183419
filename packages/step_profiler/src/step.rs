//! Measurement tree nodes and the handles that applications hold on to.

use std::fmt::Display;
use std::mem;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use crate::clock::SharedClock;
use crate::error::{Error, Result};
use crate::pal::PlatformFacade;
use crate::report::ReportWriter;
use crate::{Logger, template};

/// Invoked with a root step once it has reached a terminal state.
pub(crate) type OnClosed = Box<dyn FnOnce(&StepNode) + Send>;

/// Callbacks a root step runs when it closes. At most one of them ever runs.
#[derive(derive_more::Debug, Default)]
pub(crate) struct RootHooks {
    /// Runs after the report has been emitted.
    #[debug(ignore)]
    pub(crate) on_finished: Option<OnClosed>,

    /// Runs after the root and everything nested in it has been discarded.
    #[debug(ignore)]
    pub(crate) on_discarded: Option<OnClosed>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub(crate) enum StepState {
    Active = 0,
    Finished = 1,
    Discarded = 2,
}

impl StepState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Active,
            1 => Self::Finished,
            2 => Self::Discarded,
            _ => unreachable!("step state is only ever stored from a StepState"),
        }
    }
}

/// Responsibilities that only the root of a tree carries.
#[derive(derive_more::Debug)]
struct RootDuties {
    logger: Arc<dyn Logger>,
    hooks: Mutex<RootHooks>,
}

impl RootDuties {
    fn take_hook(
        &self,
        select: fn(&mut RootHooks) -> &mut Option<OnClosed>,
    ) -> Option<OnClosed> {
        select(&mut self.hooks.lock().unwrap_or_else(PoisonError::into_inner)).take()
    }
}

/// One timed step in a measurement tree.
///
/// Parents own their children; children never refer back to their parent. Every node of a
/// tree shares the clock of the root, so offsets and durations are comparable across the tree.
#[derive(Debug)]
pub(crate) struct StepNode {
    name: String,
    clock: Arc<SharedClock>,

    /// Clock reading when this step started. Zero for the root.
    start_offset: u64,

    /// Set exactly once, when the step finishes normally.
    duration: OnceLock<u64>,

    /// In creation order. Appended to under this lock only while the step is active.
    children: Mutex<Vec<Arc<StepNode>>>,

    state: AtomicU8,

    /// Present only on the root.
    root: Option<RootDuties>,
}

impl StepNode {
    pub(crate) fn new_root(
        name: String,
        logger: Arc<dyn Logger>,
        platform: PlatformFacade,
        hooks: RootHooks,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            clock: Arc::new(SharedClock::start(platform)),
            start_offset: 0,
            duration: OnceLock::new(),
            children: Mutex::new(Vec::new()),
            state: AtomicU8::new(StepState::Active as u8),
            root: Some(RootDuties {
                logger,
                hooks: Mutex::new(hooks),
            }),
        })
    }

    fn new_child(name: String, clock: Arc<SharedClock>) -> Arc<Self> {
        let start_offset = clock.elapsed_millis();

        Arc::new(Self {
            name,
            clock,
            start_offset,
            duration: OnceLock::new(),
            children: Mutex::new(Vec::new()),
            state: AtomicU8::new(StepState::Active as u8),
            root: None,
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn start_offset_millis(&self) -> u64 {
        self.start_offset
    }

    /// The measured duration, or zero if the step has not finished normally.
    pub(crate) fn duration_millis(&self) -> u64 {
        self.duration.get().copied().unwrap_or_default()
    }

    pub(crate) fn state(&self) -> StepState {
        StepState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn is_active(&self) -> bool {
        self.state() == StepState::Active
    }

    /// A copy of the current child list, so callers can walk it without holding the lock.
    pub(crate) fn children_snapshot(&self) -> Vec<Arc<Self>> {
        self.lock_children().clone()
    }

    /// Registers a new child step, unless this step is already closed.
    pub(crate) fn try_start_step(&self, name: String) -> Result<Arc<Self>> {
        let mut children = self.lock_children();

        // Checked under the lock: discard() flips the state before taking the lock, so a child
        // appended here is guaranteed to be seen (and discarded) by a concurrent discard().
        if !self.is_active() {
            return Err(Error::StepClosed {
                name: self.name.clone(),
            });
        }

        let child = Self::new_child(name, Arc::clone(&self.clock));
        children.push(Arc::clone(&child));

        Ok(child)
    }

    fn start_step(&self, name: String) -> Step {
        match self.try_start_step(name) {
            Ok(child) => Step::from_node(child),
            Err(error) => {
                if let Some(root) = &self.root {
                    root.logger
                        .debug(format_args!("WARN: bad use of step [{}]: {error}", self.name));
                }

                Step::inert()
            }
        }
    }

    fn transition(&self, to: StepState) -> bool {
        self.state
            .compare_exchange(
                StepState::Active as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub(crate) fn discard(&self) {
        if !self.transition(StepState::Discarded) {
            return;
        }

        // The state flips before each lock is taken, so no child can be appended to a node
        // after its children were moved out here.
        let mut pending = mem::take(&mut *self.lock_children());

        while let Some(node) = pending.pop() {
            if node.transition(StepState::Discarded) {
                pending.append(&mut node.lock_children());
            }
        }

        if let Some(on_discarded) = self
            .root
            .as_ref()
            .and_then(|root| root.take_hook(|hooks| &mut hooks.on_discarded))
        {
            on_discarded(self);
        }
    }

    pub(crate) fn finish(&self) {
        if !self.transition(StepState::Finished) {
            return;
        }

        let duration = self
            .clock
            .elapsed_millis()
            .saturating_sub(self.start_offset);

        // We won the state transition, so nobody else can have set it.
        _ = self.duration.set(duration);

        let Some(root) = &self.root else {
            return;
        };

        let mut report = ReportWriter::new(&self.name, duration);
        report.write_steps(&self.children_snapshot(), 1);

        let overhead = self.clock.stop().saturating_sub(duration);
        report.write_overhead(overhead);

        root.logger.info(format_args!("{}", report.finish()));

        if let Some(on_finished) = root.take_hook(|hooks| &mut hooks.on_finished) {
            on_finished(self);
        }
    }

    fn lock_children(&self) -> MutexGuard<'_, Vec<Arc<Self>>> {
        // Every update is a single push or take, so a panic while it was locked cannot tear it.
        self.children.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for StepNode {
    fn drop(&mut self) {
        // Tear down descendants with a worklist instead of letting each drop recurse into its
        // children, so deep trees cannot exhaust the stack.
        let mut pending = mem::take(
            self.children
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner),
        );

        while let Some(node) = pending.pop() {
            // Nodes still referenced elsewhere keep their subtree alive.
            if let Some(mut node) = Arc::into_inner(node) {
                pending.append(
                    node.children
                        .get_mut()
                        .unwrap_or_else(PoisonError::into_inner),
                );
            }
        }
    }
}

/// A step of work being measured.
///
/// The step is measured from the moment it was started until it is dropped or
/// [`finish()`][Self::finish] is called. Nested steps are started with
/// [`start_step()`][Self::start_step] and appear in the report of the root step, in the
/// order they were started.
///
/// When the root step finishes, the whole tree is rendered into one report and sent to the
/// logger of the profiler that created it. Finishing a nested step only fixes its duration.
///
/// No operation on a step ever fails. Starting a nested step from a step that has already
/// finished or been discarded yields an inert step on which every operation does nothing.
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
/// let root = profiler.start_profiling("handle request");
///
/// for i in 1..=3 {
///     let _step = root.start_step_with("step{0}", &[&i]);
///     // Work measured as part of this step.
/// }
///
/// drop(root); // Emits the report.
/// ```
#[derive(Debug)]
#[must_use = "a step is measured between creation and drop"]
pub struct Step {
    /// `None` for the inert step.
    node: Option<Arc<StepNode>>,
}

impl Step {
    pub(crate) fn from_node(node: Arc<StepNode>) -> Self {
        Self { node: Some(node) }
    }

    /// Returns a step on which every operation does nothing.
    ///
    /// This is what [`start_step()`][Self::start_step] returns when called on a closed step.
    pub fn inert() -> Self {
        Self { node: None }
    }

    pub(crate) fn node(&self) -> Option<&Arc<StepNode>> {
        self.node.as_ref()
    }

    /// Starts a nested step with the given name.
    pub fn start_step(&self, name: impl Into<String>) -> Self {
        match &self.node {
            Some(node) => node.start_step(name.into()),
            None => Self::inert(),
        }
    }

    /// Starts a nested step whose name is rendered from a positional template.
    ///
    /// See [`template::render()`][crate::template::render] for the template syntax.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use step_profiler::{LogLogger, Profiler, StartProfiling};
    ///
    /// let profiler = Profiler::new(Arc::new(LogLogger::new()));
    /// let root = profiler.start_profiling("batch");
    ///
    /// let step = root.start_step_with("item {0} of {1}", &[&4, &10]);
    /// assert_eq!(step.name(), Some("item 4 of 10"));
    /// ```
    pub fn start_step_with(&self, template: &str, args: &[&dyn Display]) -> Self {
        match &self.node {
            Some(node) => node.start_step(template::render(template, args)),
            None => Self::inert(),
        }
    }

    /// Abandons this step and everything nested in it.
    ///
    /// A discarded step never reports and does not appear in the report of an ancestor that
    /// finishes later. Steps nested in it are discarded as well. Calling this on a step that
    /// has already finished or been discarded does nothing.
    ///
    /// Discarding a root started by a [`ThreadProfiler`][crate::ThreadProfiler] on its own
    /// thread also releases that thread, so the next start call there begins a new tree.
    pub fn discard(&self) {
        if let Some(node) = &self.node {
            node.discard();
        }
    }

    /// Finishes this step, fixing its duration.
    ///
    /// If this is a root step, the report for the whole tree is emitted. Only the first call
    /// has an effect; dropping the step afterwards does nothing further.
    pub fn finish(&self) {
        if let Some(node) = &self.node {
            node.finish();
        }
    }

    /// The name of the step, or `None` for an inert step.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.node.as_deref().map(StepNode::name)
    }

    /// Whether the step is still being measured.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.node.as_deref().is_some_and(StepNode::is_active)
    }

    /// Whether this is an inert step that ignores every operation.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.node.is_none()
    }

    /// The measured duration, available once the step has finished normally.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.node
            .as_deref()
            .and_then(|node| node.duration.get().copied())
            .map(Duration::from_millis)
    }

    /// When the step started, relative to the start of its root step.
    ///
    /// Zero for root steps and inert steps.
    #[must_use]
    pub fn start_offset(&self) -> Duration {
        Duration::from_millis(
            self.node
                .as_deref()
                .map_or(0, StepNode::start_offset_millis),
        )
    }
}

impl Drop for Step {
    fn drop(&mut self) {
        self.finish();
    }
}

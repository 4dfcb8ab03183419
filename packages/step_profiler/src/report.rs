//! Rendering of finished measurement trees into text reports.
//!
//! A report has one line for the root followed by one line per nested step, depth-first, in
//! the order the steps were started:
//!
//! ```text
//! Operation :	1452 ms
//!   -step1 :	150 ms (+1000)
//!     -inner step :	30 ms (+1120)
//!   -step2 :	151 ms (+1150)
//! Measure overhead: 1 ms
//! ```
//!
//! Offsets are measured from the start of the root step. At the first nesting level, a zero
//! offset is left out; deeper levels always show it.

use std::fmt::Write;
use std::sync::Arc;

use crate::step::{StepNode, StepState};

/// Trailing characters removed from the finished report.
const TRIMMED_TAIL: [char; 3] = ['\r', '\n', ' '];

/// Spaces of indentation per nesting level.
const INDENT_PER_LEVEL: usize = 2;

/// Accumulates the text of one report.
#[derive(Debug)]
pub(crate) struct ReportWriter {
    text: String,
}

impl ReportWriter {
    /// Starts a report with the line describing the root step.
    pub(crate) fn new(root_name: &str, duration_millis: u64) -> Self {
        let mut text = String::new();

        // Writing into a String cannot fail.
        _ = writeln!(text, "{root_name} :\t{duration_millis} ms");

        Self { text }
    }

    /// Writes `steps` and everything nested in them, `steps` being at nesting level `depth`.
    ///
    /// Discarded steps and their descendants are left out. The tree is walked with an explicit
    /// stack, so the nesting depth is not limited by the thread's stack size.
    pub(crate) fn write_steps(&mut self, steps: &[Arc<StepNode>], depth: usize) {
        // Next step to write on top; siblings are pushed in reverse to keep creation order.
        let mut pending: Vec<(Arc<StepNode>, usize)> = steps
            .iter()
            .rev()
            .map(|step| (Arc::clone(step), depth))
            .collect();

        while let Some((step, depth)) = pending.pop() {
            if step.state() == StepState::Discarded {
                continue;
            }

            self.write_step(&step, depth);

            let child_depth = depth.saturating_add(1);
            pending.extend(
                step.children_snapshot()
                    .into_iter()
                    .rev()
                    .map(|child| (child, child_depth)),
            );
        }
    }

    fn write_step(&mut self, step: &StepNode, depth: usize) {
        let indent = depth.saturating_mul(INDENT_PER_LEVEL);
        let offset = step.start_offset_millis();

        _ = write!(
            self.text,
            "{:indent$}-{} :\t{} ms",
            "",
            step.name(),
            step.duration_millis()
        );

        if depth != 1 || offset != 0 {
            _ = write!(self.text, " (+{offset})");
        }

        self.text.push('\n');
    }

    /// Appends the time spent producing the report, if there was any.
    pub(crate) fn write_overhead(&mut self, overhead_millis: u64) {
        if overhead_millis != 0 {
            _ = writeln!(self.text, "Measure overhead: {overhead_millis} ms");
        }
    }

    /// Returns the report text without trailing line breaks or spaces.
    pub(crate) fn finish(self) -> String {
        let trimmed_len = self.text.trim_end_matches(TRIMMED_TAIL).len();

        let mut text = self.text;
        text.truncate(trimmed_len);
        text
    }
}

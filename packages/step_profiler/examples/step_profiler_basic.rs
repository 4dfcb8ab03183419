//! Measures a few nested steps and prints the resulting report.
//!
//! Run with: `cargo run --example step_profiler_basic`.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use step_profiler::{Logger, Profiler, StartProfiling};

/// Prints reports to stdout and ignores diagnostics.
#[derive(Debug)]
struct StdoutLogger;

impl Logger for StdoutLogger {
    fn info(&self, message: fmt::Arguments<'_>) {
        println!("{message}");
    }

    fn debug(&self, _message: fmt::Arguments<'_>) {}
}

fn main() {
    let profiler = Profiler::new(Arc::new(StdoutLogger));

    let root = profiler.start_profiling("BasicUsage");

    // Some long initial step that is not measured separately.
    thread::sleep(Duration::from_millis(100));

    for i in 1..=3 {
        let step = root.start_step_with("step{0}", &[&i]);
        thread::sleep(Duration::from_millis(15));

        {
            let _inner = step.start_step("inner step");
            thread::sleep(Duration::from_millis(3));
        }
    }

    // A step that turned out not to be worth reporting.
    let abandoned = root.start_step("abandoned");
    abandoned.discard();

    drop(root);
}

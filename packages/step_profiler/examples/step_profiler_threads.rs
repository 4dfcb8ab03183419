//! Demonstrates steps finished on worker threads and nesting with `ThreadProfiler`.
//!
//! Run with: `cargo run --example step_profiler_threads`.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use step_profiler::{Logger, StartProfiling, ThreadProfiler};

/// Prints everything to stdout, prefixed with the level.
#[derive(Debug)]
struct StdoutLogger;

impl Logger for StdoutLogger {
    fn info(&self, message: fmt::Arguments<'_>) {
        println!("[info] {message}");
    }

    fn debug(&self, message: fmt::Arguments<'_>) {
        println!("[debug] {message}");
    }
}

/// A library function that profiles itself without knowing whether its caller does.
fn load_settings(profiler: &ThreadProfiler) {
    let _step = profiler.start_profiling("load settings");
    thread::sleep(Duration::from_millis(5));
}

fn main() {
    let profiler = ThreadProfiler::new(Arc::new(StdoutLogger));

    // Called on its own, the function produces its own report.
    load_settings(&profiler);

    let root = profiler.start_profiling_with("Multithreads({0})", &[&3]);

    // Called while the thread is already profiling, it becomes a nested step.
    load_settings(&profiler);

    thread::scope(|s| {
        for i in 0..3 {
            let item = root.start_step_with("Thread pool item {0}", &[&i]);

            s.spawn(move || {
                let _work = item.start_step("work");
                thread::sleep(Duration::from_millis(10));
            });
        }
    });

    drop(root);
}

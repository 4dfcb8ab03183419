#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Nested step timing with a single human-readable report per call tree.
//!
//! Application code marks the steps of an operation, nesting them as deeply as needed. When the
//! outermost step completes, the whole tree is rendered into one report and handed to a
//! [`Logger`]:
//!
//! ```text
//! BasicUsage :	1452 ms
//!   -step1 :	150 ms (+1000)
//!     -inner step :	30 ms (+1120)
//!   -step2 :	151 ms (+1150)
//!     -inner step :	30 ms (+1271)
//! ```
//!
//! Each nested line shows the duration of the step and, in parentheses, when it started relative
//! to the start of the root step.
//!
//! The core types are:
//!
//! - [`Profiler`] - starts a new, independent measurement tree for every call.
//! - [`ThreadProfiler`] - nests start calls made on a thread that is already measuring something
//!   into that thread's existing tree.
//! - [`Step`] - one step being measured; finishes when dropped.
//! - [`Logger`] - receives reports; [`LogLogger`] forwards them to the [`log`] facade.
//!
//! This package is meant for lightweight latency instrumentation, not for statistical profiling.
//! It keeps no data between reports.
//!
//! # Simple usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use step_profiler::{LogLogger, Profiler, StartProfiling};
//!
//! let profiler = Profiler::new(Arc::new(LogLogger::new()));
//!
//! {
//!     let root = profiler.start_profiling("BasicUsage");
//!
//!     for i in 1..=3 {
//!         let step = root.start_step_with("step{0}", &[&i]);
//!
//!         {
//!             let _inner = step.start_step("inner step");
//!             // Work measured as "inner step".
//!         }
//!     }
//! } // The root step is dropped here and the report is logged.
//! ```
//!
//! # Abandoning a measurement
//!
//! A step that should not be reported, for example because the operation failed, can be
//! discarded. Discarding removes the step and everything nested in it from the report:
//!
//! ```
//! use std::sync::Arc;
//!
//! use step_profiler::{LogLogger, Profiler, StartProfiling};
//!
//! let profiler = Profiler::new(Arc::new(LogLogger::new()));
//! let root = profiler.start_profiling("import");
//!
//! let parse = root.start_step("parse");
//! let parsed: Result<u32, String> = Err("bad input".to_string());
//!
//! if parsed.is_err() {
//!     parse.discard();
//! }
//! ```
//!
//! # Threading
//!
//! Steps can be sent to and finished on other threads, and nested steps can be started
//! concurrently from many threads. Nested steps always appear in the report in the order they
//! were started, regardless of the order in which they finish.
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use step_profiler::{LogLogger, Profiler, StartProfiling};
//!
//! let profiler = Profiler::new(Arc::new(LogLogger::new()));
//! let root = profiler.start_profiling_with("Multithreads({0})", &[&4]);
//!
//! thread::scope(|s| {
//!     for i in 0..4 {
//!         let item = root.start_step_with("work item {0}", &[&i]);
//!
//!         s.spawn(move || {
//!             let _work = item.start_step("processing");
//!             // Work measured on a worker thread.
//!         });
//!     }
//! });
//! ```
//!
//! # Misuse
//!
//! No operation on a step ever panics or returns an error. Starting a nested step from a step
//! that has already finished or been discarded returns an inert step that ignores everything,
//! and a warning is sent to the logger at debug level.

mod clock;
mod error;
mod logger;
mod pal;
mod profiler;
mod report;
mod step;
pub mod template;
mod thread_profiler;

pub use error::Error;
pub use logger::{LogLogger, Logger};
pub use profiler::{Profiler, ProfilerBuilder, StartProfiling};
pub use step::Step;
pub use thread_profiler::{ThreadProfiler, ThreadProfilerBuilder};

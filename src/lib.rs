//! Benchmark harness for surveying conv2d accelerator architecture variants
//! under `perf stat`.
//!
//! A sweep runs every architecture executable at every channel count, pinned
//! to a fixed CPU set, with five hardware counters attached. Each trial's
//! stdout carries the application's own simulated-cycle survey line and its
//! stderr carries perf's free-text report; both are parsed into one flat
//! [`BenchmarkRecord`]. Records can then be collapsed per configuration with
//! a [`Reducer`] and written as a flat table for the plotting layer.
//!
//! perf's text output is locale-ambiguous (the same punctuation mark groups
//! thousands in one locale and marks decimals in another), so every parser
//! takes an explicit [`NumberFormat`] policy instead of guessing per token.

pub mod aggregate;
pub mod format;
pub mod logfile;
pub mod parse;
pub mod run;
pub mod sweep;
pub mod table;

pub use aggregate::{aggregate, AggregatedRecord, GroupOptions, Reducer};
pub use format::NumberFormat;
pub use logfile::{parse_log, split_blocks, CommandReport};
pub use parse::{extract_survey, CounterSnapshot, CycleTriplet, ReportParser, SURVEY_MARKER};
pub use run::{Executor, RunError, RunOutput, COUNTER_EVENTS};
pub use sweep::{ArchVariant, BenchmarkRecord, ShapeArgs, Sweep, TrialConfig, MACS_PER_PE};
pub use table::TableError;

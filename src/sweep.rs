//! The sweep controller: cross-product of architecture variants and channel
//! counts, one blocking instrumented trial per pair.

use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::parse::{extract_survey, CounterSnapshot, CycleTriplet, ReportParser};
use crate::run::Executor;

/// Operations each processing element performs per cycle. Fixed across the
/// whole survey; the sweep scales element count, not element width.
pub const MACS_PER_PE: u32 = 3;

/// Fixed conv2d shape of a survey, passed to the benchmark as argv 1..=10
/// in this order: IH IW IC KH KW OF OH OW S P.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeArgs {
    pub input_h: u32,
    pub input_w: u32,
    pub input_c: u32,
    pub kernel_h: u32,
    pub kernel_w: u32,
    pub output_f: u32,
    pub output_h: u32,
    pub output_w: u32,
    pub stride: u32,
    pub padding: u32,
}

impl ShapeArgs {
    pub fn to_args(&self) -> Vec<String> {
        [
            self.input_h,
            self.input_w,
            self.input_c,
            self.kernel_h,
            self.kernel_w,
            self.output_f,
            self.output_h,
            self.output_w,
            self.stride,
            self.padding,
        ]
        .iter()
        .map(u32::to_string)
        .collect()
    }
}

impl Default for ShapeArgs {
    /// The 112x112x32 layer the survey campaign targets.
    fn default() -> Self {
        Self {
            input_h: 112,
            input_w: 112,
            input_c: 32,
            kernel_h: 3,
            kernel_w: 3,
            output_f: 1,
            output_h: 112,
            output_w: 112,
            stride: 1,
            padding: 1,
        }
    }
}

/// One architecture variant bound to its compiled executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchVariant {
    pub label: String,
    pub executable: PathBuf,
}

/// Hardware parameters of one trial, derived deterministically from the
/// channel count. Invariant: num_pe * macs_per_pe <= total_macs, and
/// buffer_size_bytes equals the total operation count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialConfig {
    pub arch: String,
    pub parallel_channels: u32,
    pub total_macs: u32,
    pub num_pe: u32,
    pub macs_per_pe: u32,
    pub buffer_size_bytes: u32,
}

impl TrialConfig {
    pub fn derive(arch: &str, channels: u32, shape: &ShapeArgs) -> Self {
        let total_macs = channels * shape.kernel_h * shape.kernel_w;
        Self {
            arch: arch.to_owned(),
            parallel_channels: channels,
            total_macs,
            num_pe: total_macs / MACS_PER_PE,
            macs_per_pe: MACS_PER_PE,
            buffer_size_bytes: total_macs,
        }
    }

    /// argv positions 11..=13: NPE MAC BUF.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            self.num_pe.to_string(),
            self.macs_per_pe.to_string(),
            self.buffer_size_bytes.to_string(),
        ]
    }
}

/// One successful trial: configuration, the application's simulated cycles,
/// the hardware counters, and the per-trial miss rate. Never mutated after
/// construction. Missing counters serialize as empty cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub architecture: String,
    pub parallel_channels: u32,
    pub total_macs: u32,
    pub num_pe: u32,
    pub macs_per_pe: u32,
    pub buffer_size_bytes: u32,
    pub dma_cycles: u64,
    pub compute_cycles: u64,
    pub total_cycles: u64,
    pub cache_references: Option<u64>,
    pub cache_misses: Option<u64>,
    pub hw_cycles: Option<u64>,
    pub instructions: Option<u64>,
    pub branches: Option<u64>,
    pub seconds: Option<f64>,
    pub miss_rate_pct: Option<f64>,
}

impl BenchmarkRecord {
    pub fn new(config: TrialConfig, sim: CycleTriplet, counters: CounterSnapshot) -> Self {
        Self {
            architecture: config.arch,
            parallel_channels: config.parallel_channels,
            total_macs: config.total_macs,
            num_pe: config.num_pe,
            macs_per_pe: config.macs_per_pe,
            buffer_size_bytes: config.buffer_size_bytes,
            dma_cycles: sim.dma_cycles,
            compute_cycles: sim.compute_cycles,
            total_cycles: sim.total_cycles,
            cache_references: counters.cache_references,
            cache_misses: counters.cache_misses,
            hw_cycles: counters.cycles,
            instructions: counters.instructions,
            branches: counters.branches,
            seconds: counters.seconds,
            miss_rate_pct: counters.miss_rate_pct(),
        }
    }
}

/// The full survey: every variant at every channel count.
#[derive(Debug, Clone)]
pub struct Sweep {
    pub shape: ShapeArgs,
    pub channels: Vec<u32>,
    pub variants: Vec<ArchVariant>,
}

impl Sweep {
    /// Run every trial sequentially and return the collected records.
    ///
    /// A trial that fails to launch or whose stdout lacks the survey line is
    /// logged and skipped; the sweep always runs to the end of the
    /// cross-product. An empty result set is a valid outcome.
    pub fn run(&self, executor: &Executor, parser: &ReportParser) -> Vec<BenchmarkRecord> {
        let n = self.variants.len() * self.channels.len();
        let mut records = Vec::with_capacity(n);
        let pb = ProgressBar::new(n as u64);
        pb.set_style(ProgressStyle::default_bar().progress_chars("#> "));

        for variant in &self.variants {
            for &channels in &self.channels {
                if let Some(record) = self.run_trial(executor, parser, variant, channels) {
                    records.push(record);
                }
                pb.inc(1);
            }
        }
        pb.finish_and_clear();
        records
    }

    fn run_trial(
        &self,
        executor: &Executor,
        parser: &ReportParser,
        variant: &ArchVariant,
        channels: u32,
    ) -> Option<BenchmarkRecord> {
        let config = TrialConfig::derive(&variant.label, channels, &self.shape);
        let mut args = self.shape.to_args();
        args.extend(config.to_args());

        let output = match executor.run(&variant.executable, &args) {
            Ok(out) => out,
            Err(err) => {
                warn!("[{}] ch={}: {}", variant.label, channels, err);
                return None;
            }
        };

        let sim = match extract_survey(&output.stdout) {
            Some(sim) => sim,
            None => {
                warn!(
                    "[{}] ch={}: no {} line in stdout",
                    variant.label,
                    channels,
                    crate::parse::SURVEY_MARKER
                );
                return None;
            }
        };

        let counters = parser.parse(&output.stderr);
        info!(
            "[{}] ch={} sim_cycles={} perf_sec={:.5}",
            variant.label,
            channels,
            sim.total_cycles,
            counters.seconds.unwrap_or(0.0)
        );
        Some(BenchmarkRecord::new(config, sim, counters))
    }
}

//! Collapses repeated measurements of the same configuration and derives
//! comparison ratios from the reduced scalars.

use std::collections::BTreeMap;

use clap::ValueEnum;
use serde::Serialize;

use crate::sweep::BenchmarkRecord;

/// How duplicate measurements of one configuration are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Reducer {
    Min,
    Mean,
    Median,
}

impl Reducer {
    /// Reduce a sample set. `None` for an empty set, so a group whose
    /// samples were all unrecorded stays unrecorded.
    pub fn reduce(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(match self {
            Reducer::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Reducer::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Reducer::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 1 {
                    sorted[mid]
                } else {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                }
            }
        })
    }
}

/// `num / den`, undefined when the denominator is missing or zero. Never
/// produces an infinity or a placeholder zero.
fn ratio(num: Option<f64>, den: Option<f64>) -> Option<f64> {
    match (num, den) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

/// One (architecture, channels) group after reduction.
///
/// Ratios are computed from the reduced numerator and reduced denominator,
/// never by reducing the per-trial ratios, which would weight trials with
/// small denominators too heavily.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRecord {
    pub architecture: String,
    pub parallel_channels: u32,
    pub total_macs: u32,
    pub num_pe: u32,
    pub buffer_size_bytes: u32,
    pub samples: usize,
    pub dma_cycles: f64,
    pub compute_cycles: f64,
    pub total_cycles: f64,
    pub cache_references: Option<f64>,
    pub cache_misses: Option<f64>,
    pub hw_cycles: Option<f64>,
    pub instructions: Option<f64>,
    pub branches: Option<f64>,
    pub seconds: Option<f64>,
    pub miss_rate_pct: Option<f64>,
    pub ipc: Option<f64>,
    pub dma_ratio: Option<f64>,
    pub throughput_macs_per_cycle: Option<f64>,
    pub speedup_vs_baseline: Option<f64>,
}

/// Aggregation options beyond the reducer itself.
#[derive(Debug, Clone, Default)]
pub struct GroupOptions {
    /// Add buffer capacity as a tertiary grouping dimension.
    pub by_buffer: bool,
    /// Architecture label whose reduced total cycles anchor the speedup
    /// column, e.g. `TL`.
    pub baseline: Option<String>,
}

/// Group records by (architecture, channels[, buffer]) and reduce each group.
/// Output order is the key order, independent of input record order.
pub fn aggregate(
    records: &[BenchmarkRecord],
    reducer: Reducer,
    options: &GroupOptions,
) -> Vec<AggregatedRecord> {
    let mut groups: BTreeMap<(String, u32, Option<u32>), Vec<&BenchmarkRecord>> = BTreeMap::new();
    for rec in records {
        let tertiary = options.by_buffer.then_some(rec.buffer_size_bytes);
        groups
            .entry((rec.architecture.clone(), rec.parallel_channels, tertiary))
            .or_default()
            .push(rec);
    }

    let mut out: Vec<AggregatedRecord> = groups
        .into_iter()
        .map(|((architecture, parallel_channels, _), group)| {
            reduce_group(architecture, parallel_channels, &group, reducer)
        })
        .collect();

    if let Some(baseline) = options.baseline.as_deref() {
        let anchors: BTreeMap<u32, f64> = out
            .iter()
            .filter(|a| a.architecture == baseline)
            .map(|a| (a.parallel_channels, a.total_cycles))
            .collect();
        for agg in &mut out {
            agg.speedup_vs_baseline = ratio(
                anchors.get(&agg.parallel_channels).copied(),
                Some(agg.total_cycles),
            );
        }
    }
    out
}

fn reduce_group(
    architecture: String,
    parallel_channels: u32,
    group: &[&BenchmarkRecord],
    reducer: Reducer,
) -> AggregatedRecord {
    let required = |pick: fn(&BenchmarkRecord) -> u64| {
        let vals: Vec<f64> = group.iter().map(|&r| pick(r) as f64).collect();
        // groups are built from at least one record
        reducer.reduce(&vals).unwrap_or(0.0)
    };
    let optional = |pick: fn(&BenchmarkRecord) -> Option<u64>| {
        let vals: Vec<f64> = group
            .iter()
            .filter_map(|&r| pick(r).map(|v| v as f64))
            .collect();
        reducer.reduce(&vals)
    };

    let dma_cycles = required(|r| r.dma_cycles);
    let compute_cycles = required(|r| r.compute_cycles);
    let total_cycles = required(|r| r.total_cycles);
    let cache_references = optional(|r| r.cache_references);
    let cache_misses = optional(|r| r.cache_misses);
    let hw_cycles = optional(|r| r.hw_cycles);
    let instructions = optional(|r| r.instructions);
    let branches = optional(|r| r.branches);
    let seconds = {
        let vals: Vec<f64> = group.iter().filter_map(|r| r.seconds).collect();
        reducer.reduce(&vals)
    };

    let first = group[0];
    AggregatedRecord {
        architecture,
        parallel_channels,
        total_macs: first.total_macs,
        num_pe: first.num_pe,
        buffer_size_bytes: first.buffer_size_bytes,
        samples: group.len(),
        dma_cycles,
        compute_cycles,
        total_cycles,
        cache_references,
        cache_misses,
        hw_cycles,
        instructions,
        branches,
        seconds,
        miss_rate_pct: ratio(cache_misses, cache_references).map(|r| r * 100.0),
        ipc: ratio(instructions, hw_cycles),
        dma_ratio: ratio(Some(dma_cycles), Some(total_cycles)),
        throughput_macs_per_cycle: ratio(Some(first.total_macs as f64), Some(total_cycles)),
        speedup_vs_baseline: None,
    }
}

//! End-to-end pipeline over captured output text: derived trial parameters,
//! both stream parsers, record assembly, and aggregation, without launching
//! any instrumented process.

use perf_sweep::{
    aggregate, extract_survey, BenchmarkRecord, GroupOptions, NumberFormat, Reducer, ReportParser,
    ShapeArgs, TrialConfig,
};

const STDOUT: &str = "\
--- Configuration ---
Parallel Channels: 8
Buffer Size: 72 bytes
SURVEY_RESULT,100,500,600
Total Cycles: 600
";

const STDERR: &str = "\
 Performance counter stats for './isc':

         1.234.567      cpu_core/cache-references/
            56.789      cpu_core/cache-misses/

       0,004567000 seconds time elapsed
";

#[test]
fn captured_run_becomes_one_record() {
    let config = TrialConfig::derive("ISC", 8, &ShapeArgs::default());
    assert_eq!(config.num_pe, 24);
    assert_eq!(config.macs_per_pe, 3);
    assert_eq!(config.total_macs, 72);

    let sim = extract_survey(STDOUT).expect("survey line present");
    assert_eq!(
        (sim.dma_cycles, sim.compute_cycles, sim.total_cycles),
        (100, 500, 600)
    );

    let parser = ReportParser::new("cpu_core", NumberFormat::EUROPEAN);
    let counters = parser.parse(STDERR);
    assert_eq!(counters.cache_references, Some(1234567));
    assert_eq!(counters.cache_misses, Some(56789));
    assert_eq!(counters.seconds, Some(0.004567));

    let record = BenchmarkRecord::new(config, sim, counters);
    assert_eq!(record.architecture, "ISC");
    assert_eq!(record.total_cycles, 600);
    let rate = record.miss_rate_pct.expect("references were recorded");
    assert!((rate - 4.60).abs() < 0.01, "miss rate was {rate}");
}

#[test]
fn markerless_stdout_yields_no_record() {
    assert!(extract_survey("Total Cycles: 600\n").is_none());
}

#[test]
fn record_flows_through_aggregation() {
    let parser = ReportParser::new("cpu_core", NumberFormat::EUROPEAN);
    let record = BenchmarkRecord::new(
        TrialConfig::derive("ISC", 8, &ShapeArgs::default()),
        extract_survey(STDOUT).unwrap(),
        parser.parse(STDERR),
    );

    let agg = aggregate(
        &[record.clone(), record],
        Reducer::Median,
        &GroupOptions::default(),
    );
    assert_eq!(agg.len(), 1);
    assert_eq!(agg[0].samples, 2);
    assert_eq!(agg[0].total_cycles, 600.0);
    // dma ratio and throughput come from the reduced simulated cycles
    assert!((agg[0].dma_ratio.unwrap() - 100.0 / 600.0).abs() < 1e-12);
    assert!((agg[0].throughput_macs_per_cycle.unwrap() - 72.0 / 600.0).abs() < 1e-12);
    // hardware cycles were never measured, so ipc stays undefined
    assert_eq!(agg[0].ipc, None);
}

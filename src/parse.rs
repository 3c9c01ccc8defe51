//! Parsers for the two output streams of one instrumented run: the perf stat
//! free-text report on stderr and the application's survey marker line on
//! stdout.

use regex::Regex;

use crate::format::NumberFormat;

/// Counters read back from one perf stat report.
///
/// `None` means "not recorded": the line was absent, its value token was
/// malformed, or perf printed a `<not counted>` / `<not supported>` sentinel.
/// This is deliberately distinct from an explicit zero so the distinction
/// survives aggregation and serialization.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CounterSnapshot {
    pub cache_references: Option<u64>,
    pub cache_misses: Option<u64>,
    pub cycles: Option<u64>,
    pub instructions: Option<u64>,
    pub branches: Option<u64>,
    pub seconds: Option<f64>,
}

impl CounterSnapshot {
    /// Cache-miss percentage, undefined when references are missing or zero.
    pub fn miss_rate_pct(&self) -> Option<f64> {
        match (self.cache_misses, self.cache_references) {
            (Some(m), Some(r)) if r > 0 => Some(m as f64 / r as f64 * 100.0),
            _ => None,
        }
    }
}

/// Line-by-line parser for one perf stat text block.
///
/// Only metric lines under the configured event domain are read; lines under
/// other domains and perf's decorative output are ignored. Parsing never
/// fails, it degrades field by field.
#[derive(Debug)]
pub struct ReportParser {
    domain: String,
    format: NumberFormat,
    metric_re: Regex,
    time_re: Regex,
}

impl ReportParser {
    pub fn new(domain: &str, format: NumberFormat) -> Self {
        // e.g. "       1.234.567      cpu_core/cache-references/"
        //      "   <not counted>      cpu_atom/cycles/"
        let metric_re =
            Regex::new(r"^\s*(<not counted>|<not supported>|[0-9.,]+)\s+(\w+)/([\w-]+)/").unwrap();
        // e.g. "       0,004567000 seconds time elapsed"
        let time_re = Regex::new(r"([0-9.,]+)\s+seconds time elapsed").unwrap();
        Self {
            domain: domain.to_owned(),
            format,
            metric_re,
            time_re,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Parse one report into a snapshot. Each field is set at most once;
    /// the first matching line wins.
    pub fn parse(&self, text: &str) -> CounterSnapshot {
        let mut snap = CounterSnapshot::default();
        for line in text.lines() {
            if let Some(caps) = self.metric_re.captures(line) {
                if &caps[2] != self.domain {
                    continue;
                }
                // Sentinels fail parse_count and leave the field unrecorded.
                let value = self.format.parse_count(&caps[1]);
                let event = &caps[3];
                // Substring match tolerates tool-version suffixes on event names.
                if event.contains("cache-references") {
                    snap.cache_references = snap.cache_references.or(value);
                } else if event.contains("cache-misses") {
                    snap.cache_misses = snap.cache_misses.or(value);
                } else if event.contains("cycles") {
                    snap.cycles = snap.cycles.or(value);
                } else if event.contains("instructions") {
                    snap.instructions = snap.instructions.or(value);
                } else if event.contains("branches") {
                    snap.branches = snap.branches.or(value);
                }
            } else if let Some(caps) = self.time_re.captures(line) {
                snap.seconds = snap.seconds.or(self.format.parse_seconds(&caps[1]));
            }
        }
        snap
    }
}

/// Simulated cycle counts reported by the benchmarked application itself,
/// distinct from the hardware counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTriplet {
    pub dma_cycles: u64,
    pub compute_cycles: u64,
    pub total_cycles: u64,
}

/// Marker prefix of the application result line on stdout.
pub const SURVEY_MARKER: &str = "SURVEY_RESULT";

/// Find the `SURVEY_RESULT,<dma>,<compute>,<total>` line in a run's stdout.
/// Absence means the trial produced no usable result.
pub fn extract_survey(stdout: &str) -> Option<CycleTriplet> {
    let re = Regex::new(r"SURVEY_RESULT,(\d+),(\d+),(\d+)").unwrap();
    let caps = re.captures(stdout)?;
    Some(CycleTriplet {
        dma_cycles: caps[1].parse().ok()?,
        compute_cycles: caps[2].parse().ok()?,
        total_cycles: caps[3].parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
 Performance counter stats for './isc':

         1.234.567      cpu_core/cache-references/
            56.789      cpu_core/cache-misses/
        27.687.235      cpu_core/cycles/
        41.000.123      cpu_core/instructions/
         3.456.789      cpu_core/branches/
           287.215      cpu_atom/cache-references/

       0,004567000 seconds time elapsed
";

    fn parser() -> ReportParser {
        ReportParser::new("cpu_core", NumberFormat::EUROPEAN)
    }

    #[test]
    fn parses_all_fields_under_configured_domain() {
        let snap = parser().parse(REPORT);
        assert_eq!(snap.cache_references, Some(1234567));
        assert_eq!(snap.cache_misses, Some(56789));
        assert_eq!(snap.cycles, Some(27687235));
        assert_eq!(snap.instructions, Some(41000123));
        assert_eq!(snap.branches, Some(3456789));
        assert_eq!(snap.seconds, Some(0.004567));
    }

    #[test]
    fn other_domains_are_ignored_not_errors() {
        let snap = ReportParser::new("cpu_atom", NumberFormat::EUROPEAN).parse(REPORT);
        assert_eq!(snap.cache_references, Some(287215));
        // no cpu_atom cycles line in the report
        assert_eq!(snap.cycles, None);
    }

    #[test]
    fn not_counted_is_distinct_from_zero() {
        let text = "\
     <not counted>      cpu_core/cache-misses/
                 0      cpu_core/cache-references/
";
        let snap = parser().parse(text);
        assert_eq!(snap.cache_misses, None);
        assert_eq!(snap.cache_references, Some(0));
    }

    #[test]
    fn malformed_value_leaves_field_unrecorded() {
        let text = "        12x34      cpu_core/branches/\n";
        let snap = parser().parse(text);
        assert_eq!(snap.branches, None);
    }

    #[test]
    fn first_matching_line_wins() {
        let text = "\
               100      cpu_core/cycles/
               999      cpu_core/cycles/
";
        assert_eq!(parser().parse(text).cycles, Some(100));
    }

    #[test]
    fn event_suffix_variants_still_classify() {
        let text = "         1.000      cpu_core/cache-misses_v2/\n";
        assert_eq!(parser().parse(text).cache_misses, Some(1000));
    }

    #[test]
    fn miss_rate_undefined_without_references() {
        let mut snap = CounterSnapshot {
            cache_misses: Some(10),
            ..Default::default()
        };
        assert_eq!(snap.miss_rate_pct(), None);
        snap.cache_references = Some(0);
        assert_eq!(snap.miss_rate_pct(), None);
        snap.cache_references = Some(1000);
        assert_eq!(snap.miss_rate_pct(), Some(1.0));
    }

    #[test]
    fn survey_line_extraction() {
        let out = "--- Configuration ---\nSURVEY_RESULT,100,500,600\n";
        let t = extract_survey(out).unwrap();
        assert_eq!(t.dma_cycles, 100);
        assert_eq!(t.compute_cycles, 500);
        assert_eq!(t.total_cycles, 600);
    }

    #[test]
    fn missing_survey_line_is_none() {
        assert_eq!(extract_survey("Total Cycles: 600\n"), None);
    }
}

//! Retroactive reprocessing of an aggregated perf log: a single file holding
//! the concatenated `perf stat` output of many commands, each block preceded
//! by perf's own header line naming the command.

use regex::Regex;

use crate::parse::{CounterSnapshot, ReportParser};

/// One command's slice of an aggregated log.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandReport {
    pub command: String,
    pub counters: CounterSnapshot,
}

/// Split a concatenated log on `Performance counter stats for '<cmd>':`
/// headers into ordered (command, block text) pairs. Text before the first
/// header is discarded.
pub fn split_blocks(content: &str) -> Vec<(String, String)> {
    let header_re = Regex::new(r"Performance counter stats for '([^']+)':").unwrap();
    let mut blocks = Vec::new();
    let mut pending: Option<(String, usize)> = None;
    for caps in header_re.captures_iter(content) {
        let whole = caps.get(0).unwrap();
        if let Some((command, start)) = pending.take() {
            blocks.push((command, content[start..whole.start()].to_owned()));
        }
        pending = Some((caps[1].to_owned(), whole.end()));
    }
    if let Some((command, start)) = pending {
        blocks.push((command, content[start..].to_owned()));
    }
    blocks
}

/// Split an aggregated log and parse every block with the same parser used
/// for live runs, so a block parsed in place yields the same snapshot as the
/// block parsed on its own.
pub fn parse_log(content: &str, parser: &ReportParser) -> Vec<CommandReport> {
    split_blocks(content)
        .into_iter()
        .map(|(command, block)| CommandReport {
            command,
            counters: parser.parse(&block),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::NumberFormat;

    const LOG: &str = "\
 Performance counter stats for './tl1':

        27.687.235      cpu_core/cycles/
         1.234.567      cpu_core/cache-references/

       0,022675880 seconds time elapsed

 Performance counter stats for './ws2':

     <not counted>      cpu_core/cycles/
            87.654      cpu_core/cache-references/

       0,010000000 seconds time elapsed
";

    fn parser() -> ReportParser {
        ReportParser::new("cpu_core", NumberFormat::EUROPEAN)
    }

    #[test]
    fn splits_in_command_order() {
        let blocks = split_blocks(LOG);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].0, "./tl1");
        assert_eq!(blocks[1].0, "./ws2");
        assert!(blocks[0].1.contains("27.687.235"));
        assert!(!blocks[0].1.contains("87.654"));
    }

    #[test]
    fn parses_each_block() {
        let reports = parse_log(LOG, &parser());
        assert_eq!(reports[0].counters.cycles, Some(27687235));
        assert_eq!(reports[0].counters.seconds, Some(0.02267588));
        // <not counted> stays distinguishable from zero
        assert_eq!(reports[1].counters.cycles, None);
        assert_eq!(reports[1].counters.cache_references, Some(87654));
    }

    #[test]
    fn split_then_parse_matches_direct_parse() {
        let parser = parser();
        let direct = parser.parse(
            "        27.687.235      cpu_core/cycles/\n         1.234.567      cpu_core/cache-references/\n       0,022675880 seconds time elapsed\n",
        );
        assert_eq!(parse_log(LOG, &parser)[0].counters, direct);
    }

    #[test]
    fn empty_input_yields_no_blocks() {
        assert!(split_blocks("").is_empty());
        assert!(split_blocks("no headers here\n").is_empty());
    }
}

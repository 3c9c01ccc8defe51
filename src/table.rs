//! Flat tabular persistence: one row per record, written once per sweep
//! completion. Unrecorded counters become empty cells, never zeros.

use std::fs::File;
use std::io;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::aggregate::AggregatedRecord;
use crate::logfile::CommandReport;
use crate::sweep::BenchmarkRecord;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("io error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("csv error on '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

fn io_err(path: &Path, source: io::Error) -> TableError {
    TableError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn csv_err(path: &Path, source: csv::Error) -> TableError {
    TableError::Csv {
        path: path.display().to_string(),
        source,
    }
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), TableError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_err(path, e))?;
    for row in rows {
        wtr.serialize(row).map_err(|e| csv_err(path, e))?;
    }
    wtr.flush().map_err(|e| io_err(path, e))?;
    Ok(())
}

pub fn write_records(path: &Path, records: &[BenchmarkRecord]) -> Result<(), TableError> {
    write_csv(path, records)
}

pub fn read_records(path: &Path) -> Result<Vec<BenchmarkRecord>, TableError> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| csv_err(path, e))?;
    let mut records = Vec::new();
    for row in rdr.deserialize() {
        records.push(row.map_err(|e| csv_err(path, e))?);
    }
    Ok(records)
}

pub fn write_aggregates(path: &Path, aggregates: &[AggregatedRecord]) -> Result<(), TableError> {
    write_csv(path, aggregates)
}

/// Flat row shape for the retroactive log table; csv does not flatten
/// nested structs, so the snapshot fields are spelled out.
#[derive(Debug, Serialize)]
struct LogRow<'a> {
    command: &'a str,
    cache_references: Option<u64>,
    cache_misses: Option<u64>,
    cycles: Option<u64>,
    instructions: Option<u64>,
    branches: Option<u64>,
    seconds: Option<f64>,
    miss_rate_pct: Option<f64>,
}

pub fn write_log_reports(path: &Path, reports: &[CommandReport]) -> Result<(), TableError> {
    let rows: Vec<LogRow<'_>> = reports
        .iter()
        .map(|r| LogRow {
            command: &r.command,
            cache_references: r.counters.cache_references,
            cache_misses: r.counters.cache_misses,
            cycles: r.counters.cycles,
            instructions: r.counters.instructions,
            branches: r.counters.branches,
            seconds: r.counters.seconds,
            miss_rate_pct: r.counters.miss_rate_pct(),
        })
        .collect();
    write_csv(path, &rows)
}

/// JSON sink for the same records, for consumers that want structure over
/// a table.
pub fn write_records_json(path: &Path, records: &[BenchmarkRecord]) -> Result<(), TableError> {
    let file = File::create(path).map_err(|e| io_err(path, e))?;
    serde_json::to_writer_pretty(file, records)
        .map_err(|e| io_err(path, io::Error::new(io::ErrorKind::InvalidData, e)))?;
    Ok(())
}

//! CSV Sink and Reader
//!
//! The sink writes the header once at creation and flushes after every row,
//! so an interrupted sweep leaves a valid file holding every finished run.

use crate::aggregate::AggregateReport;
use crate::record::{SWEEP_COLUMNS, SweepRecord};
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while writing or reading sweep files
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("Cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Append-only CSV sink for sweep records
pub struct CsvSink<W: Write> {
    writer: ::csv::Writer<W>,
    rows: usize,
}

impl<W: Write> CsvSink<W> {
    /// Wrap `inner` and write the header row
    pub fn new(inner: W) -> Result<Self, SinkError> {
        let mut writer = ::csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(::csv::Terminator::Any(b'\n'))
            .from_writer(inner);
        writer.write_record(SWEEP_COLUMNS)?;
        writer.flush()?;
        Ok(Self { writer, rows: 0 })
    }

    /// Append one row and flush it
    pub fn append(&mut self, record: &SweepRecord) -> Result<(), SinkError> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far (header excluded)
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|e| flush_error(e.error()))
    }
}

impl CsvSink<File> {
    /// Create (or truncate) the file at `path`, creating parent directories
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        ensure_parent(path)?;
        let file = File::create(path).map_err(|source| SinkError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(file)
    }

    /// Create the file at `path`, failing if it already exists
    pub fn create_new(path: &Path) -> Result<Self, SinkError> {
        ensure_parent(path)?;
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|source| SinkError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Self::new(file)
    }

    /// Create `path`, or the first of `<stem>-1.csv`, `<stem>-2.csv`, ...
    /// that does not exist yet. Returns the path actually created.
    pub fn create_numbered(path: &Path) -> Result<(PathBuf, Self), SinkError> {
        for candidate in numbered_paths(path) {
            match Self::create_new(&candidate) {
                Ok(sink) => return Ok((candidate, sink)),
                // Taken, possibly by a concurrent sweep since the last attempt
                Err(SinkError::Open { source, .. })
                    if source.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e),
            }
        }
        Err(SinkError::Open {
            path: path.to_path_buf(),
            source: std::io::Error::from(ErrorKind::AlreadyExists),
        })
    }
}

fn flush_error(err: &std::io::Error) -> SinkError {
    SinkError::Io(std::io::Error::new(err.kind(), err.to_string()))
}

fn ensure_parent(path: &Path) -> Result<(), SinkError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).map_err(|source| SinkError::Open {
                path: dir.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}

/// `<directory>/results_<label>_<YYYYmmdd-HHMMSS>.csv`
pub fn default_sink_path(directory: &Path, label: &str, at: &DateTime<Local>) -> PathBuf {
    directory.join(format!(
        "results_{}_{}.csv",
        label,
        at.format("%Y%m%d-%H%M%S")
    ))
}

/// `path` followed by `<stem>-1.csv`, `<stem>-2.csv`, ...
fn numbered_paths(path: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    std::iter::once(path.to_path_buf())
        .chain((1u32..).map(move |n| path.with_file_name(format!("{}-{}{}", stem, n, ext))))
}

/// Parse every row of a sweep file
pub fn read_records<R: Read>(reader: R) -> Result<Vec<SweepRecord>, SinkError> {
    let mut reader = ::csv::Reader::from_reader(reader);
    let records = reader
        .deserialize::<SweepRecord>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Parse every row of the sweep file at `path`
pub fn read_records_from_path(path: &Path) -> Result<Vec<SweepRecord>, SinkError> {
    let file = File::open(path).map_err(|source| SinkError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_records(file)
}

/// Render an aggregate report as CSV, one row per axis value
pub fn generate_csv_report(report: &AggregateReport) -> Result<String, SinkError> {
    let mut writer = ::csv::WriterBuilder::new()
        .terminator(::csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record([
        report.axis.as_str(),
        "runs",
        "tps_mean",
        "tps_median",
        "tps_std",
        "tps_min",
        "tps_max",
        "latency_ms",
        "latency_std_ms",
        "errors",
        "failed_runs",
    ])?;

    let opt = |v: Option<f64>| v.map(|v| format!("{:.3}", v)).unwrap_or_default();
    for group in &report.groups {
        let tps = group.tps.as_ref();
        writer.write_record([
            group.value.to_string(),
            group.runs.to_string(),
            opt(tps.map(|s| s.mean)),
            opt(tps.map(|s| s.median)),
            opt(tps.map(|s| s.std_dev)),
            opt(tps.map(|s| s.min)),
            opt(tps.map(|s| s.max)),
            opt(group.latency_ms),
            opt(group.latency_std_ms),
            group.errors.to_string(),
            group.failed_runs.to_string(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| flush_error(e.error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(clients: u32, run_index: u32, tps: Option<f64>) -> SweepRecord {
        SweepRecord {
            timestamp: "2026-03-14T09:26:53".to_string(),
            sql_file: "timeline.sql".to_string(),
            n_users: 10_000,
            clients,
            fanout: None,
            duration_s: 30,
            run_index,
            tps,
            latency_ms: Some(1.5),
            latency_std_ms: None,
            errors: 0,
            returncode: 0,
            cmd: format!("pgbench -c {}", clients),
        }
    }

    fn written(rows: &[SweepRecord]) -> String {
        let mut sink = CsvSink::new(Vec::new()).unwrap();
        for r in rows {
            sink.append(r).unwrap();
        }
        String::from_utf8(sink.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_header_written_without_rows() {
        let text = written(&[]);
        assert_eq!(text, format!("{}\n", SWEEP_COLUMNS.join(",")));
    }

    #[test]
    fn test_absent_values_are_empty_fields() {
        let text = written(&[row(4, 1, None)]);
        let line = text.lines().nth(1).unwrap();
        assert_eq!(
            line,
            "2026-03-14T09:26:53,timeline.sql,10000,4,,30,1,,1.5,,0,0,pgbench -c 4"
        );
    }

    #[test]
    fn test_delimiters_in_command_are_quoted() {
        let mut r = row(1, 1, Some(2.0));
        r.cmd = "pgbench --extra a,b".to_string();
        let text = written(&[r.clone()]);
        assert!(text.contains("\"pgbench --extra a,b\""));

        let back = read_records(text.as_bytes()).unwrap();
        assert_eq!(back, vec![r]);
    }

    #[test]
    fn test_rows_read_back_in_order() {
        let rows = vec![row(1, 1, Some(10.0)), row(1, 2, None), row(2, 1, Some(20.5))];
        let back = read_records(written(&rows).as_bytes()).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn test_reads_file_without_fanout_columns() {
        let text = "\
timestamp,sql_file,n_users,clients,duration_s,run_index,tps,latency_ms,errors,returncode,cmd
2026-03-14T09:26:53,timeline.sql,10000,4,30,1,812.5,4.9,0,0,pgbench
";
        let back = read_records(text.as_bytes()).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].fanout, None);
        assert_eq!(back[0].latency_std_ms, None);
        assert_eq!(back[0].tps, Some(812.5));
    }

    #[test]
    fn test_create_writes_through_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.csv");
        let mut sink = CsvSink::create(&path).unwrap();
        sink.append(&row(8, 1, Some(1.0))).unwrap();

        // Flushed per row: readable while the sink is still open
        let back = read_records_from_path(&path).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(sink.rows(), 1);
    }

    #[test]
    fn test_create_new_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "keep me").unwrap();

        assert!(matches!(
            CsvSink::create_new(&path),
            Err(SinkError::Open { .. })
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");
    }

    #[test]
    fn test_default_sink_path() {
        let dir = tempfile::tempdir().unwrap();
        let at = Local.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let path = default_sink_path(dir.path(), "timeline", &at);
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            "results_timeline_20260314-092653.csv"
        );
    }

    #[test]
    fn test_create_numbered_skips_taken_paths() {
        let dir = tempfile::tempdir().unwrap();
        let at = Local.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let path = default_sink_path(dir.path(), "timeline", &at);

        let (first, _sink) = CsvSink::create_numbered(&path).unwrap();
        assert_eq!(first, path);

        // A file created by another sweep after ours is skipped, not reported
        let taken = dir.path().join("results_timeline_20260314-092653-1.csv");
        std::fs::write(&taken, "other sweep").unwrap();

        let (second, _sink) = CsvSink::create_numbered(&path).unwrap();
        assert_eq!(
            second.file_name().unwrap().to_string_lossy(),
            "results_timeline_20260314-092653-2.csv"
        );
        assert_eq!(std::fs::read_to_string(&taken).unwrap(), "other sweep");
    }
}

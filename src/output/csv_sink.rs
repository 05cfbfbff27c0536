//! Incremental CSV persistence
//!
//! Rows are buffered and written in batches. Each batch is encoded in memory
//! first and then written to the file in one call under the lock, so a row is
//! never split across two writes and a failed batch leaves earlier rows intact.

use crate::output::traits::CsvRow;
use crate::{SinkError, SinkResult};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// How a sink opens and batches its file
#[derive(Debug, Clone, Copy)]
pub struct SinkOptions {
    /// Rows buffered before a write
    pub batch_size: usize,

    /// Write a header row when the file is empty
    pub write_header: bool,

    /// Keep existing content instead of truncating
    pub append: bool,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            write_header: true,
            append: false,
        }
    }
}

impl From<&crate::config::OutputConfig> for SinkOptions {
    fn from(config: &crate::config::OutputConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            write_header: config.write_header,
            append: config.append,
        }
    }
}

struct SinkState<R> {
    file: File,
    pending: Vec<R>,
}

/// Thread-safe, batching CSV writer
///
/// Pending rows are flushed when the batch fills, on `flush`, and on drop.
pub struct CsvSink<R: CsvRow> {
    path: PathBuf,
    batch_size: usize,
    state: Mutex<SinkState<R>>,
    rows_written: AtomicU64,
    failed_batches: AtomicU64,
}

impl<R: CsvRow> CsvSink<R> {
    /// Opens (or creates) the output file
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Open` if the file cannot be opened at all; this is
    /// the one sink failure that should abort a run.
    pub fn create(path: &Path, options: SinkOptions) -> SinkResult<Self> {
        let existing_len = if options.append {
            std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
        } else {
            0
        };

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(options.append)
            .truncate(!options.append)
            .open(path)
            .map_err(|source| SinkError::Open {
                path: path.display().to_string(),
                source,
            })?;

        if options.write_header && existing_len == 0 {
            let header = encode_records(std::iter::once(
                R::HEADER.iter().map(|s| s.to_string()).collect(),
            ))?;
            file.write_all(&header)?;
            file.flush()?;
        }

        tracing::debug!("Opened output {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            batch_size: options.batch_size.max(1),
            state: Mutex::new(SinkState {
                file,
                pending: Vec::new(),
            }),
            rows_written: AtomicU64::new(0),
            failed_batches: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Buffers rows, writing them out once a full batch is pending
    ///
    /// # Errors
    ///
    /// Returns the batch's write error. The batch is dropped and counted as
    /// failed; rows written earlier are unaffected and the sink stays usable.
    pub fn append(&self, rows: Vec<R>) -> SinkResult<()> {
        let mut state = self.state.lock().map_err(|_| SinkError::Poisoned)?;
        state.pending.extend(rows);

        if state.pending.len() >= self.batch_size {
            self.write_pending(&mut state)?;
        }

        Ok(())
    }

    /// Writes every pending row
    pub fn flush(&self) -> SinkResult<()> {
        let mut state = self.state.lock().map_err(|_| SinkError::Poisoned)?;
        self.write_pending(&mut state)
    }

    /// Writes the remainder and closes the sink, returning the rows written
    pub fn finish(self) -> SinkResult<u64> {
        self.flush()?;
        Ok(self.rows_written())
    }

    /// Rows successfully written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written.load(Ordering::Relaxed)
    }

    /// Batches that failed to write
    pub fn failed_batches(&self) -> u64 {
        self.failed_batches.load(Ordering::Relaxed)
    }

    fn write_pending(&self, state: &mut SinkState<R>) -> SinkResult<()> {
        if state.pending.is_empty() {
            return Ok(());
        }

        let batch = std::mem::take(&mut state.pending);
        let count = batch.len() as u64;

        let result = encode_records(batch.iter().map(|row| row.fields())).and_then(|bytes| {
            state.file.write_all(&bytes)?;
            state.file.flush()?;
            Ok(())
        });

        match result {
            Ok(()) => {
                self.rows_written.fetch_add(count, Ordering::Relaxed);
                tracing::debug!("Wrote {} rows to {}", count, self.path.display());
                Ok(())
            }
            Err(e) => {
                self.failed_batches.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    "Failed to write {} rows to {}: {}",
                    count,
                    self.path.display(),
                    e
                );
                Err(e)
            }
        }
    }
}

impl<R: CsvRow> Drop for CsvSink<R> {
    fn drop(&mut self) {
        let state = match self.state.get_mut() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if state.pending.is_empty() {
            return;
        }

        let pending = std::mem::take(&mut state.pending);
        let count = pending.len();
        let result = encode_records(pending.iter().map(|row| row.fields())).and_then(|bytes| {
            state.file.write_all(&bytes)?;
            state.file.flush()?;
            Ok(())
        });

        if let Err(e) = result {
            tracing::error!(
                "Failed to write {} pending rows to {} on close: {}",
                count,
                self.path.display(),
                e
            );
        }
    }
}

/// Encodes records as CSV bytes
fn encode_records<I>(records: I) -> SinkResult<Vec<u8>>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    for record in records {
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| SinkError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::DetailLink;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn read_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn links(prefix: &str, n: usize) -> Vec<DetailLink> {
        (0..n)
            .map(|i| DetailLink::new(format!("https://example.com/mip/{}-{}", prefix, i)))
            .collect()
    }

    #[test]
    fn test_header_written_for_new_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.csv");
        let sink = CsvSink::<DetailLink>::create(&path, SinkOptions::default()).unwrap();
        sink.flush().unwrap();

        assert_eq!(read_lines(&path), vec!["Scraped URLs"]);
    }

    #[test]
    fn test_no_header_when_disabled() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.csv");
        let options = SinkOptions {
            write_header: false,
            ..SinkOptions::default()
        };
        let sink = CsvSink::<DetailLink>::create(&path, options).unwrap();
        sink.append(links("a", 2)).unwrap();
        sink.flush().unwrap();

        assert_eq!(read_lines(&path).len(), 2);
    }

    #[test]
    fn test_rows_held_until_batch_fills() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.csv");
        let options = SinkOptions {
            batch_size: 3,
            write_header: false,
            append: false,
        };
        let sink = CsvSink::<DetailLink>::create(&path, options).unwrap();

        sink.append(links("a", 2)).unwrap();
        assert_eq!(sink.rows_written(), 0);
        assert_eq!(read_lines(&path).len(), 0);

        sink.append(links("b", 1)).unwrap();
        assert_eq!(sink.rows_written(), 3);
        assert_eq!(read_lines(&path).len(), 3);
    }

    #[test]
    fn test_drop_flushes_remainder() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.csv");
        {
            let sink = CsvSink::<DetailLink>::create(&path, SinkOptions::default()).unwrap();
            sink.append(links("a", 5)).unwrap();
        }

        assert_eq!(read_lines(&path).len(), 6);
    }

    #[test]
    fn test_finish_reports_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.csv");
        let sink = CsvSink::<DetailLink>::create(&path, SinkOptions::default()).unwrap();
        sink.append(links("a", 4)).unwrap();

        assert_eq!(sink.finish().unwrap(), 4);
        assert_eq!(read_lines(&path).len(), 5);
    }

    #[test]
    fn test_append_mode_keeps_existing_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.csv");

        let sink = CsvSink::<DetailLink>::create(&path, SinkOptions::default()).unwrap();
        sink.append(links("a", 2)).unwrap();
        drop(sink);

        let options = SinkOptions {
            append: true,
            ..SinkOptions::default()
        };
        let sink = CsvSink::<DetailLink>::create(&path, options).unwrap();
        sink.append(links("b", 2)).unwrap();
        drop(sink);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines.iter().filter(|l| *l == "Scraped URLs").count(), 1);
    }

    #[test]
    fn test_fields_with_commas_are_quoted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("details.csv");
        let sink =
            CsvSink::<crate::crawler::BusinessRecord>::create(&path, SinkOptions::default())
                .unwrap();
        let record = crate::crawler::BusinessRecord {
            name: "Smith, Jones & Co".to_string(),
            emails: ["a@x.com".to_string(), "b@x.com".to_string()].into(),
            ..Default::default()
        };
        sink.append(vec![record]).unwrap();
        sink.flush().unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][1], "Smith, Jones & Co");
        assert_eq!(&rows[0][2], "a@x.com, b@x.com");
    }

    #[test]
    fn test_unopenable_path() {
        let result = CsvSink::<DetailLink>::create(
            Path::new("/nonexistent-dir/links.csv"),
            SinkOptions::default(),
        );
        assert!(matches!(result, Err(SinkError::Open { .. })));
    }

    #[test]
    fn test_concurrent_batches_are_not_interleaved() {
        const WORKERS: usize = 8;
        const BATCHES: usize = 25;
        const BATCH_SIZE: usize = 10;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.csv");
        let options = SinkOptions {
            batch_size: BATCH_SIZE,
            write_header: false,
            append: false,
        };
        let sink = Arc::new(CsvSink::<DetailLink>::create(&path, options).unwrap());

        let handles: Vec<_> = (0..WORKERS)
            .map(|worker| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for batch in 0..BATCHES {
                        sink.append(links(&format!("w{}-b{}", worker, batch), BATCH_SIZE))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        sink.flush().unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), WORKERS * BATCHES * BATCH_SIZE);
        assert_eq!(sink.rows_written() as usize, lines.len());
        for line in &lines {
            assert!(line.starts_with("https://example.com/mip/w"), "bad row: {}", line);
            assert_eq!(line.matches("https://").count(), 1, "interleaved row: {}", line);
        }
    }
}

//! JSON Lines export and import of chunk records.
//!
//! Each line is one complete [`ChunkRecord`], so snapshots can be streamed,
//! appended to and inspected with line tools.

use serde::Serialize;
use std::io::{BufRead, BufWriter, Write};

use super::record::ChunkRecord;
use crate::error::PrimsResult;

/// Statistics from an export operation.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ExportStats {
    /// Total chunks processed.
    pub total: u64,
    /// Successfully exported chunks.
    pub exported: u64,
    /// Error messages for failed exports.
    pub errors: Vec<String>,
}

impl ExportStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if export completed without errors.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.total == self.exported
    }
}

/// Statistics from an import operation.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportStats {
    /// Total non-empty lines processed.
    pub total: u64,
    /// Successfully imported chunks.
    pub imported: u64,
    /// Error messages for failed lines.
    pub errors: Vec<String>,
}

impl ImportStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if import completed without errors.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the error rate as a percentage.
    pub fn error_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.errors.len() as f64 / self.total as f64) * 100.0
        }
    }
}

/// Write records as JSON Lines.
///
/// A record that fails to serialize is counted as an error and skipped;
/// failing to write is an IO error.
pub fn export_jsonl<W, I>(records: I, writer: W) -> PrimsResult<ExportStats>
where
    W: Write,
    I: IntoIterator<Item = ChunkRecord>,
{
    let mut stats = ExportStats::new();
    let mut writer = BufWriter::new(writer);

    for record in records {
        stats.total += 1;
        match serde_json::to_string(&record) {
            Ok(json) => {
                writer.write_all(json.as_bytes())?;
                writer.write_all(b"\n")?;
                stats.exported += 1;
            }
            Err(e) => {
                stats
                    .errors
                    .push(format!("Serialization error for chunk {}: {}", record.name, e));
            }
        }
    }

    writer.flush()?;
    Ok(stats)
}

/// Read JSON Lines records, handing each to `import`.
///
/// Empty lines are skipped. Malformed lines and records rejected by
/// `import` are counted as errors and don't abort the import.
pub fn import_jsonl<R, F>(reader: R, mut import: F) -> PrimsResult<ImportStats>
where
    R: BufRead,
    F: FnMut(ChunkRecord) -> PrimsResult<()>,
{
    let mut stats = ImportStats::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        stats.total += 1;

        match serde_json::from_str::<ChunkRecord>(line) {
            Ok(record) => {
                let name = record.name.clone();
                match import(record) {
                    Ok(()) => stats.imported += 1,
                    Err(e) => stats.errors.push(format!("Import error for chunk {}: {}", name, e)),
                }
            }
            Err(e) => {
                stats
                    .errors
                    .push(format!("Parse error at line {}: {}", stats.total, e));
            }
        }
    }

    Ok(stats)
}

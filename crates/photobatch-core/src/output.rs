//! Batch report formatting as JSON or JSON Lines.
//!
//! JSON writes the whole [`BatchResult`] as one document. JSON Lines writes
//! one record per written file and per failure, followed by a summary line,
//! so reports of large batches can be streamed through line-oriented tools.

use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

use crate::types::{BatchResult, ItemFailure};

/// Report format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Single JSON document
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl ReportFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// One line of a JSON Lines report.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ReportRecord<'a> {
    Output {
        path: &'a Path,
    },
    Failure(&'a ItemFailure),
    Summary {
        total: usize,
        processed: usize,
        succeeded: usize,
        failed: usize,
        cancelled: bool,
    },
}

/// Serializes batch results to a writer.
pub struct ReportWriter<W: Write> {
    writer: W,
    format: ReportFormat,
    pretty: bool,
    records_written: usize,
}

impl<W: Write> ReportWriter<W> {
    /// Create a new report writer.
    ///
    /// `pretty` only affects the JSON format; JSON Lines is always compact.
    pub fn new(writer: W, format: ReportFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            records_written: 0,
        }
    }

    /// Write the report for `result`.
    pub fn write_result(&mut self, result: &BatchResult) -> io::Result<()> {
        match self.format {
            ReportFormat::Json => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, result)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, result).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
                self.records_written += 1;
            }
            ReportFormat::JsonLines => {
                for path in &result.outputs {
                    self.write_line(&ReportRecord::Output { path })?;
                }
                for failure in &result.failures {
                    self.write_line(&ReportRecord::Failure(failure))?;
                }
                self.write_line(&ReportRecord::Summary {
                    total: result.total,
                    processed: result.processed,
                    succeeded: result.succeeded,
                    failed: result.failed(),
                    cancelled: result.cancelled,
                })?;
            }
        }
        Ok(())
    }

    fn write_line<T: Serialize>(&mut self, record: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record).map_err(io::Error::other)?;
        writeln!(self.writer)?;
        self.records_written += 1;
        Ok(())
    }

    /// Get the number of records written.
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

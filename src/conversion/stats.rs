//! Statistics for parse and format sessions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Counters collected by a reader or writer session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseStatistics {
    /// Physical lines pulled from the input, blank ones included
    pub lines_read: usize,
    /// Top-level records parsed, structurally sound
    pub records_parsed: usize,
    /// Lines skipped in lenient mode
    pub unmatched_lines: usize,
    /// Field conversion failures across all records
    pub field_errors: usize,
    /// Records abandoned on a structural error
    pub structural_errors: usize,
    /// Records written by a writer session
    pub records_written: usize,
    /// Physical lines written by a writer session
    pub lines_written: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// Timestamp of when statistics were collected
    pub collected_at: chrono::DateTime<chrono::Utc>,
}

impl Default for ParseStatistics {
    fn default() -> Self {
        Self {
            lines_read: 0,
            records_parsed: 0,
            unmatched_lines: 0,
            field_errors: 0,
            structural_errors: 0,
            records_written: 0,
            lines_written: 0,
            processing_time_ms: 0,
            collected_at: chrono::Utc::now(),
        }
    }
}

impl ParseStatistics {
    /// Create new empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the wall time a session took
    pub fn finish(&mut self, elapsed: Duration) {
        self.processing_time_ms = elapsed.as_millis() as u64;
        self.collected_at = chrono::Utc::now();
    }

    /// Combine statistics from another session
    pub fn combine(&mut self, other: &Self) {
        self.lines_read += other.lines_read;
        self.records_parsed += other.records_parsed;
        self.unmatched_lines += other.unmatched_lines;
        self.field_errors += other.field_errors;
        self.structural_errors += other.structural_errors;
        self.records_written += other.records_written;
        self.lines_written += other.lines_written;
        self.processing_time_ms += other.processing_time_ms;
        self.collected_at = chrono::Utc::now();
    }

    /// True when no error of any kind was counted
    pub fn is_clean(&self) -> bool {
        self.unmatched_lines == 0 && self.field_errors == 0 && self.structural_errors == 0
    }

    /// Get a formatted summary
    pub fn summary(&self) -> String {
        format!(
            "Read {} lines into {} records in {:.3}s - {} unmatched, {} field errors, {} structural errors",
            self.lines_read,
            self.records_parsed,
            self.processing_time_ms as f32 / 1000.0,
            self.unmatched_lines,
            self.field_errors,
            self.structural_errors
        )
    }

    /// Export to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

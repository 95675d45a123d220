use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use carwash_core::Value;

use crate::errors::ScrubError;
use crate::formatter::FormatterShape;

/// Options for the scrub engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrubOptions {
    /// Records fetched per page.
    pub page_size: usize,
    /// Limit for every page fetch and record write.
    pub io_timeout_ms: u64,
    /// Tables scrubbed at the same time.
    pub table_concurrency: usize,
    /// Restrict the run to these configured tables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<String>>,
}

impl Default for ScrubOptions {
    fn default() -> Self {
        Self {
            page_size: 500,
            io_timeout_ms: 30_000,
            table_concurrency: 1,
            tables: None,
        }
    }
}

impl ScrubOptions {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ScrubError> {
        if self.page_size == 0 {
            return Err(ScrubError::InvalidOptions("page_size must be >= 1".to_string()));
        }
        if self.table_concurrency == 0 {
            return Err(ScrubError::InvalidOptions(
                "table_concurrency must be >= 1".to_string(),
            ));
        }
        if self.io_timeout_ms == 0 {
            return Err(ScrubError::InvalidOptions(
                "io_timeout_ms must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Some records or tables failed; everything else was scrubbed.
    CompletedWithErrors,
    /// Stopped by a shutdown signal.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    Completed,
    /// Paging failed; later pages were not processed.
    Aborted { code: String, message: String },
    /// Not scrubbed at all.
    Skipped { reason: String },
    /// Stopped between pages by a shutdown signal.
    Cancelled,
}

/// Summary of a scrubbed table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub shape: FormatterShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    pub pages: u64,
    pub records_read: u64,
    pub records_scrubbed: u64,
    pub records_failed: u64,
    pub duration_ms: u64,
    pub outcome: TableOutcome,
}

impl TableReport {
    pub fn new(table: impl Into<String>, shape: FormatterShape) -> Self {
        Self {
            table: table.into(),
            shape,
            primary_key: None,
            pages: 0,
            records_read: 0,
            records_scrubbed: 0,
            records_failed: 0,
            duration_ms: 0,
            outcome: TableOutcome::Completed,
        }
    }
}

/// Structured scrub warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrubIssue {
    pub level: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ScrubIssue {
    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            level: "warning".to_string(),
            code: code.to_string(),
            message: message.into(),
            table: None,
            field: None,
        }
    }

    pub fn with_table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    pub fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }
}

/// A record that was left as it was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordFailure {
    pub table: String,
    pub key: Value,
    pub code: String,
    pub message: String,
}

/// Report for a scrub run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrubReport {
    pub run_id: String,
    pub status: RunStatus,
    pub started_at: String,
    pub duration_ms: u64,
    pub tables: Vec<TableReport>,
    pub warnings_by_code: BTreeMap<String, u64>,
    pub warnings: Vec<ScrubIssue>,
    pub failures: Vec<RecordFailure>,
}

impl ScrubReport {
    pub fn new(run_id: String, started_at: String) -> Self {
        Self {
            run_id,
            status: RunStatus::Completed,
            started_at,
            duration_ms: 0,
            tables: Vec::new(),
            warnings_by_code: BTreeMap::new(),
            warnings: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn record_warning(&mut self, issue: ScrubIssue) {
        *self.warnings_by_code.entry(issue.code.clone()).or_insert(0) += 1;
        self.warnings.push(issue);
    }

    pub fn record_failure(&mut self, failure: RecordFailure) {
        self.failures.push(failure);
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|table| table.table == name)
    }

    pub fn records_scrubbed(&self) -> u64 {
        self.tables.iter().map(|table| table.records_scrubbed).sum()
    }

    pub fn records_failed(&self) -> u64 {
        self.tables.iter().map(|table| table.records_failed).sum()
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Derive the run status from table outcomes and failures.
    pub fn finish(&mut self, cancelled: bool) {
        let aborted = self
            .tables
            .iter()
            .any(|table| matches!(table.outcome, TableOutcome::Aborted { .. }));
        self.status = if cancelled {
            RunStatus::Cancelled
        } else if aborted || !self.failures.is_empty() {
            RunStatus::CompletedWithErrors
        } else {
            RunStatus::Completed
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_reflects_failures_and_aborts() {
        let mut report = ScrubReport::new("run".to_string(), "now".to_string());
        report.tables.push(TableReport::new("users", FormatterShape::Field));
        report.finish(false);
        assert_eq!(report.status, RunStatus::Completed);

        report.tables[0].outcome = TableOutcome::Aborted {
            code: "storage_timeout".to_string(),
            message: "page_records timed out".to_string(),
        };
        report.finish(false);
        assert_eq!(report.status, RunStatus::CompletedWithErrors);

        report.finish(true);
        assert_eq!(report.status, RunStatus::Cancelled);
    }

    #[test]
    fn options_reject_zero_sizes() {
        let options = ScrubOptions {
            page_size: 0,
            ..ScrubOptions::default()
        };
        assert!(matches!(options.validate(), Err(ScrubError::InvalidOptions(_))));
        assert!(ScrubOptions::default().validate().is_ok());
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(TableOutcome::Skipped {
            reason: "table not found in storage".to_string(),
        })
        .expect("serialize");
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "table not found in storage");
    }
}

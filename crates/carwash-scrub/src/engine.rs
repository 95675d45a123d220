use std::collections::BTreeSet;
use std::future::Future;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use carwash_core::{Record, Value};
use carwash_store::{Cursor, Storage, StorageError, StorageResult};

use crate::configuration::Configuration;
use crate::errors::ScrubError;
use crate::formatters::FormatterTypes;
use crate::generators::Generator;
use crate::model::{RecordFailure, ScrubIssue, ScrubOptions, ScrubReport, TableOutcome, TableReport};
use crate::resolver::Resolver;
use crate::table_spec::TableSpec;

/// Pages through configured tables and rewrites their records.
pub struct ScrubEngine {
    options: ScrubOptions,
    types: FormatterTypes,
    shutdown: Option<watch::Receiver<bool>>,
}

/// Everything one table worker produced.
struct TableRun {
    report: TableReport,
    warnings: Vec<ScrubIssue>,
    failures: Vec<RecordFailure>,
    warned_fields: BTreeSet<String>,
    warned_key: bool,
}

impl TableRun {
    fn new(spec: &TableSpec) -> Self {
        let mut report = TableReport::new(spec.table(), spec.shape());
        report.primary_key = Some(spec.primary_key().to_string());
        Self {
            report,
            warnings: Vec::new(),
            failures: Vec::new(),
            warned_fields: BTreeSet::new(),
            warned_key: false,
        }
    }

    fn fail(&mut self, key: &Value, code: &str, message: String) {
        self.report.records_failed += 1;
        self.failures.push(RecordFailure {
            table: self.report.table.clone(),
            key: key.clone(),
            code: code.to_string(),
            message,
        });
    }
}

impl ScrubEngine {
    pub fn new(options: ScrubOptions) -> Self {
        Self {
            options,
            types: FormatterTypes::with_builtins(),
            shutdown: None,
        }
    }

    /// Replace the formatter types that type names resolve against.
    pub fn with_formatter_types(mut self, types: FormatterTypes) -> Self {
        self.types = types;
        self
    }

    /// Stop between pages and tables once `shutdown` reads `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn options(&self) -> &ScrubOptions {
        &self.options
    }

    pub fn formatter_types(&self) -> &FormatterTypes {
        &self.types
    }

    /// Scrub every configured table.
    ///
    /// Configuration and resolution errors, and failing to list the storage
    /// tables, abort before any record is written. A failed primary-key lookup
    /// aborts only its table. Everything else ends up in the report.
    pub async fn run(
        &self,
        configuration: &Configuration,
        storage: &dyn Storage,
        generator: &dyn Generator,
    ) -> Result<ScrubReport, ScrubError> {
        self.options.validate()?;
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut report = ScrubReport::new(run_id.clone(), chrono::Utc::now().to_rfc3339());

        info!(
            run_id = %run_id,
            engine = storage.engine(),
            tables = configuration.len(),
            page_size = self.options.page_size,
            table_concurrency = self.options.table_concurrency,
            "scrub started"
        );

        let available: BTreeSet<String> = self
            .with_timeout("list_tables", storage.list_tables())
            .await?
            .into_iter()
            .collect();

        let selected: Vec<_> = match &self.options.tables {
            Some(names) => {
                for name in names {
                    if configuration.get(name).is_none() {
                        report.record_warning(
                            ScrubIssue::warning(
                                "unconfigured_table",
                                format!("table '{name}' was selected but has no configuration"),
                            )
                            .with_table(name),
                        );
                    }
                }
                configuration
                    .tables()
                    .filter(|(name, _)| names.iter().any(|selected| selected.as_str() == *name))
                    .collect()
            }
            None => configuration.tables().collect(),
        };

        let mut resolver = Resolver::new(&self.types);
        let mut specs = Vec::with_capacity(selected.len());
        for (table, config) in selected {
            if !available.contains(table) {
                // Formatters of missing tables are resolved all the same.
                let transform = resolver.resolve_entry(&config.entry)?;
                warn!(table = %table, "configured table not found in storage");
                report.record_warning(
                    ScrubIssue::warning(
                        "unknown_table",
                        format!("table '{table}' does not exist in storage"),
                    )
                    .with_table(table),
                );
                let mut skipped = TableReport::new(table, transform.shape());
                skipped.outcome = TableOutcome::Skipped {
                    reason: "table not found in storage".to_string(),
                };
                report.tables.push(skipped);
                continue;
            }

            let primary_key = match &config.primary_key {
                Some(column) => column.clone(),
                None => match self
                    .with_timeout("primary_key", storage.primary_key(table))
                    .await
                {
                    Ok(column) => column,
                    Err(err) => {
                        // Resolve anyway so configuration errors stay fatal.
                        let transform = resolver.resolve_entry(&config.entry)?;
                        warn!(
                            table = %table,
                            error = %err,
                            "primary key lookup failed, table aborted"
                        );
                        let mut aborted = TableReport::new(table, transform.shape());
                        aborted.outcome = TableOutcome::Aborted {
                            code: err.code().to_string(),
                            message: err.to_string(),
                        };
                        report.tables.push(aborted);
                        continue;
                    }
                },
            };
            let spec = resolver.build_table_spec(table, config, &primary_key)?;
            debug!(
                table = %table,
                primary_key = %primary_key,
                shape = %spec.shape(),
                "table resolved"
            );
            specs.push(spec);
        }
        drop(resolver);

        let runs: Vec<TableRun> = stream::iter(
            specs
                .iter()
                .map(|spec| self.scrub_table(spec, storage, generator)),
        )
        .buffer_unordered(self.options.table_concurrency)
        .collect()
        .await;

        let mut cancelled = false;
        for run in runs {
            cancelled |= matches!(
                run.report.outcome,
                TableOutcome::Cancelled | TableOutcome::Skipped { .. }
            );
            for issue in run.warnings {
                report.record_warning(issue);
            }
            for failure in run.failures {
                report.record_failure(failure);
            }
            report.tables.push(run.report);
        }
        report.tables.sort_by(|a, b| a.table.cmp(&b.table));
        report.duration_ms = start.elapsed().as_millis() as u64;
        report.finish(cancelled);

        info!(
            run_id = %run_id,
            status = ?report.status,
            tables = report.tables.len(),
            records_scrubbed = report.records_scrubbed(),
            records_failed = report.records_failed(),
            warnings = report.warnings.len(),
            duration_ms = report.duration_ms,
            "scrub completed"
        );
        Ok(report)
    }

    async fn scrub_table(
        &self,
        spec: &TableSpec,
        storage: &dyn Storage,
        generator: &dyn Generator,
    ) -> TableRun {
        let start = Instant::now();
        let mut run = TableRun::new(spec);

        if self.is_cancelled() {
            run.report.outcome = TableOutcome::Skipped {
                reason: "cancelled before start".to_string(),
            };
            return run;
        }

        info!(
            table = %spec.table(),
            primary_key = %spec.primary_key(),
            shape = %spec.shape(),
            "scrubbing table"
        );

        let mut cursor: Option<Cursor> = None;
        loop {
            if run.report.pages > 0 && self.is_cancelled() {
                run.report.outcome = TableOutcome::Cancelled;
                break;
            }

            let page = match self
                .with_timeout(
                    "page_records",
                    storage.page_records(
                        spec.table(),
                        spec.primary_key(),
                        self.options.page_size,
                        cursor.as_ref(),
                    ),
                )
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    warn!(table = %spec.table(), error = %err, "page fetch failed, table aborted");
                    run.report.outcome = TableOutcome::Aborted {
                        code: err.code().to_string(),
                        message: err.to_string(),
                    };
                    break;
                }
            };

            run.report.pages += 1;
            run.report.records_read += page.records.len() as u64;
            for record in &page.records {
                self.scrub_record(spec, record, storage, generator, &mut run).await;
            }
            debug!(
                table = %spec.table(),
                page = run.report.pages,
                records = page.records.len(),
                "page scrubbed"
            );

            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        run.report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            table = %spec.table(),
            pages = run.report.pages,
            records_scrubbed = run.report.records_scrubbed,
            records_failed = run.report.records_failed,
            duration_ms = run.report.duration_ms,
            "table scrubbed"
        );
        run
    }

    async fn scrub_record(
        &self,
        spec: &TableSpec,
        record: &Record,
        storage: &dyn Storage,
        generator: &dyn Generator,
        run: &mut TableRun,
    ) {
        let key = match record.get(spec.primary_key()) {
            Some(key) if !key.is_null() => key.clone(),
            _ => {
                run.fail(
                    &Value::Null,
                    "missing_primary_key",
                    format!("record has no value for '{}'", spec.primary_key()),
                );
                return;
            }
        };

        let change = match spec.apply(generator, record) {
            Ok(change) => change,
            Err(err) => {
                debug!(table = %spec.table(), key = %key, error = %err, "formatter failed");
                run.fail(&key, err.code(), err.to_string());
                return;
            }
        };

        for field in &change.missing_fields {
            if run.warned_fields.insert(field.clone()) {
                run.warnings.push(
                    ScrubIssue::warning(
                        "unknown_field",
                        format!("field '{field}' is configured but missing from records"),
                    )
                    .with_table(spec.table())
                    .with_field(field),
                );
            }
        }
        if change.ignored_key.is_some() && !run.warned_key {
            run.warned_key = true;
            run.warnings.push(
                ScrubIssue::warning(
                    "primary_key_ignored",
                    "record formatter returned a different primary key; it was not written",
                )
                .with_table(spec.table())
                .with_field(spec.primary_key()),
            );
        }

        if !change.updates.is_empty() {
            let write = self
                .with_timeout(
                    "update_record",
                    storage.update_record(spec.table(), spec.primary_key(), &key, &change.updates),
                )
                .await;
            if let Err(err) = write {
                debug!(table = %spec.table(), key = %key, error = %err, "record write failed");
                run.fail(&key, err.code(), err.to_string());
                return;
            }
        }
        run.report.records_scrubbed += 1;
    }

    async fn with_timeout<T, F>(&self, operation: &str, future: F) -> StorageResult<T>
    where
        F: Future<Output = StorageResult<T>>,
    {
        match tokio::time::timeout(self.options.io_timeout(), future).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout {
                operation: operation.to_string(),
                timeout_ms: self.options.io_timeout_ms,
            }),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|shutdown| *shutdown.borrow())
    }
}

// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Export Session
//!
//! Turns one table into one flat file:
//! 1. Resolve the key column (override, or a one-row probe).
//! 2. Read the row count once, best effort.
//! 3. Page through the table with `CursorPaginator`, writing every batch with
//!    `BatchWriter` and pausing briefly between batches.
//! 4. On a failed batch, ask `FailureRecoveryPolicy` whether to abort, skip
//!    ahead, or stop with what was collected.
//! 5. Finalize the file as complete, or under a partial-marked name.

use crate::application::batch_writer::{export_file_name, BatchWriter};
use crate::application::cursor_paginator::CursorPaginator;
use crate::application::recovery_policy::{FailureRecoveryPolicy, RecoveryDecision};
use crate::application::row_counter::{progress_line, RowCounter};
use crate::config::ExportConfig;
use crate::domain::entities::{ExportResult, PageQuery, Row};
use crate::domain::errors::{ExportError, Result};
use crate::ports::table_store_port::TableStorePort;
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything an export needs besides the store itself.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub output_dir: PathBuf,
    pub page_size: usize,
    pub batch_pause: Duration,
    pub preferred_key: String,
    pub key_overrides: HashMap<String, String>,
    pub compress: bool,
    pub delimiter: u8,
    pub max_consecutive_failures: u32,
    /// Date embedded in output file names.
    pub export_date: NaiveDate,
}

impl SessionSettings {
    pub fn from_config(export: &ExportConfig, export_date: NaiveDate) -> Result<Self> {
        Ok(Self {
            output_dir: PathBuf::from(&export.output_dir),
            page_size: export.page_size,
            batch_pause: Duration::from_millis(export.batch_pause_ms),
            preferred_key: export.key_column.clone(),
            key_overrides: export.key_overrides.clone(),
            compress: export.compress,
            delimiter: export.delimiter_byte()?,
            max_consecutive_failures: export.max_consecutive_failures,
            export_date,
        })
    }
}

/// The preferred key if the row has it, otherwise the row's first column.
pub fn choose_key_column(row: &Row, preferred: &str) -> String {
    if row.contains_key(preferred) {
        return preferred.to_string();
    }
    row.keys()
        .next()
        .cloned()
        .unwrap_or_else(|| preferred.to_string())
}

pub struct ExportSession {
    store: Arc<dyn TableStorePort>,
    settings: SessionSettings,
}

impl ExportSession {
    pub fn new(store: Arc<dyn TableStorePort>, settings: SessionSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    fn output_path(&self, table: &str, partial: bool) -> PathBuf {
        self.settings.output_dir.join(export_file_name(
            table,
            self.settings.export_date,
            partial,
            self.settings.compress,
        ))
    }

    /// Picks the pagination key. `Ok(None)` means the table is empty.
    fn resolve_key_column(&self, table: &str) -> Result<Option<String>> {
        if let Some(key) = self.settings.key_overrides.get(table) {
            return Ok(Some(key.clone()));
        }
        let probe = PageQuery {
            filters: Vec::new(),
            order_by: None,
            limit: 1,
        };
        let rows = self
            .store
            .page(table, &probe)
            .map_err(|e| ExportError::BatchFetchFailed {
                table: table.to_string(),
                reason: e.to_string(),
            })?;
        Ok(rows
            .first()
            .map(|row| choose_key_column(row, &self.settings.preferred_key)))
    }

    /// Exports `table`; an `Err` means the export aborted and left no file.
    pub fn run(&self, table: &str) -> Result<ExportResult> {
        let start = Instant::now();
        std::fs::create_dir_all(&self.settings.output_dir)?;
        let complete_path = self.output_path(table, false);

        let key_column = match self.resolve_key_column(table)? {
            Some(k) => k,
            None => {
                info!("{} has no rows; writing an empty export", table);
                let writer = BatchWriter::create(
                    &complete_path,
                    self.settings.delimiter,
                    self.settings.compress,
                )?;
                writer.finalize(&complete_path)?;
                return Ok(ExportResult::Complete {
                    path: complete_path,
                    rows_written: 0,
                });
            }
        };

        let total = RowCounter::new(self.store.clone()).count(table);
        info!(
            "Exporting {} keyed on `{}` ({} rows expected, page size {})",
            table,
            key_column,
            total.map(|t| t.to_string()).unwrap_or_else(|| "unknown".to_string()),
            self.settings.page_size
        );

        let mut writer =
            BatchWriter::create(&complete_path, self.settings.delimiter, self.settings.compress)?;
        let mut paginator = CursorPaginator::new(
            self.store.clone(),
            table,
            &key_column,
            self.settings.page_size,
        );
        let mut policy = FailureRecoveryPolicy::new(self.settings.max_consecutive_failures);
        let mut count_bound_hit: Option<u64> = None;

        loop {
            match paginator.next_batch() {
                Ok(rows) if rows.is_empty() => break,
                Ok(rows) => {
                    if let Err(e) = writer.append(&rows) {
                        if let Err(d) = writer.discard() {
                            warn!("Could not remove in-progress file for {}: {}", table, d);
                        }
                        return Err(e);
                    }
                    policy.on_batch_success();
                    info!("{}", progress_line(table, writer.rows_written(), total));

                    if let Some(t) = total {
                        // the table grew past the count taken at start
                        if writer.rows_written() > t {
                            warn!(
                                "{}: {} rows written exceeds the starting count of {}; stopping",
                                table,
                                writer.rows_written(),
                                t
                            );
                            count_bound_hit = Some(t);
                            break;
                        }
                    }
                    if !self.settings.batch_pause.is_zero() {
                        std::thread::sleep(self.settings.batch_pause);
                    }
                }
                Err(e) => match policy.on_batch_failure(writer.rows_written(), &e) {
                    RecoveryDecision::Abort => {
                        if let Err(d) = writer.discard() {
                            warn!("Could not remove in-progress file for {}: {}", table, d);
                        }
                        return Err(e);
                    }
                    RecoveryDecision::SkipAhead => {
                        if paginator.skip_failed_batch() {
                            info!("{}: continuing after substitute cursor {}", table, paginator.cursor());
                        } else {
                            info!("{}: retrying from cursor {}", table, paginator.cursor());
                        }
                    }
                    RecoveryDecision::Stop => break,
                },
            }
        }

        let partial_cause = if policy.is_degraded() {
            Some(policy.cause())
        } else {
            count_bound_hit.map(|t| format!("stopped at starting count {}", t))
        };

        let result = if let Some(cause) = partial_cause {
            let path = self.output_path(table, true);
            let rows_written = writer.finalize(&path)?;
            warn!(
                "{} exported PARTIALLY: {} rows to {} ({})",
                table,
                rows_written,
                path.display(),
                cause
            );
            ExportResult::Partial {
                path,
                rows_written,
                cause,
            }
        } else {
            let rows_written = writer.finalize(&complete_path)?;
            info!(
                "{} exported: {} rows to {} in {:.1}s ({} batches)",
                table,
                rows_written,
                complete_path.display(),
                start.elapsed().as_secs_f64(),
                paginator.batches_requested()
            );
            ExportResult::Complete {
                path: complete_path,
                rows_written,
            }
        };
        Ok(result)
    }
}

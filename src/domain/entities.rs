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

//! # Domain Entities
//!
//! Entities are the "Nouns" of the archiver: rows fetched from the table store,
//! the filters used to bound a page, the pagination cursor, and the results
//! each export and archival step reports back.
//!
//! Rows are schemaless JSON objects. Column order is the order the store sent
//! them in (serde_json is built with `preserve_order`), which is what makes
//! header inference from the first row deterministic.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// A single record from the table store: column name to value, in column order.
pub type Row = serde_json::Map<String, Value>;

/// Renders a JSON value the way it appears in a flat-file cell or a filter.
///
/// Strings are written as-is, `null` becomes an empty cell, and nested
/// arrays/objects are written as compact JSON text.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// A single-column predicate supported by the table store.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: String, value: String },
    Gt { column: String, value: String },
    Gte { column: String, value: String },
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn gt(column: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Gt {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn gte(column: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Gte {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq { column, .. } | Filter::Gt { column, .. } | Filter::Gte { column, .. } => {
                column
            }
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Filter::Eq { value, .. } | Filter::Gt { value, .. } | Filter::Gte { value, .. } => {
                value
            }
        }
    }

    /// The PostgREST operator name for this predicate.
    pub fn operator(&self) -> &'static str {
        match self {
            Filter::Eq { .. } => "eq",
            Filter::Gt { .. } => "gt",
            Filter::Gte { .. } => "gte",
        }
    }
}

/// One bounded request against the table store.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub filters: Vec<Filter>,
    /// Ascending sort column. `None` leaves ordering to the store.
    pub order_by: Option<String>,
    pub limit: usize,
}

/// Watermark of the key column marking how far an export has progressed.
///
/// Rows with a key `<=` the cursor are considered already exported.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PaginationCursor {
    /// Nothing exported yet: the next page starts at the beginning of the table.
    #[default]
    Unset,
    At(Value),
}

impl PaginationCursor {
    /// The `key > cursor` predicate for the next page, if the cursor is set.
    pub fn filter(&self, key_column: &str) -> Option<Filter> {
        match self {
            PaginationCursor::Unset => None,
            PaginationCursor::At(v) => Some(Filter::gt(key_column, value_to_text(v))),
        }
    }

    /// Best-effort substitute for the unknown last key of a failed batch.
    ///
    /// Numeric keys skip ahead by one page. Any other key type has no sensible
    /// arithmetic, so `None` is returned and the caller retries from the
    /// current cursor.
    pub fn skip_ahead(&self, page_size: usize) -> Option<PaginationCursor> {
        let PaginationCursor::At(Value::Number(n)) = self else {
            return None;
        };
        let step = page_size as u64;
        let next = if let Some(i) = n.as_i64() {
            Value::from(i.saturating_add(step as i64))
        } else if let Some(u) = n.as_u64() {
            Value::from(u.saturating_add(step))
        } else {
            Value::from(n.as_f64()? + step as f64)
        };
        Some(PaginationCursor::At(next))
    }
}

impl fmt::Display for PaginationCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaginationCursor::Unset => write!(f, "<start>"),
            PaginationCursor::At(v) => write!(f, "{}", value_to_text(v)),
        }
    }
}

/// Final state of one table export.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportResult {
    /// Every batch succeeded and the table was read to the end.
    Complete { path: PathBuf, rows_written: u64 },
    /// At least one batch was skipped; the file name carries a partial marker.
    Partial {
        path: PathBuf,
        rows_written: u64,
        cause: String,
    },
}

impl ExportResult {
    pub fn path(&self) -> &Path {
        match self {
            ExportResult::Complete { path, .. } | ExportResult::Partial { path, .. } => path,
        }
    }

    pub fn rows_written(&self) -> u64 {
        match self {
            ExportResult::Complete { rows_written, .. }
            | ExportResult::Partial { rows_written, .. } => *rows_written,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, ExportResult::Partial { .. })
    }
}

/// Outcome status reported for each configured table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    /// Exported completely and archived.
    Complete,
    /// Exported with gaps and archived under a partial-marked name.
    Partial,
    /// The export aborted before producing any usable file.
    ExportFailed,
    /// The export produced a file but archival failed; the local file is kept.
    ArchiveFailed,
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableStatus::Complete => write!(f, "COMPLETE"),
            TableStatus::Partial => write!(f, "PARTIAL"),
            TableStatus::ExportFailed => write!(f, "EXPORT_FAILED"),
            TableStatus::ArchiveFailed => write!(f, "ARCHIVE_FAILED"),
        }
    }
}

/// The "Report Card" for one table in an archive run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableOutcome {
    pub table: String,
    pub status: TableStatus,
    /// Data records written to the export file.
    pub rows: u64,
    /// Whether the export file is a partial snapshot.
    pub partial: bool,
    /// Local path of the export file (removed once archived).
    pub file: Option<String>,
    /// SHA-256 of the finalized export file.
    pub sha256: Option<String>,
    /// Identifier returned by the archive.
    pub remote_id: Option<String>,
    /// Wall-clock seconds spent on export and upload.
    pub duration: f64,
    pub error: Option<String>,
}

impl TableOutcome {
    /// Export finished and the archive accepted the file.
    pub fn archived(
        table: &str,
        result: &ExportResult,
        sha256: Option<String>,
        remote_id: String,
        duration: f64,
    ) -> Self {
        let (status, error) = match result {
            ExportResult::Complete { .. } => (TableStatus::Complete, None),
            ExportResult::Partial { cause, .. } => (TableStatus::Partial, Some(cause.clone())),
        };
        Self {
            table: table.to_string(),
            status,
            rows: result.rows_written(),
            partial: result.is_partial(),
            file: Some(result.path().display().to_string()),
            sha256,
            remote_id: Some(remote_id),
            duration,
            error,
        }
    }

    /// Export produced a file but the upload failed.
    pub fn archive_failed(
        table: &str,
        result: &ExportResult,
        sha256: Option<String>,
        error: String,
        duration: f64,
    ) -> Self {
        Self {
            table: table.to_string(),
            status: TableStatus::ArchiveFailed,
            rows: result.rows_written(),
            partial: result.is_partial(),
            file: Some(result.path().display().to_string()),
            sha256,
            remote_id: None,
            duration,
            error: Some(error),
        }
    }

    /// Export aborted; nothing was handed to the archive.
    pub fn export_failed(table: &str, error: String, duration: f64) -> Self {
        Self {
            table: table.to_string(),
            status: TableStatus::ExportFailed,
            rows: 0,
            partial: false,
            file: None,
            sha256: None,
            remote_id: None,
            duration,
            error: Some(error),
        }
    }

    /// True when the table's data reached the archive (whole or partial).
    pub fn is_archived(&self) -> bool {
        matches!(self.status, TableStatus::Complete | TableStatus::Partial)
    }
}

/// Plain counters consumed by the daily report.
///
/// Every figure is optional: a statistic that could not be gathered is shown
/// as unavailable instead of failing the whole report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyStats {
    pub date: String,
    pub table_totals: Vec<(String, Option<u64>)>,
    pub new_today: Vec<(String, Option<u64>)>,
    pub calls_today: Option<u64>,
    pub credits_saved: Option<u64>,
}

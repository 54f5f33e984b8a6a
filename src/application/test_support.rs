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

//! In-memory table store and recording collaborators shared by the
//! application-layer tests.

use crate::domain::entities::{value_to_text, Filter, PageQuery, Row};
use crate::domain::errors::{ExportError, Result};
use crate::ports::archive_port::ArchivePort;
use crate::ports::notification_port::NotificationPort;
use crate::ports::table_store_port::TableStorePort;
use serde_json::json;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// `id` 1..=n with a couple of text columns.
pub fn numbered_rows(n: u64) -> Vec<Row> {
    (1..=n)
        .map(|i| {
            json!({"id": i, "name": format!("org-{}", i), "domain": format!("org{}.example.com", i)})
                .as_object()
                .cloned()
                .unwrap()
        })
        .collect()
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

fn matches(row: &Row, filter: &Filter) -> bool {
    let Some(v) = row.get(filter.column()) else {
        return false;
    };
    let ord = cmp_text(&value_to_text(v), filter.value());
    match filter {
        Filter::Eq { .. } => ord == Ordering::Equal,
        Filter::Gt { .. } => ord == Ordering::Greater,
        Filter::Gte { .. } => ord != Ordering::Less,
    }
}

struct PageFailure {
    table: String,
    after: Option<String>,
    remaining: u32,
}

/// Table store backed by vectors, with scriptable page failures.
#[derive(Default)]
pub struct FakeTableStore {
    tables: HashMap<String, Vec<Row>>,
    fail_counts: bool,
    stale_counts: HashMap<String, u64>,
    page_failures: Mutex<Vec<PageFailure>>,
    queries: Mutex<Vec<(String, PageQuery)>>,
}

impl FakeTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, rows: Vec<Row>) -> Self {
        self.tables.insert(name.to_string(), rows);
        self
    }

    /// Reports `count` as the unfiltered row count of `table`, whatever it holds.
    pub fn with_stale_count(mut self, table: &str, count: u64) -> Self {
        self.stale_counts.insert(table.to_string(), count);
        self
    }

    pub fn failing_counts(mut self) -> Self {
        self.fail_counts = true;
        self
    }

    /// Fails the next `times` page requests on `table` whose cursor is `after`
    /// (`None` = requests without a cursor, including the key probe).
    pub fn fail_page_after(self, table: &str, after: Option<&str>, times: u32) -> Self {
        self.page_failures.lock().unwrap().push(PageFailure {
            table: table.to_string(),
            after: after.map(str::to_string),
            remaining: times,
        });
        self
    }

    /// Every page request made against `table`, in order.
    pub fn page_queries(&self, table: &str) -> Vec<PageQuery> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == table)
            .map(|(_, q)| q.clone())
            .collect()
    }

    /// Ordered (paginated) requests only, leaving out the unordered key probe.
    pub fn batch_queries(&self, table: &str) -> Vec<PageQuery> {
        self.page_queries(table)
            .into_iter()
            .filter(|q| q.order_by.is_some())
            .collect()
    }

    fn rows(&self, table: &str) -> Result<&Vec<Row>> {
        self.tables
            .get(table)
            .ok_or_else(|| ExportError::StoreError(format!("relation \"{}\" does not exist", table)))
    }

    fn should_fail(&self, table: &str, query: &PageQuery) -> bool {
        let after = query.filters.iter().find_map(|f| match f {
            Filter::Gt { value, .. } => Some(value.clone()),
            _ => None,
        });
        let mut failures = self.page_failures.lock().unwrap();
        for f in failures.iter_mut() {
            if f.table == table && f.after == after && f.remaining > 0 {
                f.remaining -= 1;
                return true;
            }
        }
        false
    }
}

impl TableStorePort for FakeTableStore {
    fn count(&self, table: &str, filters: &[Filter]) -> Result<u64> {
        if self.fail_counts {
            return Err(ExportError::StoreError("count timed out".to_string()));
        }
        if let (true, Some(&n)) = (filters.is_empty(), self.stale_counts.get(table)) {
            return Ok(n);
        }
        let rows = self.rows(table)?;
        Ok(rows
            .iter()
            .filter(|r| filters.iter().all(|f| matches(r, f)))
            .count() as u64)
    }

    fn page(&self, table: &str, query: &PageQuery) -> Result<Vec<Row>> {
        self.queries
            .lock()
            .unwrap()
            .push((table.to_string(), query.clone()));
        if self.should_fail(table, query) {
            return Err(ExportError::StoreError("canceling statement due to statement timeout".to_string()));
        }

        let mut rows: Vec<Row> = self
            .rows(table)?
            .iter()
            .filter(|r| query.filters.iter().all(|f| matches(r, f)))
            .cloned()
            .collect();
        if let Some(col) = &query.order_by {
            let text = |r: &Row| r.get(col).map(value_to_text).unwrap_or_default();
            rows.sort_by(|a, b| cmp_text(&text(a), &text(b)));
        }
        rows.truncate(query.limit);
        Ok(rows)
    }
}

/// Archive that records every call; optionally fails for given file names.
#[derive(Default)]
pub struct RecordingArchive {
    pub calls: Mutex<Vec<(PathBuf, Option<String>)>>,
    fail_names: Vec<String>,
}

impl RecordingArchive {
    pub fn failing_for(names: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_names: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn stored_names(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(p, _)| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect()
    }
}

impl ArchivePort for RecordingArchive {
    fn store(&self, path: &Path, destination: Option<&str>) -> Result<String> {
        assert!(path.exists(), "archive called with missing file {}", path.display());
        self.calls
            .lock()
            .unwrap()
            .push((path.to_path_buf(), destination.map(str::to_string)));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.fail_names.iter().any(|f| name.contains(f.as_str())) {
            return Err(ExportError::UploadFailed {
                path: path.display().to_string(),
                reason: "quota exceeded".to_string(),
            });
        }
        Ok(format!("remote-{}", name))
    }
}

/// Notifier that keeps sent messages in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

impl NotificationPort for RecordingNotifier {
    fn send(&self, subject: &str, html_body: &str) -> Result<()> {
        if self.fail {
            return Err(ExportError::NotificationError("connection refused".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), html_body.to_string()));
        Ok(())
    }
}

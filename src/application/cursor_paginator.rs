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

//! # Cursor Paginator
//!
//! Issues keyset-paginated requests: every page asks for rows whose key is
//! strictly greater than the cursor, sorted ascending by the key, bounded by
//! the page size. After each non-empty page the cursor moves to the key of
//! the last row, so the sort order is what keeps the watermark correct.
//!
//! The key column must be unique and monotonically sortable. A non-unique key
//! can make pagination skip rows or stall; that is a precondition, not
//! something this module detects.

use crate::domain::entities::{PageQuery, PaginationCursor, Row};
use crate::domain::errors::{ExportError, Result};
use crate::ports::table_store_port::TableStorePort;
use log::debug;
use std::sync::Arc;

pub struct CursorPaginator {
    store: Arc<dyn TableStorePort>,
    table: String,
    key_column: String,
    page_size: usize,
    cursor: PaginationCursor,
    batches: u64,
}

impl CursorPaginator {
    pub fn new(
        store: Arc<dyn TableStorePort>,
        table: &str,
        key_column: &str,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            table: table.to_string(),
            key_column: key_column.to_string(),
            page_size,
            cursor: PaginationCursor::Unset,
            batches: 0,
        }
    }

    pub fn cursor(&self) -> &PaginationCursor {
        &self.cursor
    }

    /// Number of fetch attempts made so far, failed ones included.
    pub fn batches_requested(&self) -> u64 {
        self.batches
    }

    /// Fetches the next page and advances the cursor past it.
    ///
    /// An empty vector means there are no more rows. Any store failure comes
    /// back as `BatchFetchFailed` and leaves the cursor untouched.
    pub fn next_batch(&mut self) -> Result<Vec<Row>> {
        self.batches += 1;
        let query = PageQuery {
            filters: self.cursor.filter(&self.key_column).into_iter().collect(),
            order_by: Some(self.key_column.clone()),
            limit: self.page_size,
        };
        debug!(
            "{}: batch {} after {} (limit {})",
            self.table, self.batches, self.cursor, self.page_size
        );

        let rows = self
            .store
            .page(&self.table, &query)
            .map_err(|e| self.fetch_failed(e.to_string()))?;

        if let Some(last) = rows.last() {
            let key = last.get(&self.key_column).cloned().ok_or_else(|| {
                self.fetch_failed(format!("row without key column `{}`", self.key_column))
            })?;
            self.cursor = PaginationCursor::At(key);
        }
        Ok(rows)
    }

    /// Moves the cursor past a batch whose rows were never seen.
    ///
    /// Returns `false` when the key type allows no substitute, in which case
    /// the next call retries from the same cursor.
    pub fn skip_failed_batch(&mut self) -> bool {
        match self.cursor.skip_ahead(self.page_size) {
            Some(next) => {
                self.cursor = next;
                true
            }
            None => false,
        }
    }

    fn fetch_failed(&self, reason: String) -> ExportError {
        ExportError::BatchFetchFailed {
            table: self.table.clone(),
            reason,
        }
    }
}

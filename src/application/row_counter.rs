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

//! # Row Counter
//!
//! Reads the authoritative row count of a table once, at export start.
//! The figure is only a progress denominator and a runaway bound, so a
//! failure here is logged and turned into `None` rather than stopping the export.

use crate::domain::errors::ExportError;
use crate::ports::table_store_port::TableStorePort;
use log::warn;
use std::sync::Arc;

pub struct RowCounter {
    store: Arc<dyn TableStorePort>,
}

impl RowCounter {
    pub fn new(store: Arc<dyn TableStorePort>) -> Self {
        Self { store }
    }

    /// Exact row count of `table`, or `None` when the store could not answer.
    pub fn count(&self, table: &str) -> Option<u64> {
        match self.store.count(table, &[]) {
            Ok(n) => Some(n),
            Err(e) => {
                let err = ExportError::CountUnavailable {
                    table: table.to_string(),
                    reason: e.to_string(),
                };
                warn!("{}; progress will show rows so far only", err);
                None
            }
        }
    }
}

/// Human-readable progress line for one table.
pub fn progress_line(table: &str, rows_written: u64, total: Option<u64>) -> String {
    match total {
        Some(t) if t > 0 => format!(
            "{}: {}/{} rows ({:.1}%)",
            table,
            rows_written,
            t,
            rows_written as f64 * 100.0 / t as f64
        ),
        _ => format!("{}: {} rows so far", table, rows_written),
    }
}

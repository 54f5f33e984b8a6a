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

//! # Table Store Port
//!
//! This Port defines what the archiver needs from the place the rows live.
//! It doesn't care IF the store is a PostgREST endpoint, a SQL database, or
//! an in-memory fake used in tests. Any struct implementing `TableStorePort`
//! can feed the export pipeline and the daily report.

use crate::domain::entities::{Filter, PageQuery, Row};
use crate::domain::errors::Result;

/// `TableStorePort` is the query surface consumed by the archiver.
pub trait TableStorePort: Send + Sync {
    /// Exact number of rows in `table` matching every filter.
    fn count(&self, table: &str, filters: &[Filter]) -> Result<u64>;

    /// One bounded page of rows.
    ///
    /// When `query.order_by` is set, rows come back sorted ascending by that
    /// column. At most `query.limit` rows are returned; an empty page means
    /// no rows matched.
    fn page(&self, table: &str, query: &PageQuery) -> Result<Vec<Row>>;
}

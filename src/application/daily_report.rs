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

//! # Daily Report
//!
//! Gathers a handful of row-count statistics and mails them as an HTML
//! summary. Each statistic is independent: one that cannot be read is logged
//! and shown as `n/a`, the rest of the report still goes out.

use crate::config::ReportConfig;
use crate::domain::entities::{DailyStats, Filter, PageQuery};
use crate::domain::errors::Result;
use crate::ports::notification_port::NotificationPort;
use crate::ports::table_store_port::TableStorePort;
use chrono::NaiveDate;
use log::{info, warn};
use serde_json::Value;
use std::sync::Arc;

pub struct DailyReport {
    store: Arc<dyn TableStorePort>,
    config: ReportConfig,
}

impl DailyReport {
    pub fn new(store: Arc<dyn TableStorePort>, config: ReportConfig) -> Self {
        Self { store, config }
    }

    fn stat<T>(&self, what: &str, res: Result<T>) -> Option<T> {
        match res {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Could not read {}: {}", what, e);
                None
            }
        }
    }

    pub fn collect(&self, today: NaiveDate) -> DailyStats {
        let day = today.format("%Y-%m-%d").to_string();

        let table_totals = self
            .config
            .total_tables
            .iter()
            .map(|t| {
                let n = self.stat(&format!("total rows of {}", t), self.store.count(t, &[]));
                (t.clone(), n)
            })
            .collect();

        let new_today = self
            .config
            .total_tables
            .iter()
            .map(|t| {
                let filter = Filter::gte(&self.config.created_at_column, &day);
                let n = self.stat(&format!("new rows of {}", t), self.store.count(t, &[filter]));
                (t.clone(), n)
            })
            .collect();

        let calls_today = self.config.calls_table.as_ref().and_then(|t| {
            let filter = Filter::eq(&self.config.calls_date_column, &day);
            self.stat("calls made today", self.store.count(t, &[filter]))
        });

        let credits_saved = self
            .config
            .credits_table
            .as_ref()
            .and_then(|t| self.stat("credits saved", self.read_credits(t)))
            .flatten();

        DailyStats {
            date: day,
            table_totals,
            new_today,
            calls_today,
            credits_saved,
        }
    }

    /// The credits column of the first row; a table with no rows counts as zero.
    fn read_credits(&self, table: &str) -> Result<Option<u64>> {
        let query = PageQuery {
            filters: Vec::new(),
            order_by: None,
            limit: 1,
        };
        let rows = self.store.page(table, &query)?;
        let Some(row) = rows.first() else {
            return Ok(Some(0));
        };
        let value = row.get(&self.config.credits_column);
        Ok(match value {
            Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// Collects today's figures and sends them; no retry on failure.
    pub fn send(&self, notifier: &dyn NotificationPort, today: NaiveDate) -> Result<DailyStats> {
        let stats = self.collect(today);
        notifier.send(&subject(&stats), &compose_html(&stats))?;
        info!("Daily report for {} sent", stats.date);
        Ok(stats)
    }
}

pub fn subject(stats: &DailyStats) -> String {
    format!("Supabase Daily Report - {}", stats.date)
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn show(v: Option<u64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_else(|| "n/a".to_string())
}

pub fn compose_html(stats: &DailyStats) -> String {
    let mut items = Vec::new();
    for (table, n) in &stats.table_totals {
        items.push(format!("Total rows in {}: {}", escape_html(table), show(*n)));
    }
    items.push(format!("Total Calls Made Today: {}", show(stats.calls_today)));
    items.push(format!("Total Apollo Credits Saved: {}", show(stats.credits_saved)));
    for (table, n) in &stats.new_today {
        items.push(format!("New rows in {} today: {}", escape_html(table), show(*n)));
    }

    let list: String = items
        .iter()
        .map(|i| format!("          <li>{}</li>\n", i))
        .collect();
    format!(
        "<html>\n  <body>\n    <h2>Supabase Daily Report</h2>\n    <h3>Database Stats ({}):</h3>\n    <ul>\n{}    </ul>\n  </body>\n</html>\n",
        escape_html(&stats.date),
        list
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{FakeTableStore, RecordingNotifier};
    use crate::domain::entities::Row;
    use serde_json::json;

    fn row(v: serde_json::Value) -> Row {
        v.as_object().unwrap().clone()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn store() -> FakeTableStore {
        FakeTableStore::new()
            .with_table(
                "leads_db",
                vec![
                    row(json!({"id": 1, "created_at": "2026-10-17T09:00:00"})),
                    row(json!({"id": 2, "created_at": "2026-10-18T08:00:00"})),
                    row(json!({"id": 3, "created_at": "2026-10-18T10:30:00"})),
                ],
            )
            .with_table(
                "orgs_db",
                vec![row(json!({"id": 1, "created_at": "2026-10-01T00:00:00"}))],
            )
            .with_table(
                "calls",
                vec![
                    row(json!({"id": 1, "date": "2026-10-18"})),
                    row(json!({"id": 2, "date": "2026-10-17"})),
                ],
            )
            .with_table("apollo_credits", vec![row(json!({"total": 1250}))])
    }

    #[test]
    fn test_collect() {
        let report = DailyReport::new(Arc::new(store()), ReportConfig::default());
        let stats = report.collect(today());

        assert_eq!(stats.date, "2026-10-18");
        assert_eq!(
            stats.table_totals,
            vec![("leads_db".to_string(), Some(3)), ("orgs_db".to_string(), Some(1))]
        );
        assert_eq!(
            stats.new_today,
            vec![("leads_db".to_string(), Some(2)), ("orgs_db".to_string(), Some(0))]
        );
        assert_eq!(stats.calls_today, Some(1));
        assert_eq!(stats.credits_saved, Some(1250));
    }

    #[test]
    fn test_missing_tables_are_unavailable_not_fatal() {
        let store = FakeTableStore::new().with_table("leads_db", vec![]);
        let report = DailyReport::new(Arc::new(store), ReportConfig::default());
        let stats = report.collect(today());

        assert_eq!(stats.table_totals[0], ("leads_db".to_string(), Some(0)));
        assert_eq!(stats.table_totals[1], ("orgs_db".to_string(), None));
        assert_eq!(stats.calls_today, None);
        assert_eq!(stats.credits_saved, None);
    }

    #[test]
    fn test_empty_credits_table_counts_zero() {
        let store = FakeTableStore::new().with_table("apollo_credits", vec![]);
        let report = DailyReport::new(Arc::new(store), ReportConfig::default());
        assert_eq!(report.collect(today()).credits_saved, Some(0));
    }

    #[test]
    fn test_compose_html() {
        let stats = DailyStats {
            date: "2026-10-18".to_string(),
            table_totals: vec![("leads_db".to_string(), Some(3))],
            new_today: vec![("leads_db".to_string(), None)],
            calls_today: Some(4),
            credits_saved: None,
        };
        let html = compose_html(&stats);
        assert!(html.contains("<li>Total rows in leads_db: 3</li>"));
        assert!(html.contains("<li>Total Calls Made Today: 4</li>"));
        assert!(html.contains("<li>Total Apollo Credits Saved: n/a</li>"));
        assert!(html.contains("<li>New rows in leads_db today: n/a</li>"));
        assert_eq!(subject(&stats), "Supabase Daily Report - 2026-10-18");
    }

    #[test]
    fn test_send() {
        let report = DailyReport::new(Arc::new(store()), ReportConfig::default());
        let notifier = RecordingNotifier::default();
        report.send(&notifier, today()).unwrap();

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "Supabase Daily Report - 2026-10-18");

        let failing = RecordingNotifier {
            fail: true,
            ..Default::default()
        };
        assert!(report.send(&failing, today()).is_err());
    }
}

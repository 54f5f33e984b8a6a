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

//! Infrastructure adapter reading tables through a PostgREST endpoint
//! (the REST surface Supabase exposes under `/rest/v1`).
//!
//! - Filters map to `column=op.value` query parameters.
//! - Ordering maps to `order=column.asc`, bounds to `limit=n`.
//! - Exact counts come from a `HEAD` request with `Prefer: count=exact`,
//!   read back from the `Content-Range` header (`0-24/250` or `*/250`).

use crate::domain::entities::{Filter, PageQuery, Row};
use crate::domain::errors::{ExportError, Result};
use crate::ports::table_store_port::TableStorePort;
use log::debug;

pub struct PostgrestAdapter {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl PostgrestAdapter {
    pub fn new(agent: ureq::Agent, base_url: &str, api_key: String) -> Self {
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: &str, table: &str, filters: &[Filter]) -> ureq::Request {
        let mut req = self
            .agent
            .request(method, &self.endpoint(table))
            .set("apikey", &self.api_key)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .query("select", "*");
        for f in filters {
            let (k, v) = filter_param(f);
            req = req.query(&k, &v);
        }
        req
    }
}

pub fn filter_param(f: &Filter) -> (String, String) {
    (f.column().to_string(), format!("{}.{}", f.operator(), f.value()))
}

/// Total from a `Content-Range` header; `None` when the server sent `*`.
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

fn store_error(e: ureq::Error) -> ExportError {
    match e {
        ureq::Error::Status(code, resp) => {
            let body = resp.into_string().unwrap_or_default();
            ExportError::StoreError(format!("HTTP {}: {}", code, body.trim()))
        }
        ureq::Error::Transport(t) => ExportError::StoreError(t.to_string()),
    }
}

impl TableStorePort for PostgrestAdapter {
    fn count(&self, table: &str, filters: &[Filter]) -> Result<u64> {
        let resp = self
            .request("HEAD", table, filters)
            .set("Prefer", "count=exact")
            .call()
            .map_err(store_error)?;
        let range = resp.header("content-range").ok_or_else(|| {
            ExportError::StoreError(format!("no Content-Range in count response for {}", table))
        })?;
        parse_content_range_total(range).ok_or_else(|| {
            ExportError::StoreError(format!("unusable Content-Range `{}` for {}", range, table))
        })
    }

    fn page(&self, table: &str, query: &PageQuery) -> Result<Vec<Row>> {
        let mut req = self.request("GET", table, &query.filters);
        if let Some(col) = &query.order_by {
            req = req.query("order", &format!("{}.asc", col));
        }
        req = req.query("limit", &query.limit.to_string());
        debug!("GET {}", req.url());

        let resp = req.call().map_err(store_error)?;
        resp.into_json::<Vec<Row>>()
            .map_err(|e| ExportError::StoreError(format!("invalid page body for {}: {}", table, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Serves one canned HTTP response; the handle yields the request head.
    fn serve_once(response: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = String::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                head.push_str(&line);
            }
            stream.write_all(response.as_bytes()).unwrap();
            head
        });
        (url, handle)
    }

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("0-24/250"), Some(250));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-24/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    #[test]
    fn test_filter_param() {
        assert_eq!(
            filter_param(&Filter::gt("id", "100")),
            ("id".to_string(), "gt.100".to_string())
        );
        assert_eq!(
            filter_param(&Filter::gte("created_at", "2026-10-18")),
            ("created_at".to_string(), "gte.2026-10-18".to_string())
        );
    }

    #[test]
    fn test_page_request_and_row_order() {
        let body = r#"[{"id":101,"name":"b","domain":null},{"id":102,"name":"c","domain":"c.io"}]"#;
        let (url, handle) = serve_once(format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        ));
        let adapter = PostgrestAdapter::new(ureq::agent(), &format!("{}/", url), "k3y".into());

        let rows = adapter
            .page(
                "orgs_db",
                &PageQuery {
                    filters: vec![Filter::gt("id", "100")],
                    order_by: Some("id".into()),
                    limit: 2,
                },
            )
            .unwrap();

        assert_eq!(rows.len(), 2);
        let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "name", "domain"]);

        let head = handle.join().unwrap();
        let request_line = head.lines().next().unwrap();
        assert!(request_line.starts_with("GET /rest/v1/orgs_db?"));
        assert!(request_line.contains("id=gt.100"));
        assert!(request_line.contains("order=id.asc"));
        assert!(request_line.contains("limit=2"));
        assert!(head.to_lowercase().contains("apikey: k3y"));
    }

    #[test]
    fn test_count_reads_content_range() {
        let (url, handle) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Range: */250\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                .to_string(),
        );
        let adapter = PostgrestAdapter::new(ureq::agent(), &url, "k3y".into());
        assert_eq!(adapter.count("orgs_db", &[]).unwrap(), 250);

        let head = handle.join().unwrap();
        assert!(head.starts_with("HEAD /rest/v1/orgs_db?"));
        assert!(head.to_lowercase().contains("prefer: count=exact"));
    }

    #[test]
    fn test_http_error_is_store_error() {
        let body = r#"{"message":"canceling statement due to statement timeout"}"#;
        let (url, _handle) = serve_once(format!(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        ));
        let adapter = PostgrestAdapter::new(ureq::agent(), &url, "k3y".into());
        let err = adapter
            .page("orgs_db", &PageQuery { filters: vec![], order_by: None, limit: 1 })
            .unwrap_err();
        assert!(err.to_string().contains("HTTP 500"));
        assert!(err.to_string().contains("statement timeout"));
    }
}

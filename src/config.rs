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

//! # Configuration
//!
//! Settings come from three layers, applied in order:
//! 1. A YAML (or JSON, by extension) configuration file.
//! 2. Command-line overrides (`CliArgs`).
//! 3. Environment variables, used only to fill secrets the first two left empty.

use crate::domain::errors::{ExportError, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;

pub const ENV_STORE_URL: &str = "SUPABASE_URL";
pub const ENV_STORE_KEY: &str = "SUPABASE_KEY";
pub const ENV_DRIVE_CREDENTIALS: &str = "GOOGLE_DRIVE_CREDENTIALS";
pub const ENV_SMTP_USER: &str = "GMAIL_USER";
pub const ENV_SMTP_PASSWORD: &str = "GMAIL_APP_PASSWORD";
pub const ENV_REPORT_RECIPIENT: &str = "REPORT_RECIPIENT";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
}

/// Connection details for the PostgREST table store.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: String,
    pub tables: Vec<String>,
    /// Rows requested per batch.
    pub page_size: usize,
    /// Pause after each successful batch, in milliseconds.
    pub batch_pause_ms: u64,
    /// Preferred pagination key when the table has such a column.
    pub key_column: String,
    /// Per-table key column, skipping discovery.
    pub key_overrides: HashMap<String, String>,
    /// Gzip the output file.
    pub compress: bool,
    /// Consecutive failed batches tolerated while degraded before giving up.
    pub max_consecutive_failures: u32,
    pub field_delimiter: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: ".".to_string(),
            tables: vec!["leads_db".to_string(), "orgs_db".to_string()],
            page_size: 1000,
            batch_pause_ms: 1000,
            key_column: "id".to_string(),
            key_overrides: HashMap::new(),
            compress: false,
            max_consecutive_failures: 3,
            field_delimiter: ",".to_string(),
        }
    }
}

impl ExportConfig {
    /// The delimiter as the single byte the CSV writer expects.
    pub fn delimiter_byte(&self) -> Result<u8> {
        match self.field_delimiter.as_bytes() {
            [b] => Ok(*b),
            _ => Err(ExportError::ConfigError(format!(
                "field_delimiter must be a single byte, got {:?}",
                self.field_delimiter
            ))),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    #[default]
    Drive,
    Local,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ArchiveConfig {
    #[serde(default)]
    pub kind: ArchiveKind,
    /// Destination folder handed to the archive with every file.
    pub folder_id: Option<String>,
    /// Root directory for the `local` archive.
    pub local_root: Option<String>,
    /// Base64-encoded service-account JSON for the `drive` archive.
    pub credentials: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReportConfig {
    pub total_tables: Vec<String>,
    pub calls_table: Option<String>,
    pub calls_date_column: String,
    pub credits_table: Option<String>,
    pub credits_column: String,
    pub created_at_column: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            total_tables: vec!["leads_db".to_string(), "orgs_db".to_string()],
            calls_table: Some("calls".to_string()),
            calls_date_column: "date".to_string(),
            credits_table: Some("apollo_credits".to_string()),
            credits_column: "total".to_string(),
            created_at_column: "created_at".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub recipient: Option<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            user: None,
            password: None,
            recipient: None,
        }
    }
}

/// Which job to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Gather table statistics and mail the summary.
    Daily,
    /// Export every configured table and archive the files.
    Weekly,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    #[arg(value_enum, default_value_t = Mode::Daily)]
    pub mode: Mode,

    /// Path to configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    // Overrides for ad-hoc runs
    #[arg(long)]
    pub url: Option<String>,
    #[arg(short, long)]
    pub output: Option<String>,
    /// Table to export; repeat for several
    #[arg(long = "table")]
    pub tables: Vec<String>,
    #[arg(long)]
    pub page_size: Option<usize>,
    #[arg(long)]
    pub folder_id: Option<String>,
    #[arg(long)]
    pub compress: bool,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: AppConfig = if path.ends_with(".json") {
            serde_json::from_str(&contents).map_err(|e| ExportError::ConfigError(e.to_string()))?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| ExportError::ConfigError(e.to_string()))?
        };

        Ok(config)
    }

    pub fn merge_cli(&mut self, args: &CliArgs) {
        if let Some(u) = &args.url { self.store.url = u.clone(); }
        if let Some(o) = &args.output { self.export.output_dir = o.clone(); }
        if !args.tables.is_empty() { self.export.tables = args.tables.clone(); }
        if let Some(p) = args.page_size { self.export.page_size = p; }
        if let Some(f) = &args.folder_id { self.archive.folder_id = Some(f.clone()); }
        if args.compress { self.export.compress = true; }
    }

    /// Fills secrets missing from file and CLI using `lookup` (normally the process environment).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.store.url.is_empty() {
            self.store.url = lookup(ENV_STORE_URL).unwrap_or_default();
        }
        self.store.api_key = self.store.api_key.take().or_else(|| lookup(ENV_STORE_KEY));
        self.archive.credentials = self
            .archive
            .credentials
            .take()
            .or_else(|| lookup(ENV_DRIVE_CREDENTIALS));
        self.smtp.user = self.smtp.user.take().or_else(|| lookup(ENV_SMTP_USER));
        self.smtp.password = self.smtp.password.take().or_else(|| lookup(ENV_SMTP_PASSWORD));
        self.smtp.recipient = self
            .smtp
            .recipient
            .take()
            .or_else(|| lookup(ENV_REPORT_RECIPIENT));
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.url.trim().is_empty() {
            return Err(ExportError::ConfigError(format!(
                "store url is required (config `store.url` or {})",
                ENV_STORE_URL
            )));
        }
        if self.store.api_key.as_deref().unwrap_or("").is_empty() {
            return Err(ExportError::ConfigError(format!(
                "store api key is required (config `store.api_key` or {})",
                ENV_STORE_KEY
            )));
        }
        if self.export.tables.is_empty() {
            return Err(ExportError::ConfigError("no tables configured".to_string()));
        }
        if self.export.page_size == 0 {
            return Err(ExportError::ConfigError("page_size must be at least 1".to_string()));
        }
        if self.export.max_consecutive_failures == 0 {
            return Err(ExportError::ConfigError(
                "max_consecutive_failures must be at least 1".to_string(),
            ));
        }
        self.export.delimiter_byte()?;
        if self.archive.kind == ArchiveKind::Local && self.archive.local_root.is_none() {
            return Err(ExportError::ConfigError(
                "archive kind `local` requires `archive.local_root`".to_string(),
            ));
        }
        Ok(())
    }
}

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

//! # Runtime Context
//!
//! Builds the shared resources the application runs on:
//! 1. **HTTP agent**: one `ureq` agent with the configured timeout, shared by
//!    the table store and the Drive archive so connections are pooled.
//! 2. **Table store**: the PostgREST adapter every export and report reads through.
//! 3. **Collaborators**: the archive and notifier, built on demand for the
//!    mode being run.

use crate::application::archive_pipeline::ArchivePipeline;
use crate::application::daily_report::DailyReport;
use crate::application::export_session::{ExportSession, SessionSettings};
use crate::config::{AppConfig, ArchiveKind};
use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::drive::drive_adapter::DriveArchiveAdapter;
use crate::infrastructure::local_storage::local_archive_adapter::LocalArchiveAdapter;
use crate::infrastructure::postgrest::postgrest_adapter::PostgrestAdapter;
use crate::infrastructure::smtp::smtp_notifier::SmtpNotifier;
use crate::ports::archive_port::ArchivePort;
use crate::ports::notification_port::NotificationPort;
use crate::ports::table_store_port::TableStorePort;
use chrono::NaiveDate;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// `RuntimeContext` holds resources that live for the whole run.
pub struct RuntimeContext {
    pub config: AppConfig,
    pub agent: ureq::Agent,
    pub store: Arc<dyn TableStorePort>,
}

impl RuntimeContext {
    pub fn init(config: AppConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.store.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();

        let api_key = config.store.api_key.clone().ok_or_else(|| {
            ExportError::ConfigError("store api key is missing".to_string())
        })?;
        info!("Using table store at {}", config.store.url);
        let store: Arc<dyn TableStorePort> =
            Arc::new(PostgrestAdapter::new(agent.clone(), &config.store.url, api_key));

        Ok(Self {
            config,
            agent,
            store,
        })
    }

    pub fn archive(&self) -> Result<Arc<dyn ArchivePort>> {
        match self.config.archive.kind {
            ArchiveKind::Drive => {
                let blob = self.config.archive.credentials.clone().ok_or_else(|| {
                    ExportError::CredentialMaterializationFailed(
                        "no archival credentials configured".to_string(),
                    )
                })?;
                Ok(Arc::new(DriveArchiveAdapter::new(self.agent.clone(), blob)))
            }
            ArchiveKind::Local => {
                let root = self.config.archive.local_root.clone().ok_or_else(|| {
                    ExportError::ConfigError("archive.local_root is required".to_string())
                })?;
                Ok(Arc::new(LocalArchiveAdapter::new(PathBuf::from(root))))
            }
        }
    }

    pub fn notifier(&self) -> Result<Arc<dyn NotificationPort>> {
        Ok(Arc::new(SmtpNotifier::from_config(&self.config.smtp)?))
    }

    pub fn pipeline(&self, export_date: NaiveDate) -> Result<ArchivePipeline> {
        let settings = SessionSettings::from_config(&self.config.export, export_date)?;
        let session = ExportSession::new(self.store.clone(), settings);
        Ok(ArchivePipeline::new(
            session,
            self.archive()?,
            self.config.archive.folder_id.clone(),
        ))
    }

    pub fn daily_report(&self) -> DailyReport {
        DailyReport::new(self.store.clone(), self.config.report.clone())
    }
}

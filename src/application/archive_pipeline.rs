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

//! # Archive Pipeline
//!
//! Runs an `ExportSession` for every configured table, one after the other,
//! and hands each finished file to the archive. A failure on one table is
//! recorded in its `TableOutcome` and the run moves on to the next table.
//!
//! The local file is removed only after the archive confirmed the upload;
//! when the upload fails the file stays where it is.

use crate::application::export_session::ExportSession;
use crate::domain::entities::{TableOutcome, TableStatus};
use crate::domain::errors::{ExportError, Result};
use crate::ports::archive_port::ArchivePort;
use log::{error, info, warn};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Hex SHA-256 of a file's contents.
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

pub struct ArchivePipeline {
    session: ExportSession,
    archive: Arc<dyn ArchivePort>,
    destination: Option<String>,
}

impl ArchivePipeline {
    pub fn new(
        session: ExportSession,
        archive: Arc<dyn ArchivePort>,
        destination: Option<String>,
    ) -> Self {
        Self {
            session,
            archive,
            destination,
        }
    }

    /// Exports and archives each table in order; one outcome per table.
    pub fn run(&self, tables: &[String]) -> Vec<TableOutcome> {
        tables.iter().map(|table| self.process_table(table)).collect()
    }

    fn process_table(&self, table: &str) -> TableOutcome {
        let start = Instant::now();
        info!("Processing {}", table);

        let result = match self.session.run(table) {
            Ok(r) => r,
            Err(e) => {
                error!("Export of {} failed: {}", table, e);
                return TableOutcome::export_failed(
                    table,
                    e.to_string(),
                    start.elapsed().as_secs_f64(),
                );
            }
        };

        let sha256 = match file_sha256(result.path()) {
            Ok(h) => Some(h),
            Err(e) => {
                warn!("Could not checksum {}: {}", result.path().display(), e);
                None
            }
        };

        match self.archive.store(result.path(), self.destination.as_deref()) {
            Ok(remote_id) => {
                info!(
                    "Archived {} as {}",
                    result.path().display(),
                    remote_id
                );
                if let Err(e) = std::fs::remove_file(result.path()) {
                    warn!(
                        "Archived but could not remove local file {}: {}",
                        result.path().display(),
                        e
                    );
                }
                TableOutcome::archived(
                    table,
                    &result,
                    sha256,
                    remote_id,
                    start.elapsed().as_secs_f64(),
                )
            }
            Err(e) => {
                warn!(
                    "Upload of {} failed, keeping local file: {}",
                    result.path().display(),
                    e
                );
                TableOutcome::archive_failed(
                    table,
                    &result,
                    sha256,
                    e.to_string(),
                    start.elapsed().as_secs_f64(),
                )
            }
        }
    }

    /// Writes `archive_report_<timestamp>.json` next to the exports.
    pub fn generate_report(&self, outcomes: &[TableOutcome], duration_secs: f64) -> Result<PathBuf> {
        let count = |s: TableStatus| outcomes.iter().filter(|o| o.status == s).count();
        let report = json!({
            "summary": {
                "tables": outcomes.len(),
                "complete": count(TableStatus::Complete),
                "partial": count(TableStatus::Partial),
                "export_failed": count(TableStatus::ExportFailed),
                "archive_failed": count(TableStatus::ArchiveFailed),
                "archived": outcomes.iter().filter(|o| o.is_archived()).count(),
                "total_rows": outcomes.iter().map(|o| o.rows).sum::<u64>(),
                "total_duration_seconds": duration_secs,
            },
            "details": outcomes
        });

        let output_dir = &self.session.settings().output_dir;
        std::fs::create_dir_all(output_dir)?;
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let report_path = output_dir.join(format!("archive_report_{}.json", timestamp));
        let file = File::create(&report_path)?;
        serde_json::to_writer_pretty(file, &report)
            .map_err(|e| ExportError::ArtifactError(e.to_string()))?;
        Ok(report_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::export_session::SessionSettings;
    use crate::application::test_support::{numbered_rows, FakeTableStore, RecordingArchive};
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::time::Duration;

    fn session(store: Arc<FakeTableStore>, dir: &Path) -> ExportSession {
        ExportSession::new(
            store,
            SessionSettings {
                output_dir: dir.to_path_buf(),
                page_size: 100,
                batch_pause: Duration::ZERO,
                preferred_key: "id".to_string(),
                key_overrides: HashMap::new(),
                compress: false,
                delimiter: b',',
                max_consecutive_failures: 3,
                export_date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            },
        )
    }

    fn tables(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_archives_and_removes_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            FakeTableStore::new()
                .with_table("leads_db", numbered_rows(30))
                .with_table("orgs_db", numbered_rows(250)),
        );
        let archive = Arc::new(RecordingArchive::default());
        let pipeline = ArchivePipeline::new(
            session(store, dir.path()),
            archive.clone(),
            Some("folder-1".to_string()),
        );

        let outcomes = pipeline.run(&tables(&["leads_db", "orgs_db"]));

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.status == TableStatus::Complete));
        assert_eq!(outcomes[1].rows, 250);
        assert_eq!(outcomes[1].remote_id.as_deref(), Some("remote-orgs_db_2026-10-18.csv"));
        assert_eq!(outcomes[0].sha256.as_ref().map(|s| s.len()), Some(64));
        assert_eq!(
            archive.stored_names(),
            vec!["leads_db_2026-10-18.csv", "orgs_db_2026-10-18.csv"]
        );
        assert!(archive
            .calls
            .lock()
            .unwrap()
            .iter()
            .all(|(_, d)| d.as_deref() == Some("folder-1")));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_upload_failure_keeps_file_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            FakeTableStore::new()
                .with_table("leads_db", numbered_rows(5))
                .with_table("orgs_db", numbered_rows(5)),
        );
        let archive = Arc::new(RecordingArchive::failing_for(&["leads_db"]));
        let pipeline = ArchivePipeline::new(session(store, dir.path()), archive.clone(), None);

        let outcomes = pipeline.run(&tables(&["leads_db", "orgs_db"]));

        assert_eq!(outcomes[0].status, TableStatus::ArchiveFailed);
        assert!(outcomes[0].error.as_deref().unwrap().contains("quota exceeded"));
        assert!(dir.path().join("leads_db_2026-10-18.csv").exists());
        assert_eq!(outcomes[1].status, TableStatus::Complete);
        assert!(!dir.path().join("orgs_db_2026-10-18.csv").exists());
    }

    #[test]
    fn test_aborted_export_is_not_uploaded() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            FakeTableStore::new()
                .with_table("orgs_db", numbered_rows(5))
                .fail_page_after("leads_db", None, 1),
        );
        let archive = Arc::new(RecordingArchive::default());
        let pipeline = ArchivePipeline::new(session(store, dir.path()), archive.clone(), None);

        // leads_db fails its first fetch; orgs_db must still be attempted
        let outcomes = pipeline.run(&tables(&["leads_db", "orgs_db"]));

        assert_eq!(outcomes[0].status, TableStatus::ExportFailed);
        assert_eq!(outcomes[0].file, None);
        assert_eq!(outcomes[1].status, TableStatus::Complete);
        assert_eq!(archive.stored_names(), vec!["orgs_db_2026-10-18.csv"]);
    }

    #[test]
    fn test_partial_export_is_uploaded_with_marker() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            FakeTableStore::new()
                .with_table("orgs_db", numbered_rows(250))
                .fail_page_after("orgs_db", Some("100"), 1),
        );
        let archive = Arc::new(RecordingArchive::default());
        let pipeline = ArchivePipeline::new(session(store, dir.path()), archive.clone(), None);

        let outcomes = pipeline.run(&tables(&["orgs_db"]));

        assert_eq!(outcomes[0].status, TableStatus::Partial);
        assert!(outcomes[0].partial);
        assert_eq!(archive.stored_names(), vec!["orgs_db_2026-10-18_PARTIAL.csv"]);
    }

    #[test]
    fn test_generate_report() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FakeTableStore::new().with_table("orgs_db", numbered_rows(3)));
        let archive = Arc::new(RecordingArchive::default());
        let pipeline = ArchivePipeline::new(session(store, dir.path()), archive, None);
        let outcomes = pipeline.run(&tables(&["orgs_db", "missing_db"]));

        let path = pipeline.generate_report(&outcomes, 1.5).unwrap();
        let report: serde_json::Value =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(report["summary"]["tables"], 2);
        assert_eq!(report["summary"]["complete"], 1);
        assert_eq!(report["summary"]["export_failed"], 1);
        assert_eq!(report["summary"]["total_rows"], 3);
        assert_eq!(report["details"][0]["status"], "COMPLETE");
        assert_eq!(report["details"][1]["status"], "EXPORT_FAILED");
    }

    #[test]
    fn test_file_sha256() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.csv");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            file_sha256(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}

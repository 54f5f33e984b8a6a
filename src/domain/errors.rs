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

//! Core error definitions for the table archiver.
//!
//! This module provides a centralized `ExportError` enum and a `Result` type
//! used throughout the application to handle store, I/O, upload and logic errors.
//!
//! An empty source table is deliberately *not* an error: it produces an
//! empty-but-valid export file.

use thiserror::Error;

/// Error types encountered during export, archival and reporting.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The exact row count could not be obtained. Only degrades progress display.
    #[error("Row count unavailable for {table}: {reason}")]
    CountUnavailable { table: String, reason: String },

    /// A bounded page fetch failed. Fatal only when nothing was written yet.
    #[error("Batch fetch failed for {table}: {reason}")]
    BatchFetchFailed { table: String, reason: String },

    #[error("Table store error: {0}")]
    StoreError(String),

    #[error("Artifact generation failed: {0}")]
    ArtifactError(String),

    #[error("Upload failed for {path}: {reason}")]
    UploadFailed { path: String, reason: String },

    #[error("Could not materialize archival credentials: {0}")]
    CredentialMaterializationFailed(String),

    #[error("Notification failed: {0}")]
    NotificationError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<csv::Error> for ExportError {
    fn from(e: csv::Error) -> Self {
        ExportError::ArtifactError(e.to_string())
    }
}

/// A specialized Result type for the table archiver.
pub type Result<T> = std::result::Result<T, ExportError>;

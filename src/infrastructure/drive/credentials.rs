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

//! Transient service-account credentials.
//!
//! The archival credentials arrive as a base64 blob. For the duration of one
//! upload they are written to a private temporary file, which is deleted on
//! `release` or, on any early return, when the guard is dropped.

use crate::domain::errors::{ExportError, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a service-account key file the uploader needs.
#[derive(Debug, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug)]
pub struct MaterializedCredentials {
    file: NamedTempFile,
}

fn materialization_failed(e: impl std::fmt::Display) -> ExportError {
    ExportError::CredentialMaterializationFailed(e.to_string())
}

impl MaterializedCredentials {
    /// Decodes `blob` and writes it to a temporary file in `dir` (or the system temp dir).
    pub fn materialize(blob: &str, dir: Option<&Path>) -> Result<Self> {
        let decoded = general_purpose::STANDARD
            .decode(blob.trim())
            .map_err(|e| materialization_failed(format!("credentials are not valid base64: {}", e)))?;
        let json: Value = serde_json::from_slice(&decoded)
            .map_err(|e| materialization_failed(format!("credentials are not valid JSON: {}", e)))?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("credentials-").suffix(".json");
        let mut file = match dir {
            Some(d) => builder.tempfile_in(d),
            None => builder.tempfile(),
        }
        .map_err(materialization_failed)?;

        serde_json::to_writer(&mut file, &json).map_err(materialization_failed)?;
        file.flush().map_err(materialization_failed)?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Reads the key back from the materialized file.
    pub fn load_key(&self) -> Result<ServiceAccountKey> {
        let f = File::open(self.path()).map_err(materialization_failed)?;
        serde_json::from_reader(f)
            .map_err(|e| materialization_failed(format!("not a service-account key: {}", e)))
    }

    /// Deletes the file, reporting a failed deletion instead of ignoring it.
    pub fn release(self) -> Result<()> {
        self.file.close().map_err(ExportError::IoError)
    }
}

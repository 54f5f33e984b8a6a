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

//! Infrastructure adapter archiving export files to Google Drive.
//!
//! Each `store` call:
//! 1. Materializes the service-account credentials into a temporary file.
//! 2. Signs a JWT assertion and exchanges it for an access token.
//! 3. Opens a resumable upload session and streams the file into it.
//! 4. Deletes the credentials file, whatever happened in 2 and 3.

use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::drive::credentials::{MaterializedCredentials, ServiceAccountKey};
use crate::ports::archive_port::ArchivePort;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files?uploadType=resumable&fields=id";
const JWT_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

pub struct DriveArchiveAdapter {
    agent: ureq::Agent,
    credentials_blob: String,
    scratch_dir: Option<PathBuf>,
}

impl DriveArchiveAdapter {
    pub fn new(agent: ureq::Agent, credentials_blob: String) -> Self {
        Self {
            agent,
            credentials_blob,
            scratch_dir: None,
        }
    }

    /// Directory for the transient credentials file instead of the system temp dir.
    pub fn with_scratch_dir(mut self, dir: PathBuf) -> Self {
        self.scratch_dir = Some(dir);
        self
    }

    fn upload_failed(path: &Path, reason: impl std::fmt::Display) -> ExportError {
        ExportError::UploadFailed {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    fn access_token(&self, key: &ServiceAccountKey, path: &Path) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &key.client_email,
            scope: DRIVE_SCOPE,
            aud: &key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            ExportError::CredentialMaterializationFailed(format!("invalid private key: {}", e))
        })?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| ExportError::CredentialMaterializationFailed(e.to_string()))?;

        let resp = self
            .agent
            .post(&key.token_uri)
            .send_form(&[("grant_type", JWT_GRANT), ("assertion", assertion.as_str())])
            .map_err(|e| Self::upload_failed(path, format!("token exchange: {}", e)))?;
        let token: TokenResponse = resp
            .into_json()
            .map_err(|e| Self::upload_failed(path, format!("token response: {}", e)))?;
        Ok(token.access_token)
    }

    fn upload(
        &self,
        creds: &MaterializedCredentials,
        path: &Path,
        destination: Option<&str>,
    ) -> Result<String> {
        let size = fs::metadata(path)
            .map_err(|e| Self::upload_failed(path, e))?
            .len();
        let key = creds.load_key()?;
        let token = self.access_token(&key, path)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parents: Vec<&str> = destination.into_iter().collect();

        let session = self
            .agent
            .post(UPLOAD_URL)
            .set("Authorization", &format!("Bearer {}", token))
            .set("X-Upload-Content-Type", "application/octet-stream")
            .set("X-Upload-Content-Length", &size.to_string())
            .send_json(json!({ "name": name, "parents": parents }))
            .map_err(|e| Self::upload_failed(path, e))?;
        let location = session
            .header("location")
            .ok_or_else(|| Self::upload_failed(path, "no resumable session location"))?
            .to_string();

        let resp = self
            .agent
            .put(&location)
            .set("Content-Length", &size.to_string())
            .send(File::open(path).map_err(|e| Self::upload_failed(path, e))?)
            .map_err(|e| Self::upload_failed(path, e))?;
        let created: DriveFile = resp
            .into_json()
            .map_err(|e| Self::upload_failed(path, e))?;

        info!("File {} uploaded to Google Drive with ID: {}", name, created.id);
        Ok(created.id)
    }
}

impl ArchivePort for DriveArchiveAdapter {
    fn store(&self, path: &Path, destination: Option<&str>) -> Result<String> {
        let creds =
            MaterializedCredentials::materialize(&self.credentials_blob, self.scratch_dir.as_deref())?;
        let outcome = self.upload(&creds, path, destination);
        if let Err(e) = creds.release() {
            error!("Could not delete temporary credentials file: {}", e);
        }
        outcome
    }
}

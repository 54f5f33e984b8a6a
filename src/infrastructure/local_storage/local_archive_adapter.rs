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

//! Infrastructure adapter archiving export files into a local directory tree.
//!
//! Useful for mounted cold-storage volumes and for dry runs: each file is
//! copied to `{root}/{destination}/` (or `{root}/default/`), and the stored
//! path is returned as the archive identifier.

use crate::domain::errors::{ExportError, Result};
use crate::ports::archive_port::ArchivePort;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_DESTINATION: &str = "default";

pub struct LocalArchiveAdapter {
    root: PathBuf,
}

impl LocalArchiveAdapter {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn copy_into(&self, path: &Path, destination: Option<&str>) -> std::io::Result<PathBuf> {
        let dir = self.root.join(destination.unwrap_or(DEFAULT_DESTINATION));
        fs::create_dir_all(&dir)?;
        let name = path.file_name().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name")
        })?;
        let target = dir.join(name);
        fs::copy(path, &target)?;
        Ok(target)
    }
}

impl ArchivePort for LocalArchiveAdapter {
    fn store(&self, path: &Path, destination: Option<&str>) -> Result<String> {
        let target = self
            .copy_into(path, destination)
            .map_err(|e| ExportError::UploadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        info!("Archived {} to {}", path.display(), target.display());
        Ok(target.display().to_string())
    }
}

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

//! # Archive Port
//!
//! Contract for durable cold storage of finished export files.

use crate::domain::errors::Result;
use std::path::Path;

/// Stores a finalized file and returns the identifier the archive assigned.
pub trait ArchivePort: Send + Sync {
    /// Uploads `path` into `destination` (or the archive's default location).
    ///
    /// Implementations must not delete `path`; the pipeline removes the local
    /// file itself once this call has returned `Ok`.
    fn store(&self, path: &Path, destination: Option<&str>) -> Result<String>;
}

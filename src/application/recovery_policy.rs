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

//! # Failure Recovery Policy
//!
//! Decides what an export does after a batch fetch fails.
//!
//! ```text
//!   Healthy --fail, rows written == 0--> Aborted
//!   Healthy --fail, rows written  > 0--> Degraded
//!   Degraded --fail-------------------> Degraded
//! ```
//!
//! Nothing ever returns to `Healthy`: once a batch has been skipped the
//! output may have a gap of up to one page, so the export is reported as
//! partial even if every later batch succeeds.

use crate::domain::errors::ExportError;
use log::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Degraded,
    Aborted,
}

/// What the session should do about a failed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryDecision {
    /// No progress to salvage: fail the export.
    Abort,
    /// Skip past the failed batch and keep fetching.
    SkipAhead,
    /// Too many consecutive failures while degraded: stop and keep what we have.
    Stop,
}

#[derive(Debug)]
pub struct FailureRecoveryPolicy {
    state: HealthState,
    failures: u32,
    consecutive: u32,
    max_consecutive: u32,
    first_cause: Option<String>,
}

impl FailureRecoveryPolicy {
    pub fn new(max_consecutive: u32) -> Self {
        Self {
            state: HealthState::Healthy,
            failures: 0,
            consecutive: 0,
            max_consecutive: max_consecutive.max(1),
            first_cause: None,
        }
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    pub fn is_degraded(&self) -> bool {
        self.state == HealthState::Degraded
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn on_batch_success(&mut self) {
        self.consecutive = 0;
    }

    pub fn on_batch_failure(&mut self, rows_written: u64, err: &ExportError) -> RecoveryDecision {
        self.failures += 1;
        self.consecutive += 1;
        if self.first_cause.is_none() {
            self.first_cause = Some(err.to_string());
        }

        match self.state {
            HealthState::Healthy if rows_written == 0 => {
                error!("{} before any row was written; aborting export", err);
                self.state = HealthState::Aborted;
                RecoveryDecision::Abort
            }
            HealthState::Aborted => RecoveryDecision::Abort,
            _ => {
                self.state = HealthState::Degraded;
                if self.consecutive >= self.max_consecutive {
                    warn!(
                        "{} ({} consecutive failures); stopping with {} rows",
                        err, self.consecutive, rows_written
                    );
                    RecoveryDecision::Stop
                } else {
                    warn!("{}; skipping ahead with {} rows kept", err, rows_written);
                    RecoveryDecision::SkipAhead
                }
            }
        }
    }

    /// Summary used as the cause of a partial export.
    pub fn cause(&self) -> String {
        format!(
            "{} batch fetch(es) failed; first: {}",
            self.failures,
            self.first_cause.as_deref().unwrap_or("unknown")
        )
    }
}

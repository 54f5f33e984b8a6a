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

//! # Application
//!
//! The export pipeline and the daily report, written purely against the ports.

pub mod archive_pipeline;
pub mod batch_writer;
pub mod cursor_paginator;
pub mod daily_report;
pub mod export_session;
pub mod recovery_policy;
pub mod row_counter;
pub mod runtime;

#[cfg(test)]
pub mod test_support;

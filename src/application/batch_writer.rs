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

//! # Batch Writer
//!
//! Serializes fetched rows into a delimited text file.
//!
//! The header is the ordered key list of the first row ever written and stays
//! authoritative for the rest of the export:
//! - a column missing from a later row is written as an empty cell;
//! - a column present in a later row but absent from the header is dropped.
//!
//! Output goes to an in-progress file. Only `finalize` moves it under its
//! final name, and `discard` removes it, so a reader never sees a final-named
//! file that is missing its tail.

use crate::domain::entities::{value_to_text, Row};
use crate::domain::errors::{ExportError, Result};
use chrono::NaiveDate;
use csv::{QuoteStyle, Writer, WriterBuilder};
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{info, warn};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Marker inserted into the file name of an incomplete snapshot.
pub const PARTIAL_MARKER: &str = "_PARTIAL";
const IN_PROGRESS_SUFFIX: &str = ".inprogress";

/// `{table}_{YYYY-MM-DD}[_PARTIAL].csv[.gz]`
pub fn export_file_name(table: &str, date: NaiveDate, partial: bool, compress: bool) -> String {
    format!(
        "{}_{}{}.csv{}",
        table,
        date.format("%Y-%m-%d"),
        if partial { PARTIAL_MARKER } else { "" },
        if compress { ".gz" } else { "" }
    )
}

pub fn is_partial_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.contains(PARTIAL_MARKER))
        .unwrap_or(false)
}

/// Plain or gzip-compressed file sink.
enum Sink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Plain(w) => w.write(buf),
            Sink::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Plain(w) => w.flush(),
            Sink::Gzip(w) => w.flush(),
        }
    }
}

impl Sink {
    fn finish(self) -> io::Result<()> {
        let mut inner = match self {
            Sink::Plain(w) => w,
            Sink::Gzip(enc) => enc.finish()?,
        };
        inner.flush()?;
        inner.get_ref().sync_all()
    }
}

pub struct BatchWriter {
    writer: Writer<Sink>,
    in_progress: PathBuf,
    header: Option<Vec<String>>,
    rows_written: u64,
    dropped_columns: BTreeSet<String>,
}

impl BatchWriter {
    /// Opens the in-progress file that will become `final_path`.
    pub fn create(final_path: &Path, delimiter: u8, compress: bool) -> Result<Self> {
        let mut name = final_path.as_os_str().to_owned();
        name.push(IN_PROGRESS_SUFFIX);
        let in_progress = PathBuf::from(name);

        let file = File::create(&in_progress)?;
        let buf = BufWriter::with_capacity(128 * 1024, file);
        let sink = if compress {
            Sink::Gzip(GzEncoder::new(buf, Compression::default()))
        } else {
            Sink::Plain(buf)
        };
        let writer = WriterBuilder::new()
            .delimiter(delimiter)
            .quote_style(QuoteStyle::Necessary)
            .from_writer(sink);

        Ok(Self {
            writer,
            in_progress,
            header: None,
            rows_written: 0,
            dropped_columns: BTreeSet::new(),
        })
    }

    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn in_progress_path(&self) -> &Path {
        &self.in_progress
    }

    /// Appends one batch; returns how many records were written.
    pub fn append(&mut self, rows: &[Row]) -> Result<u64> {
        for row in rows {
            if self.header.is_none() {
                let header: Vec<String> = row.keys().cloned().collect();
                self.writer.write_record(&header)?;
                self.header = Some(header);
            }
            let record = self.align(row);
            self.writer.write_record(&record)?;
            self.rows_written += 1;
        }
        Ok(rows.len() as u64)
    }

    /// One cell per header column, in header order.
    fn align(&mut self, row: &Row) -> Vec<String> {
        let header = self.header.as_deref().unwrap_or_default();
        for key in row.keys() {
            if !header.contains(key) && self.dropped_columns.insert(key.clone()) {
                warn!(
                    "Column `{}` is not in the header inferred from the first row; its values are dropped",
                    key
                );
            }
        }
        header
            .iter()
            .map(|col| row.get(col).map(value_to_text).unwrap_or_default())
            .collect()
    }

    /// Flushes everything and moves the file to `final_path`.
    pub fn finalize(self, final_path: &Path) -> Result<u64> {
        let sink = self
            .writer
            .into_inner()
            .map_err(|e| ExportError::ArtifactError(e.to_string()))?;
        sink.finish()?;
        fs::rename(&self.in_progress, final_path)?;
        if !self.dropped_columns.is_empty() {
            info!(
                "{}: dropped columns outside the header: {:?}",
                final_path.display(),
                self.dropped_columns
            );
        }
        Ok(self.rows_written)
    }

    /// Removes the in-progress file without producing an artifact.
    pub fn discard(self) -> Result<()> {
        let in_progress = self.in_progress.clone();
        drop(self.writer);
        match fs::remove_file(&in_progress) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

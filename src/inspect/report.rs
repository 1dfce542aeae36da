//! Defect log and its CSV report.

use super::cells::write_atomic;
use crate::hole::HoleId;
use crate::search::Diagnostic;
use crate::util::HoleCheckResult;
use std::fmt::Write as _;
use std::path::Path;

/// One hole that needs attention.
#[derive(Clone, Debug, PartialEq)]
pub struct DefectEntry {
    pub hole: HoleId,
    pub diagnostic: Diagnostic,
}

/// Ordered defect entries for one run.
#[derive(Clone, Debug)]
pub struct DefectLog {
    header: [&'static str; 2],
    entries: Vec<DefectEntry>,
}

impl DefectLog {
    /// Creates an empty log with the report column titles.
    pub fn new(header: [&'static str; 2]) -> Self {
        Self {
            header,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, hole: HoleId, diagnostic: Diagnostic) {
        self.entries.push(DefectEntry { hole, diagnostic });
    }

    pub fn entries(&self) -> &[DefectEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn header(&self) -> [&'static str; 2] {
        self.header
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Renders the report as CSV with a header row.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{},{}", csv_field(self.header[0]), csv_field(self.header[1]));
        for entry in &self.entries {
            let value = entry.diagnostic.to_string();
            let _ = writeln!(out, "{},{}", csv_field(entry.hole.as_str()), csv_field(&value));
        }
        out
    }

    /// Writes the report to `path` when there is anything to report.
    ///
    /// Returns whether a file was written.
    pub fn write_csv(&self, path: &Path) -> HoleCheckResult<bool> {
        if self.entries.is_empty() {
            return Ok(false);
        }
        write_atomic(path, &self.to_csv())?;
        Ok(true)
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

//! Capture folder scanning.
//!
//! The folder is an externally populated queue. Re-listing it is safe
//! because every consumed path is remembered in a processed set.

use crate::util::{HoleCheckError, HoleCheckResult};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Extensions produced by the capture process.
pub const CAPTURE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Extensions considered when picking the latest frame for centering.
pub const CENTERING_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff"];

/// Order in which pending files are consumed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScanOrder {
    /// Lexicographic file name.
    #[default]
    Name,
    /// Modification time, then name.
    ArrivalTime,
}

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| exts.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

/// Image files in `dir` with one of `exts`, paired with their modification
/// time. A missing directory is treated as empty.
fn list_with_mtime(dir: &Path, exts: &[&str]) -> HoleCheckResult<Vec<(PathBuf, SystemTime)>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(HoleCheckError::io(format!("listing {}", dir.display()), &e)),
    };
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| HoleCheckError::io(format!("listing {}", dir.display()), &e))?;
        let path = entry.path();
        if !has_extension(&path, exts) {
            continue;
        }
        // Files can vanish between listing and stat.
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if meta.is_file() {
            out.push((path, meta.modified().unwrap_or(SystemTime::UNIX_EPOCH)));
        }
    }
    Ok(out)
}

/// Most recently modified image in `dir`, if any.
pub fn latest_image(dir: &Path, exts: &[&str]) -> HoleCheckResult<Option<PathBuf>> {
    let files = list_with_mtime(dir, exts)?;
    Ok(files
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
        .map(|(path, _)| path))
}

/// Deletes every image in `dir` with one of `exts`; returns how many.
pub fn clear_images(dir: &Path, exts: &[&str]) -> HoleCheckResult<usize> {
    let files = list_with_mtime(dir, exts)?;
    let mut removed = 0;
    for (path, _) in files {
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(HoleCheckError::io(format!("removing {}", path.display()), &e)),
        }
    }
    Ok(removed)
}

/// Capture folder with a record of consumed files.
#[derive(Debug)]
pub struct CaptureFolder {
    dir: PathBuf,
    order: ScanOrder,
    processed: HashSet<PathBuf>,
}

impl CaptureFolder {
    pub fn new(dir: impl Into<PathBuf>, order: ScanOrder) -> Self {
        Self {
            dir: dir.into(),
            order,
            processed: HashSet::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All capture images currently in the folder, in scan order.
    pub fn list(&self) -> HoleCheckResult<Vec<PathBuf>> {
        let mut files = list_with_mtime(&self.dir, CAPTURE_EXTENSIONS)?;
        match self.order {
            ScanOrder::Name => files.sort_by(|a, b| a.0.cmp(&b.0)),
            ScanOrder::ArrivalTime => {
                files.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
            }
        }
        Ok(files.into_iter().map(|(path, _)| path).collect())
    }

    /// Images not yet marked as processed, in scan order.
    pub fn pending(&self) -> HoleCheckResult<Vec<PathBuf>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|p| !self.processed.contains(p))
            .collect())
    }

    /// Records `path` as consumed. Returns false if it already was.
    pub fn mark_processed(&mut self, path: &Path) -> bool {
        self.processed.insert(path.to_path_buf())
    }

    pub fn is_processed(&self, path: &Path) -> bool {
        self.processed.contains(path)
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    /// Forgets every consumed path.
    pub fn forget_all(&mut self) {
        self.processed.clear();
    }
}

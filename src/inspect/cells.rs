//! Persisted single-value cells shared with external readers.
//!
//! Each cell is a tiny text file rewritten wholesale on every update. Writes
//! go to a sibling temporary file that is then renamed over the target, so a
//! concurrent reader sees either the old or the new value, never a torn one.

use crate::trace::trace_warn;
use crate::util::{HoleCheckError, HoleCheckResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Atomically replaces the contents of `path`.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> HoleCheckResult<()> {
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| HoleCheckError::io(format!("creating {}", parent.display()), &e))?;
    }
    fs::write(&tmp, contents)
        .map_err(|e| HoleCheckError::io(format!("writing {}", tmp.display()), &e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        HoleCheckError::io(format!("replacing {}", path.display()), &e)
    })
}

/// Decimal counter persisted in a text file.
#[derive(Clone, Debug)]
pub struct CounterCell {
    path: PathBuf,
}

impl CounterCell {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the counter without repairing it. Missing or invalid files read
    /// as `Configuration` errors.
    pub fn try_read(&self) -> HoleCheckResult<u32> {
        let text = fs::read_to_string(&self.path).map_err(|e| HoleCheckError::Configuration {
            reason: format!("{}: {e}", self.path.display()),
        })?;
        text.trim()
            .parse()
            .map_err(|_| HoleCheckError::Configuration {
                reason: format!("{}: not a counter value {:?}", self.path.display(), text.trim()),
            })
    }

    /// Reads the counter, recreating it as `0` when missing or invalid.
    pub fn read(&self) -> HoleCheckResult<u32> {
        match self.try_read() {
            Ok(value) => Ok(value),
            Err(err) => {
                trace_warn!("resetting counter: {err}");
                self.write(0)?;
                Ok(0)
            }
        }
    }

    pub fn write(&self, value: u32) -> HoleCheckResult<()> {
        write_atomic(&self.path, &value.to_string())
    }
}

/// Persisted pause flag holding `"0"` or `"1"`.
#[derive(Clone, Debug)]
pub struct PauseFlag {
    path: PathBuf,
}

impl PauseFlag {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True only when the file holds `1`; a missing file means running.
    pub fn is_paused(&self) -> bool {
        match fs::read_to_string(&self.path) {
            Ok(text) => text.trim() == "1",
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    trace_warn!("unreadable pause flag {}: {e}", self.path.display());
                }
                false
            }
        }
    }

    pub fn set(&self, paused: bool) -> HoleCheckResult<()> {
        write_atomic(&self.path, if paused { "1" } else { "0" })
    }
}

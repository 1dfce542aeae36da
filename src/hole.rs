//! Hole identifiers.
//!
//! Every captured frame is named after the hole it shows (`A0170.jpg`), so
//! the identifier is the file stem. Operators type the same code to request
//! a retake; that input must be exactly five characters.

use crate::util::{HoleCheckError, HoleCheckResult};
use std::fmt;
use std::path::Path;

/// Expected length of a hole code.
pub const HOLE_CODE_LEN: usize = 5;

/// Identifier of a captured frame, derived from its file name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HoleId(String);

impl HoleId {
    /// Wraps an identifier verbatim.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Uses the file stem of `path` as the identifier.
    pub fn from_path(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self(stem)
    }

    /// Returns the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the identifier has the usual five-character shape.
    pub fn is_well_formed(&self) -> bool {
        self.0.chars().count() == HOLE_CODE_LEN
    }
}

impl fmt::Display for HoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated five-character hole code typed by an operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoleCode(String);

impl HoleCode {
    /// Trims and upper-cases `input`, then requires exactly five ASCII
    /// alphanumerics.
    pub fn parse(input: &str) -> HoleCheckResult<Self> {
        let code = input.trim().to_uppercase();
        if code.len() != HOLE_CODE_LEN || !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(HoleCheckError::InvalidHoleCode { code });
        }
        Ok(Self(code))
    }

    /// Returns the normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HoleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{HoleCode, HoleId};
    use crate::util::HoleCheckError;
    use std::path::Path;

    #[test]
    fn id_is_file_stem() {
        let id = HoleId::from_path(Path::new("/data/captures/A0170.jpg"));
        assert_eq!(id.as_str(), "A0170");
        assert!(id.is_well_formed());
        assert!(!HoleId::from_path(Path::new("scan-12.png")).is_well_formed());
    }

    #[test]
    fn code_is_normalized() {
        assert_eq!(HoleCode::parse("  a0170 \n").unwrap().as_str(), "A0170");
    }

    #[test]
    fn code_length_is_enforced() {
        assert_eq!(
            HoleCode::parse("A017"),
            Err(HoleCheckError::InvalidHoleCode {
                code: "A017".to_string()
            })
        );
        assert!(HoleCode::parse("A01700").is_err());
        assert!(HoleCode::parse("").is_err());
        assert!(HoleCode::parse("A0 70").is_err());
    }
}

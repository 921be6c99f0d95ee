//! Version output parsing with regex extraction.

use crate::DetectionError;
use regex::Regex;
use semver::Version;

/// Parse a semantic version from CLI output.
///
/// Extracts the first `major.minor.patch` token from arbitrary text, so all of
/// these resolve to a version:
///
/// - `mato 0.9.1` -> 0.9.1
/// - `mato v1.2.3 (abc1234)` -> 1.2.3
/// - `0.1.0` -> 0.1.0
///
/// A pre-release suffix directly attached to the triple is kept
/// (`1.0.0-rc.1`).
pub(crate) fn parse_version(output: &str) -> Result<Version, DetectionError> {
    let re = Regex::new(r"(\d+)\.(\d+)\.(\d+)(-[0-9A-Za-z.-]+)?").expect("Invalid regex pattern");

    let caps = re.captures(output).ok_or(DetectionError::VersionParseFailed)?;
    let token = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
    Version::parse(token).map_err(|_| DetectionError::VersionParseFailed)
}

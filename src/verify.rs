//! Post-install verification.
//!
//! An artifact counts as installed only if running it with `--version` exits
//! zero. A parseable version token is extracted when present; a clean exit
//! without one still verifies, with the version recorded as the sentinel.

use crate::detection::{parse_version, run_version_query};
use crate::{DetectionError, InstallError};
use semver::Version;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Placeholder for a version that could not be determined.
pub const VERSION_SENTINEL: &str = "unknown";

/// Version of the artifact: reported by an installed binary, or published
/// for download. Either a parsed version or the sentinel.
///
/// # Example
///
/// ```rust
/// use mato_installer::ArtifactVersion;
/// use semver::Version;
///
/// assert_eq!(ArtifactVersion::Known(Version::new(0, 9, 1)).to_string(), "0.9.1");
/// assert_eq!(ArtifactVersion::Unknown.to_string(), "unknown");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum ArtifactVersion {
    /// A recognizable semantic version.
    Known(Version),
    /// No version could be determined; displays as the sentinel.
    Unknown,
}

impl ArtifactVersion {
    /// The parsed version, if any.
    pub fn version(&self) -> Option<&Version> {
        match self {
            Self::Known(v) => Some(v),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for ArtifactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(v) => write!(f, "{v}"),
            Self::Unknown => f.write_str(VERSION_SENTINEL),
        }
    }
}

impl From<ArtifactVersion> for String {
    fn from(version: ArtifactVersion) -> Self {
        version.to_string()
    }
}

/// Confirm that `artifact` is operable and extract its version.
///
/// Returns [`InstallError::VerificationFailure`] if the artifact cannot be
/// run, exits non-zero, or outlives `limit`.
///
/// # Example
///
/// ```rust,no_run
/// use mato_installer::verify;
/// use std::path::Path;
/// use std::time::Duration;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     match verify(Path::new("/usr/local/bin/mato"), Duration::from_secs(5)).await {
///         Ok(version) => println!("mato {version} is operable"),
///         Err(e) => println!("not usable: {e}"),
///     }
/// }
/// ```
pub async fn verify(artifact: &Path, limit: Duration) -> Result<ArtifactVersion, InstallError> {
    let output = run_version_query(artifact, limit).await.map_err(|e| {
        let fix = match e {
            DetectionError::Timeout => "The artifact hangs on --version; reinstall it",
            DetectionError::PermissionDenied => "Make the artifact executable (chmod +x)",
            _ => "The artifact is present but broken; a later strategy will replace it",
        };
        InstallError::VerificationFailure {
            message: format!("{} running {} --version", e.description(), artifact.display()),
            fix: fix.to_string(),
        }
    })?;

    match parse_version(&output.text) {
        Ok(version) => {
            tracing::debug!(artifact = %artifact.display(), %version, "artifact verified");
            Ok(ArtifactVersion::Known(version))
        }
        Err(_) => {
            tracing::warn!(
                artifact = %artifact.display(),
                output = output.text.trim(),
                "artifact runs but reports no version"
            );
            Ok(ArtifactVersion::Unknown)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    fn fake_artifact(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("mato");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_verify_extracts_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = fake_artifact(dir.path(), "echo 'mato 0.9.1'");
        let version = verify(&path, Duration::from_secs(5)).await.unwrap();
        assert_eq!(version, ArtifactVersion::Known(Version::new(0, 9, 1)));
    }

    #[tokio::test]
    async fn test_verify_without_token_is_weak_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = fake_artifact(dir.path(), "echo 'Multi-Agent Terminal Office'");
        let version = verify(&path, Duration::from_secs(5)).await.unwrap();
        assert_eq!(version, ArtifactVersion::Unknown);
        assert_eq!(version.to_string(), VERSION_SENTINEL);
    }

    #[tokio::test]
    async fn test_verify_rejects_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let path = fake_artifact(dir.path(), "echo 'mato 0.9.1'; exit 3");
        let err = verify(&path, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, InstallError::VerificationFailure { .. }));
    }

    #[tokio::test]
    async fn test_verify_rejects_missing_artifact() {
        let err = verify(Path::new("/nonexistent/mato"), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/mato"));
    }

    #[tokio::test]
    async fn test_verify_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = fake_artifact(dir.path(), "sleep 5");
        let started = std::time::Instant::now();
        let err = verify(&path, Duration::from_millis(200)).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_installed_version_serializes_as_string() {
        let json = serde_json::to_string(&ArtifactVersion::Known(Version::new(1, 2, 3))).unwrap();
        assert_eq!(json, "\"1.2.3\"");
        let json = serde_json::to_string(&ArtifactVersion::Unknown).unwrap();
        assert_eq!(json, "\"unknown\"");
    }
}

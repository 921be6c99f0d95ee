//! Async version query with timeout.

use crate::DetectionError;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Argument passed to an artifact to ask for its version.
pub(crate) const VERSION_ARG: &str = "--version";

/// Captured output of a successful version query.
#[derive(Debug, Clone)]
pub(crate) struct VersionOutput {
    /// Stdout if non-empty, stderr otherwise (some tools print there).
    pub(crate) text: String,
}

/// Run `path --version` and capture its output.
///
/// Succeeds only when the process exits zero within `limit`. Errors:
/// - `Timeout` if the process outlives `limit` (it is killed on drop)
/// - `PermissionDenied` if the artifact is not executable
/// - `IoError` for spawn failures and non-zero exits
pub(crate) async fn run_version_query(
    path: &Path,
    limit: Duration,
) -> Result<VersionOutput, DetectionError> {
    let mut command = Command::new(path);
    command.arg(VERSION_ARG).kill_on_drop(true);

    let output = timeout(limit, command.output())
        .await
        .map_err(|_| DetectionError::Timeout)?
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                DetectionError::PermissionDenied
            } else {
                DetectionError::IoError
            }
        })?;

    if !output.status.success() {
        return Err(DetectionError::IoError);
    }

    let raw = if !output.stdout.is_empty() {
        output.stdout
    } else {
        output.stderr
    };

    Ok(VersionOutput {
        text: String::from_utf8_lossy(&raw).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_version_query_nonexistent() {
        let path = PathBuf::from("/nonexistent/path/to/mato");
        let result = run_version_query(&path, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(DetectionError::IoError)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_version_query_non_executable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mato");
        std::fs::write(&path, "not a program").unwrap();
        let result = run_version_query(&path, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(DetectionError::PermissionDenied)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_version_query_false_exits_nonzero() {
        if let Some(path) = crate::detection::find_executable("false") {
            let result = run_version_query(&path, Duration::from_secs(2)).await;
            assert!(matches!(result, Err(DetectionError::IoError)));
        }
    }
}

//! Error types for the installation engine.
//!
//! [`InstallError`] covers everything that can go wrong while resolving an
//! install. Only [`InstallError::Exhaustion`] and
//! [`InstallError::EnvironmentUnknown`] are terminal; the executor folds every
//! other variant into the session transcript and moves on to the next
//! strategy.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while resolving an installation.
///
/// Each variant carries a `fix` field with an actionable suggestion, so an
/// operator (or an agent reading the transcript) knows what to try next.
///
/// # Example
///
/// ```rust
/// use mato_installer::InstallError;
///
/// fn handle_error(error: InstallError) {
///     eprintln!("Installation failed: {}", error);
///     eprintln!("To fix: {}", error.fix_suggestion());
/// }
/// ```
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum InstallError {
    /// A strategy's required capability is absent on this host.
    ///
    /// Recorded as a skipped attempt; never fatal.
    #[error("precondition unmet: {capability}")]
    PreconditionUnmet {
        /// The capability that is missing (e.g. "program `brew` on PATH").
        capability: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// A strategy ran but failed or produced no artifact.
    #[error("{message}")]
    ExecutionFailure {
        /// Description of the failure.
        message: String,
        /// Exit code of the failing command, if it exited normally.
        exit_code: Option<i32>,
        /// Trimmed tail of the command's standard error, if any.
        stderr: Option<String>,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// A strategy ran out of time.
    #[error("timed out after {duration:?}")]
    Timeout {
        /// How long the strategy was allowed to run.
        duration: Duration,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The artifact exists but did not pass the operability check.
    #[error("verification failed: {message}")]
    VerificationFailure {
        /// What the check observed.
        message: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// Fetching the published version failed.
    ///
    /// Only the version resolver produces this, and it always recovers it to
    /// the sentinel.
    #[error("network error: {message}")]
    NetworkFailure {
        /// Description of the network error.
        message: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// Every eligible strategy was tried and failed.
    ///
    /// With no reasons at all, nothing was eligible on this host.
    #[error("{}", exhaustion_summary(reasons))]
    Exhaustion {
        /// One `strategy: reason` entry per failed attempt, in catalog order.
        reasons: Vec<String>,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The host OS or CPU architecture is not in the supported set.
    #[error("unsupported environment: {os}/{arch}")]
    EnvironmentUnknown {
        /// The OS family reported by the host.
        os: String,
        /// The CPU architecture reported by the host.
        arch: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },
}

impl InstallError {
    /// Get an actionable suggestion for fixing this error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mato_installer::InstallError;
    /// use std::time::Duration;
    ///
    /// let error = InstallError::Timeout {
    ///     duration: Duration::from_secs(300),
    ///     fix: "Retry with a longer --strategy-timeout".to_string(),
    /// };
    /// assert!(error.fix_suggestion().contains("timeout"));
    /// ```
    pub fn fix_suggestion(&self) -> &str {
        match self {
            Self::PreconditionUnmet { fix, .. } => fix,
            Self::ExecutionFailure { fix, .. } => fix,
            Self::Timeout { fix, .. } => fix,
            Self::VerificationFailure { fix, .. } => fix,
            Self::NetworkFailure { fix, .. } => fix,
            Self::Exhaustion { fix, .. } => fix,
            Self::EnvironmentUnknown { fix, .. } => fix,
        }
    }

    /// Whether this error ends the session instead of advancing the chain.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhaustion { .. } | Self::EnvironmentUnknown { .. })
    }

    /// Process exit code for this error.
    ///
    /// Terminal kinds map to their documented codes; everything else is
    /// recovered inside the chain and would never reach the process boundary,
    /// so it shares the generic failure code.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::EnvironmentUnknown { .. } => 2,
            _ => 1,
        }
    }
}

fn exhaustion_summary(reasons: &[String]) -> String {
    if reasons.is_empty() {
        "no eligible strategy".to_string()
    } else {
        format!("all install strategies failed ({} attempted)", reasons.len())
    }
}

/// Typed error variants for low-level detection failures.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DetectionError {
    /// Timed out while running the executable.
    Timeout,

    /// Permission denied executing the artifact.
    PermissionDenied,

    /// Output contained no recognizable version token.
    VersionParseFailed,

    /// I/O error or non-zero exit status.
    IoError,
}

impl DetectionError {
    /// Human-readable description of the error.
    ///
    /// ```rust
    /// use mato_installer::DetectionError;
    ///
    /// assert_eq!(DetectionError::Timeout.description(), "Detection timed out");
    /// ```
    pub fn description(&self) -> &'static str {
        match self {
            Self::Timeout => "Detection timed out",
            Self::PermissionDenied => "Permission denied",
            Self::VersionParseFailed => "Failed to parse version",
            Self::IoError => "I/O error during detection",
        }
    }
}

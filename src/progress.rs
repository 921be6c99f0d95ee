//! Progress reporting for the install chain.
//!
//! The executor reports each step through a caller-supplied callback. The
//! binary turns these into log lines; tests use them to observe ordering.

use crate::Platform;

/// Progress stages during a session.
///
/// # Example
///
/// ```rust
/// use mato_installer::InstallProgress;
///
/// fn on_progress(progress: InstallProgress) {
///     match &progress {
///         InstallProgress::Attempting { index, strategy } => {
///             println!("[{}] trying {strategy}", index + 1);
///         }
///         InstallProgress::Failed { strategy, reason } => {
///             println!("{strategy} failed: {reason}; continuing");
///         }
///         other => println!("{}", other.description()),
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallProgress {
    /// The session started on this platform.
    Started {
        /// The classified host.
        platform: Platform,
    },

    /// A verified artifact was already present; no strategy will run.
    AlreadyInstalled {
        /// The version reported by the artifact, or the sentinel.
        version: String,
    },

    /// Entering a catalog entry.
    Attempting {
        /// Catalog position, zero-based.
        index: usize,
        /// Strategy identifier.
        strategy: String,
    },

    /// The entry's precondition is unmet.
    Skipped {
        /// Strategy identifier.
        strategy: String,
        /// The missing capability.
        reason: String,
    },

    /// The entry ran and failed, or its artifact did not verify.
    Failed {
        /// Strategy identifier.
        strategy: String,
        /// Captured diagnostic.
        reason: String,
    },

    /// The entry's commands succeeded; checking the artifact.
    Verifying {
        /// Strategy identifier.
        strategy: String,
    },

    /// The session ended with a verified artifact.
    Completed {
        /// The version reported by the artifact, or the sentinel.
        version: String,
    },

    /// The session ended without a verified artifact.
    Exhausted {
        /// Number of failed attempts.
        failures: usize,
    },
}

impl InstallProgress {
    /// Get a human-readable description of the stage.
    ///
    /// ```rust
    /// use mato_installer::InstallProgress;
    ///
    /// let progress = InstallProgress::Exhausted { failures: 3 };
    /// assert_eq!(progress.description(), "All strategies failed");
    /// ```
    pub fn description(&self) -> &'static str {
        match self {
            Self::Started { .. } => "Starting installation",
            Self::AlreadyInstalled { .. } => "Already installed",
            Self::Attempting { .. } => "Attempting strategy",
            Self::Skipped { .. } => "Strategy skipped",
            Self::Failed { .. } => "Strategy failed",
            Self::Verifying { .. } => "Verifying installation",
            Self::Completed { .. } => "Installation complete",
            Self::Exhausted { .. } => "All strategies failed",
        }
    }

    /// Whether this stage ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::AlreadyInstalled { .. } | Self::Completed { .. } | Self::Exhausted { .. }
        )
    }
}

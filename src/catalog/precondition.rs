//! Strategy preconditions.
//!
//! A precondition names the capabilities a strategy needs from the host: an
//! OS family it supports and programs it invokes by name. Checking is cheap
//! and side-effect free, so the executor evaluates it right before each
//! attempt.

use crate::detection::program_on_path;
use crate::platform::OsFamily;
use crate::{InstallError, Platform};
use serde::{Deserialize, Serialize};

/// A program a strategy invokes by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredProgram {
    /// Executable name looked up on PATH.
    pub name: String,

    /// Where to get it, used in the fix suggestion.
    pub install_url: Option<String>,
}

impl RequiredProgram {
    /// A required program without an install hint.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            install_url: None,
        }
    }

    /// Attach an install hint URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.install_url = Some(url.into());
        self
    }
}

/// Capabilities a strategy requires before it may run.
///
/// # Example
///
/// ```rust
/// use mato_installer::{OsFamily, Platform, Precondition, RequiredProgram};
///
/// let pre = Precondition::only_on([OsFamily::MacOs])
///     .with_program(RequiredProgram::new("sh"));
///
/// let linux = Platform::from_parts("linux", "x86_64").unwrap();
/// assert!(pre.check(&linux).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precondition {
    /// OS families the strategy supports. Empty means any.
    pub platforms: Vec<OsFamily>,

    /// Programs that must resolve on PATH.
    pub programs: Vec<RequiredProgram>,
}

impl Precondition {
    /// No requirements: always eligible.
    pub fn none() -> Self {
        Self::default()
    }

    /// Restrict to the given OS families.
    pub fn only_on(platforms: impl IntoIterator<Item = OsFamily>) -> Self {
        Self {
            platforms: platforms.into_iter().collect(),
            programs: Vec::new(),
        }
    }

    /// Require a program on PATH.
    pub fn with_program(mut self, program: RequiredProgram) -> Self {
        self.programs.push(program);
        self
    }

    /// Check the precondition against `platform` and the current PATH.
    ///
    /// Returns the first unmet capability as
    /// [`InstallError::PreconditionUnmet`].
    pub fn check(&self, platform: &Platform) -> Result<(), InstallError> {
        if !self.platforms.is_empty() && !self.platforms.contains(&platform.os) {
            let supported: Vec<_> = self.platforms.iter().map(ToString::to_string).collect();
            return Err(InstallError::PreconditionUnmet {
                capability: format!("os {} (requires {})", platform.os, supported.join(" or ")),
                fix: "Use a later strategy in the chain".to_string(),
            });
        }

        for program in &self.programs {
            if !program_on_path(&program.name) {
                return Err(InstallError::PreconditionUnmet {
                    capability: format!("program `{}` on PATH", program.name),
                    fix: match &program.install_url {
                        Some(url) => format!("Install {} from {url}", program.name),
                        None => format!("Install {} and re-run", program.name),
                    },
                });
            }
        }

        Ok(())
    }
}

//! Type definitions for install strategies.
//!
//! A strategy pairs a precondition with the commands that perform the
//! install and the place the artifact is expected to appear afterwards. The
//! types support both programmatic execution and human-readable display.

use super::Precondition;
use crate::detection::find_executable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A structured command for programmatic execution.
///
/// # Example
///
/// ```rust
/// use mato_installer::StructuredCommand;
///
/// let cmd = StructuredCommand::new("brew", ["install", "mato"]);
/// assert_eq!(cmd.to_string(), "brew install mato");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredCommand {
    /// The program to execute (e.g., "bash", "brew").
    pub program: String,

    /// Arguments to pass to the program.
    pub args: Vec<String>,

    /// Environment variables to set before execution (key, value pairs).
    pub env_vars: Vec<(String, String)>,
}

impl StructuredCommand {
    /// A command with no extra environment.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            env_vars: Vec::new(),
        }
    }

    /// A `bash -c` invocation of `script` with `pipefail` enabled, so a
    /// failing `curl` in a pipe fails the whole command.
    pub fn bash(script: impl AsRef<str>) -> Self {
        Self::new(
            "bash",
            [
                "-c".to_string(),
                format!("set -euo pipefail\n{}", script.as_ref()),
            ],
        )
    }

    /// Add an environment variable for the child process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for StructuredCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Where a strategy's artifact is expected after it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocation {
    /// Executable name, also looked up on PATH and common install dirs.
    pub binary: String,

    /// Exact paths checked first, in order.
    pub candidates: Vec<PathBuf>,
}

impl ArtifactLocation {
    /// Look the artifact up by name only.
    pub fn named(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            candidates: Vec::new(),
        }
    }

    /// Add an exact candidate path.
    pub fn at(mut self, path: impl Into<PathBuf>) -> Self {
        self.candidates.push(path.into());
        self
    }

    /// First existing candidate, else a PATH/fallback-dir hit for `binary`.
    pub fn locate(&self) -> Option<PathBuf> {
        self.candidates
            .iter()
            .find(|p| p.is_file())
            .cloned()
            .or_else(|| find_executable(&self.binary))
    }
}

/// One concrete way of installing the artifact.
///
/// # Example
///
/// ```rust
/// use mato_installer::{
///     ArtifactLocation, InstallStrategy, Precondition, RequiredProgram, StructuredCommand,
/// };
///
/// let brew = InstallStrategy {
///     id: "homebrew".to_string(),
///     description: "Install via Homebrew".to_string(),
///     precondition: Precondition::none().with_program(RequiredProgram::new("brew")),
///     commands: vec![
///         StructuredCommand::new("brew", ["tap", "mr-kelly/tap"]),
///         StructuredCommand::new("brew", ["install", "mato"]),
///     ],
///     raw_command: "brew tap mr-kelly/tap\nbrew install mato".to_string(),
///     artifact: ArtifactLocation::named("mato"),
/// };
/// assert_eq!(brew.commands.len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallStrategy {
    /// Stable identifier printed in the transcript (`strategy=<id>`).
    pub id: String,

    /// Human-readable description.
    pub description: String,

    /// What the host must provide before this strategy is attempted.
    pub precondition: Precondition,

    /// Commands run in order; the first non-zero exit fails the strategy.
    pub commands: Vec<StructuredCommand>,

    /// Copy-pasteable form for humans and agent prompts.
    pub raw_command: String,

    /// Where the artifact should exist once the commands succeed.
    pub artifact: ArtifactLocation,
}

//! Host platform detection.
//!
//! The engine only proceeds on a platform it can classify into the supported
//! set (Linux or macOS on x86_64 or aarch64); release assets and install
//! strategies are keyed by that pair.

use crate::InstallError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::IntoEnumIterator;

/// Supported operating system families.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    /// Any Linux distribution.
    Linux,
    /// Apple macOS.
    #[strum(to_string = "macos", serialize = "darwin")]
    MacOs,
}

/// Supported CPU architectures.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Arch {
    /// 64-bit x86.
    #[strum(to_string = "x86_64", serialize = "amd64")]
    #[serde(rename = "x86_64")]
    X86_64,
    /// 64-bit ARM (Apple Silicon, Graviton, ...).
    #[strum(to_string = "aarch64", serialize = "arm64")]
    #[serde(rename = "aarch64")]
    Aarch64,
}

/// The classified host: OS family plus CPU architecture.
///
/// # Example
///
/// ```rust
/// use mato_installer::{Arch, OsFamily, Platform};
///
/// let platform = Platform::from_parts("linux", "x86_64").unwrap();
/// assert_eq!(platform.os, OsFamily::Linux);
/// assert_eq!(platform.asset_name(), "mato-linux-x86_64.tar.gz");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system family.
    pub os: OsFamily,
    /// CPU architecture.
    pub arch: Arch,
}

impl Platform {
    /// Classify the running host.
    ///
    /// Fails with [`InstallError::EnvironmentUnknown`] when the OS or
    /// architecture is outside the supported set.
    pub fn detect() -> Result<Self, InstallError> {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Classify an explicit `(os, arch)` pair as reported by
    /// `std::env::consts` or `uname`.
    pub fn from_parts(os: &str, arch: &str) -> Result<Self, InstallError> {
        match (OsFamily::from_str(os), Arch::from_str(arch)) {
            (Ok(os), Ok(arch)) => Ok(Self { os, arch }),
            _ => Err(InstallError::EnvironmentUnknown {
                os: os.to_string(),
                arch: arch.to_string(),
                fix: format!(
                    "Supported platforms are {}; build from source manually on other hosts",
                    Self::supported_list()
                ),
            }),
        }
    }

    /// Name of the prebuilt release archive for this platform.
    pub fn asset_name(&self) -> String {
        format!("mato-{}-{}.tar.gz", self.os, self.arch)
    }

    /// Iterator over every supported platform.
    pub fn all() -> impl Iterator<Item = Self> {
        OsFamily::iter().flat_map(|os| Arch::iter().map(move |arch| Self { os, arch }))
    }

    fn supported_list() -> String {
        Self::all()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

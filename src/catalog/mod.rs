//! The ordered catalog of install strategies.
//!
//! Catalog order is priority order. It is fixed when the catalog is built and
//! never re-sorted: the executor walks entries front to back, recording a
//! skip for every entry whose precondition is unmet.
//!
//! # Example
//!
//! ```rust
//! use mato_installer::{InstallOptions, Platform, StrategyCatalog};
//!
//! let platform = Platform::from_parts("linux", "x86_64").unwrap();
//! let catalog = StrategyCatalog::builtin(&platform, &InstallOptions::default());
//!
//! let ids: Vec<_> = catalog.iter().map(|s| s.id.as_str()).collect();
//! assert_eq!(ids, ["script", "homebrew", "binary", "source"]);
//! ```

mod builtin;
mod precondition;
mod types;

pub use builtin::{ARTIFACT_NAME, RELEASES_URL};
pub use precondition::{Precondition, RequiredProgram};
pub use types::{ArtifactLocation, InstallStrategy, StructuredCommand};

use crate::Platform;

/// A fixed, declaration-ordered list of install strategies.
#[derive(Debug, Clone)]
pub struct StrategyCatalog {
    strategies: Vec<InstallStrategy>,
}

impl StrategyCatalog {
    /// Build a catalog whose priority is the order of `strategies`.
    pub fn new(strategies: Vec<InstallStrategy>) -> Self {
        Self { strategies }
    }

    /// The built-in chain for `mato`: install script, Homebrew, prebuilt
    /// release binary, build from source.
    pub fn builtin(platform: &Platform, options: &crate::InstallOptions) -> Self {
        Self::new(builtin::strategies(platform, &options.install_dir))
    }

    /// Strategies in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &InstallStrategy> {
        self.strategies.iter()
    }

    /// Strategy at catalog position `index`.
    pub fn get(&self, index: usize) -> Option<&InstallStrategy> {
        self.strategies.get(index)
    }

    /// Number of strategies, eligible or not.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether the catalog has no strategies at all.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

/// Whether `strategy` may be attempted on `platform`.
pub fn eligible(strategy: &InstallStrategy, platform: &Platform) -> bool {
    strategy.precondition.check(platform).is_ok()
}

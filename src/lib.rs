//! # mato-installer
//!
//! Installation resolution engine for Mato, the Multi-Agent Terminal Office.
//!
//! The engine classifies the host, walks an ordered catalog of install
//! strategies until one produces an artifact that verifies, and emits a
//! line-oriented transcript that a human or a coding agent can act on
//! without further interpretation.
//!
//! ## Features
//!
//! - [`Platform`] classification of the host OS family and architecture
//! - [`StrategyCatalog`] of install strategies in priority order
//! - [`executor::run`] for the strict sequential fallback chain
//! - [`verify()`] post-install check of an artifact's `--version`
//! - [`resolve()`] bounded lookup of the published version
//! - [`report`] text and JSON transcripts
//!
//! ## Example
//!
//! ```rust,no_run
//! use mato_installer::{executor, report, InstallOptions, Platform, StrategyCatalog};
//!
//! #[tokio::main]
//! async fn main() {
//!     let platform = match Platform::detect() {
//!         Ok(p) => p,
//!         Err(e) => {
//!             eprintln!("{e}: {}", e.fix_suggestion());
//!             println!("status=failed");
//!             std::process::exit(e.exit_code().into());
//!         }
//!     };
//!
//!     let options = InstallOptions::default();
//!     let catalog = StrategyCatalog::builtin(&platform, &options);
//!     let session = executor::run(&catalog, platform, &options).await;
//!
//!     print!("{}", report::render_text(&session));
//!     std::process::exit(session.exit_code().into());
//! }
//! ```

mod catalog;
mod detection;
mod error;
pub mod executor;
mod options;
mod platform;
mod progress;
pub mod report;
mod resolver;
pub mod session;
mod verify;

pub use catalog::{
    eligible, ArtifactLocation, InstallStrategy, Precondition, RequiredProgram, StrategyCatalog,
    StructuredCommand, ARTIFACT_NAME, RELEASES_URL,
};
pub use error::{DetectionError, InstallError};
pub use options::{InstallOptions, ResolveOptions, DEFAULT_VERSION_URL};
pub use platform::{Arch, OsFamily, Platform};
pub use progress::InstallProgress;
pub use resolver::{release_url, resolve, VersionBadge, VersionQuery, VersionWatch};
pub use session::{AttemptOutcome, FailureReason, InstallAttempt, InstallSession, SessionState};
pub use verify::{verify, ArtifactVersion, VERSION_SENTINEL};

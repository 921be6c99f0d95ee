//! Host probing helpers shared by the catalog and the verifier.
//!
//! - `find_executable`: PATH lookup with fallback install locations
//! - `run_version_query`: runs an artifact with `--version` under a timeout
//! - `parse_version`: regex-based version extraction from CLI output

mod parser;
mod path_finder;
mod version;

pub(crate) use parser::parse_version;
pub(crate) use path_finder::{find_executable, program_on_path};
pub(crate) use version::run_version_query;

//! PATH-based executable lookup with fallback locations.

use std::path::PathBuf;

/// System fallback paths to check if executable not found in PATH.
const FALLBACK_PATHS: &[&str] = &["/usr/local/bin", "/opt/homebrew/bin", "/usr/bin"];

/// Find an executable by name.
///
/// Tries the system PATH via the `which` crate first, then common system
/// directories, then user-local directories under `$HOME`. Freshly installed
/// binaries often land in `~/.local/bin` before the user's shell has picked
/// up the PATH change, so the fallbacks matter right after an install.
pub(crate) fn find_executable(name: &str) -> Option<PathBuf> {
    if let Ok(path) = which::which(name) {
        return Some(path);
    }

    for dir in FALLBACK_PATHS {
        let path = PathBuf::from(dir).join(name);
        if path.is_file() {
            return Some(path);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let home = PathBuf::from(home);
        for sub in [".local/bin", "bin", ".cargo/bin"] {
            let path = home.join(sub).join(name);
            if path.is_file() {
                return Some(path);
            }
        }
    }

    None
}

/// Whether `name` resolves on PATH.
///
/// Unlike [`find_executable`] this does not consult fallback directories:
/// a capability only counts if strategies can invoke it by name.
pub(crate) fn program_on_path(name: &str) -> bool {
    which::which(name).is_ok()
}

//! Engine configuration.
//!
//! [`InstallOptions`] tunes the install chain and [`ResolveOptions`] the
//! published-version lookup. Both have defaults suitable for an interactive
//! terminal; the CLI overrides individual fields from flags or `MATO_*`
//! environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Default URL of the plaintext published-version resource.
pub const DEFAULT_VERSION_URL: &str = "https://mato.sh/version.txt";

/// Options for controlling the install chain.
///
/// # Example
///
/// ```rust
/// use mato_installer::InstallOptions;
/// use std::time::Duration;
///
/// let options = InstallOptions::default();
/// assert_eq!(options.strategy_timeout, Duration::from_secs(300));
///
/// let options = InstallOptions {
///     force: true,
///     ..Default::default()
/// };
/// assert!(options.force);
/// ```
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Upper bound for one strategy's whole command sequence.
    ///
    /// Default: 5 minutes.
    pub strategy_timeout: Duration,

    /// Upper bound for the `--version` check of an installed artifact.
    ///
    /// Default: 5 seconds.
    pub verify_timeout: Duration,

    /// Directory the binary and source strategies install into.
    ///
    /// Default: `~/.local/bin` (no sudo needed), or `/usr/local/bin` when
    /// `$HOME` is unset.
    pub install_dir: PathBuf,

    /// Run the chain even if a verified artifact is already present.
    ///
    /// Default: `false`.
    pub force: bool,
}

impl InstallOptions {
    /// The default install directory for this user.
    pub fn default_install_dir() -> PathBuf {
        match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(".local").join("bin"),
            None => PathBuf::from("/usr/local/bin"),
        }
    }
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            strategy_timeout: Duration::from_secs(300),
            verify_timeout: Duration::from_secs(5),
            install_dir: Self::default_install_dir(),
            force: false,
        }
    }
}

/// Options for the published-version lookup.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Plaintext resource holding one semantic version.
    pub url: String,

    /// Hard bound on the whole fetch, connect through body.
    ///
    /// Default: 3 seconds.
    pub timeout: Duration,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            url: DEFAULT_VERSION_URL.to_string(),
            timeout: Duration::from_secs(3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_defaults() {
        let opts = InstallOptions::default();
        assert_eq!(opts.strategy_timeout, Duration::from_secs(300));
        assert_eq!(opts.verify_timeout, Duration::from_secs(5));
        assert!(!opts.force);
        assert!(opts.install_dir.ends_with("bin"));
    }

    #[test]
    fn test_install_custom_timeout() {
        let opts = InstallOptions {
            strategy_timeout: Duration::from_millis(500),
            ..Default::default()
        };
        assert_eq!(opts.strategy_timeout, Duration::from_millis(500));
        assert_eq!(opts.verify_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_resolve_defaults() {
        let opts = ResolveOptions::default();
        assert_eq!(opts.url, "https://mato.sh/version.txt");
        assert_eq!(opts.timeout, Duration::from_secs(3));
    }
}

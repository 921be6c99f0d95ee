//! Published-version lookup.
//!
//! Fetches the plaintext version resource used for the version badge and the
//! release link. The lookup is bounded by a timeout and always yields a
//! value: any network error, non-success status, empty or malformed body, or
//! timeout collapses to the `"unknown"` sentinel. It never touches the
//! install chain.

use crate::catalog::RELEASES_URL;
use crate::{ArtifactVersion, InstallError, ResolveOptions};
use semver::Version;
use serde::Serialize;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Result of one published-version lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionQuery {
    /// The URL that was (or is being) fetched.
    pub source: String,

    /// The published version, or the sentinel.
    pub value: ArtifactVersion,

    /// When `value` was determined.
    pub resolved_at: SystemTime,

    /// Why the value is the sentinel, when the fetch failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl VersionQuery {
    /// A query that has not produced a value yet.
    pub fn pending(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            value: ArtifactVersion::Unknown,
            resolved_at: SystemTime::now(),
            failure: None,
        }
    }

    /// Release page for the resolved value.
    pub fn release_url(&self) -> String {
        release_url(&self.value)
    }
}

/// Release page for `version`, or the latest release for the sentinel.
///
/// ```rust
/// use mato_installer::{release_url, ArtifactVersion};
/// use semver::Version;
///
/// assert_eq!(
///     release_url(&ArtifactVersion::Known(Version::new(0, 9, 1))),
///     "https://github.com/mr-kelly/mato/releases/tag/v0.9.1"
/// );
/// assert_eq!(
///     release_url(&ArtifactVersion::Unknown),
///     "https://github.com/mr-kelly/mato/releases/latest"
/// );
/// ```
pub fn release_url(version: &ArtifactVersion) -> String {
    match version {
        ArtifactVersion::Known(v) => format!("{RELEASES_URL}/tag/v{v}"),
        ArtifactVersion::Unknown => format!("{RELEASES_URL}/latest"),
    }
}

/// Fetch the published version.
///
/// Completes within `options.timeout` and never fails; see the module docs.
///
/// # Example
///
/// ```rust,no_run
/// use mato_installer::{resolve, ResolveOptions};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let query = resolve(&ResolveOptions::default()).await;
///     println!("latest: {} ({})", query.value, query.release_url());
/// }
/// ```
pub async fn resolve(options: &ResolveOptions) -> VersionQuery {
    let outcome = match timeout(options.timeout, fetch(&options.url, options.timeout)).await {
        Ok(result) => result,
        Err(_) => Err(InstallError::NetworkFailure {
            message: format!("no response within {}ms", options.timeout.as_millis()),
            fix: "Retry later or raise --version-timeout".to_string(),
        }),
    };

    let (value, failure) = match outcome {
        Ok(version) => {
            tracing::debug!(url = %options.url, %version, "published version resolved");
            (ArtifactVersion::Known(version), None)
        }
        Err(e) => {
            tracing::warn!(
                url = %options.url,
                error = %e,
                "published version unavailable, using sentinel"
            );
            (ArtifactVersion::Unknown, Some(e.to_string()))
        }
    };

    VersionQuery {
        source: options.url.clone(),
        value,
        resolved_at: SystemTime::now(),
        failure,
    }
}

async fn fetch(url: &str, limit: Duration) -> Result<Version, InstallError> {
    let client = reqwest::Client::builder()
        .timeout(limit)
        .user_agent(concat!("mato-installer/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(network_failure)?;

    let response = client
        .get(url)
        .header(reqwest::header::CACHE_CONTROL, "no-store")
        .send()
        .await
        .map_err(network_failure)?;

    let status = response.status();
    if !status.is_success() {
        return Err(InstallError::NetworkFailure {
            message: format!("HTTP {status}"),
            fix: format!("Check that {url} is published"),
        });
    }

    let body = response.text().await.map_err(network_failure)?;
    parse_published(&body).ok_or_else(|| InstallError::NetworkFailure {
        message: format!("malformed version body ({} bytes)", body.len()),
        fix: format!("{url} must contain a single semantic version"),
    })
}

fn network_failure(e: reqwest::Error) -> InstallError {
    InstallError::NetworkFailure {
        message: e.to_string(),
        fix: "Check your internet connection".to_string(),
    }
}

/// Parse the version resource body: one trimmed semantic version, optionally
/// prefixed with `v`.
pub(crate) fn parse_published(body: &str) -> Option<Version> {
    let token = body.trim();
    let token = token.strip_prefix('v').unwrap_or(token);
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Version::parse(token).ok()
}

/// Display state for the version badge.
///
/// Starts at the sentinel and takes the first successfully resolved version;
/// after that it never changes. Failed lookups leave it untouched.
///
/// ```rust
/// use mato_installer::{ArtifactVersion, VersionBadge, VersionQuery};
/// use semver::Version;
///
/// let mut badge = VersionBadge::default();
/// assert_eq!(badge.label(), "Mato vunknown: Multi-Agent Terminal Office");
///
/// let mut query = VersionQuery::pending("https://mato.sh/version.txt");
/// query.value = ArtifactVersion::Known(Version::new(0, 9, 1));
/// assert!(badge.apply(&query));
/// assert_eq!(badge.release_url(), "https://github.com/mr-kelly/mato/releases/tag/v0.9.1");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionBadge {
    resolved: Option<Version>,
}

impl VersionBadge {
    /// Fold a lookup result into the badge. Returns whether it changed.
    pub fn apply(&mut self, query: &VersionQuery) -> bool {
        match (&self.resolved, &query.value) {
            (None, ArtifactVersion::Known(v)) => {
                self.resolved = Some(v.clone());
                true
            }
            _ => false,
        }
    }

    /// The displayed version.
    pub fn version(&self) -> ArtifactVersion {
        match &self.resolved {
            Some(v) => ArtifactVersion::Known(v.clone()),
            None => ArtifactVersion::Unknown,
        }
    }

    /// Link target for the badge.
    pub fn release_url(&self) -> String {
        release_url(&self.version())
    }

    /// Badge text.
    pub fn label(&self) -> String {
        format!("Mato v{}: Multi-Agent Terminal Office", self.version())
    }
}

/// A lookup running in the background.
///
/// [`current`](Self::current) is available immediately and returns the
/// sentinel until the fetch completes. Dropping the handle cancels the fetch;
/// spawning another starts an independent lookup.
#[derive(Debug)]
pub struct VersionWatch {
    source: String,
    rx: watch::Receiver<Option<VersionQuery>>,
    task: JoinHandle<()>,
}

impl VersionWatch {
    /// Start a lookup on the current tokio runtime.
    pub fn spawn(options: ResolveOptions) -> Self {
        let (tx, rx) = watch::channel(None);
        let source = options.url.clone();
        let task = tokio::spawn(async move {
            let query = resolve(&options).await;
            let _ = tx.send(Some(query));
        });
        Self { source, rx, task }
    }

    /// The latest known result without waiting.
    pub fn current(&self) -> VersionQuery {
        self.rx
            .borrow()
            .clone()
            .unwrap_or_else(|| VersionQuery::pending(self.source.clone()))
    }

    /// Whether the lookup has produced its result.
    pub fn is_settled(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait for the lookup to finish, then return its result.
    ///
    /// Bounded by the lookup's own timeout.
    pub async fn settled(&mut self) -> VersionQuery {
        while self.rx.borrow().is_none() {
            if self.rx.changed().await.is_err() {
                break;
            }
        }
        self.current()
    }
}

impl Drop for VersionWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a loopback port.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}/version.txt")
    }

    /// Accept one connection and never answer.
    async fn serve_silence() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((socket, _)) = listener.accept().await {
                tokio::time::sleep(Duration::from_secs(30)).await;
                drop(socket);
            }
        });
        format!("http://{addr}/version.txt")
    }

    fn options(url: String, timeout: Duration) -> ResolveOptions {
        ResolveOptions { url, timeout }
    }

    #[test]
    fn test_parse_published() {
        assert_eq!(parse_published("0.9.1\n"), Some(Version::new(0, 9, 1)));
        assert_eq!(parse_published("  v1.2.3  "), Some(Version::new(1, 2, 3)));
        assert_eq!(parse_published(""), None);
        assert_eq!(parse_published("   \n"), None);
        assert_eq!(parse_published("<html>oops</html>"), None);
        assert_eq!(parse_published("1.2.3 1.2.4"), None);
        assert_eq!(parse_published("1.2"), None);
    }

    #[tokio::test]
    async fn test_resolve_success() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 6\r\nConnection: close\r\n\r\n0.9.1\n",
        )
        .await;
        let query = resolve(&options(url.clone(), Duration::from_secs(5))).await;
        assert_eq!(query.value, ArtifactVersion::Known(Version::new(0, 9, 1)));
        assert_eq!(query.source, url);
        assert!(query.failure.is_none());
        assert_eq!(
            query.release_url(),
            "https://github.com/mr-kelly/mato/releases/tag/v0.9.1"
        );
    }

    #[tokio::test]
    async fn test_resolve_non_success_status() {
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let query = resolve(&options(url, Duration::from_secs(5))).await;
        assert_eq!(query.value, ArtifactVersion::Unknown);
        assert!(query.failure.unwrap().contains("404"));
    }

    #[tokio::test]
    async fn test_resolve_empty_body() {
        let url =
            serve_once("HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
        let query = resolve(&options(url, Duration::from_secs(5))).await;
        assert_eq!(query.value.to_string(), "unknown");
    }

    #[tokio::test]
    async fn test_resolve_malformed_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 6\r\nConnection: close\r\n\r\n<html>",
        )
        .await;
        let query = resolve(&options(url, Duration::from_secs(5))).await;
        assert_eq!(query.value, ArtifactVersion::Unknown);
        assert!(query.failure.unwrap().contains("malformed"));
    }

    #[tokio::test]
    async fn test_resolve_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let query = resolve(&options(
            format!("http://{addr}/version.txt"),
            Duration::from_secs(5),
        ))
        .await;
        assert_eq!(query.value, ArtifactVersion::Unknown);
        assert_eq!(query.release_url(), "https://github.com/mr-kelly/mato/releases/latest");
    }

    #[tokio::test]
    async fn test_resolve_respects_timeout() {
        let url = serve_silence().await;
        let started = Instant::now();
        let query = resolve(&options(url, Duration::from_millis(200))).await;
        assert_eq!(query.value, ArtifactVersion::Unknown);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_badge_single_assignment() {
        let mut badge = VersionBadge::default();
        assert_eq!(badge.version(), ArtifactVersion::Unknown);
        assert_eq!(
            badge.release_url(),
            "https://github.com/mr-kelly/mato/releases/latest"
        );

        let failed = VersionQuery::pending("u");
        assert!(!badge.apply(&failed));

        let mut first = VersionQuery::pending("u");
        first.value = ArtifactVersion::Known(Version::new(0, 9, 1));
        assert!(badge.apply(&first));

        let mut second = VersionQuery::pending("u");
        second.value = ArtifactVersion::Known(Version::new(1, 0, 0));
        assert!(!badge.apply(&second));
        assert!(!badge.apply(&failed));
        assert_eq!(badge.label(), "Mato v0.9.1: Multi-Agent Terminal Office");
    }

    #[tokio::test]
    async fn test_watch_is_sentinel_until_settled() {
        let url = serve_silence().await;
        let mut watch = VersionWatch::spawn(options(url.clone(), Duration::from_millis(300)));

        let now = watch.current();
        assert_eq!(now.value, ArtifactVersion::Unknown);
        assert_eq!(now.source, url);

        let settled = watch.settled().await;
        assert!(watch.is_settled());
        assert_eq!(settled.value, ArtifactVersion::Unknown);
        assert!(settled.failure.is_some());
    }

    #[tokio::test]
    async fn test_watch_refines_to_resolved_value() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\n2.0.0",
        )
        .await;
        let mut watch = VersionWatch::spawn(options(url, Duration::from_secs(5)));
        let settled = watch.settled().await;
        assert_eq!(settled.value, ArtifactVersion::Known(Version::new(2, 0, 0)));
        assert_eq!(watch.current(), settled);
    }
}

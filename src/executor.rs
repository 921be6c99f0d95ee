//! The install chain executor.
//!
//! Walks a [`StrategyCatalog`] strictly in order, one strategy at a time:
//! strategies mutate shared host state (files, PATH, package manager
//! databases), so they never overlap. Every non-terminal error is folded into
//! the session's attempt log and the walk continues with the next entry.

use crate::catalog::{InstallStrategy, StrategyCatalog, StructuredCommand};
use crate::session::{AttemptOutcome, FailureReason, InstallAttempt, InstallSession, SessionState};
use crate::{verify, ArtifactVersion, InstallError, InstallOptions, InstallProgress, Platform};
use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::{timeout_at, Instant};

/// Maximum stderr lines kept as a failure diagnostic.
const STDERR_TAIL_LINES: usize = 3;

/// Run the install chain without progress reporting.
///
/// See [`run_with_progress`].
pub async fn run(
    catalog: &StrategyCatalog,
    platform: Platform,
    options: &InstallOptions,
) -> InstallSession {
    run_with_progress(catalog, platform, options, |_| {}).await
}

/// Run the install chain, reporting each step through `on_progress`.
///
/// This function:
/// 1. Unless `options.force` is set, looks for an already-installed artifact
///    at any catalog location and, if it verifies, succeeds immediately
/// 2. For each catalog entry in order: records a skip if its precondition is
///    unmet, otherwise runs its commands under `options.strategy_timeout`
/// 3. Verifies the artifact of a strategy whose commands succeeded; the
///    first verified artifact ends the session
/// 4. Ends the session as exhausted once the catalog runs out
///
/// The returned session is always terminal.
///
/// # Example
///
/// ```rust,no_run
/// use mato_installer::{executor, InstallOptions, Platform, StrategyCatalog};
///
/// #[tokio::main]
/// async fn main() {
///     let platform = Platform::detect().expect("supported platform");
///     let options = InstallOptions::default();
///     let catalog = StrategyCatalog::builtin(&platform, &options);
///
///     let session = executor::run_with_progress(&catalog, platform, &options, |p| {
///         eprintln!("{}", p.description());
///     })
///     .await;
///
///     std::process::exit(session.exit_code().into());
/// }
/// ```
pub async fn run_with_progress<F>(
    catalog: &StrategyCatalog,
    platform: Platform,
    options: &InstallOptions,
    on_progress: F,
) -> InstallSession
where
    F: Fn(InstallProgress) + Send + Sync,
{
    let mut session = InstallSession::new(platform);
    on_progress(InstallProgress::Started { platform });

    if !options.force {
        if let Some((path, version)) = find_existing(catalog, options.verify_timeout).await {
            tracing::info!(
                artifact = %path.display(),
                %version,
                "already installed, nothing to do"
            );
            session.set_artifact(path);
            on_progress(InstallProgress::AlreadyInstalled {
                version: version.to_string(),
            });
            session.advance(SessionState::Succeeded(version));
            return session;
        }
    }

    let mut failures = Vec::new();

    for (index, strategy) in catalog.iter().enumerate() {
        session.advance(SessionState::Attempting(index));
        on_progress(InstallProgress::Attempting {
            index,
            strategy: strategy.id.clone(),
        });

        if let Err(e) = strategy.precondition.check(&platform) {
            tracing::info!(strategy = %strategy.id, reason = %e, "skipping strategy");
            on_progress(InstallProgress::Skipped {
                strategy: strategy.id.clone(),
                reason: e.to_string(),
            });
            session.record(InstallAttempt::new(
                &strategy.id,
                AttemptOutcome::Skipped,
                e.to_string(),
            ));
            continue;
        }

        tracing::info!(strategy = %strategy.id, "attempting strategy");
        let artifact = match execute(strategy, options.strategy_timeout).await {
            Ok(path) => path,
            Err(e) => {
                record_failure(&mut session, &mut failures, strategy, &e, &on_progress);
                continue;
            }
        };

        session.advance(SessionState::Verifying(index));
        on_progress(InstallProgress::Verifying {
            strategy: strategy.id.clone(),
        });

        match verify(&artifact, options.verify_timeout).await {
            Ok(version) => {
                tracing::info!(strategy = %strategy.id, %version, "installation verified");
                session.record(InstallAttempt::new(
                    &strategy.id,
                    AttemptOutcome::Succeeded,
                    format!("verified {} version {version}", artifact.display()),
                ));
                session.set_artifact(artifact);
                on_progress(InstallProgress::Completed {
                    version: version.to_string(),
                });
                session.advance(SessionState::Succeeded(version));
                return session;
            }
            Err(e) => record_failure(&mut session, &mut failures, strategy, &e, &on_progress),
        }
    }

    if failures.is_empty() {
        tracing::warn!("no eligible strategy on this host");
    }
    on_progress(InstallProgress::Exhausted {
        failures: failures.len(),
    });
    session.advance(SessionState::Exhausted(failures));
    session
}

fn record_failure<F>(
    session: &mut InstallSession,
    failures: &mut Vec<FailureReason>,
    strategy: &InstallStrategy,
    error: &InstallError,
    on_progress: &F,
) where
    F: Fn(InstallProgress),
{
    tracing::warn!(
        strategy = %strategy.id,
        error = %error,
        fix = error.fix_suggestion(),
        "strategy failed, continuing with next fallback"
    );
    let detail = error.to_string();
    on_progress(InstallProgress::Failed {
        strategy: strategy.id.clone(),
        reason: detail.clone(),
    });
    session.record(InstallAttempt::new(&strategy.id, AttemptOutcome::Failed, detail.clone()));
    failures.push(FailureReason {
        strategy: strategy.id.clone(),
        detail,
    });
}

/// Look for a verified artifact at any catalog location.
async fn find_existing(
    catalog: &StrategyCatalog,
    limit: Duration,
) -> Option<(PathBuf, ArtifactVersion)> {
    let mut seen = HashSet::new();
    for strategy in catalog.iter() {
        let Some(path) = strategy.artifact.locate() else {
            continue;
        };
        if !seen.insert(path.clone()) {
            continue;
        }
        match verify(&path, limit).await {
            Ok(version) => return Some((path, version)),
            Err(e) => tracing::debug!(
                artifact = %path.display(),
                error = %e,
                "existing artifact unusable"
            ),
        }
    }
    None
}

/// Run a strategy's commands under one timeout, then locate its artifact.
async fn execute(strategy: &InstallStrategy, limit: Duration) -> Result<PathBuf, InstallError> {
    let deadline = Instant::now() + limit;
    for command in &strategy.commands {
        if run_command(command, deadline).await? == Completion::TimedOut {
            return Err(InstallError::Timeout {
                duration: limit,
                fix: format!(
                    "`{}` did not finish in {limit:?}; retry with a longer --strategy-timeout \
                     or check network",
                    strategy.id
                ),
            });
        }
    }

    strategy.artifact.locate().ok_or_else(|| {
        let expected: Vec<_> = strategy
            .artifact
            .candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        InstallError::ExecutionFailure {
            message: format!(
                "commands succeeded but no `{}` artifact found (checked PATH{}{})",
                strategy.artifact.binary,
                if expected.is_empty() { "" } else { ", " },
                expected.join(", ")
            ),
            exit_code: Some(0),
            stderr: None,
            fix: "Add the install directory to PATH or pick an explicit --install-dir".to_string(),
        }
    })
}

/// How a command ended, short of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Completion {
    Finished,
    TimedOut,
}

/// Run one command to completion; non-zero exit is an error.
///
/// The command runs in its own process group. Once it exits, or `deadline`
/// passes, the whole group is killed, so nothing it started keeps touching
/// the host while the next strategy runs.
pub(crate) async fn run_command(
    cmd: &StructuredCommand,
    deadline: Instant,
) -> Result<Completion, InstallError> {
    tracing::debug!(command = %cmd, "running");

    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .envs(cmd.env_vars.iter().cloned())
        .kill_on_drop(true)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn().map_err(|e| InstallError::ExecutionFailure {
        message: format!("failed to start `{}`: {e}", cmd.program),
        exit_code: None,
        stderr: None,
        fix: if e.kind() == std::io::ErrorKind::PermissionDenied {
            "Try running with appropriate permissions".to_string()
        } else {
            format!("Make sure `{}` is installed and on PATH", cmd.program)
        },
    })?;
    let group = child.id();

    let mut stderr_pipe = child.stderr.take();
    let stderr_reader = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    });

    let status = match timeout_at(deadline, child.wait()).await {
        Ok(status) => {
            kill_group(group);
            status
        }
        Err(_) => {
            tracing::debug!(command = %cmd, "deadline passed, killing process group");
            kill_group(group);
            let _ = child.kill().await;
            stderr_reader.abort();
            return Ok(Completion::TimedOut);
        }
    };
    let status = status.map_err(|e| InstallError::ExecutionFailure {
        message: format!("failed to wait for `{}`: {e}", cmd.program),
        exit_code: None,
        stderr: None,
        fix: "Re-run the installer".to_string(),
    })?;
    let stderr = stderr_reader.await.unwrap_or_default();

    if status.success() {
        return Ok(Completion::Finished);
    }

    let stderr = String::from_utf8_lossy(&stderr);
    let tail = stderr_tail(&stderr);

    let is_network = ["network", "connection", "resolve", "ETIMEDOUT", "ENOTFOUND"]
        .iter()
        .any(|needle| stderr.contains(needle));

    let code = status.code();
    let status = match code {
        Some(c) => format!("exited with code {c}"),
        None => "was terminated by a signal".to_string(),
    };

    Err(InstallError::ExecutionFailure {
        message: if tail.is_empty() {
            format!("`{}` {status}", cmd.program)
        } else {
            format!("`{}` {status}: {tail}", cmd.program)
        },
        exit_code: code,
        stderr: (!tail.is_empty()).then_some(tail),
        fix: if is_network {
            "Check your internet connection and try again".to_string()
        } else {
            "See the diagnostic above; the next fallback runs automatically".to_string()
        },
    })
}

/// SIGKILL every process left in the group led by `leader`.
#[cfg(unix)]
fn kill_group(leader: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = leader.and_then(|id| i32::try_from(id).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(pgid = pid, error = %e, "failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_group(_leader: Option<u32>) {}

/// Last few non-empty stderr lines, joined on one line.
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join(" | ")
}

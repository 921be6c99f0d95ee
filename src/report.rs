//! Transcript rendering.
//!
//! The text transcript is line-oriented and stable:
//!
//! ```text
//! strategy=<id> result=<ok|skip|fail> detail=<reason>
//! ...
//! status=<installed:<version>|failed>
//! ```
//!
//! One line per attempt in catalog order, then exactly one status line. Each
//! line stands alone: details are flattened onto a single line so an agent
//! can act on any line without reading its neighbours.

use crate::catalog::{StrategyCatalog, ARTIFACT_NAME};
use crate::session::{AttemptOutcome, InstallAttempt, InstallSession};
use crate::{Platform, VersionQuery};
use serde::Serialize;

/// Short result code used in the transcript.
pub fn result_code(outcome: AttemptOutcome) -> &'static str {
    match outcome {
        AttemptOutcome::Succeeded => "ok",
        AttemptOutcome::Skipped => "skip",
        AttemptOutcome::Failed => "fail",
    }
}

/// Collapse all whitespace (including newlines) into single spaces.
fn single_line(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.is_empty() {
        "none".to_string()
    } else {
        flat
    }
}

/// Render one attempt.
pub fn attempt_line(attempt: &InstallAttempt) -> String {
    format!(
        "strategy={} result={} detail={}",
        attempt.strategy,
        result_code(attempt.outcome),
        single_line(&attempt.reason)
    )
}

/// Render the terminal status line.
///
/// A session that is somehow not terminal reports `failed`: the line is
/// always present.
pub fn status_line(session: &InstallSession) -> String {
    match session.installed_version() {
        Some(version) => format!("status=installed:{version}"),
        None => "status=failed".to_string(),
    }
}

/// Render the published-version lookup as a single line.
///
/// Not part of the install transcript; the `version` command prints it.
///
/// ```rust
/// use mato_installer::{report, VersionQuery};
///
/// let query = VersionQuery::pending("https://mato.sh/version.txt");
/// let line = report::version_line(&query);
/// assert!(line.starts_with("version=unknown source=https://mato.sh/version.txt "));
/// assert!(line.ends_with("release=https://github.com/mr-kelly/mato/releases/latest"));
/// ```
pub fn version_line(query: &VersionQuery) -> String {
    format!(
        "version={} source={} release={}",
        query.value,
        query.source,
        query.release_url()
    )
}

/// Render the full text transcript of a session: attempt lines, then the
/// status line. Nothing else is ever written.
pub fn render_text(session: &InstallSession) -> String {
    let mut out = String::new();
    for attempt in session.attempts() {
        out.push_str(&attempt_line(attempt));
        out.push('\n');
    }
    out.push_str(&status_line(session));
    out.push('\n');
    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    status: String,
    exit_code: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    session: &'a InstallSession,
    #[serde(skip_serializing_if = "Option::is_none")]
    published: Option<&'a VersionQuery>,
}

/// Render the session as a single JSON document.
///
/// `detail` carries the terminal error, and `published` the version lookup
/// when one has settled.
pub fn render_json(
    session: &InstallSession,
    published: Option<&VersionQuery>,
) -> Result<String, serde_json::Error> {
    let status = status_line(session);
    let report = JsonReport {
        status: status.trim_start_matches("status=").to_string(),
        exit_code: session.exit_code(),
        detail: match session.outcome() {
            Some(Err(e)) => Some(e.to_string()),
            _ => None,
        },
        session,
        published,
    };
    serde_json::to_string_pretty(&report)
}

/// Describe what the chain would do on `platform` without running anything.
///
/// One `strategy=` line per entry with its eligibility, followed by the
/// copy-pasteable commands indented with `$`.
pub fn render_plan(catalog: &StrategyCatalog, platform: &Platform) -> String {
    let mut out = String::new();
    for strategy in catalog.iter() {
        let (eligible, detail) = match strategy.precondition.check(platform) {
            Ok(()) => ("yes", strategy.description.clone()),
            Err(e) => ("no", e.to_string()),
        };
        out.push_str(&format!(
            "strategy={} eligible={eligible} detail={}\n",
            strategy.id,
            single_line(&detail)
        ));
        for line in strategy.raw_command.lines() {
            out.push_str(&format!("  $ {line}\n"));
        }
    }
    out
}

/// Fallback labels used in the agent prompt after the primary step.
const FALLBACK_LABELS: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

/// The install instructions for a coding agent, derived from the catalog.
pub fn render_agent_prompt(catalog: &StrategyCatalog) -> String {
    let mut out = String::from("Install Mato on this machine and verify it works.\n\nSteps:\n");
    let mut step = 0;
    for (index, strategy) in catalog.iter().enumerate() {
        step += 1;
        let heading = match index {
            0 => format!("Primary install path ({})", strategy.description),
            i => {
                let label = FALLBACK_LABELS.get(i - 1).copied().unwrap_or("N");
                format!("If that fails, fallback {label} ({})", strategy.description)
            }
        };
        out.push_str(&format!("{step}) {heading}:\n"));
        for line in strategy.raw_command.lines() {
            out.push_str(&format!("   - {line}\n"));
        }
    }
    out.push_str(&format!(
        "{}) Verification:\n   - run: {ARTIFACT_NAME} --version\n",
        step + 1
    ));
    out.push_str(&format!(
        "{}) If any step fails, explain the exact failure and continue with the next \
         fallback automatically.\n",
        step + 2
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{FailureReason, SessionState};
    use crate::{ArtifactVersion, Platform};
    use semver::Version;

    fn linux() -> Platform {
        Platform::from_parts("linux", "x86_64").unwrap()
    }

    fn exhausted_session() -> InstallSession {
        let mut session = InstallSession::new(linux());
        session.advance(SessionState::Attempting(0));
        session.record(InstallAttempt::new(
            "homebrew",
            AttemptOutcome::Skipped,
            "precondition unmet: program `brew` on PATH",
        ));
        session.advance(SessionState::Attempting(1));
        session.record(InstallAttempt::new(
            "binary",
            AttemptOutcome::Failed,
            "`bash` exited with code 22:\ncurl: (22) 404",
        ));
        session.advance(SessionState::Exhausted(vec![FailureReason {
            strategy: "binary".to_string(),
            detail: "exit 22".to_string(),
        }]));
        session
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("a\n  b\tc "), "a b c");
        assert_eq!(single_line("  \n"), "none");
    }

    #[test]
    fn test_exhausted_transcript() {
        let text = render_text(&exhausted_session());
        assert_eq!(
            text,
            "strategy=homebrew result=skip detail=precondition unmet: program `brew` on PATH\n\
             strategy=binary result=fail detail=`bash` exited with code 22: curl: (22) 404\n\
             status=failed\n"
        );
    }

    #[test]
    fn test_succeeded_transcript() {
        let mut session = InstallSession::new(linux());
        session.advance(SessionState::Attempting(0));
        session.advance(SessionState::Verifying(0));
        session.record(InstallAttempt::new(
            "script",
            AttemptOutcome::Succeeded,
            "verified /home/u/.local/bin/mato version 0.9.1",
        ));
        session.advance(SessionState::Succeeded(ArtifactVersion::Known(Version::new(0, 9, 1))));

        let text = render_text(&session);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "strategy=script result=ok detail=verified /home/u/.local/bin/mato version 0.9.1",
                "status=installed:0.9.1",
            ]
        );
    }

    #[test]
    fn test_transcript_has_only_attempt_and_status_lines() {
        let text = render_text(&exhausted_session());
        for line in text.lines() {
            assert!(
                line.starts_with("strategy=") || line.starts_with("status="),
                "unexpected line: {line}"
            );
        }
        let status: Vec<_> = text.lines().filter(|l| l.starts_with("status=")).collect();
        assert_eq!(status, ["status=failed"]);
        assert_eq!(text.lines().last(), Some("status=failed"));
    }

    #[test]
    fn test_plan_marks_ineligible_entries() {
        use crate::catalog::{
            ArtifactLocation, InstallStrategy, Precondition, RequiredProgram, StructuredCommand,
        };

        let catalog = StrategyCatalog::new(vec![
            InstallStrategy {
                id: "first".to_string(),
                description: "Always available".to_string(),
                precondition: Precondition::none(),
                commands: vec![StructuredCommand::new("true", [] as [&str; 0])],
                raw_command: "true".to_string(),
                artifact: ArtifactLocation::named("mato"),
            },
            InstallStrategy {
                id: "second".to_string(),
                description: "Needs a tool".to_string(),
                precondition: Precondition::none()
                    .with_program(RequiredProgram::new("definitely_not_real_xyz")),
                commands: vec![],
                raw_command: "one\ntwo".to_string(),
                artifact: ArtifactLocation::named("mato"),
            },
        ]);

        let plan = render_plan(&catalog, &linux());
        let lines: Vec<_> = plan.lines().collect();
        assert_eq!(
            lines,
            [
                "strategy=first eligible=yes detail=Always available",
                "  $ true",
                "strategy=second eligible=no \
                 detail=precondition unmet: program `definitely_not_real_xyz` on PATH",
                "  $ one",
                "  $ two",
            ]
        );
    }

    #[test]
    fn test_agent_prompt_follows_catalog() {
        let catalog = StrategyCatalog::builtin(&linux(), &crate::InstallOptions::default());
        let prompt = render_agent_prompt(&catalog);
        assert!(prompt.starts_with("Install Mato on this machine and verify it works."));
        assert!(prompt.contains(
            "1) Primary install path (Official install script):\n\
             \x20  - curl -fsSL http://mato.sh/install.sh | bash\n"
        ));
        assert!(prompt.contains(
            "2) If that fails, fallback A (Homebrew tap (Linux/macOS)):\n\
             \x20  - brew tap mr-kelly/tap\n\
             \x20  - brew install mato\n"
        ));
        assert!(prompt.contains("5) Verification:\n   - run: mato --version\n"));
        assert!(prompt.ends_with("continue with the next fallback automatically.\n"));
    }

    #[test]
    fn test_json_report() {
        let json = render_json(&exhausted_session(), None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["exit_code"], 1);
        assert_eq!(value["detail"], "all install strategies failed (1 attempted)");
        assert_eq!(value["session"]["attempts"][0]["outcome"], "skipped");
        assert_eq!(value["session"]["state"]["state"], "exhausted");
        assert!(value.get("published").is_none());
    }

    #[test]
    fn test_json_report_names_empty_chain() {
        let mut session = InstallSession::new(linux());
        session.advance(SessionState::Exhausted(vec![]));
        let value: serde_json::Value =
            serde_json::from_str(&render_json(&session, None).unwrap()).unwrap();
        assert_eq!(value["detail"], "no eligible strategy");
    }

    #[test]
    fn test_json_report_includes_settled_lookup() {
        let query = VersionQuery::pending("https://mato.sh/version.txt");
        let json = render_json(&exhausted_session(), Some(&query)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["published"]["value"], "unknown");
    }
}

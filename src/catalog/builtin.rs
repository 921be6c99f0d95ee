//! The built-in install chain for `mato`.
//!
//! Order: official install script, Homebrew tap, prebuilt release archive,
//! build from source. The two strategies that write into the install
//! directory stage everything in a fresh temp dir and move the binary into
//! place last, so a failed or repeated run never leaves a half-written file
//! behind.

use super::{ArtifactLocation, InstallStrategy, Precondition, RequiredProgram, StructuredCommand};
use crate::platform::OsFamily;
use crate::Platform;
use std::path::{Path, PathBuf};

/// Executable name of the installed artifact.
pub const ARTIFACT_NAME: &str = "mato";

/// GitHub releases page for the artifact.
pub const RELEASES_URL: &str = "https://github.com/mr-kelly/mato/releases";

const INSTALL_SCRIPT_URL: &str = "http://mato.sh/install.sh";
const BREW_TAP: &str = "mr-kelly/tap";
const REPO_URL: &str = "https://github.com/mr-kelly/mato.git";
const UNIX: [OsFamily; 2] = [OsFamily::Linux, OsFamily::MacOs];

const BINARY_SCRIPT: &str = r#"tmp="$(mktemp -d)"
trap 'rm -rf "$tmp"' EXIT
curl -fsSL "$MATO_ASSET_URL" -o "$tmp/mato.tar.gz"
tar -xzf "$tmp/mato.tar.gz" -C "$tmp"
mkdir -p "$MATO_INSTALL_DIR"
install -m 0755 "$tmp/mato" "$MATO_INSTALL_DIR/.mato.partial"
mv -f "$MATO_INSTALL_DIR/.mato.partial" "$MATO_INSTALL_DIR/mato""#;

const SOURCE_SCRIPT: &str = r#"tmp="$(mktemp -d)"
trap 'rm -rf "$tmp"' EXIT
git clone --depth 1 "$MATO_REPO_URL" "$tmp/mato"
cargo build --release --manifest-path "$tmp/mato/Cargo.toml"
mkdir -p "$MATO_INSTALL_DIR"
install -m 0755 "$tmp/mato/target/release/mato" "$MATO_INSTALL_DIR/.mato.partial"
mv -f "$MATO_INSTALL_DIR/.mato.partial" "$MATO_INSTALL_DIR/mato""#;

fn program(name: &str, url: &str) -> RequiredProgram {
    RequiredProgram::new(name).with_url(url)
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Build the four built-in strategies for `platform`.
pub(super) fn strategies(platform: &Platform, install_dir: &Path) -> Vec<InstallStrategy> {
    let install_dir_str = install_dir.display().to_string();
    let asset_url = format!("{RELEASES_URL}/latest/download/{}", platform.asset_name());

    let mut script_artifact = ArtifactLocation::named(ARTIFACT_NAME);
    if let Some(home) = home_dir() {
        script_artifact = script_artifact.at(home.join(".local/bin").join(ARTIFACT_NAME));
    }
    script_artifact = script_artifact.at(Path::new("/usr/local/bin").join(ARTIFACT_NAME));

    let script = InstallStrategy {
        id: "script".to_string(),
        description: "Official install script".to_string(),
        precondition: Precondition::only_on(UNIX)
            .with_program(program("bash", "https://www.gnu.org/software/bash/"))
            .with_program(program("curl", "https://curl.se/download.html")),
        commands: vec![StructuredCommand::bash(format!(
            "curl -fsSL {INSTALL_SCRIPT_URL} | bash"
        ))],
        raw_command: format!("curl -fsSL {INSTALL_SCRIPT_URL} | bash"),
        artifact: script_artifact,
    };

    let homebrew = InstallStrategy {
        id: "homebrew".to_string(),
        description: "Homebrew tap (Linux/macOS)".to_string(),
        precondition: Precondition::only_on(UNIX).with_program(program("brew", "https://brew.sh/")),
        commands: vec![
            StructuredCommand::new("brew", ["tap", BREW_TAP]),
            StructuredCommand::new("brew", ["install", ARTIFACT_NAME]),
        ],
        raw_command: format!("brew tap {BREW_TAP}\nbrew install {ARTIFACT_NAME}"),
        artifact: ArtifactLocation::named(ARTIFACT_NAME)
            .at("/opt/homebrew/bin/mato")
            .at("/usr/local/bin/mato")
            .at("/home/linuxbrew/.linuxbrew/bin/mato"),
    };

    let binary = InstallStrategy {
        id: "binary".to_string(),
        description: format!("Prebuilt release binary ({})", platform.asset_name()),
        precondition: Precondition::only_on(UNIX)
            .with_program(program("bash", "https://www.gnu.org/software/bash/"))
            .with_program(program("curl", "https://curl.se/download.html"))
            .with_program(program("tar", "https://www.gnu.org/software/tar/")),
        commands: vec![StructuredCommand::bash(BINARY_SCRIPT)
            .env("MATO_ASSET_URL", asset_url.clone())
            .env("MATO_INSTALL_DIR", install_dir_str.clone())],
        raw_command: format!(
            "curl -fsSL {asset_url} | tar -xz && install -m 0755 mato {install_dir_str}/mato"
        ),
        artifact: ArtifactLocation::named(ARTIFACT_NAME).at(install_dir.join(ARTIFACT_NAME)),
    };

    let source = InstallStrategy {
        id: "source".to_string(),
        description: "Build from source with cargo".to_string(),
        precondition: Precondition::none()
            .with_program(program("bash", "https://www.gnu.org/software/bash/"))
            .with_program(program("git", "https://git-scm.com/downloads"))
            .with_program(program("cargo", "https://rustup.rs/")),
        commands: vec![StructuredCommand::bash(SOURCE_SCRIPT)
            .env("MATO_REPO_URL", REPO_URL)
            .env("MATO_INSTALL_DIR", install_dir_str.clone())],
        raw_command: format!(
            "git clone {REPO_URL}\n\
             cd mato\n\
             cargo build --release\n\
             install target/release/mato {install_dir_str}/mato"
        ),
        artifact: ArtifactLocation::named(ARTIFACT_NAME).at(install_dir.join(ARTIFACT_NAME)),
    };

    vec![script, homebrew, binary, source]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> Platform {
        Platform::from_parts("linux", "x86_64").unwrap()
    }

    #[test]
    fn test_builtin_order() {
        let ids: Vec<_> = strategies(&linux(), Path::new("/tmp/bin"))
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, ["script", "homebrew", "binary", "source"]);
    }

    #[test]
    fn test_script_pipes_into_bash() {
        let all = strategies(&linux(), Path::new("/tmp/bin"));
        assert_eq!(all[0].raw_command, "curl -fsSL http://mato.sh/install.sh | bash");
        assert_eq!(all[0].commands.len(), 1);
    }

    #[test]
    fn test_homebrew_taps_then_installs() {
        let all = strategies(&linux(), Path::new("/tmp/bin"));
        let rendered: Vec<_> = all[1].commands.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["brew tap mr-kelly/tap", "brew install mato"]);
    }

    #[test]
    fn test_binary_passes_paths_through_env() {
        let all = strategies(&linux(), Path::new("/opt/my tools/bin"));
        let env = &all[2].commands[0].env_vars;
        assert!(env.contains(&(
            "MATO_ASSET_URL".to_string(),
            "https://github.com/mr-kelly/mato/releases/latest/download/mato-linux-x86_64.tar.gz"
                .to_string()
        )));
        assert!(env.contains(&("MATO_INSTALL_DIR".to_string(), "/opt/my tools/bin".to_string())));
        assert_eq!(
            all[2].artifact.candidates,
            vec![PathBuf::from("/opt/my tools/bin/mato")]
        );
    }

    #[test]
    fn test_source_requires_toolchain() {
        let all = strategies(&linux(), Path::new("/tmp/bin"));
        let names: Vec<_> = all[3]
            .precondition
            .programs
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, ["bash", "git", "cargo"]);
        assert!(all[3].precondition.platforms.is_empty());
    }

    #[test]
    fn test_staging_scripts_move_into_place_last() {
        for script in [BINARY_SCRIPT, SOURCE_SCRIPT] {
            let last = script.lines().last().unwrap();
            assert!(last.starts_with("mv -f"), "{last}");
        }
    }
}

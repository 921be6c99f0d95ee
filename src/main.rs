use clap::{Parser, Subcommand, ValueEnum};
use mato_installer::{
    executor, report, Arch, InstallOptions, InstallProgress, OsFamily, Platform, ResolveOptions,
    StrategyCatalog, VersionBadge, VersionQuery, VersionWatch, DEFAULT_VERSION_URL,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Install Mato through an ordered fallback chain and report every step.
#[derive(Parser, Debug)]
#[command(name = "mato-installer", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Increase log verbosity on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
struct GlobalOpts {
    /// Seconds one strategy may run before it is abandoned
    #[arg(long, global = true, env = "MATO_STRATEGY_TIMEOUT", default_value_t = 300)]
    strategy_timeout: u64,

    /// Seconds the `--version` check may take
    #[arg(long, global = true, env = "MATO_VERIFY_TIMEOUT", default_value_t = 5)]
    verify_timeout: u64,

    /// Directory the binary and source strategies install into
    #[arg(long, global = true, env = "MATO_INSTALL_DIR")]
    install_dir: Option<PathBuf>,

    /// Run the chain even if Mato is already installed
    #[arg(long, global = true, env = "MATO_FORCE")]
    force: bool,

    /// Transcript format on stdout
    #[arg(long, global = true, env = "MATO_FORMAT", value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Plaintext resource holding the published version
    #[arg(long, global = true, env = "MATO_VERSION_URL", default_value = DEFAULT_VERSION_URL)]
    version_url: String,

    /// Seconds the published-version lookup may take
    #[arg(long, global = true, env = "MATO_VERSION_TIMEOUT", default_value_t = 3)]
    version_timeout: u64,

    /// Skip the published-version lookup
    #[arg(long, global = true, env = "MATO_NO_VERSION")]
    no_version: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Run the install chain (default)
    Install,
    /// Print the published version and its release page
    Version,
    /// List the catalog and what is eligible on this host, without running anything
    Plan,
    /// Print install instructions for a coding agent
    Prompt,
}

impl GlobalOpts {
    fn install_options(&self) -> InstallOptions {
        let defaults = InstallOptions::default();
        InstallOptions {
            strategy_timeout: Duration::from_secs(self.strategy_timeout),
            verify_timeout: Duration::from_secs(self.verify_timeout),
            install_dir: self.install_dir.clone().unwrap_or(defaults.install_dir),
            force: self.force,
        }
    }

    fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            url: self.version_url.clone(),
            timeout: Duration::from_secs(self.version_timeout),
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn log_progress(progress: InstallProgress) {
    match &progress {
        InstallProgress::Started { platform } => {
            tracing::info!(%platform, "{}", progress.description())
        }
        InstallProgress::AlreadyInstalled { version } => {
            tracing::info!(%version, "{}", progress.description())
        }
        InstallProgress::Attempting { index, strategy } => {
            tracing::info!(position = index + 1, %strategy, "{}", progress.description())
        }
        InstallProgress::Skipped { strategy, reason } => {
            tracing::info!(%strategy, %reason, "{}", progress.description())
        }
        InstallProgress::Failed { strategy, reason } => {
            tracing::warn!(%strategy, %reason, "{}", progress.description())
        }
        InstallProgress::Verifying { strategy } => {
            tracing::info!(%strategy, "{}", progress.description())
        }
        InstallProgress::Completed { version } => {
            tracing::info!(%version, "{}", progress.description())
        }
        InstallProgress::Exhausted { failures } => {
            tracing::warn!(failures, "{}", progress.description())
        }
    }
}

fn detect_platform(format: Format) -> Result<Platform, ExitCode> {
    Platform::detect().map_err(|e| {
        tracing::error!(error = %e, fix = e.fix_suggestion(), "cannot classify host");
        match format {
            Format::Text => println!("status=failed"),
            Format::Json => println!(
                "{}",
                serde_json::json!({
                    "status": "failed",
                    "exit_code": e.exit_code(),
                    "error": e.to_string(),
                    "fix": e.fix_suggestion(),
                })
            ),
        }
        ExitCode::from(e.exit_code())
    })
}

async fn install(opts: &GlobalOpts) -> ExitCode {
    let platform = match detect_platform(opts.format) {
        Ok(p) => p,
        Err(code) => return code,
    };

    // Runs beside the chain; never waited on and never part of the outcome.
    let watch = (!opts.no_version).then(|| VersionWatch::spawn(opts.resolve_options()));

    let options = opts.install_options();
    let catalog = StrategyCatalog::builtin(&platform, &options);
    let session = executor::run_with_progress(&catalog, platform, &options, log_progress).await;

    if let Some(Err(e)) = session.outcome() {
        tracing::warn!(fix = e.fix_suggestion(), "{e}");
    }

    let published = watch.as_ref().and_then(settled_lookup);
    drop(watch);
    if let Some(query) = &published {
        let mut badge = VersionBadge::default();
        badge.apply(query);
        tracing::info!(release = %badge.release_url(), "{}", badge.label());
    }

    match opts.format {
        Format::Text => print!("{}", report::render_text(&session)),
        Format::Json => match report::render_json(&session, published.as_ref()) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize transcript");
                println!("status=failed");
                return ExitCode::FAILURE;
            }
        },
    }

    ExitCode::from(session.exit_code())
}

/// The lookup result if it has already arrived.
fn settled_lookup(watch: &VersionWatch) -> Option<VersionQuery> {
    watch.is_settled().then(|| watch.current())
}

async fn version(opts: &GlobalOpts) -> ExitCode {
    let query = mato_installer::resolve(&opts.resolve_options()).await;
    match opts.format {
        Format::Text => println!("{}", report::version_line(&query)),
        Format::Json => match serde_json::to_string_pretty(&query) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::error!(error = %e, "failed to serialize version"),
        },
    }
    ExitCode::SUCCESS
}

fn plan(opts: &GlobalOpts) -> ExitCode {
    let platform = match detect_platform(Format::Text) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let catalog = StrategyCatalog::builtin(&platform, &opts.install_options());
    println!("platform={platform} asset={}", platform.asset_name());
    print!("{}", report::render_plan(&catalog, &platform));
    ExitCode::SUCCESS
}

fn prompt(opts: &GlobalOpts) -> ExitCode {
    // The prompt is meant for any host, so fall back to a representative
    // platform when this one is unsupported.
    let platform = Platform::detect().unwrap_or(Platform {
        os: OsFamily::Linux,
        arch: Arch::X86_64,
    });
    let catalog = StrategyCatalog::builtin(&platform, &opts.install_options());
    print!("{}", report::render_agent_prompt(&catalog));
    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    init_logging(args.verbose);

    match args.command.unwrap_or(Command::Install) {
        Command::Install => install(&args.global).await,
        Command::Version => version(&args.global).await,
        Command::Plan => plan(&args.global),
        Command::Prompt => prompt(&args.global),
    }
}

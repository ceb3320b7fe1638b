use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use prowl_core::{LineAnchor, OutputFormat, ProwlConfig, ReviewMode};
use prowl_review::event::{read_event, PullRequestEvent};
use prowl_review::github::{parse_pr_reference, GitHubClient};
use prowl_review::llm::CompletionClient;
use prowl_review::pipeline::Pipeline;

const CONFIG_FILE: &str = ".prowl.toml";

#[derive(Parser)]
#[command(
    name = "prowl",
    version,
    about = "Pull request review bot for CI",
    long_about = "Prowl runs inside a CI job triggered by a pull request event.\n\n\
                   It fetches the pull request and its changed files, builds one review\n\
                   comment per file, and publishes them as a single GitHub review.\n\n\
                   Examples:\n  \
                     prowl run                        Review the PR named by GITHUB_EVENT_PATH\n  \
                     prowl run --mode ai              Ask a completion model for each file\n  \
                     prowl run --pr owner/repo#1 --dry-run  Preview comments without posting\n  \
                     prowl doctor                     Check setup and environment"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .prowl.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable summary (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Review the pull request of the triggering event
    #[command(long_about = "Review the pull request of the triggering event.\n\n\
        Reads the event payload (GITHUB_EVENT_PATH or --event), fetches the PR and its\n\
        changed files, and posts a COMMENT review. In echo mode each file's diff is\n\
        posted back; in ai mode a completion model reviews each file.\n\n\
        Examples:\n  prowl run\n  prowl run --event event.json --mode ai\n  prowl run --pr owner/repo#42 --dry-run")]
    Run {
        /// Event payload file (overrides GITHUB_EVENT_PATH)
        #[arg(long, conflicts_with = "pr")]
        event: Option<PathBuf>,
        /// Review a PR directly (format: owner/repo#123)
        #[arg(long)]
        pr: Option<String>,
        /// Review mode: echo or ai
        #[arg(long)]
        mode: Option<ReviewMode>,
        /// Comment line anchoring: first-line or first-addition
        #[arg(long)]
        anchor: Option<LineAnchor>,
        /// Build comments without posting anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Create a default .prowl.toml configuration file
    #[command(long_about = "Create a default .prowl.toml configuration file.\n\n\
        Fails if .prowl.toml already exists.")]
    Init,
    /// Check your prowl setup and environment
    #[command(long_about = "Check your prowl setup and environment.\n\n\
        Reports which tokens, event payload and completion settings are present.\n\
        Use --format json for machine-readable output.")]
    Doctor,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

const VERBOSE_FILTER: &str = "prowl=debug,prowl_review=debug,prowl_core=debug,info";

fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_env("PROWL_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn init_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ProwlConfig> {
    let mut config = match path {
        Some(path) => ProwlConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                ProwlConfig::from_file(default_path)?
            } else {
                ProwlConfig::default()
            }
        }
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!("prowl v{version}: pull request review bot for CI\n");
    println!("Commands:");
    println!("  run       Review the PR of the triggering event");
    println!("  init      Create a .prowl.toml config file");
    println!("  doctor    Check your setup and environment\n");
    println!("Run 'prowl <command> --help' for details.");
}

async fn run_review(
    config: &ProwlConfig,
    pr: Option<&str>,
    dry_run: bool,
    format: OutputFormat,
) -> Result<()> {
    let event = match pr {
        Some(pr_ref) => {
            let (owner, repo, number) = parse_pr_reference(pr_ref)?;
            PullRequestEvent::new(owner, repo, number)
        }
        None => read_event(config.event_path.as_deref())?,
    };

    let github = GitHubClient::new(&config.github)?;
    let completer = match config.review.mode {
        ReviewMode::Ai => Some(CompletionClient::new(&config.completion)?),
        ReviewMode::Echo => None,
    };

    let mut pipeline = Pipeline::new(&github, &github, &config.review).dry_run(dry_run);
    if let Some(completer) = &completer {
        pipeline = pipeline.with_completer(completer);
    }
    let report = pipeline.run(&event).await?;

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).into_diagnostic()?
            );
        }
        OutputFormat::Markdown => print!("{}", report.to_markdown()),
        OutputFormat::Text => print!("{report}"),
    }
    Ok(())
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: &'static str,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self, use_color: bool) -> &'static str {
        match (self.status, use_color) {
            ("pass", true) => "\x1b[32m\u{2713}\x1b[0m",
            ("fail", true) => "\x1b[31m\u{2717}\x1b[0m",
            (_, true) => "\x1b[33m~\x1b[0m",
            ("pass", false) => "\u{2713}",
            ("fail", false) => "\u{2717}",
            _ => "~",
        }
    }
}

fn doctor_checks(config: &ProwlConfig, config_path: &Path) -> Vec<CheckResult> {
    let mut checks = Vec::new();

    if config_path.exists() {
        checks.push(CheckResult::pass(
            "config_file",
            format!("{} found", config_path.display()),
        ));
    } else {
        checks.push(CheckResult::info(
            "config_file",
            format!("{} not found, using env and defaults", config_path.display()),
        ));
    }

    if config.github.token.is_some() {
        checks.push(CheckResult::pass("github_token", "token configured"));
    } else {
        checks.push(CheckResult::fail(
            "github_token",
            "GITHUB_TOKEN not set",
            "export GITHUB_TOKEN=... (GitHub Actions provides secrets.GITHUB_TOKEN)",
        ));
    }
    checks.push(CheckResult::info("github_api", config.github.api_url.clone()));

    match &config.event_path {
        Some(path) if path.is_file() => checks.push(CheckResult::pass(
            "event_payload",
            format!("{} exists", path.display()),
        )),
        Some(path) => checks.push(CheckResult::fail(
            "event_payload",
            format!("{} does not exist", path.display()),
            "check GITHUB_EVENT_PATH",
        )),
        None => checks.push(CheckResult::fail(
            "event_payload",
            "GITHUB_EVENT_PATH not set",
            "run inside a pull_request workflow, or use 'prowl run --event' / '--pr'",
        )),
    }

    checks.push(CheckResult::pass(
        "review_mode",
        format!(
            "{} (anchor: {})",
            config.review.mode, config.review.anchor
        ),
    ));

    let completion = config.completion.validate();
    match (config.review.mode, completion) {
        (_, Ok(())) => checks.push(CheckResult::pass(
            "completion",
            format!(
                "model {} at {}",
                config.completion.model.as_deref().unwrap_or_default(),
                config.completion.endpoint.as_deref().unwrap_or_default(),
            ),
        )),
        (ReviewMode::Ai, Err(e)) => checks.push(CheckResult::fail(
            "completion",
            e.to_string(),
            "export OPENAI_API_KEY, OPENAI_MODEL and OPENAI_ENDPOINT",
        )),
        (ReviewMode::Echo, Err(_)) => {
            checks.push(CheckResult::info("completion", "not configured (not needed in echo mode)"))
        }
    }

    checks
}

fn run_doctor(config: &ProwlConfig, config_path: &Path, format: OutputFormat) -> Result<()> {
    let checks = doctor_checks(config, config_path);
    let version = env!("CARGO_PKG_VERSION");

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "version": version,
                "checks": checks,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        _ => {
            let use_color =
                std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err();
            println!("prowl v{version} environment check\n");

            for check in &checks {
                let label = check.name.replace('_', " ");
                println!("  {} {label:<16} {}", check.symbol(use_color), check.detail);
                if let Some(hint) = &check.hint {
                    println!("    hint: {hint}");
                }
            }

            let passed = checks.iter().filter(|c| c.status == "pass").count();
            let failed = checks.iter().filter(|c| c.status == "fail").count();
            let info = checks.iter().filter(|c| c.status == "info").count();
            println!("\n{passed} checks passed, {failed} failed, {info} info");
        }
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# prowl configuration
# Environment variables override values in this file.

[github]
# token = "..."                          # prefer GITHUB_TOKEN
# api_url = "https://api.github.com"     # GITHUB_API_URL

[completion]
# api_key = "..."                        # prefer OPENAI_API_KEY
# model = "gpt-35-turbo-instruct"        # OPENAI_MODEL
# endpoint = "https://example.openai.azure.com"  # OPENAI_ENDPOINT
# api_version = "2024-02-01"             # OPENAI_API_VERSION
# max_tokens = 700
# temperature = 0.2

[review]
# "echo" posts each file's diff back; "ai" asks the completion model.
mode = "echo"
# "first-line" or "first-addition"
anchor = "first-line"
# review_body = "Automated code review comments"
"#;

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        None => print_welcome(),
        Some(Command::Run {
            event,
            pr,
            mode,
            anchor,
            dry_run,
        }) => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(event) = event {
                config.event_path = Some(event);
            }
            if let Some(mode) = mode {
                config.review.mode = mode;
            }
            if let Some(anchor) = anchor {
                config.review.anchor = anchor;
            }
            debug!(mode = %config.review.mode, anchor = %config.review.anchor, dry_run, "configuration resolved");

            run_review(&config, pr.as_deref(), dry_run, cli.format).await?;
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Doctor) => {
            let config = load_config(cli.config.as_deref())?;
            let config_path = cli
                .config
                .clone()
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
            run_doctor(&config, &config_path, cli.format)?;
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "prowl", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verbose_logging_is_limited_to_prowl_crates() {
        let filter = log_filter(true).to_string();
        assert!(filter.contains("prowl_review=debug"));
        assert!(filter.contains("prowl_core=debug"));
        assert!(!filter.split(',').any(|directive| directive == "debug"));
    }

    #[test]
    fn default_config_template_parses() {
        let config = ProwlConfig::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.review.mode, ReviewMode::Echo);
        assert_eq!(config.review.anchor, LineAnchor::FirstLine);
        assert_eq!(config.completion.max_tokens, 700);
    }

    #[test]
    fn doctor_flags_missing_completion_only_in_ai_mode() {
        let mut config = ProwlConfig::default();
        let path = Path::new("does-not-exist.toml");

        let checks = doctor_checks(&config, path);
        let completion = checks.iter().find(|c| c.name == "completion").unwrap();
        assert_eq!(completion.status, "info");

        config.review.mode = ReviewMode::Ai;
        let checks = doctor_checks(&config, path);
        let completion = checks.iter().find(|c| c.name == "completion").unwrap();
        assert_eq!(completion.status, "fail");
        assert!(completion.detail.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn doctor_reports_token_and_event() {
        let mut config = ProwlConfig::default();
        config.github.token = Some("t".into());
        config.event_path = Some(PathBuf::from("missing-event.json"));

        let checks = doctor_checks(&config, Path::new("none.toml"));

        let token = checks.iter().find(|c| c.name == "github_token").unwrap();
        assert_eq!(token.status, "pass");
        let event = checks.iter().find(|c| c.name == "event_payload").unwrap();
        assert_eq!(event.status, "fail");
    }
}

//! reviewbot - CLI entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use reviewbot::cli::{ask_init_answers, format_config_list, save_init_config};
use reviewbot::commit::{CommitOutcome, TerminalConfirm, draft_commit_message, finalize};
use reviewbot::config::file::set_value;
use reviewbot::config::{
    self, AppConfig, CommitOverrides, GitOverrides, LoadOptions, Overrides, ReviewMode,
    ReviewOverrides, default_config_path, ensure_default_config_file, resolve_config_path,
};
use reviewbot::git::{GitCommand, check_git_installed};
use reviewbot::llm::get_client;
use reviewbot::progress::with_spinner;
use reviewbot::prompt::PromptRenderer;
use reviewbot::review::{collect_diff, run_review};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "REVIEWBOT_LOG";

/// Generate git commit messages and code reviews with an LLM.
#[derive(Parser, Debug)]
#[command(name = "reviewbot")]
#[command(about = "Generate git commit messages and code reviews with an LLM")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// LLM provider to use (openai, anthropic, deepseek, gemini)
    #[arg(long = "ai-provider", global = true)]
    ai_provider: Option<String>,

    /// Model identifier to use
    #[arg(long = "ai-model", global = true)]
    ai_model: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or update the config file interactively
    Init,

    /// Review code changes
    Review(ReviewArgs),

    /// Generate a commit message for the staged changes and commit
    Commit(CommitArgs),

    /// Inspect or edit the config file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// List all configuration values
    List,

    /// Set a configuration value
    Set {
        /// Dotted key, e.g. ai.model
        key: String,
        value: String,
    },
}

/// Diff flags shared by `review` and `commit`.
#[derive(Args, Debug)]
struct GitArgs {
    /// Number of context lines in the diff
    #[arg(long = "diff_unified")]
    diff_unified: Option<i64>,

    /// Extra paths to exclude from the diff (repeatable)
    #[arg(long = "exclude_list")]
    exclude_list: Vec<String>,

    /// Use the last commit instead of the staged changes
    #[arg(long)]
    amend: bool,
}

impl GitArgs {
    fn overrides(&self) -> GitOverrides {
        GitOverrides {
            diff_unified: self.diff_unified,
            exclude_list: self.exclude_list.clone(),
            amend: self.amend.then_some(true),
        }
    }
}

#[derive(Args, Debug)]
struct ReviewArgs {
    #[command(flatten)]
    git: GitArgs,

    /// Where the diff comes from: local (staged changes) or external
    #[arg(long)]
    mode: Option<String>,

    /// Diff file to review in external mode
    #[arg(long = "diff_file")]
    diff_file: Option<String>,

    /// Maximum external diff size in bytes
    #[arg(long = "max_input_size")]
    max_input_size: Option<i64>,

    /// Output language (en, zh-cn, zh-tw, ja)
    #[arg(long = "output_lang")]
    output_lang: Option<String>,

    /// Stream the review as it is generated
    #[arg(long)]
    stream: bool,

    /// Diff text to review in external mode
    #[arg(value_name = "DIFF")]
    input: Option<String>,
}

#[derive(Args, Debug)]
struct CommitArgs {
    #[command(flatten)]
    git: GitArgs,

    /// Show the message and ask before committing
    #[arg(long)]
    preview: bool,

    /// Run `git add .` before generating the message
    #[arg(long = "auto_stage")]
    auto_stage: bool,

    /// Output language (en, zh-cn, zh-tw, ja)
    #[arg(long = "output_lang")]
    output_lang: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match &cli.command {
        Command::Init => run_init(&cli),
        Command::Review(args) => run_review_command(&cli, args, &cancel).await,
        Command::Commit(args) => run_commit_command(&cli, args, &cancel).await,
        Command::Config(ConfigCommand::List) => run_config_list(&cli),
        Command::Config(ConfigCommand::Set { key, value }) => run_config_set(&cli, key, value),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("reviewbot=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Create the default config file on first use and return its path.
fn ensure_default_config() -> Result<PathBuf> {
    let path = default_config_path()?;
    if ensure_default_config_file(&path)? {
        println!(
            "{}",
            format!("Created default config file at {}", path.display()).green()
        );
    }
    Ok(path)
}

/// The config file commands write to: `--config`, else the default path.
fn config_file_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(resolve_config_path(path)?),
        None => ensure_default_config(),
    }
}

fn load_options(cli: &Cli, overrides: Overrides) -> Result<LoadOptions> {
    let explicit_path = match &cli.config {
        Some(path) => Some(resolve_config_path(path)?),
        None => {
            ensure_default_config()?;
            None
        }
    };
    Ok(LoadOptions {
        explicit_path,
        overrides: Overrides {
            ai_provider: cli.ai_provider.clone(),
            ai_model: cli.ai_model.clone(),
            ..overrides
        },
        ..LoadOptions::default()
    })
}

fn load_config(cli: &Cli, overrides: Overrides) -> Result<AppConfig> {
    let options = load_options(cli, overrides)?;
    config::load(&options).context("Invalid configuration")
}

fn run_init(cli: &Cli) -> Result<()> {
    let path = config_file_path(cli)?;
    // A `--config` path that does not exist yet starts from the defaults.
    let current = if path.is_file() {
        let options = LoadOptions {
            explicit_path: Some(path.clone()),
            ..LoadOptions::default()
        };
        config::resolve(&options).context("Failed to read the existing configuration")?
    } else {
        AppConfig::default()
    };

    let answers = ask_init_answers(&current)
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to read answers")?;
    save_init_config(&path, &current, &answers).context("Failed to save configuration")?;

    println!(
        "{}",
        format!(
            "Configuration initialized successfully! You can find the config file at: {}",
            path.display()
        )
        .green()
    );
    Ok(())
}

async fn run_review_command(cli: &Cli, args: &ReviewArgs, cancel: &CancellationToken) -> Result<()> {
    let overrides = Overrides {
        git: args.git.overrides(),
        review: ReviewOverrides {
            mode: args.mode.clone(),
            stream: args.stream.then_some(true),
            diff_file: args.diff_file.clone(),
            max_input_size: args.max_input_size,
            output_lang: args.output_lang.clone(),
        },
        ..Overrides::default()
    };
    let cfg = load_config(cli, overrides)?;
    let settings = cfg.review_settings();
    debug!("Review settings: {:?}", settings);

    if settings.mode == ReviewMode::Local {
        check_git_installed()?;
    }
    let git = GitCommand::new(cfg.git_options());
    let diff = collect_diff(&settings, &git, args.input.as_deref())?;

    let client = get_client(&cfg.ai.provider, &cfg)?;
    let renderer = PromptRenderer::new(cfg.template_dir());

    let mut stdout = std::io::stdout();
    run_review(client.as_ref(), &renderer, cancel, &diff, &settings, &mut stdout).await?;
    Ok(())
}

async fn run_commit_command(cli: &Cli, args: &CommitArgs, cancel: &CancellationToken) -> Result<()> {
    check_git_installed()?;

    let overrides = Overrides {
        git: args.git.overrides(),
        commit: CommitOverrides {
            preview: args.preview.then_some(true),
            output_lang: args.output_lang.clone(),
            auto_stage: args.auto_stage.then_some(true),
        },
        ..Overrides::default()
    };
    let cfg = load_config(cli, overrides)?;
    let settings = cfg.commit_settings();

    let git = GitCommand::new(cfg.git_options());
    let client = get_client(&cfg.ai.provider, &cfg)?;
    let renderer = PromptRenderer::new(cfg.template_dir());

    println!("{}", "We are trying to summarize your changes".cyan());
    let draft = with_spinner(
        "Generating commit message...",
        "Commit message generated",
        "Failed to generate commit message",
        draft_commit_message(client.as_ref(), &renderer, cancel, &git, &settings),
    )
    .await?;

    for usage in &draft.usage {
        println!("{}", usage.to_string().magenta());
    }
    println!("{}", "================Commit Summary====================".yellow());
    println!("\n{}\n", draft.message.yellow());
    println!("{}", "==================================================".yellow());

    match finalize(&draft, settings.preview, &TerminalConfirm, &git)? {
        CommitOutcome::Committed(output) => println!("{}", output.green()),
        CommitOutcome::Declined => println!("{}", "Commit cancelled".yellow()),
    }
    Ok(())
}

fn run_config_list(cli: &Cli) -> Result<()> {
    let options = load_options(cli, Overrides::default())?;
    let cfg = config::resolve(&options).context("Failed to read configuration")?;
    for line in format_config_list(&cfg)? {
        println!("{}", line);
    }
    Ok(())
}

fn run_config_set(cli: &Cli, key: &str, value: &str) -> Result<()> {
    let path = config_file_path(cli)?;
    set_value(&path, key, value).with_context(|| format!("Failed to set {}", key))?;
    println!(
        "{}",
        format!("Set {} in {}", key, path.display()).green()
    );
    Ok(())
}

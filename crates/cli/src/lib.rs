use std::path::{Path, PathBuf};

use anyhow::{bail, Context as AnyhowContext, Result};
use ask_model::{resolve_model, AnthropicClient};
use ask_protocol::{new_cancel_signal, raise, turn_heading, CancelSignal, Role};
use clap::{Args, Parser, Subcommand};

pub mod chat;
pub mod config;
mod flags;
mod report;

use crate::chat::{run_chat, ChatOptions};
use crate::config::{config_path, AppConfig, ContextMode};
use crate::flags::Toggle;
use crate::report::print_line;

pub const DEFAULT_SESSION: &str = "session.md";

#[derive(Parser)]
#[command(name = "ask")]
#[command(about = "Converse with a language model inside a markdown document", long_about = None)]
#[command(version)]
struct Cli {
    // `None` runs `chat` on the default session.
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new session document
    Init(SessionArgs),

    /// Expand references in the last Human turn and stream the reply
    Chat(SessionArgs),

    /// Show or change configuration
    Cfg(CfgArgs),

    /// Print version information
    Version,
}

#[derive(Args)]
struct SessionArgs {
    /// Session document
    #[arg(short, long, default_value = DEFAULT_SESSION)]
    session: PathBuf,
}

#[derive(Args)]
struct CfgArgs {
    #[command(subcommand)]
    action: Option<CfgAction>,
}

#[derive(Subcommand)]
enum CfgAction {
    /// Set the model (alias such as opus, sonnet, haiku, or a full id)
    Model { name: String },

    /// Set sampling temperature (0.0-1.0)
    Temperature { value: f64 },

    /// Set the maximum number of output tokens
    #[command(name = "max-tokens")]
    MaxTokens { value: u32 },

    /// Set the request timeout in seconds
    Timeout { secs: u64 },

    /// Turn extended thinking on or off
    Thinking {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Fraction of max tokens given to thinking (0.0-1.0)
    #[command(name = "thinking-budget")]
    ThinkingBudget { value: f64 },

    /// Select the context window
    Context {
        #[arg(value_enum)]
        mode: ContextMode,
    },

    /// Print the config file location
    Path,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let command = cli.command.unwrap_or_else(|| {
        Commands::Chat(SessionArgs {
            session: PathBuf::from(DEFAULT_SESSION),
        })
    });

    match command {
        Commands::Init(args) => run_init(&args.session)?,
        Commands::Chat(args) => run_chat_command(args, cli.quiet).await?,
        Commands::Cfg(args) => run_cfg(args)?,
        Commands::Version => print_line(&format!("ask {}", env!("CARGO_PKG_VERSION")))?,
    }

    Ok(())
}

fn run_init(session: &Path) -> Result<()> {
    if session.exists() {
        bail!("{} already exists", session.display());
    }
    let document = format!("{}\n\n", turn_heading(1, Role::Human));
    ask_session::write_atomic(session, document.as_bytes())
        .with_context(|| format!("Failed to create {}", session.display()))?;
    print_line(&format!("Created {}", session.display()))
}

async fn run_chat_command(args: SessionArgs, quiet: bool) -> Result<()> {
    let config = AppConfig::load()?;
    let client = AnthropicClient::new(config.anthropic_config()?)?;

    let cancel = new_cancel_signal();
    install_interrupt_handler(cancel.clone());

    let options = ChatOptions {
        session: args.session,
        quiet,
    };
    run_chat(&options, &config, &client, &cancel).await?;
    Ok(())
}

/// The first Ctrl-C or SIGTERM raises `cancel`; a second one exits immediately.
fn install_interrupt_handler(cancel: CancelSignal) {
    tokio::spawn(async move {
        if let Err(err) = wait_for_interrupt().await {
            log::warn!("Cannot listen for interrupts; interruption disabled: {err}");
            return;
        }
        eprintln!("\nInterrupting...");
        raise(&cancel);

        if wait_for_interrupt().await.is_ok() {
            std::process::exit(1);
        }
    });
}

#[cfg(unix)]
async fn wait_for_interrupt() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

fn run_cfg(args: CfgArgs) -> Result<()> {
    let path = config_path()?;
    let mut config = AppConfig::load_from(&path)?;

    let Some(action) = args.action else {
        print_line(&format!("# {}", path.display()))?;
        let text = toml::to_string_pretty(&config).context("Failed to serialize config")?;
        return print_line(text.trim_end());
    };

    let message = match action {
        CfgAction::Path => return print_line(&path.display().to_string()),
        CfgAction::Model { name } => {
            config.model = name.trim().to_string();
            format!("Model set to {} ({})", config.model, resolve_model(&config.model))
        }
        CfgAction::Temperature { value } => {
            config.temperature = value;
            format!("Temperature set to {value}")
        }
        CfgAction::MaxTokens { value } => {
            config.max_tokens = value;
            format!("Max tokens set to {value}")
        }
        CfgAction::Timeout { secs } => {
            config.timeout_secs = secs;
            format!("Timeout set to {secs}s")
        }
        CfgAction::Thinking { state } => {
            config.thinking.enabled = state.enabled();
            format!("Thinking {}", state.as_str())
        }
        CfgAction::ThinkingBudget { value } => {
            config.thinking.budget = value;
            format!("Thinking budget set to {value}")
        }
        CfgAction::Context { mode } => {
            config.context = mode;
            let label = match mode {
                ContextMode::Standard => "standard",
                ContextMode::OneMillion => "1m",
            };
            format!("Context set to {label}")
        }
    };

    config
        .validate()
        .context("Configuration not saved")?;
    config.save_to(&path)?;
    print_line(&message)
}

use std::sync::Arc;

use clap::{Parser, Subcommand};

use shellbot::infrastructure::adapters::ConsoleAdapter;
use shellbot::{Config, Engine, Event, User};

#[derive(Parser)]
#[command(name = "shellbot")]
#[command(about = "A chat-driven command shell", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive console session
    Run {
        /// Behave as in a one-to-one channel
        #[arg(long)]
        direct: bool,

        /// Channel id of the session
        #[arg(long, default_value = "console")]
        channel: String,
    },
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { direct, channel } => {
            if let Err(e) = run_console(&cli.config, &channel, direct) {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("shellbot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => init_config(),
    }
}

fn load_config(path: &str) -> Result<Config, shellbot::ConfigError> {
    let config = if std::path::Path::new(path).exists() {
        Config::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        Config::default()
    };

    config.apply_env()
}

fn run_console(config_path: &str, channel: &str, direct: bool) -> Result<(), shellbot::BotError> {
    let config = load_config(config_path)?;
    tracing::info!("Starting {}", config.bot.name);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| shellbot::BotError::Internal(format!("Failed to start runtime: {}", e)))?;

    rt.block_on(async {
        let console = Arc::new(ConsoleAdapter::new(config.bot.name.clone()));
        let engine = Engine::builder(config).speaker(console.clone()).build()?;

        let result = console_session(&engine, &console, channel, direct).await;
        engine.shutdown().await;
        result
    })
}

/// Lines starting with `/` are console directives: `/join <name>`,
/// `/leave <name>`, `/upload <file>` and `/quit`. Anything else is a message.
async fn console_session(
    engine: &Engine,
    console: &ConsoleAdapter,
    channel: &str,
    direct: bool,
) -> Result<(), shellbot::BotError> {
    engine.get_or_create(channel, direct).await?;
    let user = User::new("console").with_label("Console user");

    while let Some(line) = console.read_line("> ").await {
        let (directive, argument) = match line.strip_prefix('/') {
            Some(rest) => rest.split_once(' ').unwrap_or((rest, "")),
            None => ("", line.as_str()),
        };

        let event = match directive {
            "" => Event::message(channel, argument).with_actor(user.clone()),
            "join" => Event::join(channel, User::new(argument).with_label(argument)),
            "leave" => Event::leave(channel, User::new(argument).with_label(argument)),
            "upload" => Event::upload(channel, argument, format!("file://{}", argument)).with_actor(user.clone()),
            "quit" => break,
            other => {
                println!("Unknown directive: /{}", other);
                continue;
            }
        };
        let event = if direct { event.direct() } else { event };

        engine.route(event).await?;

        if engine.get(channel).await.is_none() {
            tracing::info!("Channel {} has been closed", channel);
            break;
        }
    }

    Ok(())
}

fn init_config() {
    match Config::default().to_yaml() {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
        }
        Err(e) => eprintln!("{}", e),
    }
}

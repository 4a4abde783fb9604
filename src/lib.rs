pub mod ai;
pub mod bot;
pub mod chat;
pub mod cli;
pub mod config;
pub mod logging;
pub mod model;
pub mod model_gateway;
pub mod providers;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};

use ai::AiSession;
use bot::Bot;
use chat::twitch;
use cli::{Cli, Command};
use config::{AppConfig, BotConfig};
use model_gateway::OpenAiGateway;

pub async fn run() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = logging::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match cli.command {
        Command::Run { config } => run_with_config(&config).await,
    }
}

async fn run_with_config(path: &Path) -> ExitCode {
    let cfg = match AppConfig::load(path) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(kind = err.kind(), error = %err, "failed to load configuration");
            eprintln!("Error in configuration or file path:\n{err}");
            return ExitCode::FAILURE;
        }
    };
    info!(path = %path.display(), "loaded configuration");

    let result = match cfg {
        AppConfig::Demo(demo) => {
            info!(message = %demo.message, "demo configuration loaded");
            println!("{}", demo.message);
            Ok(())
        }
        AppConfig::Bot(cfg) => start_bot(cfg).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "bot stopped with an error");
            eprintln!("An unexpected error occurred:\n{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn start_bot(cfg: BotConfig) -> Result<()> {
    let gateway = OpenAiGateway::new(cfg.ai.clone())?;
    let session = AiSession::new(gateway, cfg.ai.personality.clone())
        .with_max_history(cfg.ai.max_history);

    let connection = twitch::connect(&cfg.chat)
        .await
        .context("Failed to connect to chat")?;
    info!(
        login = %connection.identity.login,
        channel = %cfg.chat.channel,
        model = %cfg.ai.model,
        "starting bot"
    );

    let mut bot = Bot::new(&cfg.chat, session, connection.sink);
    tokio::select! {
        _ = bot.run(connection.events) => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for interrupt signal")?;
            info!("received interrupt; shutting down");
        }
    }
    Ok(())
}

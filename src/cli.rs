use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "streambot",
    version,
    about = "Chat bot that relays chat commands to a conversational AI service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a config file, then print the demo message or start the bot
    Run {
        #[arg(long, value_name = "PATH", help = "Path to the config file")]
        config: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use std::path::PathBuf;

    use super::{Cli, Command};

    #[test]
    fn run_takes_config_path() {
        let cli = Cli::try_parse_from(["streambot", "run", "--config", "bot.yaml"])
            .expect("args should parse");
        let Command::Run { config } = cli.command;
        assert_eq!(config, PathBuf::from("bot.yaml"));
    }

    #[test]
    fn run_requires_config() {
        assert!(Cli::try_parse_from(["streambot", "run"]).is_err());
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["streambot"]).is_err());
    }
}

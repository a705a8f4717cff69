use clap::Parser;
use machado_oraculo::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.clone().unwrap_or_default() {
        Command::Chat => cli::chat::run(&cli).await,
        Command::Index(args) => cli::index::run(&cli, &args).await,
    }
}

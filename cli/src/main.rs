use clap::Parser;
use dotenvy::dotenv;
use sfmemo_core::SfMemoConfig;
use tracing::debug;

mod app;
mod cli;
mod logging;
mod output;

use crate::app::{resolve_config_path, App};
use crate::cli::{Args, Commands};
use crate::logging::{print_error, setup_logging};

#[tokio::main]
async fn main() {
    // .env values feed the SFMEMO_* overrides
    dotenv().ok();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config_path = resolve_config_path(args.config.clone())?;
    let config = SfMemoConfig::load_from_file(&config_path)?.apply_env_overrides();

    setup_logging(args.verbose, config.log_level.as_deref());
    debug!(config = %config_path.display(), "Starting sfmemo");

    let app = App::new(config, config_path)?;

    match args.command {
        Commands::Login {
            username,
            password,
            security_token,
        } => app.login(username, password, security_token).await,
        Commands::Logout => app.logout().await,
        Commands::Status => app.status().await,
        Commands::Search { term } => app.search(&term).await,
        Commands::New(new_args) => app.new_memo(new_args).await,
        Commands::List => app.list().await,
        Commands::Show { path } => app.show(&path).await,
        Commands::Push { path, record_id } => app.push(&path, record_id).await,
        Commands::Config(command) => app.config_command(command),
    }
}

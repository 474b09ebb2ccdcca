use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Search Salesforce, keep memo drafts locally and push them as notes or tasks
#[derive(Parser, Debug)]
#[command(name = "sfmemo", author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true, env = "SFMEMO_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store Salesforce credentials and check that they work
    Login {
        #[arg(short, long)]
        username: Option<String>,
        #[arg(short, long)]
        password: Option<String>,
        #[arg(short = 't', long)]
        security_token: Option<String>,
    },

    /// Remove stored credentials
    Logout,

    /// Show configuration paths and connection status
    Status,

    /// Search records across the configured objects
    Search {
        #[arg(required = true)]
        term: String,
    },

    /// Save a new memo locally
    New(NewMemoArgs),

    /// List saved memos
    List,

    /// Print a saved memo
    Show {
        #[arg(required = true)]
        path: PathBuf,
    },

    /// Create a saved memo in Salesforce and mark it synced
    Push {
        #[arg(required = true)]
        path: PathBuf,

        /// Record to link to, instead of the one saved with the memo (blank keeps the saved one)
        #[arg(short, long)]
        record_id: Option<String>,
    },

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(ClapArgs, Debug)]
pub struct NewMemoArgs {
    #[arg(short, long)]
    pub title: String,

    /// Memo body
    #[arg(short = 'b', long, conflicts_with = "content_file")]
    pub content: Option<String>,

    /// Read the memo body from a file
    #[arg(short = 'f', long)]
    pub content_file: Option<PathBuf>,

    /// Search for a record and attach the memo to the one you pick
    #[arg(short, long)]
    pub link: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write a config file with the default values
    Init {
        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

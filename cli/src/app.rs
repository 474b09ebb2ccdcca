use anyhow::{anyhow, bail, Context, Result};
use colored::*;
use dialoguer::{Editor, Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use sfmemo_core::{
    clear_credentials, get_default_config_file, load_credentials, save_credentials,
    CredentialStoreRef, Credentials, FileCredentialStore, SalesforceGateway, SalesforceRecord,
    SfMemoConfig,
};
use sfmemo_memory::{MemoReadOutcome, MemoStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cli::{ConfigCommands, NewMemoArgs};
use crate::output::{
    format_record, print_connection_status, print_memo, print_memo_line, print_records,
};

/// Everything a command needs, built once from the loaded config
pub struct App {
    config: SfMemoConfig,
    config_path: PathBuf,
    credentials: CredentialStoreRef,
    gateway: SalesforceGateway,
    store: MemoStore,
}

impl App {
    pub fn new(config: SfMemoConfig, config_path: PathBuf) -> Result<Self> {
        let credentials: CredentialStoreRef = Arc::new(
            FileCredentialStore::default_location()
                .context("Failed to locate credential storage")?,
        );
        let gateway = SalesforceGateway::with_rest_client(config.clone(), credentials.clone())
            .context("Failed to initialize Salesforce client")?;
        let store = MemoStore::new(config.memo_dir().context("Failed to resolve memo directory")?);

        Ok(Self {
            config,
            config_path,
            credentials,
            gateway,
            store,
        })
    }

    pub async fn login(
        &self,
        username: Option<String>,
        password: Option<String>,
        security_token: Option<String>,
    ) -> Result<()> {
        let username = match username {
            Some(u) => u,
            None => Input::new()
                .with_prompt("Salesforce username")
                .interact_text()
                .context("Failed to read username")?,
        };
        let password = match password {
            Some(p) => p,
            None => Password::new()
                .with_prompt("Password")
                .interact()
                .context("Failed to read password")?,
        };
        let security_token = match security_token {
            Some(t) => t,
            None => Password::new()
                .with_prompt("Security token (leave empty if not required)")
                .allow_empty_password(true)
                .interact()
                .context("Failed to read security token")?,
        };

        let credentials = Credentials {
            username,
            password,
            security_token,
        };
        save_credentials(self.credentials.as_ref(), &credentials)
            .await
            .context("Failed to store credentials")?;
        info!(username = %credentials.username, "Stored Salesforce credentials");

        self.gateway.disconnect().await;
        let status = self.gateway.connect().await;
        print_connection_status(&status);
        if !status.is_connected() {
            bail!("Credentials were saved but login did not succeed");
        }
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        clear_credentials(self.credentials.as_ref())
            .await
            .context("Failed to remove credentials")?;
        self.gateway.disconnect().await;
        println!("{}", "Stored credentials removed.".green());
        Ok(())
    }

    pub async fn status(&self) -> Result<()> {
        println!("Config file:   {}", self.config_path.display());
        println!("Memo folder:   {}", self.store.dir().display());
        println!("Login URL:     {}", self.config.login_url());
        println!("Memo object:   {}", self.config.memo_object_name());

        let stored = load_credentials(self.credentials.as_ref())
            .await
            .context("Failed to read stored credentials")?;
        match stored {
            Some(credentials) => println!("Username:      {}", credentials.username),
            None => println!("Username:      {}", "(none)".yellow()),
        }

        print_connection_status(&self.gateway.connect().await);
        Ok(())
    }

    pub async fn search(&self, term: &str) -> Result<()> {
        let spinner = spinner("Searching Salesforce...");
        let result = self.gateway.search_records(term).await;
        spinner.finish_and_clear();

        print_records(&result?);
        Ok(())
    }

    pub async fn new_memo(&self, args: NewMemoArgs) -> Result<()> {
        let content = match (args.content, args.content_file) {
            (Some(content), _) => content,
            (None, Some(file)) => tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?,
            (None, None) => Editor::new()
                .edit("")
                .context("Failed to open editor")?
                .ok_or_else(|| anyhow!("Memo was not saved: editor closed without content"))?,
        };

        let related = match args.link {
            Some(term) => self.pick_record(&term).await?,
            None => None,
        };

        let path = self
            .store
            .save_memo(&args.title, &content, related.as_ref())
            .await
            .context("Failed to save memo")?;

        println!("{} {}", "Saved".green().bold(), path.display());
        if let Some(record) = related {
            println!("Linked to {} {}", record.object_type, record.name);
        }
        Ok(())
    }

    async fn pick_record(&self, term: &str) -> Result<Option<SalesforceRecord>> {
        let spinner = spinner("Searching Salesforce...");
        let result = self.gateway.search_records(term).await;
        spinner.finish_and_clear();
        let mut records = result?;

        if records.is_empty() {
            println!("{}", "No matching records; the memo will not be linked.".yellow());
            return Ok(None);
        }

        let mut items: Vec<String> = records.iter().map(format_record).collect();
        items.push("(do not link)".to_string());

        let choice = Select::new()
            .with_prompt("Link memo to")
            .items(&items)
            .default(0)
            .interact()
            .context("Failed to read selection")?;

        if choice < records.len() {
            Ok(Some(records.swap_remove(choice)))
        } else {
            Ok(None)
        }
    }

    pub async fn list(&self) -> Result<()> {
        let memos = self.store.list_memos().await;
        if memos.is_empty() {
            println!("No memos in {}", self.store.dir().display());
            return Ok(());
        }

        for path in &memos {
            let outcome = self.store.read_memo(path).await;
            print_memo_line(path, &outcome);
        }
        Ok(())
    }

    pub async fn show(&self, path: &Path) -> Result<()> {
        let outcome = self.store.read_memo(&self.resolve(path)).await;
        print_memo(&outcome);
        Ok(())
    }

    pub async fn push(&self, path: &Path, record_id: Option<String>) -> Result<()> {
        let path = self.resolve(path);
        let outcome = self.store.read_memo(&path).await;
        let original = match &outcome {
            MemoReadOutcome::Loaded(memo) => &memo.original,
            other => bail!("Cannot push {}: {}", path.display(), describe(other)),
        };

        let fields = push_fields(original, record_id);
        debug!(path = %path.display(), related = ?fields.related_id, "Pushing memo");

        let spinner = spinner("Creating memo in Salesforce...");
        let created = self
            .gateway
            .create_memo_record(&fields.title, &fields.content, fields.related_id.as_deref())
            .await;
        spinner.finish_and_clear();
        let created_id = created?;

        println!("{} {}", "Created".green().bold(), created_id);

        if !self.store.update_sync_status(&path, &created_id).await {
            warn!(path = %path.display(), "Memo was pushed but its sync status was not saved");
            println!(
                "{}",
                "Warning: the memo was created but the local file could not be updated.".yellow()
            );
        }
        Ok(())
    }

    pub fn config_command(&self, command: ConfigCommands) -> Result<()> {
        match command {
            ConfigCommands::Show => {
                let rendered = self
                    .config
                    .to_toml_string()
                    .context("Failed to render configuration")?;
                println!("{}", format!("# {}", self.config_path.display()).dimmed());
                println!("{}", rendered);
            }
            ConfigCommands::Init { force } => {
                if self.config_path.exists() && !force {
                    bail!(
                        "{} already exists; use --force to overwrite",
                        self.config_path.display()
                    );
                }
                let defaults = SfMemoConfig {
                    salesforce_url: Some(self.config.login_url().to_string()),
                    api_version: Some(self.config.api_version().to_string()),
                    memo_directory: Some(self.store.dir().to_path_buf()),
                    salesforce_object_type: Some(self.config.memo_object_name().to_string()),
                    custom_object_name: None,
                    search_target_objects: Some(self.config.search_targets().to_string()),
                    log_level: Some("warn".to_string()),
                };
                defaults
                    .save_to_file(&self.config_path)
                    .context("Failed to write configuration")?;
                println!("{} {}", "Wrote".green().bold(), self.config_path.display());
            }
        }
        Ok(())
    }

    /// Bare file names refer to memos in the memo folder
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.components().count() == 1 && !path.exists() {
            self.store.dir().join(path)
        } else {
            path.to_path_buf()
        }
    }
}

/// What gets sent to Salesforce for a saved memo
#[derive(Debug, PartialEq)]
pub struct PushFields {
    pub title: String,
    pub content: String,
    pub related_id: Option<String>,
}

/// An explicit record id wins over the one saved in the memo's metadata.
/// A blank id counts as not given.
pub fn push_fields(original: &Value, record_id: Option<String>) -> PushFields {
    let text = |pointer: &str| {
        original
            .pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let related_id = record_id
        .filter(|id| !id.trim().is_empty())
        .or_else(|| {
            original
                .pointer("/metadata/sfId")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .filter(|id| !id.trim().is_empty());

    PushFields {
        title: text("/title"),
        content: text("/content"),
        related_id,
    }
}

fn describe(outcome: &MemoReadOutcome) -> &str {
    match outcome {
        MemoReadOutcome::Unreadable => "file could not be read",
        other => other.display_text(),
    }
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Config path from the flag, or `~/.config/sfmemo/config.toml`
pub fn resolve_config_path(flag: Option<PathBuf>) -> Result<PathBuf> {
    match flag {
        Some(path) => Ok(path),
        None => get_default_config_file().context("Failed to locate config file"),
    }
}

use crate::errors::{SalesforceError, SalesforceResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "sfmemo";
pub const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";
pub const DEFAULT_API_VERSION: &str = "59.0";
pub const DEFAULT_MEMO_OBJECT: &str = "ContentNote";
pub const CUSTOM_OBJECT_MARKER: &str = "Custom";
pub const DEFAULT_SEARCH_TARGETS: &str = "CS__c(Id, Name), Contact(Id, Name), Opportunity(Id, Name), Lead(Id, Name), Account(Id, Name), Case(Id, Name)";

/// Configuration shared by the Salesforce gateway and the memo store
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SfMemoConfig {
    pub salesforce_url: Option<String>,
    pub api_version: Option<String>,
    pub memo_directory: Option<PathBuf>,
    pub salesforce_object_type: Option<String>,
    pub custom_object_name: Option<String>,
    pub search_target_objects: Option<String>,
    pub log_level: Option<String>,
}

impl SfMemoConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> SalesforceResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            SalesforceError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content).map_err(|e| {
            SalesforceError::ConfigError(format!("Failed to parse config file: {}", e))
        })
    }

    /// Renders the configuration as TOML
    pub fn to_toml_string(&self) -> SalesforceResult<String> {
        toml::to_string(self).map_err(|e| {
            SalesforceError::ConfigError(format!("Failed to serialize config: {}", e))
        })
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> SalesforceResult<()> {
        let content = self.to_toml_string()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SalesforceError::ConfigError(format!(
                    "Failed to create config directory: {}",
                    e
                ))
            })?;
        }

        fs::write(path, content).map_err(|e| {
            SalesforceError::ConfigError(format!("Failed to write config file: {}", e))
        })
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            salesforce_url: other
                .salesforce_url
                .clone()
                .or_else(|| self.salesforce_url.clone()),
            api_version: other.api_version.clone().or_else(|| self.api_version.clone()),
            memo_directory: other
                .memo_directory
                .clone()
                .or_else(|| self.memo_directory.clone()),
            salesforce_object_type: other
                .salesforce_object_type
                .clone()
                .or_else(|| self.salesforce_object_type.clone()),
            custom_object_name: other
                .custom_object_name
                .clone()
                .or_else(|| self.custom_object_name.clone()),
            search_target_objects: other
                .search_target_objects
                .clone()
                .or_else(|| self.search_target_objects.clone()),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
        }
    }

    /// Overrides fields from `SFMEMO_*` environment variables
    pub fn apply_env_overrides(&self) -> Self {
        let from_env = Self {
            salesforce_url: non_empty_env("SFMEMO_SALESFORCE_URL"),
            api_version: non_empty_env("SFMEMO_API_VERSION"),
            memo_directory: non_empty_env("SFMEMO_MEMO_DIRECTORY").map(PathBuf::from),
            salesforce_object_type: non_empty_env("SFMEMO_OBJECT_TYPE"),
            custom_object_name: non_empty_env("SFMEMO_CUSTOM_OBJECT"),
            search_target_objects: non_empty_env("SFMEMO_SEARCH_TARGETS"),
            log_level: non_empty_env("SFMEMO_LOG_LEVEL"),
        };
        self.merge(&from_env)
    }

    /// Login endpoint, defaulting to the production login host
    pub fn login_url(&self) -> &str {
        non_empty(&self.salesforce_url).unwrap_or(DEFAULT_LOGIN_URL)
    }

    pub fn api_version(&self) -> &str {
        non_empty(&self.api_version).unwrap_or(DEFAULT_API_VERSION)
    }

    /// The RETURNING clause used for record search. Passed through verbatim.
    pub fn search_targets(&self) -> &str {
        non_empty(&self.search_target_objects).unwrap_or(DEFAULT_SEARCH_TARGETS)
    }

    /// Resolves the object kind new memos are created as.
    ///
    /// A custom object name wins when the configured type is `Custom`; a bare
    /// `Custom` without a name falls back to the default note object.
    pub fn memo_object_name(&self) -> &str {
        let object_type = non_empty(&self.salesforce_object_type);

        if object_type == Some(CUSTOM_OBJECT_MARKER) {
            return non_empty(&self.custom_object_name).unwrap_or(DEFAULT_MEMO_OBJECT);
        }

        object_type.unwrap_or(DEFAULT_MEMO_OBJECT)
    }

    /// Directory memos are stored in
    pub fn memo_dir(&self) -> SalesforceResult<PathBuf> {
        match &self.memo_directory {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(dir.clone()),
            _ => get_default_memo_dir(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Helper function to get default config directory
pub fn get_default_config_dir() -> SalesforceResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        SalesforceError::ConfigError("Could not determine home directory".to_string())
    })?;

    Ok(home_dir.join(".config").join(APP_NAME))
}

/// Helper function to get default config file path
pub fn get_default_config_file() -> SalesforceResult<PathBuf> {
    Ok(get_default_config_dir()?.join("config.toml"))
}

/// Memos go to `~/Documents/sfmemo`, or under the config directory when
/// there is no documents folder.
pub fn get_default_memo_dir() -> SalesforceResult<PathBuf> {
    match dirs::document_dir() {
        Some(docs) => Ok(docs.join(APP_NAME)),
        None => Ok(get_default_config_dir()?.join("memos")),
    }
}

use thiserror::Error;

/// Salesforce gateway errors
#[derive(Error, Debug)]
pub enum SalesforceError {
    #[error("Not authenticated: no Salesforce credentials are stored")]
    NotAuthenticated,

    #[error("Failed to connect to Salesforce: {0}")]
    ConnectionFailed(String),

    #[error("Login Error: {0}")]
    LoginFailed(String),

    #[error("An error occurred while searching records: {0}")]
    SearchFailed(String),

    #[error("An error occurred while creating the memo: {0}")]
    CreateFailed(String),

    #[error("Link Error: {0}")]
    LinkFailed(String),

    #[error("HTTP Error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },

    #[error("Response Error: {0}")]
    ResponseError(String),

    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Credential Store Error: {0}")]
    CredentialStore(String),

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Result type for Salesforce operations
pub type SalesforceResult<T> = Result<T, SalesforceError>;

// Core Salesforce functionality for sfmemo:
// - Configuration loading
// - Shared error types
// - Credential persistence
// - Transport to the Salesforce APIs
// - The gateway that searches records and creates memos

// Export config module - Configuration loading
pub mod config;
pub use config::*;

// Export errors module - Shared error types
pub mod errors;
pub use errors::*;

// Export credentials module - Stored login bundle
pub mod credentials;
pub use credentials::{
    clear_credentials, load_credentials, save_credentials, CredentialStore, CredentialStoreRef,
    Credentials, FileCredentialStore, InMemoryCredentialStore, CREDENTIALS_KEY,
};

// Export types module - Records and API payloads
pub mod types;
pub use types::*;

// Transport seam and its reqwest implementation
pub mod api;
pub use api::SalesforceApi;

pub mod client;
pub use client::RestClient;

pub mod gateway;
pub use gateway::{encode_body, ConnectionStatus, SalesforceGateway};

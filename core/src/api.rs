use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::SalesforceResult;
use crate::types::{SaveResult, Session};

/// Transport calls the gateway needs from Salesforce.
///
/// Every call except `login` takes the live session it runs against.
#[async_trait]
pub trait SalesforceApi: Send + Sync {
    /// Authenticates and returns a session for the org
    async fn login(&self, login_url: &str, username: &str, password: &str)
        -> SalesforceResult<Session>;

    /// Runs a SOSL query and returns the raw search records in backend order
    async fn search(&self, session: &Session, sosl: &str)
        -> SalesforceResult<Vec<Map<String, Value>>>;

    /// Inserts a record of the given object kind
    async fn create(&self, session: &Session, object_name: &str, fields: Value)
        -> SalesforceResult<SaveResult>;

    /// Updates fields on an existing record
    async fn update(
        &self,
        session: &Session,
        object_name: &str,
        id: &str,
        fields: Value,
    ) -> SalesforceResult<()>;
}

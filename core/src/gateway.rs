use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::api::SalesforceApi;
use crate::client::RestClient;
use crate::config::SfMemoConfig;
use crate::credentials::{load_credentials, CredentialStoreRef};
use crate::errors::{SalesforceError, SalesforceResult};
use crate::types::{LinkStrategy, SalesforceRecord, Session};

/// Outcome of establishing a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    /// No credentials have been stored yet
    NotAuthenticated,
    /// Login was attempted and rejected, or the transport failed
    Failed(String),
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

/// Searches records and creates memos in Salesforce.
///
/// The session is established on first use and kept until `disconnect`.
pub struct SalesforceGateway {
    config: SfMemoConfig,
    credentials: CredentialStoreRef,
    api: Arc<dyn SalesforceApi>,
    session: RwLock<Option<Session>>,
}

impl SalesforceGateway {
    pub fn new(
        config: SfMemoConfig,
        credentials: CredentialStoreRef,
        api: Arc<dyn SalesforceApi>,
    ) -> Self {
        Self {
            config,
            credentials,
            api,
            session: RwLock::new(None),
        }
    }

    /// Gateway backed by the REST client for the configured API version
    pub fn with_rest_client(
        config: SfMemoConfig,
        credentials: CredentialStoreRef,
    ) -> SalesforceResult<Self> {
        let api = RestClient::new(Some(config.api_version()))?;
        Ok(Self::new(config, credentials, Arc::new(api)))
    }

    pub fn config(&self) -> &SfMemoConfig {
        &self.config
    }

    pub async fn is_connected(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Logs in unless a session already exists. Never returns an error;
    /// the status says why a connection could not be made.
    pub async fn connect(&self) -> ConnectionStatus {
        if self.is_connected().await {
            return ConnectionStatus::Connected;
        }

        let credentials = match load_credentials(self.credentials.as_ref()).await {
            Ok(Some(credentials)) => credentials,
            Ok(None) => return ConnectionStatus::NotAuthenticated,
            Err(e) => {
                error!(error = %e, "Failed to read stored credentials");
                return ConnectionStatus::Failed(e.to_string());
            }
        };

        let login_url = self.config.login_url();
        debug!(login_url, username = %credentials.username, "Logging in to Salesforce");

        match self
            .api
            .login(login_url, &credentials.username, &credentials.login_password())
            .await
        {
            Ok(session) => {
                info!(instance_url = %session.instance_url, "Connected to Salesforce");
                *self.session.write().await = Some(session);
                ConnectionStatus::Connected
            }
            Err(e) => {
                error!(error = %e, "Salesforce connection error");
                ConnectionStatus::Failed(e.to_string())
            }
        }
    }

    /// Drops the current session; the next call logs in again
    pub async fn disconnect(&self) {
        *self.session.write().await = None;
    }

    /// Returns the live session, logging in first if needed
    pub async fn ensure_connection(&self) -> SalesforceResult<Session> {
        if let Some(session) = self.session.read().await.clone() {
            return Ok(session);
        }

        match self.connect().await {
            ConnectionStatus::Connected => self
                .session
                .read()
                .await
                .clone()
                .ok_or_else(|| SalesforceError::ConnectionFailed("session was dropped".to_string())),
            ConnectionStatus::NotAuthenticated => Err(SalesforceError::NotAuthenticated),
            ConnectionStatus::Failed(reason) => Err(SalesforceError::ConnectionFailed(reason)),
        }
    }

    /// Full-text search across the configured objects
    pub async fn search_records(&self, term: &str) -> SalesforceResult<Vec<SalesforceRecord>> {
        let session = self.ensure_connection().await?;

        let targets = self.config.search_targets();
        let sosl = format!("FIND {{{}}} IN ALL FIELDS RETURNING {}", term, targets);
        debug!(%sosl, "Searching Salesforce records");

        let hits = self.api.search(&session, &sosl).await.map_err(|e| {
            error!(error = %e, "Salesforce record search failed");
            SalesforceError::SearchFailed(e.to_string())
        })?;

        let records: Vec<SalesforceRecord> =
            hits.iter().map(SalesforceRecord::from_search_record).collect();
        info!(term, count = records.len(), "Search completed");
        Ok(records)
    }

    /// Creates a memo record and links it to `related_record_id` when given.
    ///
    /// Returns the id of the created record. A failed link is logged and
    /// does not fail the call.
    pub async fn create_memo_record(
        &self,
        subject: &str,
        body: &str,
        related_record_id: Option<&str>,
    ) -> SalesforceResult<String> {
        let session = self.ensure_connection().await?;

        let object_name = self.config.memo_object_name();
        let fields = json!({
            "Title": subject.trim(),
            "Content": encode_body(body.trim()),
        });

        let result = self
            .api
            .create(&session, object_name, fields)
            .await
            .map_err(|e| {
                error!(object_name, error = %e, "Salesforce memo creation failed");
                SalesforceError::CreateFailed(e.to_string())
            })?;

        let created_id = match result.id.as_deref() {
            Some(id) if result.success && !id.is_empty() => id.to_string(),
            _ => {
                let raw = serde_json::to_string(&result)?;
                error!(object_name, response = %raw, "Salesforce rejected memo creation");
                return Err(SalesforceError::CreateFailed(format!(
                    "failed to create {}: {}",
                    object_name, raw
                )));
            }
        };
        info!(object_name, id = %created_id, "Created memo record");

        if let Some(related_id) = related_record_id.filter(|id| !id.trim().is_empty()) {
            if let Err(e) = self
                .link_record(&session, object_name, &created_id, related_id)
                .await
            {
                warn!(
                    object_name,
                    id = %created_id,
                    related_id,
                    error = %e,
                    "Failed to link memo to related record"
                );
            }
        }

        Ok(created_id)
    }

    async fn link_record(
        &self,
        session: &Session,
        object_name: &str,
        created_id: &str,
        related_id: &str,
    ) -> SalesforceResult<()> {
        match LinkStrategy::for_object(object_name) {
            LinkStrategy::DocumentLink => {
                let link = json!({
                    "ContentDocumentId": created_id,
                    "LinkedEntityId": related_id,
                    "ShareType": "V",
                });
                let result = self.api.create(session, "ContentDocumentLink", link).await?;
                if !result.success {
                    return Err(SalesforceError::LinkFailed(format!(
                        "ContentDocumentLink was rejected: {}",
                        serde_json::to_string(&result)?
                    )));
                }
                debug!(created_id, related_id, "Linked document to record");
            }
            LinkStrategy::TaskWhatId => {
                self.api
                    .update(session, "Task", created_id, json!({ "WhatId": related_id }))
                    .await?;
                debug!(created_id, related_id, "Set task WhatId");
            }
            LinkStrategy::None => {
                debug!(object_name, "No link strategy for object, skipping link");
            }
        }
        Ok(())
    }
}

/// Base64 of the UTF-8 body, which keeps multi-byte text intact in the
/// Content field.
pub fn encode_body(body: &str) -> String {
    BASE64.encode(body.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SalesforceApi;
    use crate::credentials::{save_credentials, Credentials, InMemoryCredentialStore};
    use crate::types::SaveResult;
    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Login { login_url: String, username: String, password: String },
        Search(String),
        Create { object: String, fields: Value },
        Update { object: String, id: String, fields: Value },
    }

    #[derive(Default)]
    struct FakeApi {
        calls: Mutex<Vec<Call>>,
        reject_login: bool,
        fail_search: bool,
        reject_create: bool,
        fail_link: bool,
        reject_link: bool,
        search_hits: Vec<Value>,
    }

    impl FakeApi {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl SalesforceApi for FakeApi {
        async fn login(
            &self,
            login_url: &str,
            username: &str,
            password: &str,
        ) -> SalesforceResult<Session> {
            self.record(Call::Login {
                login_url: login_url.to_string(),
                username: username.to_string(),
                password: password.to_string(),
            });
            if self.reject_login {
                return Err(SalesforceError::LoginFailed("INVALID_LOGIN".to_string()));
            }
            Ok(Session {
                access_token: "token".to_string(),
                instance_url: "https://acme.my.salesforce.com".to_string(),
            })
        }

        async fn search(
            &self,
            _session: &Session,
            sosl: &str,
        ) -> SalesforceResult<Vec<Map<String, Value>>> {
            self.record(Call::Search(sosl.to_string()));
            if self.fail_search {
                return Err(SalesforceError::HttpError {
                    status_code: 400,
                    message: "MALFORMED_SEARCH".to_string(),
                });
            }
            Ok(self
                .search_hits
                .iter()
                .filter_map(|hit| hit.as_object().cloned())
                .collect())
        }

        async fn create(
            &self,
            _session: &Session,
            object_name: &str,
            fields: Value,
        ) -> SalesforceResult<SaveResult> {
            self.record(Call::Create {
                object: object_name.to_string(),
                fields,
            });
            if object_name == "ContentDocumentLink" && self.reject_link {
                return Ok(SaveResult {
                    id: None,
                    success: false,
                    errors: Vec::new(),
                });
            }
            if object_name == "ContentDocumentLink" && self.fail_link {
                return Err(SalesforceError::HttpError {
                    status_code: 400,
                    message: "INSUFFICIENT_ACCESS".to_string(),
                });
            }
            if self.reject_create {
                return Ok(SaveResult {
                    id: None,
                    success: false,
                    errors: Vec::new(),
                });
            }
            Ok(SaveResult {
                id: Some("069xx0000001".to_string()),
                success: true,
                errors: Vec::new(),
            })
        }

        async fn update(
            &self,
            _session: &Session,
            object_name: &str,
            id: &str,
            fields: Value,
        ) -> SalesforceResult<()> {
            self.record(Call::Update {
                object: object_name.to_string(),
                id: id.to_string(),
                fields,
            });
            if self.fail_link {
                return Err(SalesforceError::HttpError {
                    status_code: 404,
                    message: "NOT_FOUND".to_string(),
                });
            }
            Ok(())
        }
    }

    async fn gateway_with(config: SfMemoConfig, api: Arc<FakeApi>) -> SalesforceGateway {
        let store = Arc::new(InMemoryCredentialStore::new());
        save_credentials(
            store.as_ref(),
            &Credentials {
                username: "user@example.com".to_string(),
                password: "secret".to_string(),
                security_token: "TKN".to_string(),
            },
        )
        .await
        .unwrap();
        SalesforceGateway::new(config, store, api)
    }

    fn creates(calls: &[Call]) -> Vec<&Call> {
        calls
            .iter()
            .filter(|c| matches!(c, Call::Create { .. } | Call::Update { .. }))
            .collect()
    }

    #[tokio::test]
    async fn test_connect_without_credentials() {
        let api = Arc::new(FakeApi::default());
        let gateway = SalesforceGateway::new(
            SfMemoConfig::default(),
            Arc::new(InMemoryCredentialStore::new()),
            api.clone(),
        );

        assert_eq!(gateway.connect().await, ConnectionStatus::NotAuthenticated);
        assert!(api.calls().is_empty());

        let err = gateway.search_records("Acme").await.unwrap_err();
        assert!(matches!(err, SalesforceError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_connect_appends_token_and_memoizes() {
        let api = Arc::new(FakeApi::default());
        let gateway = gateway_with(SfMemoConfig::default(), api.clone()).await;

        assert!(gateway.connect().await.is_connected());
        assert!(gateway.connect().await.is_connected());

        assert_eq!(
            api.calls(),
            vec![Call::Login {
                login_url: "https://login.salesforce.com".to_string(),
                username: "user@example.com".to_string(),
                password: "secretTKN".to_string(),
            }]
        );

        gateway.disconnect().await;
        assert!(!gateway.is_connected().await);
        gateway.ensure_connection().await.unwrap();
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_login_is_reported_not_thrown() {
        let api = Arc::new(FakeApi {
            reject_login: true,
            ..Default::default()
        });
        let gateway = gateway_with(SfMemoConfig::default(), api).await;

        assert!(matches!(gateway.connect().await, ConnectionStatus::Failed(_)));
        let err = gateway.create_memo_record("T", "B", None).await.unwrap_err();
        assert!(matches!(err, SalesforceError::ConnectionFailed(_)));
    }

    #[tokio::test]
    async fn test_search_returns_typed_records() {
        let api = Arc::new(FakeApi {
            search_hits: vec![
                json!({
                    "attributes": { "type": "Account", "url": "/services/data/v59.0/sobjects/Account/001xx000003DGb2AAG" },
                    "Id": "001xx000003DGb2AAG",
                    "Name": "Acme Corp"
                }),
                json!({ "Id": "003xx", "Name": "Acme Contact" }),
            ],
            ..Default::default()
        });
        let config = SfMemoConfig {
            search_target_objects: Some("Account(Id, Name), Contact(Id, Name)".to_string()),
            ..Default::default()
        };
        let gateway = gateway_with(config, api.clone()).await;

        let records = gateway.search_records("Acme").await.unwrap();

        assert_eq!(
            records,
            vec![
                SalesforceRecord {
                    id: "001xx000003DGb2AAG".to_string(),
                    name: "Acme Corp".to_string(),
                    object_type: "Account".to_string(),
                },
                SalesforceRecord {
                    id: "003xx".to_string(),
                    name: "Acme Contact".to_string(),
                    object_type: "Unknown".to_string(),
                },
            ]
        );
        assert!(api.calls().contains(&Call::Search(
            "FIND {Acme} IN ALL FIELDS RETURNING Account(Id, Name), Contact(Id, Name)".to_string()
        )));
    }

    #[tokio::test]
    async fn test_empty_search_is_ok() {
        let api = Arc::new(FakeApi::default());
        let gateway = gateway_with(SfMemoConfig::default(), api).await;
        assert!(gateway.search_records("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_failure_is_wrapped() {
        let api = Arc::new(FakeApi {
            fail_search: true,
            ..Default::default()
        });
        let gateway = gateway_with(SfMemoConfig::default(), api).await;

        let err = gateway.search_records("Acme").await.unwrap_err();
        assert!(matches!(err, SalesforceError::SearchFailed(_)));
    }

    #[tokio::test]
    async fn test_create_trims_and_encodes_body() {
        let api = Arc::new(FakeApi::default());
        let gateway = gateway_with(SfMemoConfig::default(), api.clone()).await;

        let id = gateway
            .create_memo_record("  Title  ", "\n会議メモ\n", None)
            .await
            .unwrap();

        assert_eq!(id, "069xx0000001");
        assert_eq!(
            creates(&api.calls()),
            vec![&Call::Create {
                object: "ContentNote".to_string(),
                fields: json!({ "Title": "Title", "Content": encode_body("会議メモ") }),
            }]
        );
    }

    #[tokio::test]
    async fn test_empty_related_id_does_not_link() {
        let api = Arc::new(FakeApi::default());
        let gateway = gateway_with(SfMemoConfig::default(), api.clone()).await;

        gateway.create_memo_record("T", "B", Some("")).await.unwrap();
        assert_eq!(creates(&api.calls()).len(), 1);
    }

    #[tokio::test]
    async fn test_content_note_creates_document_link() {
        let api = Arc::new(FakeApi::default());
        let gateway = gateway_with(SfMemoConfig::default(), api.clone()).await;

        gateway
            .create_memo_record("Title", "Body", Some("003xyz"))
            .await
            .unwrap();

        let calls = api.calls();
        assert_eq!(
            creates(&calls)[1],
            &Call::Create {
                object: "ContentDocumentLink".to_string(),
                fields: json!({
                    "ContentDocumentId": "069xx0000001",
                    "LinkedEntityId": "003xyz",
                    "ShareType": "V",
                }),
            }
        );
    }

    #[tokio::test]
    async fn test_failed_link_still_returns_created_id() {
        let api = Arc::new(FakeApi {
            fail_link: true,
            ..Default::default()
        });
        let gateway = gateway_with(SfMemoConfig::default(), api.clone()).await;

        let id = gateway
            .create_memo_record("Title", "Body", Some("003xyz"))
            .await
            .unwrap();

        assert_eq!(id, "069xx0000001");
        assert_eq!(creates(&api.calls()).len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_document_link_still_returns_created_id() {
        let api = Arc::new(FakeApi {
            reject_link: true,
            ..Default::default()
        });
        let gateway = gateway_with(SfMemoConfig::default(), api.clone()).await;

        let id = gateway
            .create_memo_record("Title", "Body", Some("003xyz"))
            .await
            .unwrap();

        assert_eq!(id, "069xx0000001");
        assert!(matches!(
            creates(&api.calls())[1],
            Call::Create { object, .. } if object == "ContentDocumentLink"
        ));
    }

    #[tokio::test]
    async fn test_failed_what_id_update_still_returns_created_id() {
        let api = Arc::new(FakeApi {
            fail_link: true,
            ..Default::default()
        });
        let config = SfMemoConfig {
            salesforce_object_type: Some("Task".to_string()),
            ..Default::default()
        };
        let gateway = gateway_with(config, api.clone()).await;

        let id = gateway
            .create_memo_record("Call back", "Body", Some("001acme"))
            .await
            .unwrap();

        assert_eq!(id, "069xx0000001");
        assert!(matches!(creates(&api.calls())[1], Call::Update { .. }));
    }

    #[tokio::test]
    async fn test_task_links_through_what_id() {
        let api = Arc::new(FakeApi::default());
        let config = SfMemoConfig {
            salesforce_object_type: Some("Task".to_string()),
            ..Default::default()
        };
        let gateway = gateway_with(config, api.clone()).await;

        gateway
            .create_memo_record("Call back", "Body", Some("001acme"))
            .await
            .unwrap();

        assert_eq!(
            creates(&api.calls())[1],
            &Call::Update {
                object: "Task".to_string(),
                id: "069xx0000001".to_string(),
                fields: json!({ "WhatId": "001acme" }),
            }
        );
    }

    #[tokio::test]
    async fn test_custom_object_skips_link() {
        let api = Arc::new(FakeApi::default());
        let config = SfMemoConfig {
            salesforce_object_type: Some("Custom".to_string()),
            custom_object_name: Some("Memo__c".to_string()),
            ..Default::default()
        };
        let gateway = gateway_with(config, api.clone()).await;

        gateway
            .create_memo_record("Title", "Body", Some("001acme"))
            .await
            .unwrap();

        let calls = api.calls();
        let writes = creates(&calls);
        assert_eq!(writes.len(), 1);
        assert!(matches!(writes[0], Call::Create { object, .. } if object == "Memo__c"));
    }

    #[tokio::test]
    async fn test_rejected_create_is_fatal() {
        let api = Arc::new(FakeApi {
            reject_create: true,
            ..Default::default()
        });
        let gateway = gateway_with(SfMemoConfig::default(), api.clone()).await;

        let err = gateway
            .create_memo_record("Title", "Body", Some("003xyz"))
            .await
            .unwrap_err();

        match err {
            SalesforceError::CreateFailed(message) => assert!(message.contains("\"success\":false")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(creates(&api.calls()).len(), 1);
    }

    #[test]
    fn test_encode_body() {
        assert_eq!(encode_body("hello"), "aGVsbG8=");
    }
}

use async_trait::async_trait;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_CHARSET, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde_json::{Map, Value};
use tracing::debug;

use crate::api::SalesforceApi;
use crate::config::DEFAULT_API_VERSION;
use crate::errors::{SalesforceError, SalesforceResult};
use crate::types::{SaveResult, SearchResponse, Session};

const JSON_UTF8: &str = "application/json; charset=utf-8";

/// Client for the Salesforce SOAP login and REST data APIs
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    api_version: String,
}

impl RestClient {
    /// Create a new client that sends UTF-8 on every request
    pub fn new(api_version: Option<&str>) -> SalesforceResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_CHARSET, HeaderValue::from_static("utf-8"));

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            api_version: api_version.unwrap_or(DEFAULT_API_VERSION).to_string(),
        })
    }

    fn data_url(&self, session: &Session, path: &str) -> String {
        format!(
            "{}/services/data/v{}/{}",
            session.instance_url.trim_end_matches('/'),
            self.api_version,
            path
        )
    }

    fn authorized(&self, builder: RequestBuilder, session: &Session) -> RequestBuilder {
        builder
            .header(AUTHORIZATION, format!("Bearer {}", session.access_token))
            .header(CONTENT_TYPE, JSON_UTF8)
    }

    async fn send(&self, builder: RequestBuilder) -> SalesforceResult<Response> {
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.map_err(|e| {
                SalesforceError::ResponseError(format!("Failed to read error response: {}", e))
            })?;

            return Err(SalesforceError::HttpError {
                status_code: status.as_u16(),
                message: format!("API request failed: {}", error_body),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl SalesforceApi for RestClient {
    async fn login(
        &self,
        login_url: &str,
        username: &str,
        password: &str,
    ) -> SalesforceResult<Session> {
        let url = format!(
            "{}/services/Soap/u/{}",
            login_url.trim_end_matches('/'),
            self.api_version
        );
        debug!(%url, "Sending SOAP login request");

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", "login")
            .body(login_envelope(username, password))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            SalesforceError::ResponseError(format!("Failed to read login response: {}", e))
        })?;

        if !status.is_success() {
            return Err(SalesforceError::LoginFailed(fault_reason(body)));
        }

        parse_login_response(&body)
    }

    async fn search(
        &self,
        session: &Session,
        sosl: &str,
    ) -> SalesforceResult<Vec<Map<String, Value>>> {
        let url = self.data_url(session, "search/");
        let request = self.authorized(self.client.get(&url), session).query(&[("q", sosl)]);

        let response = self.send(request).await?;
        let body = response.json::<SearchResponse>().await.map_err(|e| {
            SalesforceError::ResponseError(format!("Failed to parse search response: {}", e))
        })?;

        Ok(body.search_records)
    }

    async fn create(
        &self,
        session: &Session,
        object_name: &str,
        fields: Value,
    ) -> SalesforceResult<SaveResult> {
        let url = self.data_url(session, &format!("sobjects/{}/", object_name));
        let request = self
            .authorized(self.client.post(&url), session)
            .body(serde_json::to_vec(&fields)?);

        let response = self.send(request).await?;
        response.json::<SaveResult>().await.map_err(|e| {
            SalesforceError::ResponseError(format!("Failed to parse create response: {}", e))
        })
    }

    async fn update(
        &self,
        session: &Session,
        object_name: &str,
        id: &str,
        fields: Value,
    ) -> SalesforceResult<()> {
        let url = self.data_url(session, &format!("sobjects/{}/{}", object_name, id));
        let request = self
            .authorized(self.client.patch(&url), session)
            .body(serde_json::to_vec(&fields)?);

        self.send(request).await?;
        Ok(())
    }
}

fn login_envelope(username: &str, password: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<se:Envelope xmlns:se="http://schemas.xmlsoap.org/soap/envelope/">"#,
            "<se:Header/><se:Body>",
            r#"<login xmlns="urn:partner.soap.sforce.com">"#,
            "<username>{}</username><password>{}</password>",
            "</login></se:Body></se:Envelope>"
        ),
        escape(username),
        escape(password)
    )
}

/// Unescaped text of the first element with the given local name
fn element_text(body: &str, tag: &str) -> Option<String> {
    let mut reader = Reader::from_str(body);
    let mut inside = false;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if !inside && e.local_name().as_ref() == tag.as_bytes() => {
                inside = true;
            }
            Ok(Event::Empty(ref e)) if !inside && e.local_name().as_ref() == tag.as_bytes() => {
                return Some(String::new());
            }
            Ok(Event::Text(ref e)) if inside => text.push_str(&e.unescape().ok()?),
            Ok(Event::CData(ref e)) if inside => {
                text.push_str(&String::from_utf8_lossy(e));
            }
            Ok(Event::End(ref e)) if inside && e.local_name().as_ref() == tag.as_bytes() => {
                return Some(text);
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// The SOAP fault string, or the whole body when there is none
fn fault_reason(body: String) -> String {
    element_text(&body, "faultstring").unwrap_or(body)
}

/// Extracts the session id and instance origin from a successful login
fn parse_login_response(body: &str) -> SalesforceResult<Session> {
    let field = |name: &str| {
        element_text(body, name)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                SalesforceError::LoginFailed(format!("Login response did not contain {}", name))
            })
    };

    let access_token = field("sessionId")?;
    let server_url = field("serverUrl")?;

    let instance_url = Url::parse(&server_url)
        .map_err(|e| SalesforceError::LoginFailed(format!("Invalid serverUrl {}: {}", server_url, e)))?
        .origin()
        .ascii_serialization();

    Ok(Session {
        access_token,
        instance_url,
    })
}

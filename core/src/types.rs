use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const UNKNOWN_OBJECT_TYPE: &str = "Unknown";

lazy_static! {
    static ref SOBJECT_URL_PATTERN: Regex =
        Regex::new(r"/sobjects/(\w+)/").expect("sobject url pattern is valid");
}

/// A record returned by search, reduced to what the memo workflow needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesforceRecord {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    /// Originating object kind, never empty
    #[serde(rename = "Type")]
    pub object_type: String,
}

impl SalesforceRecord {
    /// Builds a record from a raw search hit, deriving its object type
    pub fn from_search_record(record: &Map<String, Value>) -> Self {
        let field = |name: &str| {
            record
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Self {
            id: field("Id"),
            name: field("Name"),
            object_type: derive_object_type(record),
        }
    }
}

/// Works out which object kind a search hit came from.
///
/// Order: `attributes.type`, then the first field named `*Type` (minus the
/// suffix), then the `/sobjects/<Kind>/` segment of `attributes.url`.
/// The url is only consulted when no `*Type` field exists.
pub fn derive_object_type(record: &Map<String, Value>) -> String {
    let attributes = record.get("attributes").and_then(Value::as_object);

    let explicit = attributes
        .and_then(|attrs| attrs.get("type"))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty());

    let derived = match explicit {
        Some(tag) => tag.to_string(),
        None => match record.keys().find(|key| key.ends_with("Type")) {
            Some(type_field) => type_field.replacen("Type", "", 1),
            None => attributes
                .and_then(|attrs| attrs.get("url"))
                .and_then(Value::as_str)
                .and_then(|url| SOBJECT_URL_PATTERN.captures(url))
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        },
    };

    if derived.is_empty() {
        UNKNOWN_OBJECT_TYPE.to_string()
    } else {
        derived
    }
}

/// Authenticated handle to a Salesforce org
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub instance_url: String,
}

/// Per-field error reported by the REST API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "errorCode", alias = "statusCode", default)]
    pub error_code: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Result of a create call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveResult {
    #[serde(default)]
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

/// Body of a search response
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "searchRecords", default)]
    pub search_records: Vec<Map<String, Value>>,
}

/// How a freshly created memo is attached to an existing record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStrategy {
    /// Insert a ContentDocumentLink with viewer access
    DocumentLink,
    /// Point the task's WhatId at the record
    TaskWhatId,
    /// Custom objects carry no link; creating the memo is the whole job
    None,
}

impl LinkStrategy {
    pub fn for_object(object_name: &str) -> Self {
        match object_name {
            "ContentNote" | "ContentDocument" => LinkStrategy::DocumentLink,
            "Task" => LinkStrategy::TaskWhatId,
            _ => LinkStrategy::None,
        }
    }
}

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sfmemo_core::SalesforceRecord;

/// A memo as written to disk. Field order is the on-disk key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoDocument {
    pub title: String,
    pub content: String,
    pub metadata: MemoMetadata,
    pub sync_status: SyncStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoMetadata {
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sf_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sf_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sf_type: Option<String>,
}

/// Whether and when the memo was pushed to Salesforce
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub last_synced_at: Option<String>,
    pub sf_note_id: Option<String>,
}

impl SyncStatus {
    pub fn synced(sf_note_id: &str) -> Self {
        Self {
            last_synced_at: Some(iso_timestamp()),
            sf_note_id: Some(sf_note_id.to_string()),
        }
    }
}

impl MemoDocument {
    /// A fresh, unsynced memo stamped with the current time
    pub fn new(title: &str, content: &str, related: Option<&SalesforceRecord>) -> Self {
        Self::with_created_at(title, content, related, iso_timestamp())
    }

    pub fn with_created_at(
        title: &str,
        content: &str,
        related: Option<&SalesforceRecord>,
        created_at: String,
    ) -> Self {
        let metadata = MemoMetadata {
            created_at,
            sf_id: related.map(|r| r.id.clone()),
            sf_name: related.map(|r| r.name.clone()),
            sf_type: related.map(|r| r.object_type.clone()),
        };

        Self {
            title: title.to_string(),
            content: content.to_string(),
            metadata,
            sync_status: SyncStatus::default(),
        }
    }
}

/// Current UTC time as `2024-05-01T09:30:00.123Z`
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `memo_<timestamp>.json` with `:` and `.` replaced so the name is valid everywhere
pub fn memo_file_name(timestamp: &str) -> String {
    format!("memo_{}.json", timestamp.replace([':', '.'], "-"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_name_from_timestamp() {
        assert_eq!(
            memo_file_name("2024-05-01T09:30:00.123Z"),
            "memo_2024-05-01T09-30-00-123Z.json"
        );
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = iso_timestamp();
        assert_eq!(ts.len(), "2024-05-01T09:30:00.123Z".len());
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn test_unlinked_document_layout() {
        let doc = MemoDocument::with_created_at(
            "Meeting notes",
            "Discussed Q3 roadmap",
            None,
            "2024-05-01T09:30:00.123Z".to_string(),
        );

        assert_eq!(
            serde_json::to_string(&doc).unwrap(),
            r#"{"title":"Meeting notes","content":"Discussed Q3 roadmap","metadata":{"createdAt":"2024-05-01T09:30:00.123Z"},"syncStatus":{"lastSyncedAt":null,"sfNoteId":null}}"#
        );
    }

    #[test]
    fn test_linked_document_metadata() {
        let record = SalesforceRecord {
            id: "001xx".to_string(),
            name: "Acme Corp".to_string(),
            object_type: "Account".to_string(),
        };
        let doc = MemoDocument::with_created_at("t", "c", Some(&record), "ts".to_string());

        assert_eq!(
            serde_json::to_value(&doc.metadata).unwrap(),
            json!({ "createdAt": "ts", "sfId": "001xx", "sfName": "Acme Corp", "sfType": "Account" })
        );
    }
}

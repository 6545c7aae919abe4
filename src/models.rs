use serde::{Deserialize, Serialize};

use self::deserializers::null_as_default;

/// A sender or recipient
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Participant {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Folder {
    pub id: String,
    pub object: String,
    pub account_id: String,

    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Label {
    pub id: String,
    pub display_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

/// Attachment metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    pub id: String,
    pub object: String,
    pub account_id: String,

    pub content_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub filename: String,
    pub size: i64,
}

/// The account behind an access token: one email address, its mailbox and
/// optionally a calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    pub id: String,
    pub object: String,
    pub account_id: String,

    pub name: String,
    pub email_address: String,
    pub provider: String,
    pub organization_unit: String,
    pub sync_state: String,
    pub linked_at: i64,

    /// Only populated by the native-auth connect flow
    pub access_token: String,
    pub billing_state: String,
}

/// Account as seen through the application management endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingAccount {
    pub id: String,
    pub account_id: String,
    pub billing_state: String,
    pub email: String,
    pub provider: String,
    pub sync_state: String,
    pub trial: bool,
}

/// Headers only returned in the expanded view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageHeaders {
    #[serde(rename = "In-Reply-To", deserialize_with = "null_as_default")]
    pub in_reply_to: String,
    #[serde(rename = "Message-Id", deserialize_with = "null_as_default")]
    pub message_id: String,
    #[serde(rename = "References", deserialize_with = "null_as_default")]
    pub references: Vec<String>,
}

/// A single email message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    pub id: String,
    pub object: String,
    pub account_id: String,
    pub thread_id: String,

    #[serde(deserialize_with = "null_as_default")]
    pub from: Vec<Participant>,
    #[serde(deserialize_with = "null_as_default")]
    pub to: Vec<Participant>,
    #[serde(deserialize_with = "null_as_default")]
    pub cc: Vec<Participant>,
    #[serde(deserialize_with = "null_as_default")]
    pub bcc: Vec<Participant>,
    #[serde(deserialize_with = "null_as_default")]
    pub reply_to: Vec<Participant>,

    #[serde(deserialize_with = "null_as_default")]
    pub headers: MessageHeaders,

    #[serde(deserialize_with = "null_as_default")]
    pub subject: String,
    pub date: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub body: String,
    #[serde(deserialize_with = "null_as_default")]
    pub snippet: String,

    #[serde(deserialize_with = "null_as_default")]
    pub events: Vec<serde_json::Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub files: Vec<File>,
    pub folder: Option<Folder>,
    #[serde(deserialize_with = "null_as_default")]
    pub labels: Vec<Label>,

    pub starred: bool,
    pub unread: bool,
}

/// Messages of one conversation grouped together
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thread {
    pub id: String,
    pub object: String,
    pub account_id: String,

    #[serde(deserialize_with = "null_as_default")]
    pub folders: Vec<Folder>,
    pub has_attachments: bool,

    pub first_message_timestamp: i64,
    pub last_message_received_timestamp: i64,
    pub last_message_sent_timestamp: i64,
    pub last_message_timestamp: i64,

    #[serde(deserialize_with = "null_as_default")]
    pub message_ids: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub draft_ids: Vec<String>,

    /// Expanded view only, bodies omitted
    #[serde(deserialize_with = "null_as_default")]
    pub messages: Vec<Message>,
    #[serde(deserialize_with = "null_as_default")]
    pub drafts: Vec<Message>,

    #[serde(deserialize_with = "null_as_default")]
    pub participants: Vec<Participant>,
    #[serde(deserialize_with = "null_as_default")]
    pub labels: Vec<Label>,
    #[serde(deserialize_with = "null_as_default")]
    pub snippet: String,
    pub starred: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub subject: String,
    pub unread: bool,
    pub version: i64,
}

/// A message that has not been sent yet; body and recipients are mutable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Draft {
    #[serde(flatten)]
    pub message: Message,
    #[serde(deserialize_with = "null_as_default")]
    pub reply_to_message_id: String,
    pub version: i64,
}

/// Custom deserializers for Nylas API payloads
pub mod deserializers {
    use serde::{Deserialize, Deserializer};

    /// Treat an explicit `null` like a missing field
    pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        let opt: Option<T> = Option::deserialize(deserializer)?;
        Ok(opt.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_thread_nulls_and_missing_fields() {
        let thread: Thread = serde_json::from_value(json!({
            "id": "t1",
            "subject": null,
            "participants": null,
            "folders": [{"name": "drafts", "id": "f1"}]
        }))
        .unwrap();

        assert_eq!(thread.id, "t1");
        assert_eq!(thread.subject, "");
        assert!(thread.participants.is_empty());
        assert_eq!(thread.folders[0].name, "drafts");
        assert_eq!(thread.version, 0);
    }

    #[test]
    fn test_message_expanded_headers() {
        let message: Message = serde_json::from_value(json!({
            "id": "m1",
            "headers": {
                "In-Reply-To": "<a@b>",
                "Message-Id": "<c@d>",
                "References": ["<a@b>"]
            },
            "folder": {"id": "f1", "name": "inbox", "display_name": "Inbox"},
            "from": [{"name": null, "email": "ben@example.com"}]
        }))
        .unwrap();

        assert_eq!(message.headers.message_id, "<c@d>");
        assert_eq!(message.headers.references, vec!["<a@b>".to_string()]);
        assert_eq!(message.folder.unwrap().display_name, "Inbox");
        assert_eq!(message.from[0].name, "");
    }

    #[test]
    fn test_draft_flattens_message() {
        let draft: Draft = serde_json::from_value(json!({
            "id": "d1",
            "object": "draft",
            "subject": "hello",
            "reply_to_message_id": null,
            "version": 3
        }))
        .unwrap();

        assert_eq!(draft.message.id, "d1");
        assert_eq!(draft.message.subject, "hello");
        assert_eq!(draft.reply_to_message_id, "");
        assert_eq!(draft.version, 3);
    }
}

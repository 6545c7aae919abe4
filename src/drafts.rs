use hyper::Method;
use serde::Serialize;
use serde_json::json;

use crate::client::{Client, CountResponse, Query, VIEW_COUNT};
use crate::error::Result;
use crate::models::{Draft, Message, Participant};

/// A new draft, or a message to send directly
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DraftRequest {
    pub subject: String,
    pub from: Vec<Participant>,
    pub to: Vec<Participant>,
    pub cc: Vec<Participant>,
    pub bcc: Vec<Participant>,
    pub reply_to: Vec<Participant>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reply_to_message_id: String,
    pub body: String,
    pub file_ids: Vec<String>,
}

/// Changes to an existing draft.
///
/// `version` must match the draft's current version or the server rejects
/// the update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateDraftRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Vec<Participant>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<Participant>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<Vec<Participant>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcc: Option<Vec<Participant>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Vec<Participant>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_ids: Option<Vec<String>>,

    pub version: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftsOptions {
    pub view: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub thread_id: Option<String>,
    pub any_email: Vec<String>,
}

impl DraftsOptions {
    fn to_query(&self) -> Query {
        let mut q = Query::new();
        q.opt_str("view", &self.view);
        q.opt("limit", self.limit);
        q.opt("offset", self.offset);
        q.opt_str("thread_id", &self.thread_id);
        q.list("any_email", &self.any_email);
        q
    }
}

impl Client {
    pub async fn drafts(&self, opts: Option<&DraftsOptions>) -> Result<Vec<Draft>> {
        let query = opts.map(DraftsOptions::to_query).unwrap_or_default();
        let req = self.user_request(Method::GET, "/drafts")?.query(query);
        self.execute_json(req, "drafts").await
    }

    pub async fn drafts_count(&self, opts: Option<&DraftsOptions>) -> Result<i64> {
        let mut query = opts.map(DraftsOptions::to_query).unwrap_or_default();
        query.set("view", VIEW_COUNT);
        let req = self.user_request(Method::GET, "/drafts")?.query(query);
        let resp: CountResponse = self.execute_json(req, "drafts count").await?;
        Ok(resp.count)
    }

    pub async fn draft(&self, id: &str) -> Result<Draft> {
        let req = self.user_request(Method::GET, &format!("/drafts/{}", id))?;
        self.execute_json(req, "draft").await
    }

    pub async fn create_draft(&self, draft: &DraftRequest) -> Result<Draft> {
        let req = self.user_request(Method::POST, "/drafts")?.json(draft)?;
        self.execute_json(req, "draft").await
    }

    pub async fn update_draft(&self, id: &str, update: &UpdateDraftRequest) -> Result<Draft> {
        let req = self
            .user_request(Method::PUT, &format!("/drafts/{}", id))?
            .json(update)?;
        self.execute_json(req, "draft").await
    }

    pub async fn delete_draft(&self, id: &str, version: i64) -> Result<()> {
        let req = self
            .user_request(Method::DELETE, &format!("/drafts/{}", id))?
            .json(&json!({ "version": version }))?;
        self.execute(req).await
    }

    /// Send a saved draft. The returned message replaces the draft.
    pub async fn send_draft(&self, id: &str, version: i64) -> Result<Message> {
        let req = self
            .user_request(Method::POST, "/send")?
            .json(&json!({ "draft_id": id, "version": version }))?;
        self.execute_json(req, "sent message").await
    }

    /// Send a message without creating a draft first
    pub async fn send_directly(&self, draft: &DraftRequest) -> Result<Message> {
        let req = self.user_request(Method::POST, "/send")?.json(draft)?;
        self.execute_json(req, "sent message").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_request_omits_empty_reply_id() {
        let draft = DraftRequest {
            subject: "hi".to_string(),
            to: vec![Participant {
                name: "Ben".to_string(),
                email: "ben@example.com".to_string(),
            }],
            ..Default::default()
        };
        let value = serde_json::to_value(&draft).unwrap();
        assert!(value.get("reply_to_message_id").is_none());
        assert_eq!(value["to"][0]["email"], "ben@example.com");
        assert_eq!(value["file_ids"], json!([]));
    }

    #[test]
    fn test_update_draft_always_sends_version() {
        let update = UpdateDraftRequest {
            body: Some("new body".to_string()),
            version: 2,
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"body": "new body", "version": 2})
        );
    }
}

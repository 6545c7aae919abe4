//! Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use nylas::delta::{Delta, DeltaFeed, DeltaResponse, DeltasOptions};
use mockall::mock;
use nylas::error::Result;
use nylas::Client;
use serde_json::{json, Value};
use wiremock::MockServer;

pub const CLIENT_ID: &str = "clientID";
pub const CLIENT_SECRET: &str = "clientSecret";
pub const ACCESS_TOKEN: &str = "accessToken";

/// `Authorization` header value for basic auth with an empty password
pub fn basic_auth(user: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:", user)))
}

/// Client pointed at the mock server, with an access token
pub fn client_for(server: &MockServer) -> Client {
    Client::builder(CLIENT_ID, CLIENT_SECRET)
        .base_url(server.uri())
        .access_token(ACCESS_TOKEN)
        .build()
        .unwrap()
}

/// Client pointed at the mock server, without an access token
pub fn app_client_for(server: &MockServer) -> Client {
    Client::builder(CLIENT_ID, CLIENT_SECRET)
        .base_url(server.uri())
        .build()
        .unwrap()
}

/// Delta batch with a thread update and a folder deletion
pub fn delta_batch_fixture() -> Value {
    json!({
        "cursor_end": "end",
        "cursor_start": "start",
        "deltas": [
            {
                "attributes": {
                    "account_id": "aid",
                    "id": "tid",
                    "object": "thread",
                    "subject": "Hello World!",
                    "unread": true,
                    "message_ids": ["m1", "m2"]
                },
                "cursor": "c1",
                "event": "modify",
                "id": "tid",
                "object": "thread"
            },
            {
                "cursor": "c2",
                "event": "delete",
                "id": "fid",
                "object": "folder"
            }
        ]
    })
}

/// Event with a time span in a named zone
pub fn event_fixture() -> Value {
    json!({
        "account_id": "aid",
        "busy": true,
        "calendar_id": "cid",
        "description": "Weekly planning",
        "id": "eid",
        "location": "Room 1",
        "object": "event",
        "owner": "Owner <owner@example.com>",
        "participants": [
            {"name": "Ann", "email": "ann@example.com", "status": "yes", "comment": null}
        ],
        "read_only": false,
        "status": "confirmed",
        "title": "Planning",
        "when": {
            "object": "timespan",
            "start_time": 1409594400,
            "end_time": 1409598000,
            "start_timezone": "America/New_York",
            "end_timezone": "America/New_York"
        }
    })
}

pub fn account_fixture() -> Value {
    json!({
        "id": "awa6ltos76vz5hvphkp8k17nt",
        "object": "account",
        "account_id": "awa6ltos76vz5hvphkp8k17nt",
        "name": "Ben Bitdiddle",
        "email_address": "benbitdiddle@gmail.com",
        "provider": "gmail",
        "organization_unit": "label",
        "sync_state": "running",
        "linked_at": 1470231381
    })
}

/// Serialized delta record with no attributes
pub fn delta_line(id: &str, cursor: &str) -> String {
    json!({"id": id, "object": "message", "event": "delete", "cursor": cursor}).to_string()
}

mock! {
    pub Feed {}

    #[async_trait]
    impl DeltaFeed for Feed {
        async fn latest_cursor(&self) -> Result<String>;
        async fn deltas<'a, 'b, 'c>(&'a self, cursor: &'b str, opts: Option<&'c DeltasOptions>) -> Result<DeltaResponse>;
    }
}

/// Batch of message deltas whose cursors are derived from `cursor_end`
pub fn batch(cursor_start: &str, cursor_end: &str, ids: &[&str]) -> DeltaResponse {
    let deltas = ids
        .iter()
        .map(|id| Delta {
            id: id.to_string(),
            object: "message".to_string(),
            event: "modify".to_string(),
            cursor: format!("{}-{}", cursor_end, id),
            attributes: None,
        })
        .collect();
    DeltaResponse {
        cursor_start: cursor_start.to_string(),
        cursor_end: cursor_end.to_string(),
        deltas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth() {
        assert_eq!(basic_auth("accessToken"), "Basic YWNjZXNzVG9rZW46");
    }

    #[test]
    fn test_batch_cursors() {
        let resp = batch("c0", "c1", &["a", "b"]);
        assert!(!resp.is_caught_up());
        assert_eq!(resp.deltas[1].cursor, "c1-b");
    }

    #[test]
    fn test_delta_line_parses() {
        let delta: Delta = serde_json::from_str(&delta_line("d1", "c1")).unwrap();
        assert_eq!(delta.id, "d1");
        assert!(!delta.has_attributes());
    }
}

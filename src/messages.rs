//! Messages and threads
//!
//! Both list endpoints accept the same style of search filters and a
//! `view=count` variant returning only the number of matches.

use bytes::Bytes;
use hyper::Method;
use serde::Serialize;

use crate::client::{Client, CountResponse, Query, VIEW_COUNT, VIEW_EXPANDED};
use crate::error::Result;
use crate::models::{Message, Thread};

/// Search filters for [`Client::messages`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagesOptions {
    pub view: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,

    pub subject: Option<String>,
    /// Matches any of the addresses in from/to/cc/bcc
    pub any_email: Vec<String>,
    pub to: Option<String>,
    pub from: Option<String>,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    /// Folder or label id, name or role
    pub in_folder: Option<String>,
    pub unread: Option<bool>,
    pub starred: Option<bool>,
    pub thread_id: Option<String>,
    pub filename: Option<String>,
    /// Unix timestamps
    pub received_before: Option<i64>,
    pub received_after: Option<i64>,
    pub has_attachment: Option<bool>,
}

impl MessagesOptions {
    fn to_query(&self) -> Query {
        let mut q = Query::new();
        q.opt_str("view", &self.view);
        q.opt("limit", self.limit);
        q.opt("offset", self.offset);
        q.opt_str("subject", &self.subject);
        q.list("any_email", &self.any_email);
        q.opt_str("to", &self.to);
        q.opt_str("from", &self.from);
        q.opt_str("cc", &self.cc);
        q.opt_str("bcc", &self.bcc);
        q.opt_str("in", &self.in_folder);
        q.opt("unread", self.unread);
        q.opt("starred", self.starred);
        q.opt_str("thread_id", &self.thread_id);
        q.opt_str("filename", &self.filename);
        q.opt("received_before", self.received_before);
        q.opt("received_after", self.received_after);
        q.opt("has_attachment", self.has_attachment);
        q
    }
}

/// Search filters for [`Client::threads`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadsOptions {
    pub view: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,

    pub subject: Option<String>,
    pub any_email: Vec<String>,
    pub to: Option<String>,
    pub from: Option<String>,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub in_folder: Option<String>,
    pub unread: Option<bool>,
    pub filename: Option<String>,
    pub last_message_before: Option<i64>,
    pub last_message_after: Option<i64>,
    pub started_before: Option<i64>,
    pub started_after: Option<i64>,
}

impl ThreadsOptions {
    fn to_query(&self) -> Query {
        let mut q = Query::new();
        q.opt_str("view", &self.view);
        q.opt("limit", self.limit);
        q.opt("offset", self.offset);
        q.opt_str("subject", &self.subject);
        q.list("any_email", &self.any_email);
        q.opt_str("to", &self.to);
        q.opt_str("from", &self.from);
        q.opt_str("cc", &self.cc);
        q.opt_str("bcc", &self.bcc);
        q.opt_str("in", &self.in_folder);
        q.opt("unread", self.unread);
        q.opt_str("filename", &self.filename);
        q.opt("last_message_before", self.last_message_before);
        q.opt("last_message_after", self.last_message_after);
        q.opt("started_before", self.started_before);
        q.opt("started_after", self.started_after);
        q
    }
}

/// Mutable message state. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateMessageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starred: Option<bool>,
    /// Move to a folder (folder-based accounts)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    /// Replace the label set (label-based accounts)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_ids: Option<Vec<String>>,
}

/// Mutable thread state, applied to every message in the thread
pub type UpdateThreadRequest = UpdateMessageRequest;

impl Client {
    pub async fn messages(&self, opts: Option<&MessagesOptions>) -> Result<Vec<Message>> {
        let query = opts.map(MessagesOptions::to_query).unwrap_or_default();
        let req = self.user_request(Method::GET, "/messages")?.query(query);
        self.execute_json(req, "messages").await
    }

    pub async fn messages_count(&self, opts: Option<&MessagesOptions>) -> Result<i64> {
        let mut query = opts.map(MessagesOptions::to_query).unwrap_or_default();
        query.set("view", VIEW_COUNT);
        let req = self.user_request(Method::GET, "/messages")?.query(query);
        let resp: CountResponse = self.execute_json(req, "messages count").await?;
        Ok(resp.count)
    }

    /// Fetch one message; `expanded` adds the threading headers
    pub async fn message(&self, id: &str, expanded: bool) -> Result<Message> {
        let mut query = Query::new();
        if expanded {
            query.push("view", VIEW_EXPANDED);
        }
        let req = self
            .user_request(Method::GET, &format!("/messages/{}", id))?
            .query(query);
        self.execute_json(req, "message").await
    }

    /// Original RFC 2822 message, headers and MIME parts included
    pub async fn raw_message(&self, id: &str) -> Result<Bytes> {
        let req = self
            .user_request(Method::GET, &format!("/messages/{}", id))?
            .accept("message/rfc822");
        self.execute_bytes(req).await
    }

    pub async fn update_message(&self, id: &str, update: &UpdateMessageRequest) -> Result<Message> {
        let req = self
            .user_request(Method::PUT, &format!("/messages/{}", id))?
            .json(update)?;
        self.execute_json(req, "message").await
    }

    pub async fn threads(&self, opts: Option<&ThreadsOptions>) -> Result<Vec<Thread>> {
        let query = opts.map(ThreadsOptions::to_query).unwrap_or_default();
        let req = self.user_request(Method::GET, "/threads")?.query(query);
        self.execute_json(req, "threads").await
    }

    pub async fn threads_count(&self, opts: Option<&ThreadsOptions>) -> Result<i64> {
        let mut query = opts.map(ThreadsOptions::to_query).unwrap_or_default();
        query.set("view", VIEW_COUNT);
        let req = self.user_request(Method::GET, "/threads")?.query(query);
        let resp: CountResponse = self.execute_json(req, "threads count").await?;
        Ok(resp.count)
    }

    /// Fetch one thread; `expanded` includes message and draft objects
    pub async fn thread(&self, id: &str, expanded: bool) -> Result<Thread> {
        let mut query = Query::new();
        if expanded {
            query.push("view", VIEW_EXPANDED);
        }
        let req = self
            .user_request(Method::GET, &format!("/threads/{}", id))?
            .query(query);
        self.execute_json(req, "thread").await
    }

    pub async fn update_thread(&self, id: &str, update: &UpdateThreadRequest) -> Result<Thread> {
        let req = self
            .user_request(Method::PUT, &format!("/threads/{}", id))?
            .json(update)?;
        self.execute_json(req, "thread").await
    }
}

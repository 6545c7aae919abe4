//! Delta change feed: cursors, paged fetches and typed projections
//!
//! A delta feed is read by repeatedly asking for the changes after a cursor.
//! One [`DeltaFeed::deltas`] call is not guaranteed to drain the feed; keep
//! calling with [`DeltaResponse::cursor_end`] until
//! [`DeltaResponse::is_caught_up`] returns true:
//!
//! ```no_run
//! # async fn run(client: &nylas::Client) -> nylas::Result<()> {
//! use nylas::DeltaFeed;
//!
//! let mut cursor = client.latest_cursor().await?;
//! loop {
//!     let batch = client.deltas(&cursor, None).await?;
//!     for delta in &batch.deltas {
//!         println!("{} {} {}", delta.event, delta.object, delta.id);
//!     }
//!     if batch.is_caught_up() {
//!         break;
//!     }
//!     cursor = batch.cursor_end;
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use hyper::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;
use tracing::debug;

use crate::client::{Client, Query, VIEW_COUNT, VIEW_EXPANDED, VIEW_IDS};
use crate::error::{NylasError, Result};
use crate::models::{Message, Thread};

/// A single change in the account's change log.
///
/// `attributes` is kept as the raw JSON the server sent and is only decoded
/// when one of the projection methods is called.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,

    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub cursor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Box<RawValue>>,
}

impl Delta {
    /// True when the server sent an attribute payload (create/modify)
    pub fn has_attributes(&self) -> bool {
        self.attributes.is_some()
    }

    /// Decode the attribute payload into any shape
    pub fn attributes_as<T: DeserializeOwned>(&self) -> Result<T> {
        let raw = self.attributes.as_deref().map(RawValue::get).unwrap_or("null");
        serde_json::from_str(raw).map_err(|e| {
            NylasError::decode(format!("{} delta {} attributes", self.object, self.id), e)
        })
    }

    /// Decode the attribute payload as a [`Message`]
    pub fn message(&self) -> Result<Message> {
        self.attributes_as()
    }

    /// Decode the attribute payload as a [`Thread`]
    pub fn thread(&self) -> Result<Thread> {
        self.attributes_as()
    }
}

/// One page of the change feed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeltaResponse {
    #[serde(default)]
    pub cursor_start: String,
    #[serde(default)]
    pub cursor_end: String,
    #[serde(default)]
    pub deltas: Vec<Delta>,
}

impl DeltaResponse {
    /// No further changes are pending past `cursor_end`
    pub fn is_caught_up(&self) -> bool {
        self.cursor_start == self.cursor_end
    }
}

/// `view` parameter of a delta fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaView {
    Count,
    Ids,
    Expanded,
}

impl DeltaView {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeltaView::Count => VIEW_COUNT,
            DeltaView::Ids => VIEW_IDS,
            DeltaView::Expanded => VIEW_EXPANDED,
        }
    }
}

impl fmt::Display for DeltaView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeltaView {
    type Err = NylasError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            VIEW_COUNT => Ok(DeltaView::Count),
            VIEW_IDS => Ok(DeltaView::Ids),
            VIEW_EXPANDED => Ok(DeltaView::Expanded),
            other => Err(NylasError::InvalidRequest(format!(
                "unknown delta view '{}', expected count, ids or expanded",
                other
            ))),
        }
    }
}

/// Optional filters for [`DeltaFeed::deltas`].
///
/// Include and exclude lists are both passed through when set; the server
/// decides what the combination means.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltasOptions {
    pub include_types: Vec<String>,
    pub exclude_types: Vec<String>,
    pub view: Option<DeltaView>,
}

impl DeltasOptions {
    pub(crate) fn append_to(&self, query: &mut Query) {
        query.list("include_types", &self.include_types);
        query.list("exclude_types", &self.exclude_types);
        query.opt("view", self.view.map(|v| v.as_str()));
    }
}

#[derive(Deserialize)]
struct LatestCursor {
    #[serde(default)]
    cursor: String,
}

/// Paged access to an account's change feed
#[async_trait]
pub trait DeltaFeed: Send + Sync {
    /// Current position of the change log
    async fn latest_cursor(&self) -> Result<String>;

    /// Fetch the changes after `cursor`. May return only part of what is
    /// pending, see [`DeltaResponse::is_caught_up`].
    async fn deltas(&self, cursor: &str, opts: Option<&DeltasOptions>) -> Result<DeltaResponse>;
}

#[async_trait]
impl DeltaFeed for Client {
    async fn latest_cursor(&self) -> Result<String> {
        let req = self.user_request(Method::POST, "/delta/latest_cursor")?;
        let latest: LatestCursor = self.execute_json(req, "latest cursor").await?;
        debug!(cursor = %latest.cursor, "fetched latest delta cursor");
        Ok(latest.cursor)
    }

    async fn deltas(&self, cursor: &str, opts: Option<&DeltasOptions>) -> Result<DeltaResponse> {
        let req = self.user_request(Method::GET, "/delta")?;

        let mut query = Query::new();
        query.push("cursor", cursor);
        if let Some(opts) = opts {
            opts.append_to(&mut query);
        }

        let resp: DeltaResponse = self.execute_json(req.query(query), "delta response").await?;
        debug!(
            cursor_start = %resp.cursor_start,
            cursor_end = %resp.cursor_end,
            count = resp.deltas.len(),
            "fetched delta batch"
        );
        Ok(resp)
    }
}

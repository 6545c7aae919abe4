//! Nylas API client
//!
//! An async client for the Nylas email and calendar REST API with first-class
//! support for the account change feed.
//!
//! # Overview
//!
//! - **Delta feed**: cursor-based paging over account changes, plus a
//!   long-lived streaming variant that delivers one change per line
//! - **Mail**: messages, threads, drafts, files, folders and labels
//! - **Calendar**: calendars and events, with the polymorphic `when` field
//!   decoded into a typed [`EventTime`]
//! - **Accounts**: account info, application-level account management and
//!   native authentication
//! - **Webhooks**: signature verification and a small notification listener
//!
//! # Example Usage
//!
//! ```no_run
//! use nylas::{Client, DeltaFeed};
//!
//! #[tokio::main]
//! async fn main() -> nylas::Result<()> {
//!     let client = Client::builder("client-id", "client-secret")
//!         .access_token("access-token")
//!         .build()?;
//!
//!     let mut cursor = client.latest_cursor().await?;
//!     loop {
//!         let batch = client.deltas(&cursor, None).await?;
//!         for delta in &batch.deltas {
//!             if delta.object == "message" && delta.has_attributes() {
//!                 let message = delta.message()?;
//!                 println!("{}: {}", delta.event, message.subject);
//!             }
//!         }
//!         let caught_up = batch.is_caught_up();
//!         cursor = batch.cursor_end;
//!         if caught_up {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`client`] - Transport, authentication and request plumbing
//! - [`delta`] - Delta records, paged delta fetch and the [`DeltaFeed`] trait
//! - [`stream`] - Streaming delta consumption with cancellation
//! - [`when`] - Event time shapes and time zones
//! - [`models`] - Mail data structures
//! - [`messages`], [`drafts`], [`files`], [`folders`] - Mail endpoints
//! - [`calendar`] - Calendars and events
//! - [`accounts`], [`native`] - Account management and native authentication
//! - [`webhook`] - Webhook verification and listener
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result aliases
//! - [`cli`] - Command-line interface for the `nylas-delta` binary

pub mod accounts;
pub mod calendar;
pub mod cli;
pub mod client;
pub mod config;
pub mod delta;
pub mod drafts;
pub mod error;
pub mod files;
pub mod folders;
pub mod messages;
pub mod models;
pub mod native;
pub mod stream;
pub mod webhook;
pub mod when;

// Re-export commonly used types for convenience
pub use error::{ApiError, NylasError, Result};

pub use client::{Client, ClientBuilder};
pub use config::Config;

// Delta feed
pub use delta::{Delta, DeltaFeed, DeltaResponse, DeltaView, DeltasOptions};
pub use stream::consume_delta_stream;

// Core data models
pub use models::{
    Account, BillingAccount, Draft, File, Folder, Label, Message, MessageHeaders, Participant,
    Thread,
};

// Calendar types
pub use calendar::{Calendar, Event, EventParticipant, EventRecurrence};
pub use when::{EventTime, TimeZone};

// Request options
pub use calendar::{CalendarsOptions, EventsOptions};
pub use drafts::{DraftRequest, DraftsOptions, UpdateDraftRequest};
pub use folders::{FoldersOptions, LabelsOptions, PageOptions};
pub use messages::{MessagesOptions, ThreadsOptions, UpdateMessageRequest, UpdateThreadRequest};

// Native authentication
pub use native::{
    AuthorizeRequest, AuthorizeSettings, ExchangeAuthorizeSettings, GmailAuthorizeSettings,
    ImapAuthorizeSettings, Office365AuthorizeSettings, OutlookAuthorizeSettings,
};

// Webhooks
pub use webhook::{WebhookDelta, WebhookHandler, WebhookListener};

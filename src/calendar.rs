//! Calendars and events

use chrono::{DateTime, Utc};
use hyper::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{Client, Query};
use crate::error::{NylasError, Result};
use crate::models::deserializers::null_as_default;
use crate::when::{optional_time_zone, EventTime, TimeZone};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calendar {
    pub id: String,
    pub object: String,
    pub account_id: String,

    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    pub is_primary: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub job_status_id: String,
    pub read_only: bool,
    #[serde(deserialize_with = "optional_time_zone")]
    pub timezone: Option<TimeZone>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventParticipant {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    pub email: String,
    /// yes, no, maybe or noreply
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub comment: String,
}

/// RFC 5545 recurrence rules and the zone they are evaluated in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRecurrence {
    #[serde(deserialize_with = "null_as_default")]
    pub rrule: Vec<String>,
    #[serde(deserialize_with = "optional_time_zone")]
    pub timezone: Option<TimeZone>,
}

/// A calendar event.
///
/// `when` is `None` when the payload has no recognised time shape.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "RawEvent")]
pub struct Event {
    pub id: String,
    pub object: String,
    pub account_id: String,

    pub calendar_id: String,
    pub title: String,
    pub description: String,
    pub ical_uid: String,
    pub when: Option<EventTime>,
    pub location: String,
    pub owner: String,
    pub participants: Vec<EventParticipant>,
    /// confirmed, tentative or cancelled
    pub status: String,
    pub read_only: bool,
    pub busy: bool,
    pub recurrence: EventRecurrence,

    /// Set on instances of a recurring event
    pub master_event_id: String,
    pub original_start_time: Option<DateTime<Utc>>,

    /// Application-defined key/value pairs, kept as sent
    pub metadata: Option<Value>,
}

#[derive(Deserialize)]
#[serde(default)]
struct RawEvent {
    id: String,
    object: String,
    account_id: String,

    #[serde(deserialize_with = "null_as_default")]
    calendar_id: String,
    #[serde(deserialize_with = "null_as_default")]
    title: String,
    #[serde(deserialize_with = "null_as_default")]
    description: String,
    #[serde(deserialize_with = "null_as_default")]
    ical_uid: String,
    when: Option<Value>,
    #[serde(deserialize_with = "null_as_default")]
    location: String,
    #[serde(deserialize_with = "null_as_default")]
    owner: String,
    #[serde(deserialize_with = "null_as_default")]
    participants: Vec<EventParticipant>,
    #[serde(deserialize_with = "null_as_default")]
    status: String,
    read_only: bool,
    busy: bool,
    #[serde(deserialize_with = "null_as_default")]
    recurrence: EventRecurrence,
    #[serde(deserialize_with = "null_as_default")]
    master_event_id: String,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    original_start_time: Option<DateTime<Utc>>,
    metadata: Option<Value>,
}

impl Default for RawEvent {
    fn default() -> Self {
        RawEvent {
            id: String::new(),
            object: String::new(),
            account_id: String::new(),
            calendar_id: String::new(),
            title: String::new(),
            description: String::new(),
            ical_uid: String::new(),
            when: None,
            location: String::new(),
            owner: String::new(),
            participants: Vec::new(),
            status: String::new(),
            read_only: false,
            busy: false,
            recurrence: EventRecurrence::default(),
            master_event_id: String::new(),
            original_start_time: None,
            metadata: None,
        }
    }
}

impl TryFrom<RawEvent> for Event {
    type Error = NylasError;

    fn try_from(raw: RawEvent) -> Result<Self> {
        let when = match &raw.when {
            Some(when) => EventTime::from_value(when)?,
            None => None,
        };

        Ok(Event {
            id: raw.id,
            object: raw.object,
            account_id: raw.account_id,
            calendar_id: raw.calendar_id,
            title: raw.title,
            description: raw.description,
            ical_uid: raw.ical_uid,
            when,
            location: raw.location,
            owner: raw.owner,
            participants: raw.participants,
            status: raw.status,
            read_only: raw.read_only,
            busy: raw.busy,
            recurrence: raw.recurrence,
            master_event_id: raw.master_event_id,
            original_start_time: raw.original_start_time,
            metadata: raw.metadata,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarsOptions {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl CalendarsOptions {
    fn to_query(self) -> Query {
        let mut q = Query::new();
        q.opt("limit", self.limit);
        q.opt("offset", self.offset);
        q
    }
}

/// Filters for [`Client::events`]. Time bounds are Unix timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventsOptions {
    pub show_cancelled: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub event_id: Option<String>,
    pub calendar_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_before: Option<i64>,
    pub starts_after: Option<i64>,
    pub ends_before: Option<i64>,
    pub ends_after: Option<i64>,
    pub metadata_key: Option<String>,
    pub metadata_value: Option<String>,
    pub metadata_pair: Option<String>,
    /// Return each occurrence of a recurring event separately
    pub expand_recurring: Option<bool>,
    pub busy: Option<bool>,
}

impl EventsOptions {
    fn to_query(&self) -> Query {
        let mut q = Query::new();
        q.opt("show_cancelled", self.show_cancelled);
        q.opt("limit", self.limit);
        q.opt("offset", self.offset);
        q.opt_str("event_id", &self.event_id);
        q.opt_str("calendar_id", &self.calendar_id);
        q.opt_str("title", &self.title);
        q.opt_str("description", &self.description);
        q.opt_str("location", &self.location);
        q.opt("starts_before", self.starts_before);
        q.opt("starts_after", self.starts_after);
        q.opt("ends_before", self.ends_before);
        q.opt("ends_after", self.ends_after);
        q.opt_str("metadata_key", &self.metadata_key);
        q.opt_str("metadata_value", &self.metadata_value);
        q.opt("expand_recurring", self.expand_recurring);
        q.opt_str("metadata_pair", &self.metadata_pair);
        q.opt("busy", self.busy);
        q
    }
}

impl Client {
    pub async fn calendars(&self, opts: Option<&CalendarsOptions>) -> Result<Vec<Calendar>> {
        let query = opts.map(|o| o.to_query()).unwrap_or_default();
        let req = self.user_request(Method::GET, "/calendars")?.query(query);
        self.execute_json(req, "calendars").await
    }

    pub async fn calendar(&self, id: &str) -> Result<Calendar> {
        let req = self.user_request(Method::GET, &format!("/calendars/{}", id))?;
        self.execute_json(req, "calendar").await
    }

    pub async fn events(&self, opts: Option<&EventsOptions>) -> Result<Vec<Event>> {
        let query = opts.map(EventsOptions::to_query).unwrap_or_default();
        let req = self.user_request(Method::GET, "/events")?.query(query);
        self.execute_json(req, "events").await
    }

    pub async fn event(&self, id: &str) -> Result<Event> {
        let req = self.user_request(Method::GET, &format!("/events/{}", id))?;
        self.execute_json(req, "event").await
    }
}

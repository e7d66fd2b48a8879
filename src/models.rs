use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Wire timestamp format used by the listing API and the ledger,
/// e.g. `2024-05-10T10:00:00+09:00`.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Event {
    pub id: String, // externally assigned by the listing API
    pub title: String,
    pub address: String,
    pub place: String,
    pub limit: Option<u32>,
    pub hash_tag: String,
    pub event_url: String,
    pub started_at: DateTime<FixedOffset>,
    pub ended_at: DateTime<FixedOffset>,
}

/// Identifier -> event, built fresh each run. Ordered so that send order is
/// deterministic.
pub type EventBatch = BTreeMap<String, Event>;

pub fn parse_timestamp(raw: &str) -> chrono::ParseResult<DateTime<FixedOffset>> {
    DateTime::parse_from_str(raw, TIME_FORMAT)
}

pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    // %:z keeps the colon in the offset, matching the wire format.
    ts.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

#[cfg(test)]
pub(crate) fn test_event(id: &str, start: &str, end: &str) -> Event {
    Event {
        id: id.to_string(),
        title: format!("Event{id}"),
        address: "東京都千代田区1-2-3".to_string(),
        place: "サンプル会議室".to_string(),
        limit: Some(30),
        hash_tag: "sample".to_string(),
        event_url: format!("https://connpass.com/event/{id}/"),
        started_at: parse_timestamp(start).expect("test start timestamp"),
        ended_at: parse_timestamp(end).expect("test end timestamp"),
    }
}

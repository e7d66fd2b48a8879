use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::warn;

use crate::models::{self, Event, EventBatch};

const API_URL: &str = "https://connpass.com/api/v1/event";
/// 2 = order results by event date.
const ORDER_BY_EVENT_DATE: &str = "2";
/// Single page only; matches past the first page are out of scope for a run.
const PAGE_SIZE: &str = "100";

static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(20))
        .user_agent("connpass-notify/0.1")
        .build()
        .expect("http client")
});

pub struct Connpass {
    base_url: String,
}

impl Default for Connpass {
    fn default() -> Self {
        Self {
            base_url: API_URL.to_string(),
        }
    }
}

impl Connpass {
    /// Fetches events matching `keyword` in the month of `now`, keyed by
    /// identifier. Events that have already started are dropped against the
    /// single `now` captured for this run.
    pub fn fetch(&self, keyword: &str, now: DateTime<Utc>) -> Result<EventBatch> {
        let mut url =
            reqwest::Url::parse(&self.base_url).context("invalid listing api base url")?;
        url.query_pairs_mut()
            .append_pair("ym", &now.format("%Y%m").to_string())
            .append_pair("order", ORDER_BY_EVENT_DATE)
            .append_pair("count", PAGE_SIZE)
            .append_pair("keyword", keyword);

        let response = CLIENT
            .get(url.clone())
            .send()
            .with_context(|| format!("request failed for {url}"))?;
        let response = response
            .error_for_status()
            .with_context(|| format!("non-success status for {url}"))?;
        let body = response
            .text()
            .with_context(|| format!("unable to read response body for {url}"))?;

        parse_response(&body, now)
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    events: Vec<ApiEvent>,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    event_id: i64,
    title: String,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    place: Option<String>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    hash_tag: Option<String>,
    event_url: String,
    started_at: String,
    ended_at: String,
}

pub fn parse_response(body: &str, now: DateTime<Utc>) -> Result<EventBatch> {
    let payload: ListResponse =
        serde_json::from_str(body).context("listing api response did not parse")?;

    let mut batch = EventBatch::new();
    for raw in payload.events {
        let id = raw.event_id.to_string();
        let event = match convert(id.clone(), raw) {
            Ok(event) => event,
            Err(err) => {
                // A record that fails validation is skipped whole; nothing
                // partially parsed leaves this boundary.
                warn!(id = %id, error = %err, "skipping malformed event record");
                continue;
            }
        };
        if event.started_at <= now {
            continue;
        }
        batch.insert(id, event);
    }
    Ok(batch)
}

fn convert(id: String, raw: ApiEvent) -> Result<Event> {
    let started_at = models::parse_timestamp(&raw.started_at)
        .with_context(|| format!("unreadable started_at {:?}", raw.started_at))?;
    let ended_at = models::parse_timestamp(&raw.ended_at)
        .with_context(|| format!("unreadable ended_at {:?}", raw.ended_at))?;

    Ok(Event {
        id,
        title: raw.title,
        address: raw.address.unwrap_or_default(),
        place: raw.place.unwrap_or_default(),
        limit: raw.limit,
        hash_tag: raw.hash_tag.unwrap_or_default(),
        event_url: raw.event_url,
        started_at,
        ended_at,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use mockito::Matcher;

    use super::*;

    const SAMPLE_JSON: &str = r#"{
        "results_returned": 4,
        "events": [
            {
                "event_id": 100,
                "title": "Rust入門もくもく会",
                "address": "東京都港区1-1-1",
                "place": "Aビル 3F",
                "limit": 20,
                "hash_tag": "rustbeginners",
                "event_url": "https://connpass.com/event/100/",
                "started_at": "2024-05-20T19:00:00+09:00",
                "ended_at": "2024-05-20T21:00:00+09:00"
            },
            {
                "event_id": 101,
                "title": "終了済みイベント",
                "address": "東京都港区1-1-1",
                "place": "Aビル 3F",
                "limit": 10,
                "hash_tag": "done",
                "event_url": "https://connpass.com/event/101/",
                "started_at": "2024-05-01T19:00:00+09:00",
                "ended_at": "2024-05-01T21:00:00+09:00"
            },
            {
                "event_id": 102,
                "title": "壊れたレコード",
                "address": null,
                "place": null,
                "limit": null,
                "hash_tag": "broken",
                "event_url": "https://connpass.com/event/102/",
                "started_at": "not a timestamp",
                "ended_at": "2024-05-25T21:00:00+09:00"
            },
            {
                "event_id": 103,
                "title": "オンラインLT会",
                "address": null,
                "place": null,
                "limit": null,
                "hash_tag": "",
                "event_url": "https://connpass.com/event/103/",
                "started_at": "2024-05-25T13:00:00+09:00",
                "ended_at": "2024-05-25T17:00:00+09:00"
            }
        ]
    }"#;

    fn run_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap()
    }

    #[test]
    fn keeps_only_future_parseable_events() {
        let batch = parse_response(SAMPLE_JSON, run_now()).expect("parse");
        let ids: Vec<&str> = batch.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["100", "103"]);

        let first = &batch["100"];
        assert_eq!(first.title, "Rust入門もくもく会");
        assert_eq!(first.limit, Some(20));

        let online = &batch["103"];
        assert_eq!(online.address, "");
        assert_eq!(online.limit, None);
    }

    #[test]
    fn boundary_event_starting_exactly_now_is_excluded() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 10, 0, 0).unwrap();
        // 19:00+09:00 == 10:00Z, not strictly in the future.
        let batch = parse_response(SAMPLE_JSON, now).expect("parse");
        assert!(!batch.contains_key("100"));
        assert!(batch.contains_key("103"));
    }

    #[test]
    fn fetch_builds_the_expected_query() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("ym".into(), "202405".into()),
                Matcher::UrlEncoded("order".into(), "2".into()),
                Matcher::UrlEncoded("count".into(), "100".into()),
                Matcher::UrlEncoded("keyword".into(), "rust".into()),
            ]))
            .with_status(200)
            .with_body(SAMPLE_JSON)
            .create();

        let source = Connpass {
            base_url: server.url(),
        };
        let batch = source.fetch("rust", run_now()).expect("fetch");
        assert_eq!(batch.len(), 2);
        mock.assert();
    }
}

use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::warn;

use super::{message, Channel, NO_NEWS_MESSAGE};
use crate::config::Config;
use crate::models::EventBatch;

static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(20))
        .build()
        .expect("http client")
});

/// Broadcast channel: bearer-token POST with a `message` form field. The
/// HTTP status is the delivery signal, so this channel decides what gets
/// written to the ledger.
pub struct LineNotify {
    token: String,
    endpoint: String,
}

impl LineNotify {
    pub fn new(config: &Config) -> Self {
        Self {
            token: config.line_token.clone(),
            endpoint: config.line_api_url.clone(),
        }
    }

    fn post(&self, text: &str) -> Result<StatusCode> {
        let response = CLIENT
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .form(&[("message", text)])
            .send()
            .with_context(|| format!("line request failed for {}", self.endpoint))?;
        Ok(response.status())
    }
}

impl Channel for LineNotify {
    fn name(&self) -> &'static str {
        "line"
    }

    fn send(&self, events: &EventBatch) -> Result<EventBatch> {
        if events.is_empty() {
            let status = self.post(NO_NEWS_MESSAGE)?;
            if status != StatusCode::OK {
                warn!(status = %status, "line rejected no-news message");
            }
            return Ok(EventBatch::new());
        }

        let mut delivered = EventBatch::new();
        for (id, event) in events {
            match self.post(&message::render(event)) {
                Ok(status) if status == StatusCode::OK => {
                    delivered.insert(id.clone(), event.clone());
                }
                Ok(status) => {
                    warn!(id = %id, status = %status, "line rejected notification");
                }
                Err(err) => {
                    warn!(id = %id, error = %err, "line notification failed");
                }
            }
        }
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;
    use crate::models::test_event;

    fn channel(endpoint: String) -> LineNotify {
        LineNotify {
            token: "line-token".to_string(),
            endpoint,
        }
    }

    fn two_event_batch() -> EventBatch {
        let mut batch = EventBatch::new();
        batch.insert(
            "A".to_string(),
            test_event("A", "2024-05-20T19:00:00+09:00", "2024-05-20T21:00:00+09:00"),
        );
        batch.insert(
            "B".to_string(),
            test_event("B", "2024-05-22T19:00:00+09:00", "2024-05-22T21:00:00+09:00"),
        );
        batch
    }

    #[test]
    fn empty_batch_sends_one_no_news_message() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/")
            .match_header("authorization", "Bearer line-token")
            .match_body(Matcher::UrlEncoded(
                "message".into(),
                NO_NEWS_MESSAGE.into(),
            ))
            .with_status(200)
            .expect(1)
            .create();

        let delivered = channel(server.url())
            .send(&EventBatch::new())
            .expect("send");
        assert!(delivered.is_empty());
        mock.assert();
    }

    #[test]
    fn rejected_no_news_message_does_not_fail_the_run() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/")
            .with_status(500)
            .expect(1)
            .create();

        let delivered = channel(server.url())
            .send(&EventBatch::new())
            .expect("send");
        assert!(delivered.is_empty());
        mock.assert();
    }

    #[test]
    fn returns_only_events_the_channel_accepted() {
        let mut server = mockito::Server::new();
        let accepted = server
            .mock("POST", "/")
            .match_body(Matcher::Regex("EventA".to_string()))
            .with_status(200)
            .create();
        let rejected = server
            .mock("POST", "/")
            .match_body(Matcher::Regex("EventB".to_string()))
            .with_status(500)
            .create();

        let delivered = channel(server.url())
            .send(&two_event_batch())
            .expect("send");
        let ids: Vec<&str> = delivered.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["A"]);
        accepted.assert();
        rejected.assert();
    }
}

use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use hmac::{Hmac, Mac};
use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::blocking::Client;
use sha1::Sha1;
use tracing::warn;

use super::{message, Channel, NO_NEWS_MESSAGE};
use crate::config::Config;
use crate::models::EventBatch;

const STATUS_URL: &str = "https://api.twitter.com/1.1/statuses/update.json";

/// RFC 3986 unreserved characters stay as-is, everything else is escaped.
const OAUTH_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(20))
        .build()
        .expect("http client")
});

/// Microblog channel: one OAuth 1.0a signed status update per event. The
/// API response carries no success signal this pipeline consumes, so the
/// returned delivered set is always empty and dedup for this channel rides
/// entirely on the shared seen-set.
pub struct Microblog {
    api_key: String,
    api_secret: String,
    access_token: String,
    access_token_secret: String,
    endpoint: String,
}

impl Microblog {
    pub fn new(config: &Config) -> Self {
        Self {
            api_key: config.twitter_api_key.clone(),
            api_secret: config.twitter_api_secret.clone(),
            access_token: config.twitter_access_token.clone(),
            access_token_secret: config.twitter_access_token_secret.clone(),
            endpoint: STATUS_URL.to_string(),
        }
    }

    fn post_status(&self, status: &str) -> Result<()> {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let header = self.authorization_header(status, &nonce, &timestamp);

        let response = CLIENT
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, header)
            .form(&[("status", status)])
            .send()
            .with_context(|| format!("microblog request failed for {}", self.endpoint))?;

        let code = response.status();
        if !code.is_success() {
            let body = response.text().unwrap_or_default();
            anyhow::bail!("microblog rejected status update: {code}: {body}");
        }
        Ok(())
    }

    fn authorization_header(&self, status: &str, nonce: &str, timestamp: &str) -> String {
        let oauth_params = [
            ("oauth_consumer_key", self.api_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp),
            ("oauth_token", self.access_token.as_str()),
            ("oauth_version", "1.0"),
        ];

        let mut request_params: Vec<(&str, &str)> = oauth_params.to_vec();
        request_params.push(("status", status));
        let oauth_signature = signature(
            "POST",
            &self.endpoint,
            &request_params,
            &self.api_secret,
            &self.access_token_secret,
        );

        let mut header_params: Vec<(&str, String)> = oauth_params
            .iter()
            .map(|(key, value)| (*key, encode(value)))
            .collect();
        header_params.push(("oauth_signature", encode(&oauth_signature)));
        header_params.sort();

        let joined = header_params
            .iter()
            .map(|(key, value)| format!("{key}=\"{value}\""))
            .collect::<Vec<_>>()
            .join(", ");
        format!("OAuth {joined}")
    }
}

impl Channel for Microblog {
    fn name(&self) -> &'static str {
        "microblog"
    }

    fn send(&self, events: &EventBatch) -> Result<EventBatch> {
        if events.is_empty() {
            if let Err(err) = self.post_status(NO_NEWS_MESSAGE) {
                warn!(error = %err, "microblog no-news status failed");
            }
            return Ok(EventBatch::new());
        }

        for (id, event) in events {
            // One rejected status must not cost the rest of the batch.
            if let Err(err) = self.post_status(&message::render(event)) {
                warn!(id = %id, error = %err, "microblog status update failed, continuing");
            }
        }
        Ok(EventBatch::new())
    }
}

/// HMAC-SHA1 signature over the canonical OAuth 1.0a base string built from
/// every request parameter (header and body alike).
fn signature(
    method: &str,
    endpoint: &str,
    params: &[(&str, &str)],
    consumer_secret: &str,
    token_secret: &str,
) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(key, value)| (encode(key), encode(value)))
        .collect();
    encoded.sort();
    let param_string = encoded
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let base = format!("{method}&{}&{}", encode(endpoint), encode(&param_string));
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));

    let mut mac =
        Hmac::<Sha1>::new_from_slice(key.as_bytes()).expect("hmac accepts any key length");
    mac.update(base.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE).to_string()
}

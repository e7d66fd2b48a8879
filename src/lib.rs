pub mod config;
pub mod connpass;
pub mod ledger;
pub mod models;
pub mod notify;

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use config::Config;
use connpass::Connpass;
use ledger::Ledger;
use models::EventBatch;
use notify::line::LineNotify;
use notify::microblog::Microblog;
use notify::Channel;

#[derive(Debug)]
pub struct RunSummary {
    pub fetched: usize,
    pub fresh: usize,
    pub delivered: usize,
    pub pruned: usize,
}

/// One scheduled invocation: fetch, drop already-announced events, notify
/// both channels, record what the broadcast channel confirmed, prune ledger
/// rows for events that have started. `now` is captured once and threaded
/// through fetching and the ledger so time filtering is consistent.
pub fn run(config: &Config) -> Result<RunSummary> {
    let now = Utc::now();

    let source = Connpass::default();
    let events = source.fetch(&config.keyword, now)?;
    let fetched = events.len();
    info!(fetched, keyword = %config.keyword, "fetched upcoming events");

    let ledger =
        Ledger::open(&config.ledger_path, now).context("unable to open announcement ledger")?;
    let fresh = remove_seen(events, &ledger.seen_ids());
    info!(fresh = fresh.len(), "events not announced yet");

    let line = LineNotify::new(config);
    let delivered = line.send(&fresh)?;
    info!(channel = line.name(), delivered = delivered.len(), "broadcast done");

    // Independent of the broadcast outcome; only the broadcast subset feeds
    // the ledger, the microblog has no delivery signal to contribute.
    let microblog = Microblog::new(config);
    microblog.send(&fresh)?;

    ledger
        .record(&delivered)
        .context("unable to record announcements")?;
    let pruned = ledger
        .prune_expired()
        .context("unable to prune expired announcements")?;

    Ok(RunSummary {
        fetched,
        fresh: fresh.len(),
        delivered: delivered.len(),
        pruned,
    })
}

pub fn remove_seen(mut events: EventBatch, seen: &HashSet<String>) -> EventBatch {
    events.retain(|id, _| !seen.contains(id));
    events
}

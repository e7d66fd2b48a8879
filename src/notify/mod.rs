pub mod line;
pub mod message;
pub mod microblog;

use crate::models::EventBatch;

/// Fixed text sent when a run finds nothing new. Fires every run by design,
/// even when the listing API simply has no matches.
pub const NO_NEWS_MESSAGE: &str = "\n新着イベント情報なし";

/// One delivery channel. `send` pushes the whole batch sequentially and
/// returns the subset it confirmed delivered; a channel without a usable
/// per-call success signal returns an empty batch.
pub trait Channel {
    fn name(&self) -> &'static str;
    fn send(&self, events: &EventBatch) -> anyhow::Result<EventBatch>;
}

//! Configuration loader for the matcher node.
//!
//! This crate centralizes runtime settings for the matcher. It provides sane
//! defaults and supports overrides via an optional `matcher.toml` file and
//! environment variables prefixed with `MATCHER_` (nested fields separated
//! using `__`). For example, `MATCHER_MATCHER__EVENT_BUFFER_CAPACITY=4096`.
//!
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
/// Top-level settings consumed by the matcher services.
pub struct Settings {
    pub matcher: Matcher,
}

#[derive(Debug, Deserialize, Clone)]
/// Per-pair matcher actor settings.
pub struct Matcher {
    /// Node fee attached to every produced exchange transaction.
    pub settlement_fee: u64,
    /// Depth of the serialized submission queue.
    pub submission_queue_depth: usize,
    /// Capacity of the bounded match-event buffer. A full buffer stalls the
    /// intake queue, never the book mid-match.
    pub event_buffer_capacity: usize,
}

impl Settings {
    /// Load settings from defaults, `matcher.toml` (optional), and environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .set_default("matcher.settlement_fee", 300_000)?
            .set_default("matcher.submission_queue_depth", 1024)?
            .set_default("matcher.event_buffer_capacity", 1024)?
            .add_source(config::File::with_name("matcher").required(false))
            .add_source(
                config::Environment::with_prefix("MATCHER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        config.try_deserialize()
    }
}

/// Failures surfaced by a [`Consumer`]. Running out of time while waiting for a message is never
/// one of them: timed receives report that as `Ok(None)`.
///
/// [`Consumer`]: crate::Consumer
#[derive(thiserror::Error, Debug)]
pub enum ConsumerError {
    #[error("Consumer is closed")]
    Closed,
    #[error("Consumer has been released")]
    Released,
    #[error("Failed to receive from feed: {0}")]
    Transport(#[from] FeedError),
    #[error("Failed to extract message body: {0}")]
    BodyExtraction(#[from] BodyError),
}

/// Faults reported by a [`Feed`]. These are not retried by the consumer.
///
/// [`Feed`]: crate::Feed
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum FeedError {
    #[error("Feed is no longer reachable")]
    Disconnected,
    #[error("Feed has been shut down")]
    Shutdown,
    #[error("Broker error: {0}")]
    Broker(String),
}

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum BodyError {
    #[error("Expected a bytes body, found a {found} body")]
    NotBytes { found: &'static str },
}

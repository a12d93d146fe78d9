/// Per-consumer settings, supplied when a [`Consumer`] is created.
///
/// [`Consumer`]: crate::Consumer
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Close the consumer when it is dropped while still open. When disabled, dropping an open
    /// consumer leaves its subscription attached to the feed.
    pub close_on_drop: bool,

    /// Name attached to the consumer's log events.
    pub label: Option<String>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        ConsumerConfig { close_on_drop: true, label: None }
    }
}

impl ConsumerConfig {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_close_on_drop(mut self, close_on_drop: bool) -> Self {
        self.close_on_drop = close_on_drop;
        self
    }
}

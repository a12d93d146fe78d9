use crate::{Destination, FeedError, Message};

mod memory;

pub use memory::MemoryFeed;

/// The source of messages a [`Consumer`] pulls from.
///
/// A feed is shared between every consumer of every destination it serves, so all methods take
/// `&self` and implementations are responsible for their own synchronization. Per destination,
/// messages must be handed out in the order they became available.
///
/// [`Consumer`]: crate::Consumer
pub trait Feed: Send + Sync + 'static {
    /// Takes the next available message without waiting. Returns `Ok(None)` if there is none.
    fn poll_once(&self, destination: &Destination) -> Result<Option<Message>, FeedError>;

    /// Waits for the next message until `deadline` (or forever if [`None`]), returning `Ok(None)`
    /// once the deadline has passed.
    ///
    /// The returned future must be cancel safe: a consumer drops it when closed or released
    /// mid-wait, and no message may be lost when that happens.
    fn wait_for_message(
        &self,
        destination: &Destination,
        deadline: Option<tokio::time::Instant>,
    ) -> impl Future<Output = Result<Option<Message>, FeedError>> + Send;

    /// Destroys the subscription a consumer held on `destination`.
    fn teardown(&self, destination: &Destination) -> Result<(), FeedError>;

    /// Detaches a consumer from `destination` while keeping undelivered messages for whoever
    /// attaches next.
    fn detach(&self, destination: &Destination) -> Result<(), FeedError>;
}

use crate::macros::*;
use crate::sync::*;
use crate::{Consumer, ConsumerConfig, Destination, Feed, FeedError, Message, MessageId};

/// An in-process [`Feed`] keeping one FIFO per destination.
///
/// - Queues retain messages until some consumer receives them, whether or not anyone is
///   subscribed.
/// - A topic behaves as a single shared, non-durable subscription: each message goes to one of
///   the attached consumers, messages published while nobody is subscribed are dropped, and
///   undelivered messages are discarded once the last subscriber is torn down. A subscriber which
///   is only detached keeps them around for the next one.
///
/// ```rust
/// # #[tokio::main]
/// # async fn main() {
/// use mq_consumer::{ConsumerConfig, Destination, MemoryFeed, Message};
///
/// let feed = std::sync::Arc::new(MemoryFeed::new());
/// let orders = Destination::queue("orders");
/// let consumer = feed.subscribe(orders.clone(), ConsumerConfig::default());
///
/// feed.publish(&orders, Message::bytes(&b"order-1"[..])).unwrap();
///
/// let body = consumer.receive_bytes_body(100).await.unwrap();
/// assert_eq!(body.as_deref(), Some(&b"order-1"[..]));
/// # }
/// ```
pub struct MemoryFeed {
    slots: std::sync::Mutex<std::collections::HashMap<Destination, std::sync::Arc<Slot>>>,
    next_id: std::sync::atomic::AtomicU64,
    shutdown: std::sync::atomic::AtomicBool,
}

struct Slot {
    queue: std::sync::Mutex<std::collections::VecDeque<Message>>,
    subscribers: std::sync::atomic::AtomicUsize,
    waker: Notify,
}

impl Default for MemoryFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl std::fmt::Debug for MemoryFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = lock(&self.slots);
        let mut dbg = f.debug_map();
        for (destination, slot) in slots.iter() {
            dbg.entry(&destination.to_string(), &(slot.len(), slot.subscriber_count()));
        }
        dbg.finish()
    }
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self {
            slots: Default::default(),
            next_id: std::sync::atomic::AtomicU64::new(1),
            shutdown: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Creates a [`Consumer`] attached to `destination`. The consumer only holds a weak reference
    /// to the feed: once every [`Arc`] to it is gone, receives fail with
    /// [`FeedError::Disconnected`].
    ///
    /// [`Arc`]: std::sync::Arc
    #[cfg_attr(any(test, feature = "trace"), tracing::instrument(skip(self, config)))]
    pub fn subscribe(self: &std::sync::Arc<Self>, destination: Destination, config: ConsumerConfig) -> Consumer<Self> {
        let slot = self.slot(&destination);
        let subscribers = slot.subscribers.fetch_add(1, std::sync::atomic::Ordering::AcqRel) + 1;
        debug!(subscribers, "Subscriber attached");

        Consumer::new(std::sync::Arc::downgrade(self), destination, config)
    }

    /// Makes `message` available on `destination`, waking any consumer waiting on it.
    #[cfg_attr(any(test, feature = "trace"), tracing::instrument(skip(self, message)))]
    pub fn publish(&self, destination: &Destination, message: Message) -> Result<MessageId, FeedError> {
        self.check_running()?;

        let id = MessageId(self.next_id.fetch_add(1, std::sync::atomic::Ordering::AcqRel));
        let slot = self.slot(destination);

        if destination.is_topic() && slot.subscriber_count() == 0 {
            debug!(%id, "No subscriber on topic, dropping message");
            return Ok(id);
        }

        lock(&slot.queue).push_back(message.stamp(id, destination.clone()));
        debug!(%id, "Message published");
        slot.waker.notify_waiters();

        Ok(id)
    }

    /// Number of messages waiting to be received on `destination`.
    pub fn pending(&self, destination: &Destination) -> usize {
        lock(&self.slots).get(destination).map(|slot| slot.len()).unwrap_or(0)
    }

    /// Number of consumers currently attached to `destination`.
    pub fn subscribers(&self, destination: &Destination) -> usize {
        lock(&self.slots).get(destination).map(|slot| slot.subscriber_count()).unwrap_or(0)
    }

    /// Puts the feed in a failed state: every subsequent call, including waits already in
    /// progress, reports [`FeedError::Shutdown`].
    #[cfg_attr(any(test, feature = "trace"), tracing::instrument(skip(self)))]
    pub fn shutdown(&self) {
        warn!("Shutting down feed");
        self.shutdown.store(true, std::sync::atomic::Ordering::Release);
        for slot in lock(&self.slots).values() {
            slot.waker.notify_waiters();
        }
    }

    fn check_running(&self) -> Result<(), FeedError> {
        if self.shutdown.load(std::sync::atomic::Ordering::Acquire) { Err(FeedError::Shutdown) } else { Ok(()) }
    }

    fn slot(&self, destination: &Destination) -> std::sync::Arc<Slot> {
        let mut slots = lock(&self.slots);
        let slot = slots.entry(destination.clone()).or_insert_with(|| std::sync::Arc::new(Slot::new()));
        std::sync::Arc::clone(slot)
    }

    fn pop(&self, slot: &Slot) -> Result<Option<Message>, FeedError> {
        self.check_running()?;
        Ok(lock(&slot.queue).pop_front())
    }

    fn unsubscribe(&self, destination: &Destination) -> Result<usize, FeedError> {
        let slot = lock(&self.slots).get(destination).cloned().ok_or(FeedError::Disconnected)?;
        match slot.subscribers.fetch_update(
            std::sync::atomic::Ordering::AcqRel,
            std::sync::atomic::Ordering::Acquire,
            |n| n.checked_sub(1),
        ) {
            Ok(prev) => Ok(prev - 1),
            Err(_) => {
                error!(%destination, "Unsubscribing from a destination with no subscriber");
                Err(FeedError::Broker(format!("no subscriber attached to {destination}")))
            }
        }
    }
}

impl Slot {
    fn new() -> Self {
        Self { queue: Default::default(), subscribers: std::sync::atomic::AtomicUsize::new(0), waker: Notify::new() }
    }

    fn len(&self) -> usize {
        lock(&self.queue).len()
    }

    fn subscriber_count(&self) -> usize {
        self.subscribers.load(std::sync::atomic::Ordering::Acquire)
    }
}

impl Feed for MemoryFeed {
    fn poll_once(&self, destination: &Destination) -> Result<Option<Message>, FeedError> {
        let slot = self.slot(destination);
        self.pop(&slot)
    }

    #[cfg_attr(any(test, feature = "trace"), tracing::instrument(skip(self)))]
    async fn wait_for_message(
        &self,
        destination: &Destination,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<Option<Message>, FeedError> {
        let slot = self.slot(destination);
        loop {
            // Registered before popping so a publish landing in between still wakes us up.
            let notified = slot.waker.notified();
            let mut notified = std::pin::pin!(notified);
            notified.as_mut().enable();

            if let Some(message) = self.pop(&slot)? {
                debug!(id = %message.id(), "Received message");
                break Ok(Some(message));
            }

            debug!("Waiting for a publish");
            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        debug!("Deadline reached");
                        break Ok(None);
                    }
                }
                None => notified.await,
            }
            debug!("A publish was detected");
        }
    }

    #[cfg_attr(any(test, feature = "trace"), tracing::instrument(skip(self)))]
    fn teardown(&self, destination: &Destination) -> Result<(), FeedError> {
        let remaining = self.unsubscribe(destination)?;
        if destination.is_topic() && remaining == 0 {
            let slot = self.slot(destination);
            let mut queue = lock(&slot.queue);
            debug!(dropped = queue.len(), "Last subscriber gone, discarding topic messages");
            queue.clear();
        }
        Ok(())
    }

    #[cfg_attr(any(test, feature = "trace"), tracing::instrument(skip(self)))]
    fn detach(&self, destination: &Destination) -> Result<(), FeedError> {
        let remaining = self.unsubscribe(destination)?;
        debug!(remaining, "Subscriber detached");
        Ok(())
    }
}

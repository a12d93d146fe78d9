//! `mq-consumer` is the receiving side of a message queue client: a [`Consumer`] pulls messages
//! from a single queue or topic of a [`Feed`], either waiting for them or not, and optionally hands
//! back their body as raw bytes.
//!
//! # Usage
//!
//! A consumer is created by a feed for a given [`Destination`]. [`MemoryFeed`] is an in-process
//! feed which is enough to get started:
//!
//! ```rust
//! use mq_consumer::{ConsumerConfig, Destination, MemoryFeed, Message};
//!
//! #[tokio::main]
//! async fn main() {
//!     let feed = std::sync::Arc::new(MemoryFeed::new());
//!     let queue = Destination::queue("jobs");
//!     let consumer = feed.subscribe(queue.clone(), ConsumerConfig::default());
//!
//!     for i in 0..3u8 {
//!         feed.publish(&queue, Message::bytes(vec![i])).unwrap();
//!     }
//!
//!     for i in 0..3u8 {
//!         // Waits for up to 100ms. Zero or less would wait indefinitely.
//!         assert_eq!(consumer.receive_bytes_body(100).await.unwrap().as_deref(), Some(&[i][..]));
//!     }
//!
//!     // Timing out is not an error, there just isn't a message.
//!     assert!(consumer.receive(10).await.unwrap().is_none());
//!     assert!(consumer.receive_no_wait().unwrap().is_none());
//!
//!     consumer.close();
//! }
//! ```
//!
//! # Receiving
//!
//! There are four receive operations, all built on top of [`Consumer::receive_with`]:
//!
//! | operation                                      | waits                      | returns                 |
//! |------------------------------------------------|----------------------------|-------------------------|
//! | [`receive_no_wait`]                            | never                      | [`Message`]             |
//! | [`receive`]`(wait_millis)`                     | up to `wait_millis`        | [`Message`]             |
//! | [`receive_bytes_body_no_wait`]                 | never                      | [`Bytes`]               |
//! | [`receive_bytes_body`]`(wait_millis)`          | up to `wait_millis`        | [`Bytes`]               |
//!
//! A `wait_millis` of zero or less waits until a message arrives or the consumer is closed or
//! released. Waiting only ever suspends the calling task.
//!
//! Results are always `Result<Option<_>, ConsumerError>`. `Ok(None)` means there was no message,
//! which is different from `Ok(Some(Bytes::new()))`: a message with an empty body.
//!
//! # Closing and releasing
//!
//! [`close`] tears down the subscription held by the feed for this consumer. [`release`] only
//! detaches from it, so undelivered messages can be picked up by another consumer later on. Both
//! can be called from any task, wake up a receive which is currently waiting, and never fail.
//! Once closed, every receive fails with [`ConsumerError::Closed`]; once released, with
//! [`ConsumerError::Released`].
//!
//! # Testing
//!
//! Besides unit tests, the lifecycle state machine is model checked with [`loom`] and the consumer
//! is tested against a reference FIFO under random operation sequences with [`proptest`]:
//!
//! ```bash
//! cargo test --lib state --release --features loom
//! cargo test --lib consumer_proptest --release --features proptest
//! ```
//!
//! Logs are only emitted in tests, or with the `trace` feature enabled.
//!
//! [`receive_no_wait`]: Consumer::receive_no_wait
//! [`receive`]: Consumer::receive
//! [`receive_bytes_body_no_wait`]: Consumer::receive_bytes_body_no_wait
//! [`receive_bytes_body`]: Consumer::receive_bytes_body
//! [`close`]: Consumer::close
//! [`release`]: Consumer::release
//! [`Bytes`]: bytes::Bytes
//! [`loom`]: https://docs.rs/loom
//! [`proptest`]: https://docs.rs/proptest

mod config;
mod consumer;
mod destination;
mod error;
mod feed;
mod macros;
mod message;
mod state;
mod sync;
mod wait;

#[cfg(test)]
mod common;

pub use config::ConsumerConfig;
pub use consumer::Consumer;
pub use destination::Destination;
pub use error::{BodyError, ConsumerError, FeedError};
pub use feed::{Feed, MemoryFeed};
pub use message::{Body, Message, MessageId};
pub use state::ConsumerState;
pub use wait::WaitPolicy;

pub(crate) use state::StateCell;

use crate::macros::*;
use crate::sync::*;
use crate::{ConsumerConfig, ConsumerError, ConsumerState, Destination, Feed, Message, StateCell, WaitPolicy};

/// A handle receiving messages from a single [`Destination`] of a [`Feed`].
///
/// Every receive variant goes through [`receive_with`], which differs only in how long it is
/// allowed to wait. The bytes variants then extract the body of whatever was received.
///
/// # Lifecycle
///
/// A consumer starts open and ends either [released] or [closed]. Both are permanent for the
/// instance and both wake up any receive currently waiting on it, from whichever task they are
/// called. After that:
///
/// - every receive on a closed consumer fails with [`ConsumerError::Closed`],
/// - every receive on a released consumer fails with [`ConsumerError::Released`].
///
/// Neither `close` nor `release` can fail: faults raised by the feed while cleaning up are logged
/// and dropped.
///
/// [`receive_with`]: Self::receive_with
/// [released]: Self::release
/// [closed]: Self::close
pub struct Consumer<F: Feed> {
    feed: std::sync::Weak<F>,
    destination: Destination,
    state: StateCell,
    shutdown: Shutdown,
    config: ConsumerConfig,
}

#[cfg(test)]
impl<F: Feed> std::fmt::Debug for Consumer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("destination", &self.destination)
            .field("state", &self.state.get())
            .field("label", &self.config.label)
            .finish()
    }
}

impl<F: Feed> Drop for Consumer<F> {
    fn drop(&mut self) {
        if self.config.close_on_drop && self.is_open() {
            warn!(destination = %self.destination, label = ?self.config.label, "Closing consumer on drop");
            self.close();
        }
    }
}

impl<F: Feed> Consumer<F> {
    /// Binds a consumer to `destination`. The feed is expected to already count it as a
    /// subscriber, see [`MemoryFeed::subscribe`].
    ///
    /// [`MemoryFeed::subscribe`]: crate::MemoryFeed::subscribe
    pub fn new(feed: std::sync::Weak<F>, destination: Destination, config: ConsumerConfig) -> Self {
        Self { feed, destination, state: StateCell::new(), shutdown: Shutdown::new(), config }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn state(&self) -> ConsumerState {
        self.state.get()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConsumerState::Open
    }

    /// Receives the next message if one is immediately available. Never suspends.
    pub fn receive_no_wait(&self) -> Result<Option<Message>, ConsumerError> {
        self.poll()
    }

    /// Receives the next message, waiting up to `wait_millis` milliseconds for one. Zero or less
    /// waits until a message arrives or the consumer is closed or released.
    pub async fn receive(&self, wait_millis: i32) -> Result<Option<Message>, ConsumerError> {
        self.receive_with(WaitPolicy::from_millis(wait_millis)).await
    }

    /// Same as [`receive_no_wait`] but returns the message body as bytes.
    ///
    /// [`receive_no_wait`]: Self::receive_no_wait
    pub fn receive_bytes_body_no_wait(&self) -> Result<Option<bytes::Bytes>, ConsumerError> {
        Self::body_bytes(self.poll()?)
    }

    /// Same as [`receive`] but returns the message body as bytes.
    ///
    /// [`receive`]: Self::receive
    pub async fn receive_bytes_body(&self, wait_millis: i32) -> Result<Option<bytes::Bytes>, ConsumerError> {
        Self::body_bytes(self.receive(wait_millis).await?)
    }

    /// Receives the next message according to `policy`.
    ///
    /// `Ok(None)` means no message was available within the allowed time. Closing or releasing the
    /// consumer while this is waiting makes it return right away with the matching error.
    #[cfg_attr(any(test, feature = "trace"), tracing::instrument(skip(self), fields(destination = %self.destination)))]
    pub async fn receive_with(&self, policy: WaitPolicy) -> Result<Option<Message>, ConsumerError> {
        if policy == WaitPolicy::NoWait {
            return self.poll();
        }

        // Armed before checking the state, or a close landing right after the check is missed.
        let shutdown = self.shutdown.arm();
        self.check_open()?;
        let feed = self.feed()?;

        let deadline = policy.deadline(tokio::time::Instant::now());
        let wait = async {
            match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, feed.wait_for_message(&self.destination, Some(deadline)))
                    .await
                    .unwrap_or(Ok(None)),
                None => feed.wait_for_message(&self.destination, None).await,
            }
        };

        debug!(?deadline, "Waiting for a message");
        tokio::select! {
            biased;
            _ = shutdown => {
                debug!(state = %self.state(), "Consumer shut down while waiting");
                Err(self.state_error())
            }
            res = wait => {
                let message = res?;
                debug!(id = ?message.as_ref().map(Message::id), "Wait over");
                Ok(message)
            }
        }
    }

    /// Detaches this consumer from the feed. Undelivered messages stay with the feed for another
    /// consumer to pick up. Has no effect on a consumer which is already released or closed.
    #[cfg_attr(any(test, feature = "trace"), tracing::instrument(skip(self), fields(destination = %self.destination)))]
    pub fn release(&self) {
        if self.state.transition(ConsumerState::Released).is_none() {
            return;
        }
        self.shutdown.notify_waiters();

        match self.feed.upgrade() {
            Some(feed) => {
                if let Err(err) = feed.detach(&self.destination) {
                    warn!(%err, "Failed to detach consumer, ignoring");
                }
            }
            None => {
                debug!("Feed already dropped, nothing to detach");
            }
        }
    }

    /// Closes this consumer, freeing whatever the feed held on its behalf. Has no effect on a
    /// consumer which is already closed.
    ///
    /// A released consumer can still be closed, which only updates its state: it gave up its
    /// subscription when it was released.
    #[cfg_attr(any(test, feature = "trace"), tracing::instrument(skip(self), fields(destination = %self.destination)))]
    pub fn close(&self) {
        let Some(prev) = self.state.transition(ConsumerState::Closed) else {
            return;
        };
        self.shutdown.notify_waiters();

        if prev == ConsumerState::Released {
            debug!("Consumer was released, skipping teardown");
            return;
        }

        match self.feed.upgrade() {
            Some(feed) => {
                if let Err(err) = feed.teardown(&self.destination) {
                    warn!(%err, "Failed to tear down consumer, ignoring");
                }
            }
            None => {
                debug!("Feed already dropped, nothing to tear down");
            }
        }
    }

    fn poll(&self) -> Result<Option<Message>, ConsumerError> {
        self.check_open()?;
        let message = self.feed()?.poll_once(&self.destination)?;
        debug!(destination = %self.destination, received = message.is_some(), "Polled feed");
        Ok(message)
    }

    fn body_bytes(message: Option<Message>) -> Result<Option<bytes::Bytes>, ConsumerError> {
        match message {
            Some(message) => Ok(Some(message.into_bytes()?)),
            None => Ok(None),
        }
    }

    fn check_open(&self) -> Result<(), ConsumerError> {
        match self.state() {
            ConsumerState::Open => Ok(()),
            _ => Err(self.state_error()),
        }
    }

    fn state_error(&self) -> ConsumerError {
        match self.state() {
            ConsumerState::Released => ConsumerError::Released,
            _ => ConsumerError::Closed,
        }
    }

    fn feed(&self) -> Result<std::sync::Arc<F>, ConsumerError> {
        self.feed.upgrade().ok_or(ConsumerError::Transport(crate::FeedError::Disconnected))
    }
}


/// State machine tests with [proptest]: random sequences of publishes, receives, releases and
/// closes are run against a consumer and checked against a plain FIFO reference.
#[cfg(all(test, feature = "proptest", not(feature = "loom")))]
mod proptesting {
    use super::*;
    use crate::MemoryFeed;
    use proptest::prelude::*;
    use proptest_state_machine::*;

    prop_state_machine! {
        #![proptest_config(ProptestConfig {
            // The number of tests which need to be valid for this to pass.
            cases: 512,
            // Max duration (in milliseconds) for each generated case.
            timeout: 5_000,
            ..Default::default()
        })]

        #[test]
        fn consumer_proptest(sequential 1..128 => SystemUnderTest);
    }

    struct SystemUnderTest {
        runtime: tokio::runtime::Runtime,
        feed: std::sync::Arc<MemoryFeed>,
        consumer: Consumer<MemoryFeed>,
    }

    #[derive(Clone, Debug)]
    struct Reference {
        pending: std::collections::VecDeque<u32>,
        received: Option<u32>,
        state: ConsumerState,
    }

    #[derive(Clone, Debug)]
    enum Transition {
        Publish(u32),
        ReceiveNoWait,
        Receive,
        ReceiveBytes,
        Release,
        Close,
    }

    fn destination() -> Destination {
        Destination::queue("proptest")
    }

    impl ReferenceStateMachine for Reference {
        type State = Self;
        type Transition = Transition;

        fn init_state() -> BoxedStrategy<Self::State> {
            Just(Self { pending: Default::default(), received: None, state: ConsumerState::Open }).boxed()
        }

        fn transitions(_: &Self::State) -> BoxedStrategy<Self::Transition> {
            prop_oneof![
                6 => any::<u32>().prop_map(Transition::Publish),
                3 => Just(Transition::ReceiveNoWait),
                3 => Just(Transition::Receive),
                3 => Just(Transition::ReceiveBytes),
                1 => Just(Transition::Release),
                1 => Just(Transition::Close),
            ]
            .boxed()
        }

        fn apply(mut state: Self::State, transition: &Self::Transition) -> Self::State {
            match transition {
                Transition::Publish(elem) => state.pending.push_back(*elem),
                Transition::ReceiveNoWait | Transition::Receive | Transition::ReceiveBytes => {
                    state.received = match state.state {
                        ConsumerState::Open => state.pending.pop_front(),
                        _ => None,
                    };
                }
                Transition::Release => {
                    if state.state == ConsumerState::Open {
                        state.state = ConsumerState::Released;
                    }
                }
                Transition::Close => state.state = ConsumerState::Closed,
            }
            state
        }
    }

    impl StateMachineTest for SystemUnderTest {
        type SystemUnderTest = Self;
        type Reference = Reference;

        fn init_test(_: &<Self::Reference as ReferenceStateMachine>::State) -> Self::SystemUnderTest {
            let runtime =
                tokio::runtime::Builder::new_current_thread().enable_time().build().expect("Failed to build runtime");
            let feed = std::sync::Arc::new(MemoryFeed::new());
            let consumer = feed.subscribe(destination(), ConsumerConfig::default());
            Self { runtime, feed, consumer }
        }

        fn apply(
            state: Self::SystemUnderTest,
            ref_state: &<Self::Reference as ReferenceStateMachine>::State,
            transition: <Self::Reference as ReferenceStateMachine>::Transition,
        ) -> Self::SystemUnderTest {
            // `ref_state` is the state *after* the transition.
            match transition {
                Transition::Publish(elem) => {
                    state.feed.publish(&destination(), Message::bytes(elem.to_be_bytes().to_vec())).unwrap();
                }
                Transition::ReceiveNoWait => {
                    let res = state.consumer.receive_no_wait();
                    check_message(res.map(|m| m.map(|m| m.into_bytes().unwrap())), &state, ref_state);
                }
                Transition::Receive => {
                    let res = state.runtime.block_on(state.consumer.receive(5));
                    check_message(res.map(|m| m.map(|m| m.into_bytes().unwrap())), &state, ref_state);
                }
                Transition::ReceiveBytes => {
                    let res = state.runtime.block_on(state.consumer.receive_bytes_body(5));
                    check_message(res, &state, ref_state);
                }
                Transition::Release => state.consumer.release(),
                Transition::Close => state.consumer.close(),
            }
            state
        }

        fn check_invariants(state: &Self::SystemUnderTest, ref_state: &<Self::Reference as ReferenceStateMachine>::State) {
            assert_eq!(state.consumer.state(), ref_state.state);
            assert_eq!(state.feed.pending(&destination()), ref_state.pending.len());
        }
    }

    fn check_message(res: Result<Option<bytes::Bytes>, ConsumerError>, state: &SystemUnderTest, ref_state: &Reference) {
        match ref_state.state {
            ConsumerState::Open => {
                let received = res
                    .expect("Receive failed on open consumer")
                    .map(|bytes| u32::from_be_bytes(bytes[..].try_into().expect("Unexpected body length")));
                assert_eq!(received, ref_state.received, "Wrong message received, feed is {:#?}", state.feed);
            }
            ConsumerState::Released => assert_matches::assert_matches!(res, Err(ConsumerError::Released)),
            ConsumerState::Closed => assert_matches::assert_matches!(res, Err(ConsumerError::Closed)),
        }
    }
}

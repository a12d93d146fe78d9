use crate::macros::*;
use crate::sync::*;

/// Lifecycle of a [`Consumer`] instance.
///
/// ```text
///          release            close
///   Open ───────────▶ Released ──────▶ Closed
///     │                                  ▲
///     └──────────────────────────────────┘
///                     close
/// ```
///
/// Both `Released` and `Closed` are end-of-life for the instance: neither will deliver a message
/// again. They only differ in what happens to the subscription held by the feed.
///
/// [`Consumer`]: crate::Consumer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConsumerState {
    Open = 0,
    Released = 1,
    Closed = 2,
}

impl ConsumerState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Open,
            1 => Self::Released,
            _ => Self::Closed,
        }
    }

    fn can_become(self, next: Self) -> bool {
        matches!((self, next), (Self::Open, Self::Released) | (Self::Open, Self::Closed) | (Self::Released, Self::Closed))
    }
}

impl std::fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Released => write!(f, "released"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// An atomic [`ConsumerState`], safe to read while a receive is in flight on another task.
pub(crate) struct StateCell(sync::atomic::AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(sync::atomic::AtomicU8::new(ConsumerState::Open as u8))
    }

    pub(crate) fn get(&self) -> ConsumerState {
        ConsumerState::from_raw(self.0.load(sync::atomic::Ordering::Acquire))
    }

    /// Moves to `next` if that is a legal transition from the current state, returning the state
    /// which was replaced. Exactly one caller observes `Some` for a given transition, so it alone
    /// gets to perform the associated side effect.
    pub(crate) fn transition(&self, next: ConsumerState) -> Option<ConsumerState> {
        let mut raw = self.0.load(sync::atomic::Ordering::Acquire);
        loop {
            let prev = ConsumerState::from_raw(raw);
            if !prev.can_become(next) {
                debug!(%prev, %next, "Ignoring state transition");
                break None;
            }

            match self.0.compare_exchange(
                raw,
                next as u8,
                sync::atomic::Ordering::AcqRel,
                sync::atomic::Ordering::Acquire,
            ) {
                Ok(_) => {
                    debug!(%prev, %next, "Consumer state updated");
                    break Some(prev);
                }
                Err(actual) => {
                    debug!(actual, "Inter-thread update on consumer state, trying again");
                    raw = actual;
                }
            }
        }
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod test {
    use super::*;

    #[rstest::rstest]
    #[case::release(ConsumerState::Released)]
    #[case::close(ConsumerState::Closed)]
    fn leaves_open_once(#[case] next: ConsumerState) {
        let state = StateCell::new();
        assert_eq!(state.get(), ConsumerState::Open);

        assert_eq!(state.transition(next), Some(ConsumerState::Open));
        assert_eq!(state.transition(next), None);
        assert_eq!(state.get(), next);
    }

    #[test]
    fn closed_is_terminal() {
        let state = StateCell::new();
        assert_eq!(state.transition(ConsumerState::Closed), Some(ConsumerState::Open));
        assert_eq!(state.transition(ConsumerState::Released), None);
        assert_eq!(state.transition(ConsumerState::Open), None);
        assert_eq!(state.get(), ConsumerState::Closed);
    }

    #[test]
    fn released_can_be_closed() {
        let state = StateCell::new();
        assert_eq!(state.transition(ConsumerState::Released), Some(ConsumerState::Open));
        assert_eq!(state.transition(ConsumerState::Closed), Some(ConsumerState::Released));
        assert_eq!(state.get(), ConsumerState::Closed);
    }
}

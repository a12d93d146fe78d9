/// How long a receive is allowed to suspend the calling task before reporting that no message is
/// available.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Poll the feed exactly once and never suspend.
    NoWait,
    /// Wait until a message arrives or the consumer is closed or released.
    Indefinite,
    /// Wait up to the given duration. Running out of time is not an error.
    Timeout(std::time::Duration),
}

impl WaitPolicy {
    /// Maps a millisecond wait onto a policy. Zero or less waits indefinitely, for every timed
    /// receive operation.
    pub fn from_millis(wait_millis: i32) -> Self {
        if wait_millis <= 0 {
            Self::Indefinite
        } else {
            Self::Timeout(std::time::Duration::from_millis(wait_millis as u64))
        }
    }

    /// The instant past which the receive gives up, or [`None`] if it never does.
    ///
    /// [`NoWait`] expires immediately.
    ///
    /// [`NoWait`]: Self::NoWait
    pub fn deadline(&self, now: tokio::time::Instant) -> Option<tokio::time::Instant> {
        match self {
            Self::NoWait => Some(now),
            Self::Indefinite => None,
            Self::Timeout(timeout) => Some(now + *timeout),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[rstest::rstest]
    #[case::zero(0, WaitPolicy::Indefinite)]
    #[case::negative(-1, WaitPolicy::Indefinite)]
    #[case::min(i32::MIN, WaitPolicy::Indefinite)]
    #[case::one(1, WaitPolicy::Timeout(std::time::Duration::from_millis(1)))]
    #[case::max(i32::MAX, WaitPolicy::Timeout(std::time::Duration::from_millis(i32::MAX as u64)))]
    fn from_millis(#[case] wait_millis: i32, #[case] expected: WaitPolicy) {
        assert_eq!(WaitPolicy::from_millis(wait_millis), expected);
    }

    #[test]
    fn deadline() {
        let now = tokio::time::Instant::now();
        assert_eq!(WaitPolicy::NoWait.deadline(now), Some(now));
        assert_eq!(WaitPolicy::Indefinite.deadline(now), None);
        assert_eq!(
            WaitPolicy::from_millis(50).deadline(now),
            Some(now + std::time::Duration::from_millis(50))
        );
    }
}

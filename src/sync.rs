#[cfg(feature = "loom")]
pub(crate) use loom::sync;

#[cfg(not(feature = "loom"))]
pub(crate) use std::sync;

pub(crate) use tokio::sync::Notify;

/// Wakes every receive currently suspended on a [`Consumer`] once it leaves the open state.
///
/// A receive must [`arm`] its wake-up future *before* it checks the consumer state, otherwise a
/// close happening between the check and the wait would go unnoticed.
///
/// [`Consumer`]: crate::Consumer
/// [`arm`]: Shutdown::arm
pub(crate) struct Shutdown(Notify);

impl Shutdown {
    pub(crate) fn new() -> Self {
        Self(Notify::new())
    }

    pub(crate) fn notify_waiters(&self) {
        self.0.notify_waiters();
    }

    /// Registers interest in the next [`notify_waiters`] call. The returned future resolves as
    /// soon as the consumer is closed or released, even if that happened before it was polled.
    ///
    /// [`notify_waiters`]: Self::notify_waiters
    pub(crate) fn arm(&self) -> std::pin::Pin<Box<tokio::sync::futures::Notified<'_>>> {
        let mut notified = Box::pin(self.0.notified());
        notified.as_mut().enable();
        notified
    }
}

/// Locks a std mutex, recovering the guard if a previous holder panicked. Guarded data is never
/// left half-updated across a panic point.
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

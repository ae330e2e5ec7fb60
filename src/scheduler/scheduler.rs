use std::time::Duration;
use tokio::task::JoinHandle;

/// Callback to run once a scheduled delay has elapsed.
pub type TickFn = Box<dyn FnOnce() + Send>;

/// The one capability the timer needs from its event loop: run a callback
/// later, and cancel it by handle.
///
/// Cancelling a handle whose callback has already run (or is in flight) is a
/// no-op, never an error. A superseded callback that slips through is
/// tolerated and overridden by newer state, not chased down.
pub trait Scheduler {
    type Handle;

    fn schedule(&mut self, delay: Duration, callback: TickFn) -> Self::Handle;
    fn cancel(&mut self, handle: Self::Handle);
}

/// Production scheduler: one spawned task per pending callback.
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    type Handle = JoinHandle<()>;

    fn schedule(&mut self, delay: Duration, callback: TickFn) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        })
    }

    fn cancel(&mut self, handle: JoinHandle<()>) {
        // Aborting a finished task does nothing, which is exactly the
        // cancellation contract.
        handle.abort();
    }
}

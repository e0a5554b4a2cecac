//! Cancellable repeating background task.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Handle to a running poll loop. Dropping it cancels the loop.
pub struct PollHandle {
    name: &'static str,
    cancel: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Stop scheduling ticks and drop any tick still awaiting a response.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            debug!(poller = self.name, "poller cancelled");
        }
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the loop to exit after [`cancel`](Self::cancel).
    #[cfg(test)]
    pub async fn join(mut self) {
        self.cancel();
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Run `tick` every `every`, first after one full period.
///
/// Each tick races the cancellation token: a tick whose response arrives
/// after `cancel()` is dropped before it can apply anything. The token is
/// also handed to `tick` for checks between awaits.
pub fn spawn_poller<F, Fut>(name: &'static str, every: Duration, mut tick: F) -> PollHandle
where
    F: FnMut(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let join = tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + every, every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {}
            }
            trace!(poller = name, "tick");
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tick(token.clone()) => {}
            }
        }
        debug!(poller = name, "poller stopped");
    });
    PollHandle {
        name,
        cancel,
        join: Some(join),
    }
}

//! Tracks work known to the engine but not yet finished.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Counts outstanding units of work and signals drain.
///
/// Every unit calls [`add`] before it is enqueued and [`done`] when it
/// reaches a terminal state, so the count observed externally never goes
/// below zero. [`wait`] resolves only once the count has returned to zero
/// after at least one `add` — a freshly built counter never reports drain,
/// otherwise an empty queue would close before the first start URL lands.
///
/// [`add`]: InFlight::add
/// [`done`]: InFlight::done
/// [`wait`]: InFlight::wait
#[derive(Clone, Default)]
pub struct InFlight {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    drained: Notify,
}

#[derive(Default)]
struct State {
    count: usize,
    started: bool,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new unit of work. Must precede the unit's enqueue.
    pub fn add(&self) {
        let mut state = self.inner.state.lock();
        state.count += 1;
        state.started = true;
    }

    /// Marks one unit of work as finished.
    pub fn done(&self) {
        let drained = {
            let mut state = self.inner.state.lock();
            state.count = state.count.saturating_sub(1);
            state.started && state.count == 0
        };
        if drained {
            self.inner.drained.notify_waiters();
        }
    }

    pub fn count(&self) -> usize {
        self.inner.state.lock().count
    }

    /// Blocks until the count has reached zero after at least one `add`.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.drained.notified();
            {
                let state = self.inner.state.lock();
                if state.started && state.count == 0 {
                    return;
                }
            }
            notified.await;
        }
    }
}

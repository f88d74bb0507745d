use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Fixed-interval trigger for a panel. Fires `tick` immediately on spawn and
/// again every `period`. `tick` is expected to spawn its own fetch task, so a
/// slow fetch never delays the next fire and fetches may overlap; completions
/// settle in whatever order the network delivers them.
///
/// Stopping (or dropping) the poller aborts the timer loop. In-flight fetch
/// tasks keep running to completion, but panels guard their state behind a
/// `Weak` reference so a completion after teardown writes nothing.
pub struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    pub fn spawn<F>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                tick();
            }
        });
        Self { handle }
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

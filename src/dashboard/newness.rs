use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

pub const HIGHLIGHT_STAGGER: Duration = Duration::from_millis(500);
pub const HIGHLIGHT_DURATION: Duration = Duration::from_millis(4000);

/// Tracks which token addresses appeared for the first time in the latest
/// poll and keeps a transient highlight on each one.
///
/// The very first poll never highlights anything: with no previous set to
/// diff against, everything would flash "new" on initial load. Afterwards,
/// each newly appeared address is highlighted after `index * 500ms` (in batch
/// order) and unhighlighted 4000ms later. Every highlight is its own delayed
/// task, so dropping the tracker cancels pending entries without touching
/// ones already shown.
pub struct NewnessTracker {
    previous: HashSet<String>,
    highlighted: Arc<Mutex<HashSet<String>>>,
    tasks: Vec<JoinHandle<()>>,
}

impl NewnessTracker {
    pub fn new() -> Self {
        Self {
            previous: HashSet::new(),
            highlighted: Arc::new(Mutex::new(HashSet::new())),
            tasks: Vec::new(),
        }
    }

    /// Feeds the address list of a completed poll, in list order. The
    /// previous set is replaced unconditionally, whether or not anything was
    /// highlighted.
    pub fn record_poll(&mut self, addresses: &[String]) {
        self.tasks.retain(|task| !task.is_finished());

        let current: HashSet<String> = addresses.iter().cloned().collect();
        if !self.previous.is_empty() {
            let mut scheduled = HashSet::new();
            let newly: Vec<&String> = addresses
                .iter()
                .filter(|a| !self.previous.contains(*a) && scheduled.insert((*a).clone()))
                .collect();
            for (index, address) in newly.into_iter().enumerate() {
                self.schedule(address.clone(), index);
            }
        }
        self.previous = current;
    }

    fn schedule(&mut self, address: String, index: usize) {
        let highlighted = Arc::downgrade(&self.highlighted);
        let task = tokio::spawn(async move {
            sleep(HIGHLIGHT_STAGGER * index as u32).await;
            match highlighted.upgrade() {
                Some(set) => set.lock().await.insert(address.clone()),
                None => return,
            };
            sleep(HIGHLIGHT_DURATION).await;
            if let Some(set) = highlighted.upgrade() {
                set.lock().await.remove(&address);
            }
        });
        self.tasks.push(task);
    }

    pub async fn is_highlighted(&self, address: &str) -> bool {
        self.highlighted.lock().await.contains(address)
    }

    pub async fn highlighted(&self) -> HashSet<String> {
        self.highlighted.lock().await.clone()
    }
}

impl Default for NewnessTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NewnessTracker {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addrs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn first_poll_never_highlights() {
        let mut tracker = NewnessTracker::new();
        tracker.record_poll(&addrs(&["x", "y"]));
        sleep(Duration::from_secs(10)).await;
        assert!(tracker.highlighted().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn new_addresses_highlight_staggered_and_expire() {
        let mut tracker = NewnessTracker::new();
        tracker.record_poll(&addrs(&["x"]));
        tracker.record_poll(&addrs(&["x", "y", "z"]));

        // y fires at 0ms, z at 500ms
        sleep(Duration::from_millis(10)).await;
        assert!(tracker.is_highlighted("y").await);
        assert!(!tracker.is_highlighted("z").await);
        assert!(!tracker.is_highlighted("x").await);

        sleep(Duration::from_millis(500)).await;
        assert!(tracker.is_highlighted("y").await);
        assert!(tracker.is_highlighted("z").await);

        // y expires at 4000ms, z at 4500ms
        sleep(Duration::from_millis(3500)).await;
        assert!(!tracker.is_highlighted("y").await);
        assert!(tracker.is_highlighted("z").await);

        sleep(Duration::from_millis(500)).await;
        assert!(tracker.highlighted().await.is_empty());
        assert!(!tracker.is_highlighted("x").await);
    }

    #[tokio::test(start_paused = true)]
    async fn previous_set_updates_even_when_nothing_is_new() {
        let mut tracker = NewnessTracker::new();
        tracker.record_poll(&addrs(&["x", "y"]));
        tracker.record_poll(&addrs(&["x"]));
        // y dropped out of the list; if it returns it counts as new again
        tracker.record_poll(&addrs(&["x", "y"]));
        sleep(Duration::from_millis(10)).await;
        assert!(tracker.is_highlighted("y").await);
    }
}

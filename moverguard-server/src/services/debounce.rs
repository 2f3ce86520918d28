use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

/// One pending timer per key. A new event for a key replaces its timer, so
/// a burst collapses into a single action `delay` after the last event.
pub struct Debouncer<K> {
    pending: Arc<Mutex<HashMap<K, Pending>>>,
    generation: AtomicU64,
}

impl<K> std::fmt::Debug for Debouncer<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("pending", &self.pending.lock().len())
            .finish()
    }
}

impl<K> Default for Debouncer<K> {
    fn default() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the timer for `key`. Returns true when an earlier
    /// pending timer was reset.
    pub fn trigger<F, Fut>(&self, key: K, delay: Duration, action: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        let mut pending = self.pending.lock();
        let reset = match pending.remove(&key) {
            Some(previous) => {
                previous.handle.abort();
                debug!(?key, "debounce timer reset");
                true
            }
            None => false,
        };

        let registry = Arc::clone(&self.pending);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut pending = registry.lock();
                match pending.get(&task_key) {
                    Some(entry) if entry.generation == generation => {
                        pending.remove(&task_key);
                    }
                    _ => return,
                }
            }
            action().await;
        });
        pending.insert(key, Pending { generation, handle });
        reset
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.lock().contains_key(key)
    }

    pub fn cancel_all(&self) {
        for (_, entry) in self.pending.lock().drain() {
            entry.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting(
        counter: &Arc<AtomicUsize>,
    ) -> impl FnOnce() -> futures::future::Ready<()> + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_into_one_action() {
        let debouncer = Debouncer::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let delay = Duration::from_secs(60);

        assert!(!debouncer.trigger("radarr", delay, counting(&fired)));
        assert!(debouncer.trigger("radarr", delay, counting(&fired)));
        assert!(debouncer.trigger("radarr", delay, counting(&fired)));

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending(&"radarr"));
    }

    #[tokio::test(start_paused = true)]
    async fn new_event_resets_rather_than_stacks() {
        let debouncer = Debouncer::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let delay = Duration::from_secs(60);

        debouncer.trigger("sonarr", delay, counting(&fired));
        tokio::time::sleep(Duration::from_secs(40)).await;
        debouncer.trigger("sonarr", delay, counting(&fired));

        // 80s after the first event, 40s after the second.
        tokio::time::sleep(Duration::from_secs(40)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let debouncer = Debouncer::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let delay = Duration::from_secs(30);

        debouncer.trigger("radarr", delay, counting(&fired));
        debouncer.trigger("sonarr", delay, counting(&fired));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_drops_pending_timers() {
        let debouncer = Debouncer::new();
        let fired = Arc::new(AtomicUsize::new(0));

        debouncer.trigger("radarr", Duration::from_secs(5), counting(&fired));
        debouncer.cancel_all();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}

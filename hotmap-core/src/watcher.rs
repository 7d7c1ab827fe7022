use std::sync::Weak;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::store::HotmapInner;

/// Expiration watcher for a single `set`.
///
/// Waits for either the stop signal or the deadline. A stop signal (or the
/// sender being dropped together with its slot) always wins when both are
/// ready. On deadline the key is removed only if it still belongs to this
/// watcher's generation.
pub(crate) async fn watch(
    target: Weak<HotmapInner>,
    key: String,
    generation: u64,
    deadline: Instant,
    mut stop: oneshot::Receiver<()>,
) {
    tokio::select! {
        biased;

        _ = &mut stop => {
            tracing::trace!(key = %key, generation, "watcher cancelled");
        }
        _ = tokio::time::sleep_until(deadline) => {
            // Dropped store: nothing left to expire.
            if let Some(inner) = target.upgrade() {
                inner.expire(&key, generation);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_watcher_exits_on_stop_signal() {
        let (stop_tx, stop_rx) = oneshot::channel();
        let deadline = Instant::now() + Duration::from_secs(3600);
        let task = tokio::spawn(watch(Weak::new(), "key".to_string(), 0, deadline, stop_rx));

        stop_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("watcher should exit after stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_watcher_exits_when_sender_dropped() {
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let deadline = Instant::now() + Duration::from_secs(3600);
        let task = tokio::spawn(watch(Weak::new(), "key".to_string(), 0, deadline, stop_rx));

        drop(stop_tx);

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("watcher should exit when its slot is dropped")
            .unwrap();
    }

    #[tokio::test]
    async fn test_watcher_exits_at_deadline_without_store() {
        let (_stop_tx, stop_rx) = oneshot::channel();
        let deadline = Instant::now() + Duration::from_millis(10);
        let task = tokio::spawn(watch(Weak::new(), "key".to_string(), 0, deadline, stop_rx));

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("watcher should exit at its deadline")
            .unwrap();
    }

    #[tokio::test]
    async fn test_stop_wins_over_elapsed_deadline() {
        let (stop_tx, stop_rx) = oneshot::channel();
        stop_tx.send(()).unwrap();

        // Both branches are ready on the first poll.
        let deadline = Instant::now() - Duration::from_millis(1);
        tokio::time::timeout(
            Duration::from_secs(1),
            watch(Weak::new(), "key".to_string(), 0, deadline, stop_rx),
        )
        .await
        .expect("watcher should resolve immediately");
    }
}

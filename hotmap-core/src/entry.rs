use tokio::sync::oneshot;

/// A live value together with the stop signal of the watcher guarding it.
///
/// Keeping both in one slot means a key can never have a value without a
/// watcher, or a watcher without a value.
#[derive(Debug)]
pub(crate) struct Slot {
    value: String,
    generation: u64,
    stop: oneshot::Sender<()>,
}

impl Slot {
    pub(crate) fn new(value: String, generation: u64, stop: oneshot::Sender<()>) -> Self {
        Self {
            value,
            generation,
            stop,
        }
    }

    /// Identifies the `set` call that created this slot
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Stops the watcher and hands back the value.
    ///
    /// Consumes the slot, so a watcher is signalled at most once.
    pub(crate) fn consume(self) -> String {
        // The watcher may already be gone (it lost a race and exited), which is fine.
        let _ = self.stop.send(());
        self.value
    }

    /// Stops the watcher and discards the value
    pub(crate) fn cancel(self) {
        let _ = self.stop.send(());
    }
}

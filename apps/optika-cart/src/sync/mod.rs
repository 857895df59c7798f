//! Debounced quantity synchronization for cart lines.
//!
//! Each surface (cart console, drawer) owns one `QuantitySyncManager`. Local
//! quantity edits update an optimistic overlay synchronously and schedule a
//! debounced commit; rapid edits to the same line coalesce into a single
//! network call carrying the final value. Responses are only allowed to
//! mutate state while their per-key sequence number is still the latest, so
//! a commit that was superseded mid-flight is discarded instead of clobbering
//! a newer edit. A failed commit rolls the overlay back to the last value
//! the server is known to have accepted.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use crate::model::ItemKey;

/// Debounce window for the full cart console, where attention moves away
/// from a line quickly.
pub const CART_PAGE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Debounce window for the drawer, which expects rapid successive clicks on
/// a single visible line. Intentionally distinct from the console window.
pub const DRAWER_DEBOUNCE: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub debounce_window: Duration,
}

impl SyncConfig {
    pub fn cart_page() -> Self {
        Self {
            debounce_window: CART_PAGE_DEBOUNCE,
        }
    }

    pub fn drawer() -> Self {
        Self {
            debounce_window: DRAWER_DEBOUNCE,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::cart_page()
    }
}

/// Commit failure as seen by the sync manager. The manager never retries or
/// surfaces these; they trigger a rollback and a log line.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CommitError(String);

impl CommitError {
    pub fn new(message: impl Into<String>) -> Self {
        CommitError(message.into())
    }
}

/// The network boundary the manager drives: set one line's quantity on the
/// server. Opaque, possibly failing, no partial success.
#[async_trait]
pub trait QuantityCommitter: Send + Sync {
    async fn set_item_quantity(&self, cart_item_id: &str, quantity: u32)
    -> Result<(), CommitError>;
}

/// Optimistic value overlaying the server-confirmed quantity while an edit
/// is uncommitted. `Empty` holds a cleared input field during typing so the
/// user can retype without premature clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditingValue {
    Amount(u32),
    Empty,
}

type Seq = u64;

#[derive(Default)]
struct LineSync {
    editing: Option<EditingValue>,
    last_confirmed: Option<u32>,
    /// Bumped on every scheduled commit; a response may only mutate state
    /// while its sequence is still the latest for the key.
    latest_seq: Seq,
    syncing: bool,
    timer: Option<JoinHandle<()>>,
}

/// Per-line debounce/coalescing controller. See the module docs.
///
/// All bookkeeping happens under one mutex held only for synchronous state
/// changes, never across an await. Operations on a given key are expected to
/// come from a single surface task; keys are fully independent of each other.
pub struct QuantitySyncManager {
    committer: Arc<dyn QuantityCommitter>,
    window: Duration,
    lines: Arc<Mutex<HashMap<ItemKey, LineSync>>>,
}

impl QuantitySyncManager {
    pub fn new(committer: Arc<dyn QuantityCommitter>, config: SyncConfig) -> Self {
        Self {
            committer,
            window: config.debounce_window,
            lines: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record an optimistic quantity and schedule a debounced commit.
    ///
    /// `new_quantity` must already be clamped by the caller; the manager does
    /// not know the line's inventory. The overlay updates synchronously, any
    /// pending timer for the key is cancelled, and a fresh commit is
    /// scheduled for this manager's debounce window.
    ///
    /// Must be called from within a tokio runtime.
    pub fn request_quantity_change(&self, key: &ItemKey, cart_item_id: &str, new_quantity: u32) {
        let seq = {
            let mut lines = self.lines.lock().unwrap();
            let entry = lines.entry(key.clone()).or_default();
            entry.editing = Some(EditingValue::Amount(new_quantity));
            if let Some(timer) = entry.timer.take() {
                timer.abort();
            }
            entry.syncing = true;
            entry.latest_seq += 1;
            entry.latest_seq
        };
        trace!(key = %key, seq, quantity = new_quantity, "quantity change scheduled");

        let committer = Arc::clone(&self.committer);
        let lines = Arc::clone(&self.lines);
        let window = self.window;
        let task_key = key.clone();
        let item_id = cart_item_id.to_string();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(window).await;

            // Debounce elapsed: this commit is now in flight, past the point
            // where timer cancellation applies. From here on only the
            // sequence comparison below can invalidate it.
            {
                let mut lines = lines.lock().unwrap();
                let Some(entry) = lines.get_mut(&task_key) else {
                    return;
                };
                if entry.latest_seq != seq {
                    return;
                }
                entry.timer = None;
            }

            let result = committer.set_item_quantity(&item_id, new_quantity).await;

            let mut lines = lines.lock().unwrap();
            let Some(entry) = lines.get_mut(&task_key) else {
                return;
            };
            if entry.latest_seq != seq {
                // Superseded while in flight; a newer commit owns the state.
                trace!(
                    key = %task_key,
                    seq,
                    latest = entry.latest_seq,
                    "discarding stale commit response"
                );
                return;
            }
            entry.syncing = false;
            match result {
                Ok(()) => {
                    trace!(key = %task_key, seq, quantity = new_quantity, "quantity confirmed");
                    entry.last_confirmed = Some(new_quantity);
                    entry.editing = None;
                }
                Err(err) => {
                    // Recovered locally: revert to the last confirmed value
                    // (not necessarily the value before this edit) and let
                    // the next user action re-attempt. Never surfaced.
                    warn!(
                        key = %task_key,
                        quantity = new_quantity,
                        rollback = ?entry.last_confirmed,
                        error = %err,
                        "quantity commit failed, rolling back"
                    );
                    entry.editing = entry.last_confirmed.map(EditingValue::Amount);
                }
            }
        });

        let mut lines = self.lines.lock().unwrap();
        if let Some(entry) = lines.get_mut(key) {
            if entry.latest_seq == seq {
                entry.timer = Some(timer);
            }
        }
    }

    /// Update the editing overlay without scheduling a commit. Used while
    /// the user is typing into the quantity field.
    pub fn set_editing(&self, key: &ItemKey, value: EditingValue) {
        let mut lines = self.lines.lock().unwrap();
        lines.entry(key.clone()).or_default().editing = Some(value);
    }

    pub fn clear_editing(&self, key: &ItemKey) {
        let mut lines = self.lines.lock().unwrap();
        if let Some(entry) = lines.get_mut(key) {
            entry.editing = None;
        }
    }

    /// Remove and return the overlay, reverting the display to the
    /// server-confirmed quantity. Used on blur.
    pub fn take_editing(&self, key: &ItemKey) -> Option<EditingValue> {
        let mut lines = self.lines.lock().unwrap();
        lines.get_mut(key).and_then(|entry| entry.editing.take())
    }

    pub fn editing_value(&self, key: &ItemKey) -> Option<EditingValue> {
        self.lines
            .lock()
            .unwrap()
            .get(key)
            .and_then(|entry| entry.editing)
    }

    /// The quantity a surface should display: the optimistic overlay when an
    /// amount is being edited, otherwise the server-confirmed value.
    pub fn effective_quantity(&self, key: &ItemKey, server_quantity: u32) -> u32 {
        match self.editing_value(key) {
            Some(EditingValue::Amount(amount)) => amount,
            Some(EditingValue::Empty) | None => server_quantity,
        }
    }

    pub fn is_syncing(&self, key: &ItemKey) -> bool {
        self.lines
            .lock()
            .unwrap()
            .get(key)
            .is_some_and(|entry| entry.syncing)
    }

    pub fn last_confirmed(&self, key: &ItemKey) -> Option<u32> {
        self.lines
            .lock()
            .unwrap()
            .get(key)
            .and_then(|entry| entry.last_confirmed)
    }

    /// Cancel every outstanding timer across all keys. Pending commits are
    /// dropped, not flushed; the server keeps whatever it last confirmed.
    /// Called when the owning surface goes away.
    pub fn cancel_all(&self) {
        let mut lines = self.lines.lock().unwrap();
        for entry in lines.values_mut() {
            if let Some(timer) = entry.timer.take() {
                timer.abort();
            }
            entry.syncing = false;
        }
    }
}

impl Drop for QuantitySyncManager {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopCommitter;

    #[async_trait]
    impl QuantityCommitter for NoopCommitter {
        async fn set_item_quantity(
            &self,
            _cart_item_id: &str,
            _quantity: u32,
        ) -> Result<(), CommitError> {
            Ok(())
        }
    }

    fn manager() -> QuantitySyncManager {
        QuantitySyncManager::new(Arc::new(NoopCommitter), SyncConfig::cart_page())
    }

    fn key(raw: &str) -> ItemKey {
        use crate::model::{CartLine, LineStatus};
        ItemKey::for_line(&CartLine {
            cart_item_id: Some(raw.to_string()),
            variant_id: "v".into(),
            product_slug: "p".into(),
            quantity: 1,
            available_inventory: None,
            status: LineStatus::Available,
        })
    }

    #[tokio::test]
    async fn overlay_tracks_editing_state() {
        let manager = manager();
        let key = key("ci-1");

        assert_eq!(manager.effective_quantity(&key, 4), 4);

        manager.set_editing(&key, EditingValue::Amount(7));
        assert_eq!(manager.effective_quantity(&key, 4), 7);

        manager.set_editing(&key, EditingValue::Empty);
        // An emptied field still displays the confirmed quantity for
        // step-button purposes.
        assert_eq!(manager.effective_quantity(&key, 4), 4);
        assert_eq!(manager.editing_value(&key), Some(EditingValue::Empty));

        assert_eq!(manager.take_editing(&key), Some(EditingValue::Empty));
        assert_eq!(manager.editing_value(&key), None);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let manager = manager();
        let a = key("a");
        let b = key("b");

        manager.set_editing(&a, EditingValue::Amount(9));
        assert_eq!(manager.effective_quantity(&a, 1), 9);
        assert_eq!(manager.effective_quantity(&b, 1), 1);
        assert!(!manager.is_syncing(&b));
    }
}

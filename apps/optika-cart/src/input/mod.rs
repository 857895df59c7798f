//! Quantity edit handling at the UI boundary.
//!
//! The editor owns the policies the sync manager deliberately does not:
//! clamping to `[1, min(99, available_inventory)]` at commit time, the
//! empty-while-typing sentinel, the no-op short circuit on blur, and the
//! guard that keeps out-of-stock and unavailable lines from ever reaching
//! the sync manager.

use std::sync::Arc;
use tracing::debug;

use crate::model::{CartLine, ItemKey};
use crate::sync::{EditingValue, QuantitySyncManager};

/// What an edit event did, mostly for surfaces and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// A debounced commit was scheduled for this (clamped) quantity.
    Scheduled(u32),
    /// The editing overlay changed; no commit was scheduled.
    EditingOnly,
    /// The line's status forbids edits; nothing happened.
    RejectedUnavailable,
    /// Nothing to do (blur with no overlay, no-op short circuit, missing id).
    NoOp,
}

pub struct QuantityEditor {
    manager: Arc<QuantitySyncManager>,
}

impl QuantityEditor {
    pub fn new(manager: Arc<QuantitySyncManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &QuantitySyncManager {
        &self.manager
    }

    pub fn increment(&self, line: &CartLine) -> EditOutcome {
        self.step(line, 1)
    }

    pub fn decrement(&self, line: &CartLine) -> EditOutcome {
        self.step(line, -1)
    }

    fn step(&self, line: &CartLine, delta: i64) -> EditOutcome {
        if !line.status.is_editable() {
            return EditOutcome::RejectedUnavailable;
        }
        let key = ItemKey::for_line(line);
        let Some(cart_item_id) = line.cart_item_id.as_deref() else {
            debug!(key = %key, "ignoring step on unpersisted line");
            return EditOutcome::NoOp;
        };
        let base = self.manager.effective_quantity(&key, line.quantity) as i64;
        let target = (base + delta).max(0) as u32;
        let clamped = line.clamp_quantity(target);
        self.manager.request_quantity_change(&key, cart_item_id, clamped);
        EditOutcome::Scheduled(clamped)
    }

    /// The user changed the quantity field's text. Raw text is held as an
    /// overlay without clamping or network traffic; empty and unparsable
    /// input become the `Empty` sentinel until blur resolves them.
    pub fn input_changed(&self, line: &CartLine, raw: &str) -> EditOutcome {
        if !line.status.is_editable() {
            return EditOutcome::RejectedUnavailable;
        }
        let key = ItemKey::for_line(line);
        match raw.trim().parse::<u32>() {
            Ok(amount) => self.manager.set_editing(&key, EditingValue::Amount(amount)),
            Err(_) => self.manager.set_editing(&key, EditingValue::Empty),
        }
        EditOutcome::EditingOnly
    }

    /// The quantity field lost focus: resolve the overlay. Empty input
    /// reverts to the confirmed quantity with no network call; a numeric
    /// value is clamped here, short-circuits when it equals the confirmed
    /// quantity, and otherwise schedules a commit.
    pub fn blur(&self, line: &CartLine) -> EditOutcome {
        if !line.status.is_editable() {
            return EditOutcome::RejectedUnavailable;
        }
        let key = ItemKey::for_line(line);
        match self.manager.take_editing(&key) {
            None | Some(EditingValue::Empty) => EditOutcome::NoOp,
            Some(EditingValue::Amount(amount)) => {
                let clamped = line.clamp_quantity(amount);
                let confirmed = self
                    .manager
                    .last_confirmed(&key)
                    .unwrap_or(line.quantity);
                if clamped == confirmed {
                    return EditOutcome::NoOp;
                }
                let Some(cart_item_id) = line.cart_item_id.as_deref() else {
                    debug!(key = %key, "ignoring blur commit on unpersisted line");
                    return EditOutcome::NoOp;
                };
                self.manager.request_quantity_change(&key, cart_item_id, clamped);
                EditOutcome::Scheduled(clamped)
            }
        }
    }
}

use crate::model::{CartLine, ItemKey};
use std::sync::Mutex;

/// Client-side copy of the server-confirmed cart.
///
/// Surfaces read from the store; the API client replaces its contents after
/// every successful fetch or commit. Display order follows the service.
#[derive(Debug, Default)]
pub struct CartStore {
    lines: Mutex<Vec<CartLine>>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest a fresh server snapshot, replacing all lines.
    pub fn replace_lines(&self, lines: Vec<CartLine>) {
        *self.lines.lock().unwrap() = lines;
    }

    pub fn lines(&self) -> Vec<CartLine> {
        self.lines.lock().unwrap().clone()
    }

    pub fn line(&self, key: &ItemKey) -> Option<CartLine> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .find(|line| ItemKey::for_line(line) == *key)
            .cloned()
    }

    /// Server-confirmed quantity for a line, if it is still in the cart.
    pub fn confirmed_quantity(&self, key: &ItemKey) -> Option<u32> {
        self.line(key).map(|line| line.quantity)
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().unwrap().is_empty()
    }
}

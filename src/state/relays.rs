//! Round-robin relay registry.

use std::sync::atomic::{AtomicUsize, Ordering};

use url::form_urlencoded;

/// Ordered relay list with a shared rotating cursor.
///
/// The registry has no notion of relay health: it only guarantees that
/// every caller sharing it sees the relays in list order, wrapping around.
#[derive(Debug)]
pub struct RelayRegistry {
    relays: Vec<String>,
    /// Index of the next relay to hand out. Always `< relays.len()`.
    cursor: AtomicUsize,
}

impl RelayRegistry {
    /// Create a registry. Returns `None` for an empty list.
    pub fn new(relays: Vec<String>) -> Option<Self> {
        if relays.is_empty() {
            return None;
        }
        Some(Self {
            relays,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Create a registry whose rotation begins at `initial`.
    ///
    /// An empty `initial` behaves like [`new`](Self::new). A root missing
    /// from the list is put in front of it.
    pub fn starting_at(mut relays: Vec<String>, initial: &str) -> Option<Self> {
        if initial.is_empty() {
            return Self::new(relays);
        }
        let start = match relays.iter().position(|r| r == initial) {
            Some(index) => index,
            None => {
                relays.insert(0, initial.to_string());
                0
            }
        };
        let registry = Self::new(relays)?;
        registry.cursor.store(start, Ordering::Release);
        Some(registry)
    }

    /// Hand out the next relay and advance the cursor.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> String {
        let len = self.relays.len();
        // fetch_update keeps the stored cursor inside 0..len at all times.
        let index = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + 1) % len))
            .unwrap_or(0);
        self.relays[index].clone()
    }

    /// Index of the relay the next call to [`next`](Self::next) returns.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    pub fn relays(&self) -> &[String] {
        &self.relays
    }

    pub fn len(&self) -> usize {
        self.relays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }
}

/// Compose the URL a relay must be called with to reach `target`.
///
/// Query-style relays (root ending in `=` or `?`) take the percent-encoded
/// target; prefix-style relays take it verbatim.
pub fn relay_url(relay_root: &str, target: &str) -> String {
    if relay_root.ends_with('=') || relay_root.ends_with('?') {
        let encoded: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
        format!("{}{}", relay_root, encoded)
    } else if relay_root.ends_with('/') {
        format!("{}{}", relay_root, target)
    } else {
        format!("{}/{}", relay_root, target)
    }
}

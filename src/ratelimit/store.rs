//! Counter store for rate limit windows.

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;

/// Number of clients reported in the usage ranking.
const TOP_CLIENTS: usize = 10;

/// A key that uniquely identifies a rate limit counter.
///
/// The key is composed of the client identity and the request path,
/// so distinct routes are counted independently for the same client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey {
    /// Resolved client identity (usually an IP address)
    pub identity: String,
    /// Request path the counter applies to
    pub path: String,
}

impl ClientKey {
    /// Create a new key from a client identity and request path.
    pub fn new(identity: &str, path: &str) -> Self {
        Self {
            identity: identity.to_string(),
            path: path.to_string(),
        }
    }
}

impl std::fmt::Display for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.identity, self.path)
    }
}

/// A single counter tracking requests within the current window.
#[derive(Debug, Clone)]
pub struct RateLimitEntry {
    /// Requests counted in the current window
    pub count: u64,
    /// When the current window ends
    pub reset_at: Instant,
}

impl RateLimitEntry {
    /// Create a fresh entry with an empty count.
    pub fn new(reset_at: Instant) -> Self {
        Self { count: 0, reset_at }
    }

    /// Roll the entry over into a new window.
    pub fn roll_window(&mut self, reset_at: Instant) {
        self.count = 0;
        self.reset_at = reset_at;
    }

    /// Whether the entry's window has passed.
    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.reset_at
    }
}

/// In-memory mapping from client keys to window counters.
///
/// This is a plain data structure; all policy decisions live in the
/// limiter that owns it. The store is not synchronized itself, the
/// owning limiter guards it with a mutex so that a check and the
/// increment that follows happen in one critical section.
#[derive(Debug, Default)]
pub struct RateLimitStore {
    entries: HashMap<ClientKey, RateLimitEntry>,
}

impl RateLimitStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the entry for a key, creating it with a zero count if absent.
    pub fn entry_or_insert(&mut self, key: ClientKey, reset_at: Instant) -> &mut RateLimitEntry {
        self.entries
            .entry(key)
            .or_insert_with(|| RateLimitEntry::new(reset_at))
    }

    /// Get a mutable reference to an existing entry.
    pub fn get_mut(&mut self, key: &ClientKey) -> Option<&mut RateLimitEntry> {
        self.entries.get_mut(key)
    }

    /// Remove all entries whose window has passed.
    ///
    /// Returns the number of entries removed. Without sweeping the store
    /// grows without bound, one entry per key ever seen.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    /// Remove counters for a client.
    ///
    /// With a path, removes the single matching key. Without one, removes
    /// every key belonging to the identity. Returns the number removed.
    pub fn reset_client(&mut self, identity: &str, path: Option<&str>) -> usize {
        match path {
            Some(path) => {
                let key = ClientKey::new(identity, path);
                usize::from(self.entries.remove(&key).is_some())
            }
            None => {
                let before = self.entries.len();
                self.entries.retain(|key, _| key.identity != identity);
                before - self.entries.len()
            }
        }
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Aggregate usage across all entries.
    ///
    /// Read-only: counts total and active (non-expired) entries and ranks
    /// identities by their summed request count across keys.
    pub fn stats(&self, now: Instant) -> RateLimitStats {
        let total_entries = self.entries.len();
        let active_entries = self
            .entries
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count();

        let mut by_identity: HashMap<&str, u64> = HashMap::new();
        for (key, entry) in &self.entries {
            *by_identity.entry(key.identity.as_str()).or_default() += entry.count;
        }

        let mut top_clients: Vec<ClientUsage> = by_identity
            .into_iter()
            .map(|(identity, request_count)| ClientUsage {
                identity: identity.to_string(),
                request_count,
            })
            .collect();
        top_clients.sort_by(|a, b| b.request_count.cmp(&a.request_count));
        top_clients.truncate(TOP_CLIENTS);

        RateLimitStats {
            total_entries,
            active_entries,
            top_clients,
        }
    }
}

/// Aggregate counters describing the state of a store.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStats {
    /// Entries held, including expired ones not yet swept
    pub total_entries: usize,
    /// Entries whose window has not yet passed
    pub active_entries: usize,
    /// Identities ranked by summed request count, at most ten
    pub top_clients: Vec<ClientUsage>,
}

/// Summed request count for a single client identity.
#[derive(Debug, Clone, Serialize)]
pub struct ClientUsage {
    pub identity: String,
    pub request_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn window(now: Instant) -> Instant {
        now + Duration::from_secs(60)
    }

    #[test]
    fn test_entry_created_with_zero_count() {
        let mut store = RateLimitStore::new();
        let now = Instant::now();

        let entry = store.entry_or_insert(ClientKey::new("1.2.3.4", "/api"), window(now));
        assert_eq!(entry.count, 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let mut store = RateLimitStore::new();
        let now = Instant::now();

        store.entry_or_insert(ClientKey::new("1.2.3.4", "/a"), window(now));
        store.entry_or_insert(ClientKey::new("5.6.7.8", "/b"), window(now));

        // Nothing has expired yet
        assert_eq!(store.sweep(now), 0);
        assert_eq!(store.len(), 2);

        // Everything expires once the window has passed
        let later = now + Duration::from_secs(61);
        assert_eq!(store.sweep(later), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_reset_client_single_path() {
        let mut store = RateLimitStore::new();
        let now = Instant::now();

        store.entry_or_insert(ClientKey::new("1.2.3.4", "/a"), window(now));
        store.entry_or_insert(ClientKey::new("1.2.3.4", "/b"), window(now));

        assert_eq!(store.reset_client("1.2.3.4", Some("/a")), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.reset_client("1.2.3.4", Some("/missing")), 0);
    }

    #[test]
    fn test_reset_client_all_paths() {
        let mut store = RateLimitStore::new();
        let now = Instant::now();

        store.entry_or_insert(ClientKey::new("1.2.3.4", "/a"), window(now));
        store.entry_or_insert(ClientKey::new("1.2.3.4", "/b"), window(now));
        store.entry_or_insert(ClientKey::new("5.6.7.8", "/a"), window(now));

        assert_eq!(store.reset_client("1.2.3.4", None), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_stats_ranks_identities_by_total_count() {
        let mut store = RateLimitStore::new();
        let now = Instant::now();

        store
            .entry_or_insert(ClientKey::new("1.2.3.4", "/a"), window(now))
            .count = 3;
        store
            .entry_or_insert(ClientKey::new("1.2.3.4", "/b"), window(now))
            .count = 4;
        store
            .entry_or_insert(ClientKey::new("5.6.7.8", "/a"), window(now))
            .count = 5;

        let stats = store.stats(now);
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.active_entries, 3);
        assert_eq!(stats.top_clients.len(), 2);
        assert_eq!(stats.top_clients[0].identity, "1.2.3.4");
        assert_eq!(stats.top_clients[0].request_count, 7);
        assert_eq!(stats.top_clients[1].request_count, 5);
    }

    #[test]
    fn test_stats_counts_expired_as_inactive() {
        let mut store = RateLimitStore::new();
        let now = Instant::now();

        store.entry_or_insert(ClientKey::new("1.2.3.4", "/a"), window(now));

        let later = now + Duration::from_secs(120);
        let stats = store.stats(later);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.active_entries, 0);
    }

    #[test]
    fn test_client_key_display() {
        let key = ClientKey::new("192.168.1.1", "/api/login");
        assert_eq!(key.to_string(), "192.168.1.1:/api/login");
    }
}

//! Request Cache: maps a pending MessageId to the resolver for its eventual
//! CallResult or CallError, per spec §4.B.
//!
//! Resolution is carried over a single `oneshot` channel per entry; the
//! outcome encodes both the success and error path so only one resolver is
//! ever needed per entry (§8 property 3: exactly one of response, error or
//! timeout fires).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::OcppError;

/// Outcome delivered to the task awaiting a Call's response.
#[derive(Debug)]
pub enum CacheResolution {
    Response(Value),
    Error(OcppError),
}

/// What's stored while a Call is outstanding.
pub struct CacheEntry {
    pub command: &'static str,
    pub request_payload: Value,
    pub deadline: Instant,
    resolver: oneshot::Sender<CacheResolution>,
}

impl CacheEntry {
    pub fn new(
        command: &'static str,
        request_payload: Value,
        timeout: Duration,
    ) -> (Self, oneshot::Receiver<CacheResolution>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                command,
                request_payload,
                deadline: Instant::now() + timeout,
                resolver: tx,
            },
            rx,
        )
    }

    fn resolve(self, outcome: CacheResolution) {
        // The receiving half may already be gone (caller dropped the
        // future); there's nothing useful to do with a failed send.
        let _ = self.resolver.send(outcome);
    }
}

/// Map of MessageId to outstanding [CacheEntry]. Owned exclusively by a
/// station's actor task — never shared across tasks.
#[derive(Default)]
pub struct RequestCache {
    entries: HashMap<String, CacheEntry>,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry. Fails if the id is already present — ids must be
    /// unique per station (§4.B).
    pub fn insert(&mut self, message_id: String, entry: CacheEntry) -> Result<(), OcppError> {
        if self.entries.contains_key(&message_id) {
            return Err(OcppError::Internal(format!(
                "duplicate MessageId {message_id}"
            )));
        }
        self.entries.insert(message_id, entry);
        Ok(())
    }

    /// Single-shot take: removes and returns the entry, if present.
    pub fn take(&mut self, message_id: &str) -> Option<CacheEntry> {
        self.entries.remove(message_id)
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Resolve a pending entry with a successful response.
    pub fn resolve_response(&mut self, message_id: &str, payload: Value) -> bool {
        match self.take(message_id) {
            Some(entry) => {
                entry.resolve(CacheResolution::Response(payload));
                true
            }
            None => false,
        }
    }

    /// Resolve a pending entry with an error (CallError, timeout, or
    /// transport failure).
    pub fn resolve_error(&mut self, message_id: &str, error: OcppError) -> bool {
        match self.take(message_id) {
            Some(entry) => {
                entry.resolve(CacheResolution::Error(error));
                true
            }
            None => false,
        }
    }

    /// Fail every outstanding entry with a stop sentinel, draining the
    /// cache. Used when the station stops (§5).
    pub fn fail_all_stopped(&mut self) {
        for (_, entry) in self.entries.drain() {
            entry.resolve(CacheResolution::Error(OcppError::Stopped));
        }
    }

    /// Resolve and remove every entry whose per-send timeout has elapsed
    /// (§4.F step 4).
    pub fn expire_overdue(&mut self) {
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| now > entry.deadline)
            .map(|(id, _)| id.clone())
            .collect();
        for id in expired {
            if let Some(entry) = self.take(&id) {
                let command = entry.command;
                entry.resolve(CacheResolution::Error(OcppError::Timeout(command)));
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_then_resolve_response_delivers_to_awaiter() {
        let mut cache = RequestCache::new();
        let (entry, rx) = CacheEntry::new("Heartbeat", json!({}), Duration::from_secs(60));
        cache.insert("m1".into(), entry).unwrap();
        assert_eq!(cache.size(), 1);

        assert!(cache.resolve_response("m1", json!({"currentTime": "now"})));
        assert_eq!(cache.size(), 0);

        match rx.await.unwrap() {
            CacheResolution::Response(v) => assert_eq!(v["currentTime"], "now"),
            CacheResolution::Error(_) => panic!("expected response"),
        }
    }

    #[test]
    fn duplicate_insert_fails() {
        let mut cache = RequestCache::new();
        let (entry_a, _rx_a) = CacheEntry::new("Heartbeat", json!({}), Duration::from_secs(60));
        let (entry_b, _rx_b) = CacheEntry::new("Heartbeat", json!({}), Duration::from_secs(60));
        cache.insert("m1".into(), entry_a).unwrap();
        assert!(cache.insert("m1".into(), entry_b).is_err());
    }

    #[tokio::test]
    async fn fail_all_stopped_resolves_every_entry() {
        let mut cache = RequestCache::new();
        let (entry_a, rx_a) = CacheEntry::new("Heartbeat", json!({}), Duration::from_secs(60));
        let (entry_b, rx_b) =
            CacheEntry::new("BootNotification", json!({}), Duration::from_secs(60));
        cache.insert("m1".into(), entry_a).unwrap();
        cache.insert("m2".into(), entry_b).unwrap();

        cache.fail_all_stopped();
        assert_eq!(cache.size(), 0);

        assert!(matches!(
            rx_a.await.unwrap(),
            CacheResolution::Error(OcppError::Stopped)
        ));
        assert!(matches!(
            rx_b.await.unwrap(),
            CacheResolution::Error(OcppError::Stopped)
        ));
    }
}

//! # Nonce Stores
//!
//! A nonce store answers "has this nonce not been seen before?" and, when
//! it answers yes, records the nonce so the next identical question gets
//! no. Doing both under one lock closes the check-then-mark race between
//! concurrent verifications.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use sdx_core::{Nonce, Timestamp};
use sdx_envelope::CapabilityError;

/// Replay-protection capability.
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// `true` if `nonce` is fresh; the nonce is then consumed.
    async fn has_valid_nonce(&self, nonce: &Nonce) -> Result<bool, CapabilityError>;
}

/// In-process nonce store.
///
/// Each accepted nonce is remembered together with the instant it was
/// accepted. A document accepted at `t` carries a timestamp no later than
/// `t + max_clock_skew`, so it fails freshness after
/// `t + max_clock_skew + max_age`. Pruning with
/// `now - max_age - max_clock_skew` therefore never forgets a nonce whose
/// document could still be read.
#[derive(Debug, Default)]
pub struct InMemoryNonceStore {
    seen: Mutex<HashMap<Nonce, Timestamp>>,
}

impl InMemoryNonceStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of remembered nonces.
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    /// Returns `true` if no nonce has been accepted.
    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }

    /// Forget nonces accepted before `cutoff`. Returns how many were removed.
    pub fn prune_before(&self, cutoff: &Timestamp) -> usize {
        let mut seen = self.seen.lock();
        let before = seen.len();
        seen.retain(|_, accepted| *accepted >= *cutoff);
        before - seen.len()
    }

    fn check_and_mark(&self, nonce: &Nonce, now: Timestamp) -> bool {
        let mut seen = self.seen.lock();
        if seen.contains_key(nonce) {
            return false;
        }
        seen.insert(nonce.clone(), now);
        true
    }
}

#[async_trait]
impl NonceStore for InMemoryNonceStore {
    async fn has_valid_nonce(&self, nonce: &Nonce) -> Result<bool, CapabilityError> {
        Ok(self.check_and_mark(nonce, Timestamp::now()))
    }
}

/// Accepts every nonce. For readers that handle replay elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllNonces;

#[async_trait]
impl NonceStore for AcceptAllNonces {
    async fn has_valid_nonce(&self, _nonce: &Nonce) -> Result<bool, CapabilityError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn nonce(s: &str) -> Nonce {
        Nonce::new(s).unwrap()
    }

    #[tokio::test]
    async fn second_lookup_is_rejected() {
        let store = InMemoryNonceStore::new();
        assert!(store.has_valid_nonce(&nonce("n1")).await.unwrap());
        assert!(!store.has_valid_nonce(&nonce("n1")).await.unwrap());
        assert!(store.has_valid_nonce(&nonce("n2")).await.unwrap());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_lookups_accept_exactly_once() {
        let store = Arc::new(InMemoryNonceStore::new());
        let n = nonce("shared");
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            let n = n.clone();
            handles.push(tokio::spawn(async move { store.has_valid_nonce(&n).await.unwrap() }));
        }
        let mut accepted = 0;
        for h in handles {
            if h.await.unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
    }

    #[test]
    fn prune_drops_old_entries() {
        let store = InMemoryNonceStore::new();
        let now = Timestamp::now();
        let old = now.checked_sub(Duration::days(2)).unwrap();
        assert!(store.check_and_mark(&nonce("old"), old));
        assert!(store.check_and_mark(&nonce("new"), now));
        let cutoff = now.checked_sub(Duration::days(1)).unwrap();
        assert_eq!(store.prune_before(&cutoff), 1);
        assert_eq!(store.len(), 1);
        assert!(store.check_and_mark(&nonce("old"), now));
    }

    #[test]
    fn prune_keeps_entry_accepted_at_cutoff() {
        let store = InMemoryNonceStore::new();
        let cutoff = Timestamp::now();
        assert!(store.check_and_mark(&nonce("edge"), cutoff));
        assert_eq!(store.prune_before(&cutoff), 0);
        assert!(!store.check_and_mark(&nonce("edge"), cutoff));
    }

    #[tokio::test]
    async fn accept_all_never_rejects() {
        let store = AcceptAllNonces;
        assert!(store.has_valid_nonce(&nonce("x")).await.unwrap());
        assert!(store.has_valid_nonce(&nonce("x")).await.unwrap());
    }
}

/// Name Cache - in-memory resolution state with pending tracking and waiter queues
///
/// All methods are synchronous and expect the caller to hold the resolver's
/// lock, so every read-check-then-write sequence is atomic.
use crate::names::{CacheEntry, ResolutionSource, ResolutionState, WalletAddress};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::oneshot;

/// Outcome of checking an address before resolving it
#[derive(Debug)]
pub enum Lookup {
    /// Already resolved
    Hit(Option<String>),
    /// Resolution in flight; the receiver yields its result
    Wait(oneshot::Receiver<Option<String>>),
    /// Caller now owns the resolution and must call `complete`
    Start,
}

/// Outcome of checking an address before running the fallback chain
#[derive(Debug)]
pub enum FallbackLookup {
    /// Nothing left to try; the cached value is final
    Settled(Option<String>),
    /// Fallback in flight; the receiver yields its result
    Wait(oneshot::Receiver<Option<String>>),
    /// Caller now owns the fallback and must call `complete_fallback`
    Start,
}

/// Cache state for all addresses seen by a resolver
#[derive(Debug, Default)]
pub struct NameCache {
    entries: HashMap<WalletAddress, CacheEntry>,
    pending: HashSet<WalletAddress>,
    waiters: HashMap<WalletAddress, Vec<oneshot::Sender<Option<String>>>>,
    fallback_pending: HashSet<WalletAddress>,
    fallback_waiters: HashMap<WalletAddress, Vec<oneshot::Sender<Option<String>>>>,
    hits: u64,
    misses: u64,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the cache and, on a miss, either join the in-flight resolution
    /// or mark the address pending.
    pub fn begin(&mut self, address: &WalletAddress) -> Lookup {
        if let Some(entry) = self.entries.get(address) {
            self.hits += 1;
            return Lookup::Hit(entry.name.clone());
        }

        self.misses += 1;

        if self.pending.contains(address) {
            let (tx, rx) = oneshot::channel();
            self.waiters.entry(address.clone()).or_default().push(tx);
            return Lookup::Wait(rx);
        }

        self.pending.insert(address.clone());
        Lookup::Start
    }

    /// Finish a background resolution.
    ///
    /// Returns the value that ended up cached together with the waiters to
    /// release, in enqueue order.
    pub fn complete(
        &mut self,
        address: &WalletAddress,
        name: Option<String>,
    ) -> (Option<String>, Vec<oneshot::Sender<Option<String>>>) {
        self.pending.remove(address);
        let stored = self.store(address, name, ResolutionSource::Background);
        let waiters = self.waiters.remove(address).unwrap_or_default();
        (stored, waiters)
    }

    /// Cached value when no fallback can change it: a found name, or a
    /// "not found" the fallback chain already produced. Counts as a hit.
    pub fn settled(&mut self, address: &WalletAddress) -> Option<Option<String>> {
        let entry = self.entries.get(address)?;
        if entry.name.is_none() && entry.source != ResolutionSource::Fallback {
            return None;
        }
        let name = entry.name.clone();
        self.hits += 1;
        Some(name)
    }

    /// Check the cache before the fallback chain and, unless the answer is
    /// already final, join the in-flight fallback or mark it pending.
    pub fn begin_fallback(&mut self, address: &WalletAddress) -> FallbackLookup {
        if let Some(entry) = self.entries.get(address) {
            if entry.name.is_some() || entry.source == ResolutionSource::Fallback {
                return FallbackLookup::Settled(entry.name.clone());
            }
        }

        if self.fallback_pending.contains(address) {
            let (tx, rx) = oneshot::channel();
            self.fallback_waiters
                .entry(address.clone())
                .or_default()
                .push(tx);
            return FallbackLookup::Wait(rx);
        }

        self.fallback_pending.insert(address.clone());
        FallbackLookup::Start
    }

    /// Record the outcome of the fallback chain and hand back its waiters
    pub fn complete_fallback(
        &mut self,
        address: &WalletAddress,
        name: Option<String>,
    ) -> (Option<String>, Vec<oneshot::Sender<Option<String>>>) {
        self.fallback_pending.remove(address);
        let stored = self.store(address, name, ResolutionSource::Fallback);
        let waiters = self.fallback_waiters.remove(address).unwrap_or_default();
        (stored, waiters)
    }

    /// A found name is never replaced by "not found", and a fallback
    /// "not found" is not downgraded to a background one (so it is not retried).
    fn store(
        &mut self,
        address: &WalletAddress,
        name: Option<String>,
        source: ResolutionSource,
    ) -> Option<String> {
        if let Some(existing) = self.entries.get(address) {
            let keep = match (&existing.name, &name) {
                (Some(_), None) => true,
                (None, None) => existing.source == ResolutionSource::Fallback,
                _ => false,
            };
            if keep {
                return existing.name.clone();
            }
        }

        self.entries.insert(
            address.clone(),
            CacheEntry {
                name: name.clone(),
                source,
                resolved_at: Utc::now(),
            },
        );
        name
    }

    pub fn entry(&self, address: &WalletAddress) -> Option<&CacheEntry> {
        self.entries.get(address)
    }

    /// True when the fallback chain already produced the cached "not found"
    pub fn fallback_exhausted(&self, address: &WalletAddress) -> bool {
        matches!(
            self.entries.get(address),
            Some(CacheEntry { name: None, source: ResolutionSource::Fallback, .. })
        )
    }

    pub fn state(&self, address: &WalletAddress) -> ResolutionState {
        if let Some(entry) = self.entries.get(address) {
            ResolutionState::Resolved(entry.name.clone())
        } else if self.pending.contains(address) {
            ResolutionState::Pending
        } else {
            ResolutionState::Unseen
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn named_count(&self) -> usize {
        self.entries.values().filter(|e| e.name.is_some()).count()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn waiter_count(&self) -> usize {
        self.waiters.values().map(Vec::len).sum()
    }

    pub fn fallback_pending_count(&self) -> usize {
        self.fallback_pending.len()
    }

    pub fn fallback_waiter_count(&self) -> usize {
        self.fallback_waiters.values().map(Vec::len).sum()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> WalletAddress {
        WalletAddress::normalize(s).unwrap()
    }

    #[test]
    fn test_first_lookup_starts_then_waits() {
        let mut cache = NameCache::new();
        let a = addr("0x1111");

        assert!(matches!(cache.begin(&a), Lookup::Start));
        assert_eq!(cache.state(&a), ResolutionState::Pending);
        assert!(matches!(cache.begin(&a), Lookup::Wait(_)));
        assert!(matches!(cache.begin(&a), Lookup::Wait(_)));
        assert_eq!(cache.waiter_count(), 2);
    }

    #[tokio::test]
    async fn test_complete_releases_waiters_with_same_value() {
        let mut cache = NameCache::new();
        let a = addr("0x1111");

        assert!(matches!(cache.begin(&a), Lookup::Start));
        let rx1 = match cache.begin(&a) {
            Lookup::Wait(rx) => rx,
            other => panic!("expected wait, got {:?}", other),
        };
        let rx2 = match cache.begin(&a) {
            Lookup::Wait(rx) => rx,
            other => panic!("expected wait, got {:?}", other),
        };

        let (stored, waiters) = cache.complete(&a, Some("alice.hl".to_string()));
        assert_eq!(stored.as_deref(), Some("alice.hl"));
        assert_eq!(waiters.len(), 2);
        for tx in waiters {
            tx.send(stored.clone()).unwrap();
        }

        assert_eq!(rx1.await.unwrap().as_deref(), Some("alice.hl"));
        assert_eq!(rx2.await.unwrap().as_deref(), Some("alice.hl"));
        assert_eq!(cache.state(&a), ResolutionState::Resolved(Some("alice.hl".to_string())));
        assert_eq!(cache.pending_count(), 0);
        assert_eq!(cache.waiter_count(), 0);
    }

    #[test]
    fn test_hit_after_resolution() {
        let mut cache = NameCache::new();
        let a = addr("0x2222");

        cache.begin(&a);
        cache.complete(&a, None);

        assert!(matches!(cache.begin(&a), Lookup::Hit(None)));
        assert!(matches!(cache.begin(&addr("0X2222")), Lookup::Hit(None)));
        assert_eq!(cache.hits(), 2);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_found_name_is_not_downgraded() {
        let mut cache = NameCache::new();
        let a = addr("0x3333");

        cache.begin(&a);
        cache.complete_fallback(&a, Some("bob.hl".to_string()));
        let (stored, _) = cache.complete(&a, None);

        assert_eq!(stored.as_deref(), Some("bob.hl"));
        assert_eq!(cache.entry(&a).unwrap().source, ResolutionSource::Fallback);
    }

    #[test]
    fn test_fallback_not_found_is_kept() {
        let mut cache = NameCache::new();
        let a = addr("0x4444");

        cache.begin(&a);
        cache.complete_fallback(&a, None);
        cache.complete(&a, None);

        assert!(cache.fallback_exhausted(&a));
    }

    #[test]
    fn test_fallback_upgrades_background_not_found() {
        let mut cache = NameCache::new();
        let a = addr("0x5555");

        cache.begin(&a);
        cache.complete(&a, None);
        assert!(!cache.fallback_exhausted(&a));

        let (stored, _) = cache.complete_fallback(&a, Some("carol.hl".to_string()));
        assert_eq!(stored.as_deref(), Some("carol.hl"));
        assert_eq!(cache.named_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_is_coalesced() {
        let mut cache = NameCache::new();
        let a = addr("0x6666");

        cache.begin(&a);
        cache.complete(&a, None);

        assert!(matches!(cache.begin_fallback(&a), FallbackLookup::Start));
        let rx = match cache.begin_fallback(&a) {
            FallbackLookup::Wait(rx) => rx,
            other => panic!("expected wait, got {:?}", other),
        };
        assert_eq!(cache.fallback_pending_count(), 1);
        assert_eq!(cache.fallback_waiter_count(), 1);

        let (stored, waiters) = cache.complete_fallback(&a, Some("dave.hl".to_string()));
        for tx in waiters {
            tx.send(stored.clone()).unwrap();
        }

        assert_eq!(rx.await.unwrap().as_deref(), Some("dave.hl"));
        assert_eq!(cache.fallback_pending_count(), 0);
        assert!(matches!(
            cache.begin_fallback(&a),
            FallbackLookup::Settled(Some(_))
        ));
    }

    #[test]
    fn test_settled_counts_hits() {
        let mut cache = NameCache::new();
        let a = addr("0x7777");

        cache.begin(&a);
        cache.complete(&a, None);
        // Background "not found" can still be improved by the fallback
        assert_eq!(cache.settled(&a), None);
        assert_eq!(cache.hits(), 0);

        cache.complete_fallback(&a, None);
        assert_eq!(cache.settled(&a), Some(None));
        assert_eq!(cache.hits(), 1);
    }
}

/// Name Resolver - coalescing address -> name resolution with progressive notification
use crate::{
    metrics,
    names::{
        cache::{FallbackLookup, Lookup, NameCache},
        events::{NameEvents, Subscription},
        strategy::NameStrategy,
        NameResolved, ResolutionState, WalletAddress,
    },
};
use futures::FutureExt;
use serde::Serialize;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, warn};

const DEFAULT_EVENT_BUFFER: usize = 256;

/// Snapshot of resolver state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverStats {
    pub entries: usize,
    pub named: usize,
    pub pending: usize,
    pub waiters: usize,
    pub fallback_pending: usize,
    pub fallback_waiters: usize,
    pub hits: u64,
    pub misses: u64,
    pub background_started: u64,
    pub observers: usize,
}

/// Builder for `NameResolver`; strategies run in the order they are added
pub struct NameResolverBuilder {
    background: Vec<Arc<dyn NameStrategy>>,
    fallback: Vec<Arc<dyn NameStrategy>>,
    event_buffer: usize,
}

impl Default for NameResolverBuilder {
    fn default() -> Self {
        Self {
            background: Vec::new(),
            fallback: Vec::new(),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl NameResolverBuilder {
    /// Add a strategy run by the non-blocking background worker
    pub fn background(mut self, strategy: Arc<dyn NameStrategy>) -> Self {
        self.background.push(strategy);
        self
    }

    /// Add a strategy run inline by `resolve_with_fallback`
    pub fn fallback(mut self, strategy: Arc<dyn NameStrategy>) -> Self {
        self.fallback.push(strategy);
        self
    }

    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    pub fn build(self) -> NameResolver {
        NameResolver {
            inner: Arc::new(ResolverInner {
                cache: Mutex::new(NameCache::new()),
                background: self.background,
                fallback: self.fallback,
                events: NameEvents::new(self.event_buffer),
                background_started: AtomicU64::new(0),
            }),
        }
    }
}

struct ResolverInner {
    cache: Mutex<NameCache>,
    background: Vec<Arc<dyn NameStrategy>>,
    fallback: Vec<Arc<dyn NameStrategy>>,
    events: NameEvents,
    background_started: AtomicU64,
}

impl ResolverInner {
    /// Background worker body. Always runs to completion so the cache is
    /// warmed even if every caller has gone away.
    async fn run_background(self: Arc<Self>, address: WalletAddress) {
        let outcome = AssertUnwindSafe(run_chain(&self.background, &address))
            .catch_unwind()
            .await;

        let (name, label) = match outcome {
            Ok(Some(name)) => (Some(name), "named"),
            Ok(None) => (None, "unnamed"),
            Err(_) => {
                error!(address = %address, "Background name resolution panicked");
                (None, "panicked")
            }
        };

        let (stored, waiters) = self.cache.lock().await.complete(&address, name);

        let released = waiters.len();
        for waiter in waiters {
            // Waiter may have been dropped by its caller
            let _ = waiter.send(stored.clone());
        }
        metrics::record_background_finished(label, released);

        debug!(
            address = %address,
            name = ?stored,
            waiters = released,
            "Background name resolution finished"
        );

        self.events.publish(NameResolved::new(&address, stored));
    }

    /// Fallback worker body. Spawned so that callers giving up early never
    /// leave the fallback marked pending.
    async fn run_fallback(self: Arc<Self>, address: WalletAddress) -> Option<String> {
        let name = AssertUnwindSafe(run_chain(&self.fallback, &address))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                error!(address = %address, "Fallback name resolution panicked");
                None
            });

        let (stored, waiters) = self.cache.lock().await.complete_fallback(&address, name);

        let released = waiters.len();
        for waiter in waiters {
            let _ = waiter.send(stored.clone());
        }

        debug!(
            address = %address,
            name = ?stored,
            waiters = released,
            "Fallback name resolution finished"
        );

        self.events
            .publish(NameResolved::new(&address, stored.clone()));
        stored
    }
}

/// Try each strategy in order, stopping at the first name found
async fn run_chain(strategies: &[Arc<dyn NameStrategy>], address: &WalletAddress) -> Option<String> {
    for strategy in strategies {
        let started = Instant::now();
        let result = strategy.lookup(address).await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(Some(name)) => {
                metrics::record_strategy_lookup(strategy.name(), "found", elapsed);
                return Some(name);
            }
            Ok(None) => {
                metrics::record_strategy_lookup(strategy.name(), "not_found", elapsed);
            }
            Err(e) => {
                warn!(
                    strategy = strategy.name(),
                    address = %address,
                    error = %e,
                    "Name lookup failed, treating as not found"
                );
                metrics::record_strategy_lookup(strategy.name(), "error", elapsed);
            }
        }
    }

    None
}

/// Resolves wallet addresses to display names.
///
/// Clones share one cache, so construct it once and hand clones to consumers.
/// Lookups never fail: any error from a strategy is logged and cached as
/// "no name", and that result is permanent for the life of the resolver.
#[derive(Clone)]
pub struct NameResolver {
    inner: Arc<ResolverInner>,
}

impl NameResolver {
    pub fn builder() -> NameResolverBuilder {
        NameResolverBuilder::default()
    }

    /// Non-blocking lookup.
    ///
    /// - no address: `None` without any work
    /// - cached: the cached value
    /// - resolution in flight: waits for it and returns its value
    /// - otherwise starts a background resolution and returns `None` at once;
    ///   the result arrives through the event hub
    pub async fn resolve(&self, address: Option<&str>) -> Option<String> {
        let address = WalletAddress::normalize(address?)?;
        self.resolve_normalized(&address).await
    }

    async fn resolve_normalized(&self, address: &WalletAddress) -> Option<String> {
        let lookup = self.inner.cache.lock().await.begin(address);

        match lookup {
            Lookup::Hit(name) => {
                metrics::record_cache_access(true);
                name
            }
            Lookup::Wait(rx) => {
                metrics::record_cache_access(false);
                rx.await.unwrap_or(None)
            }
            Lookup::Start => {
                metrics::record_cache_access(false);
                self.spawn_background(address.clone());
                None
            }
        }
    }

    fn spawn_background(&self, address: WalletAddress) {
        self.inner.background_started.fetch_add(1, Ordering::Relaxed);
        metrics::record_background_started();
        debug!(address = %address, "Starting background name resolution");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(inner.run_background(address));
    }

    /// Best-effort immediate answer: cache, then the non-blocking path, then
    /// the fallback strategies. Concurrent callers share one fallback run per
    /// address, and its outcome is cached, so a failed read is not retried.
    pub async fn resolve_with_fallback(&self, address: Option<&str>) -> Option<String> {
        let address = WalletAddress::normalize(address?)?;

        let settled = self.inner.cache.lock().await.settled(&address);
        if let Some(name) = settled {
            metrics::record_cache_access(true);
            return name;
        }

        if let Some(name) = self.resolve_normalized(&address).await {
            return Some(name);
        }

        if self.inner.fallback.is_empty() {
            return None;
        }

        let lookup = self.inner.cache.lock().await.begin_fallback(&address);

        match lookup {
            FallbackLookup::Settled(name) => name,
            FallbackLookup::Wait(rx) => rx.await.unwrap_or(None),
            FallbackLookup::Start => {
                let inner = Arc::clone(&self.inner);
                tokio::spawn(inner.run_fallback(address))
                    .await
                    .unwrap_or(None)
            }
        }
    }

    /// Resolve several addresses concurrently with `resolve_with_fallback`.
    /// Duplicates (after normalization) are looked up once; order follows
    /// first appearance.
    pub async fn resolve_many<I, S>(&self, addresses: I) -> Vec<(String, Option<String>)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let unique: Vec<WalletAddress> = addresses
            .into_iter()
            .filter_map(|a| WalletAddress::normalize(a.as_ref()))
            .filter(|a| seen.insert(a.clone()))
            .collect();

        let names = futures::future::join_all(
            unique
                .iter()
                .map(|a| self.resolve_with_fallback(Some(a.as_str()))),
        )
        .await;

        unique
            .into_iter()
            .map(|a| a.as_str().to_string())
            .zip(names)
            .collect()
    }

    /// Current state of an address; never triggers work
    pub async fn state(&self, address: &str) -> ResolutionState {
        match WalletAddress::normalize(address) {
            Some(address) => self.inner.cache.lock().await.state(&address),
            None => ResolutionState::Unseen,
        }
    }

    /// Cached value, `None` when no resolution has completed
    pub async fn cached(&self, address: &str) -> Option<Option<String>> {
        let address = WalletAddress::normalize(address)?;
        self.inner
            .cache
            .lock()
            .await
            .entry(&address)
            .map(|e| e.name.clone())
    }

    pub async fn stats(&self) -> ResolverStats {
        let cache = self.inner.cache.lock().await;
        ResolverStats {
            entries: cache.len(),
            named: cache.named_count(),
            pending: cache.pending_count(),
            waiters: cache.waiter_count(),
            fallback_pending: cache.fallback_pending_count(),
            fallback_waiters: cache.fallback_waiter_count(),
            hits: cache.hits(),
            misses: cache.misses(),
            background_started: self.inner.background_started.load(Ordering::Relaxed),
            observers: self.inner.events.observer_count(),
        }
    }

    /// Observe every completed resolution
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&NameResolved) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(callback)
    }

    /// Observe completed resolutions of one address
    pub fn subscribe_address<F>(&self, address: &str, callback: F) -> Option<Subscription>
    where
        F: Fn(&NameResolved) + Send + Sync + 'static,
    {
        self.inner.events.subscribe_address(address, callback)
    }

    /// Stream of completed resolutions
    pub fn events(&self) -> broadcast::Receiver<NameResolved> {
        self.inner.events.events()
    }
}

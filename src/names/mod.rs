/// Wallet name resolution
///
/// Resolves wallet addresses to display names through an in-memory cache,
/// coalesces concurrent lookups for the same address, and broadcasts
/// completed resolutions to observers.

pub mod cache;
pub mod events;
pub mod onchain;
pub mod resolver;
pub mod strategy;

pub use cache::NameCache;
pub use events::{NameEvents, Subscription};
pub use onchain::OnChainNameStrategy;
pub use resolver::{NameResolver, NameResolverBuilder, ResolverStats};
pub use strategy::{NameStrategy, RestNameStrategy};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized wallet address used as the cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Normalize raw caller input; empty input means "no address"
    pub fn normalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for `0x` followed by 40 hex digits
    pub fn is_evm(&self) -> bool {
        match self.0.strip_prefix("0x") {
            Some(hex) => hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()),
            None => false,
        }
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which path produced a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionSource {
    /// Non-blocking background worker
    Background,
    /// Synchronous fallback chain (on-chain read)
    Fallback,
}

/// Completed resolution held for the lifetime of the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub name: Option<String>,
    pub source: ResolutionSource,
    pub resolved_at: DateTime<Utc>,
}

/// Per-address resolution state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "name", rename_all = "camelCase")]
pub enum ResolutionState {
    Unseen,
    Pending,
    Resolved(Option<String>),
}

impl ResolutionState {
    pub fn label(&self) -> &'static str {
        match self {
            ResolutionState::Unseen => "unseen",
            ResolutionState::Pending => "pending",
            ResolutionState::Resolved(_) => "resolved",
        }
    }

    /// Resolved name, if any
    pub fn name(&self) -> Option<&str> {
        match self {
            ResolutionState::Resolved(name) => name.as_deref(),
            _ => None,
        }
    }
}

/// Event published whenever a resolution concludes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameResolved {
    pub address: String,
    pub name: Option<String>,
    pub resolved_at: DateTime<Utc>,
}

impl NameResolved {
    pub fn new(address: &WalletAddress, name: Option<String>) -> Self {
        Self {
            address: address.as_str().to_string(),
            name,
            resolved_at: Utc::now(),
        }
    }
}

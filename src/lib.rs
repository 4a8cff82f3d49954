/// Wallet Names - address to display name resolution
///
/// Resolves wallet addresses to human-readable names with an in-memory cache,
/// request coalescing, and resolution events, and serves them over HTTP.

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod names;
pub mod server;

pub use context::AppContext;
pub use error::{ResolverError, ResolverResult};
pub use names::{NameResolved, NameResolver, ResolutionState, WalletAddress};

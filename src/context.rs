/// Application context and dependency injection
use crate::{
    config::ServerConfig,
    error::ResolverResult,
    names::{strategy::build_http_client, NameResolver, OnChainNameStrategy, RestNameStrategy},
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub resolver: NameResolver,
    pub name_api: Arc<RestNameStrategy>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub fn new(config: ServerConfig) -> ResolverResult<Self> {
        config.validate()?;

        let http_client = build_http_client(&config.http_client)?;

        let name_api = Arc::new(RestNameStrategy::new(http_client.clone(), &config.name_api));
        let onchain = Arc::new(OnChainNameStrategy::new(http_client, &config.chain)?);

        if !name_api.reverse_enabled() {
            tracing::info!("Reverse REST lookup not configured - names come from the resolver contract");
        }

        // REST runs in the background worker, the contract read is the fallback
        let resolver = NameResolver::builder()
            .background(name_api.clone())
            .fallback(onchain)
            .event_buffer(config.events.buffer)
            .build();

        Ok(Self::from_parts(config, resolver, name_api))
    }

    /// Assemble a context from pre-built services
    pub fn from_parts(
        config: ServerConfig,
        resolver: NameResolver,
        name_api: Arc<RestNameStrategy>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            resolver,
            name_api,
        }
    }

    /// Get service address
    pub fn listen_addr(&self) -> String {
        format!(
            "{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}

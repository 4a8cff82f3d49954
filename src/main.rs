/// Wallet Names - address to display name resolution service
///
/// Hosts one shared name resolver behind an HTTP and WebSocket API for
/// dashboard front-ends.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wallet_names::{config::ServerConfig, error::ResolverResult, server, AppContext};

#[tokio::main]
async fn main() -> ResolverResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wallet_names=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    // Load configuration
    let config = ServerConfig::from_env()?;
    tracing::debug!(log_level = %config.logging.level, "Configuration loaded");

    // Create application context
    let ctx = AppContext::new(config)?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    wallet-names v{}
    address -> name resolution
        "#,
        env!("CARGO_PKG_VERSION")
    );
}

/// Configuration management for the wallet name service
use crate::error::{ResolverError, ResolverResult};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub name_api: NameApiConfig,
    pub chain: ChainConfig,
    pub http_client: HttpClientConfig,
    pub events: EventsConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// REST name backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameApiConfig {
    pub base_url: String,
    /// Sent as `X-API-Key` when present
    pub api_key: Option<String>,
    /// Reverse lookup path template containing `{address}`.
    /// The backend has no reverse endpoint today, so this is unset by default.
    pub reverse_path: Option<String>,
}

/// EVM chain configuration for the on-chain fallback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub resolver_contract: String,
}

/// Outbound HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// Resolution event fan-out configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Capacity of the broadcast channel feeding stream subscribers
    pub buffer: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ResolverResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("NAMES_HOSTNAME").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_env("NAMES_PORT", 3030, "port number")?;
        let version = env!("CARGO_PKG_VERSION").to_string();

        let base_url = env::var("NAMES_API_BASE_URL")
            .map_err(|_| ResolverError::Config("NAMES_API_BASE_URL required".to_string()))?;
        let api_key = env::var("NAMES_API_KEY").ok().filter(|s| !s.trim().is_empty());
        let reverse_path = env::var("NAMES_API_REVERSE_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let rpc_url = env::var("NAMES_RPC_URL")
            .unwrap_or_else(|_| "https://rpc.hyperliquid.xyz/evm".to_string());
        let resolver_contract = env::var("NAMES_RESOLVER_CONTRACT")
            .map_err(|_| ResolverError::Config("NAMES_RESOLVER_CONTRACT required".to_string()))?;

        let timeout_secs = parse_env("NAMES_HTTP_TIMEOUT_SECS", 10, "HTTP timeout")?;
        let user_agent = env::var("NAMES_USER_AGENT")
            .unwrap_or_else(|_| format!("wallet-names/{}", version));

        let buffer = parse_env("NAMES_EVENT_BUFFER", 256, "event buffer size")?;

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            name_api: NameApiConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key,
                reverse_path,
            },
            chain: ChainConfig {
                rpc_url,
                resolver_contract,
            },
            http_client: HttpClientConfig {
                timeout_secs,
                user_agent,
            },
            events: EventsConfig { buffer },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ResolverResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ResolverError::Validation("Hostname cannot be empty".to_string()));
        }

        for (label, url) in [
            ("NAMES_API_BASE_URL", &self.name_api.base_url),
            ("NAMES_RPC_URL", &self.chain.rpc_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ResolverError::Validation(format!(
                    "{} must be an http(s) URL, got {}",
                    label, url
                )));
            }
        }

        if let Some(path) = &self.name_api.reverse_path {
            if !path.contains("{address}") {
                return Err(ResolverError::Validation(
                    "NAMES_API_REVERSE_PATH must contain {address}".to_string(),
                ));
            }
        }

        Address::from_str(&self.chain.resolver_contract).map_err(|e| {
            ResolverError::Validation(format!("Invalid resolver contract address: {}", e))
        })?;

        if self.http_client.timeout_secs == 0 {
            return Err(ResolverError::Validation(
                "HTTP timeout must be at least 1 second".to_string(),
            ));
        }

        if self.events.buffer == 0 {
            return Err(ResolverError::Validation(
                "Event buffer must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Read a numeric variable, using `default` when unset
fn parse_env<T: FromStr>(key: &str, default: T, what: &str) -> ResolverResult<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ResolverError::Validation(format!("Invalid {} in {}: {}", what, key, raw))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "127.0.0.1".to_string(),
            port: 0,
            version: "0.1.0".to_string(),
        },
        name_api: NameApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: None,
            reverse_path: None,
        },
        chain: ChainConfig {
            rpc_url: "http://127.0.0.1:9".to_string(),
            resolver_contract: "0x000000000000000000000000000000000000beef".to_string(),
        },
        http_client: HttpClientConfig {
            timeout_secs: 2,
            user_agent: "wallet-names-test".to_string(),
        },
        events: EventsConfig { buffer: 16 },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_test_config_is_valid() {
        tokio_test::assert_ok!(test_config().validate());
    }

    #[test]
    fn test_rejects_bad_contract_address() {
        let mut config = test_config();
        config.chain.resolver_contract = "0x1234".to_string();
        assert!(matches!(config.validate(), Err(ResolverError::Validation(_))));
    }

    #[test]
    fn test_rejects_reverse_path_without_placeholder() {
        let mut config = test_config();
        config.name_api.reverse_path = Some("/resolve/name".to_string());
        assert!(config.validate().is_err());

        config.name_api.reverse_path = Some("/resolve/name/{address}".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_http_urls() {
        let mut config = test_config();
        config.chain.rpc_url = "ws://localhost:8545".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        // Variable names are unique to this test so parallel tests don't race
        env::set_var("NAMES_TEST_GARBAGE_BUFFER", "lots");
        let result = parse_env::<usize>("NAMES_TEST_GARBAGE_BUFFER", 256, "event buffer size");
        assert!(matches!(result, Err(ResolverError::Validation(_))));

        env::set_var("NAMES_TEST_GOOD_BUFFER", " 64 ");
        assert_eq!(
            parse_env::<usize>("NAMES_TEST_GOOD_BUFFER", 256, "event buffer size").unwrap(),
            64
        );

        assert_eq!(
            parse_env::<usize>("NAMES_TEST_UNSET_BUFFER", 256, "event buffer size").unwrap(),
            256
        );
    }

    #[test]
    fn test_rejects_zero_timeout_and_buffer() {
        let mut config = test_config();
        config.http_client.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.events.buffer = 0;
        assert!(config.validate().is_err());
    }
}

/// On-chain name lookup through the resolver contract's `primaryName(address)`
use crate::{
    config::ChainConfig,
    error::{ResolverError, ResolverResult},
    names::{strategy::NameStrategy, WalletAddress},
};
use alloy_primitives::Address;
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;

sol! {
    interface INameResolver {
        function primaryName(address addr) external view returns (string);
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Read-only `eth_call` against a fixed resolver contract
#[derive(Clone)]
pub struct OnChainNameStrategy {
    client: reqwest::Client,
    rpc_url: String,
    contract: Address,
}

impl OnChainNameStrategy {
    pub fn new(client: reqwest::Client, config: &ChainConfig) -> ResolverResult<Self> {
        let contract = Address::from_str(&config.resolver_contract).map_err(|e| {
            ResolverError::Config(format!("Invalid resolver contract address: {}", e))
        })?;

        Ok(Self {
            client,
            rpc_url: config.rpc_url.clone(),
            contract,
        })
    }

    /// Raw `eth_call` at the latest block, returning the decoded return data
    async fn eth_call(&self, calldata: Vec<u8>) -> ResolverResult<Vec<u8>> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                {
                    "to": format!("{:#x}", self.contract),
                    "data": format!("0x{}", hex::encode(calldata)),
                },
                "latest"
            ]
        });

        let response: RpcResponse = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(ResolverError::Rpc(format!("{} (code {})", err.message, err.code)));
        }

        let result = response
            .result
            .ok_or_else(|| ResolverError::Rpc("eth_call returned no result".to_string()))?;

        hex::decode(result.trim_start_matches("0x"))
            .map_err(|e| ResolverError::Abi(format!("Invalid eth_call hex: {}", e)))
    }
}

#[async_trait]
impl NameStrategy for OnChainNameStrategy {
    fn name(&self) -> &'static str {
        "onchain"
    }

    async fn lookup(&self, address: &WalletAddress) -> ResolverResult<Option<String>> {
        let addr = Address::from_str(address.as_str())
            .map_err(|e| ResolverError::Validation(format!("Not an EVM address: {}", e)))?;

        let calldata = INameResolver::primaryNameCall { addr }.abi_encode();
        let output = self.eth_call(calldata).await?;

        let name = INameResolver::primaryNameCall::abi_decode_returns(&output)
            .map_err(|e| ResolverError::Abi(format!("Failed to decode primaryName: {}", e)))?;

        let name = name.trim().to_string();
        Ok(if name.is_empty() { None } else { Some(name) })
    }
}

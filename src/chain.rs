use crate::error::{Error, Result};
use ethers::types::Address;
use serde::Deserialize;
use std::str::FromStr;

/// Per-network constants: contract addresses, RPC endpoint and the relay
/// network slug used to build service URLs.
///
/// Instances are immutable after construction and shared read-only by every
/// component. Custom networks can be deserialized from a JSON table with the
/// same camelCase field names.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    /// Human-readable network name ("Sepolia").
    pub name: String,
    pub chain_id: u64,
    /// Read-only chain node endpoint.
    pub rpc_url: String,
    /// Network slug in the relay provider's URL scheme ("sepolia").
    pub relay_slug: String,
    /// EntryPoint contract validating and executing operations.
    pub entrypoint: Address,
    /// Account factory used for counterfactual deployment.
    pub factory: Address,
    /// Fee token (USDC) on this network.
    pub token: Address,
    /// ERC-20 paymaster contract that may be granted a spending allowance.
    pub paymaster: Address,
}

// name, chain id, rpc url, relay slug, entrypoint, factory, token, paymaster
const BUILTIN: &[(&str, u64, &str, &str, &str, &str, &str, &str)] = &[
    (
        "sepolia",
        11155111,
        "https://rpc.ankr.com/eth_sepolia",
        "sepolia",
        "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789",
        "0x9406Cc6185a346906296840746125a0E44976454",
        "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238",
        "0x0000000000325602a77416A16136FDafd04b299f",
    ),
    (
        "polygon-mumbai",
        80001,
        "https://mumbai.rpc.thirdweb.com",
        "mumbai",
        "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789",
        "0x9406Cc6185a346906296840746125a0E44976454",
        "0x9999f7fea5938fd3b1e26a12c3f2fb024e194f97",
        "0x000000000009B901DeC1aaB9389285965F49D387",
    ),
];

impl ChainConfig {
    /// Look up a built-in network by identifier.
    pub fn builtin(name: &str) -> Result<Self> {
        let row = BUILTIN
            .iter()
            .find(|row| row.0.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::Config(format!("unsupported network: {name}")))?;

        Ok(Self {
            name: row.0.to_string(),
            chain_id: row.1,
            rpc_url: row.2.to_string(),
            relay_slug: row.3.to_string(),
            entrypoint: parse_addr(row.4, "entrypoint")?,
            factory: parse_addr(row.5, "factory")?,
            token: parse_addr(row.6, "token")?,
            paymaster: parse_addr(row.7, "paymaster")?,
        })
    }

    pub fn sepolia() -> Result<Self> {
        Self::builtin("sepolia")
    }

    pub fn polygon_mumbai() -> Result<Self> {
        Self::builtin("polygon-mumbai")
    }

    /// Relay (bundler) JSON-RPC endpoint for this network.
    pub fn bundler_url(&self, api_key: &str) -> String {
        format!(
            "https://api.pimlico.io/v1/{}/rpc?apikey={}",
            self.relay_slug, api_key
        )
    }

    /// Fee-sponsor JSON-RPC endpoint for this network (v2 API).
    pub fn paymaster_url(&self, api_key: &str) -> String {
        format!(
            "https://api.pimlico.io/v2/{}/rpc?apikey={}",
            self.relay_slug, api_key
        )
    }
}

fn parse_addr(s: &str, what: &str) -> Result<Address> {
    Address::from_str(s).map_err(|e| Error::Config(format!("invalid {what} address {s}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_sepolia() {
        let cfg = ChainConfig::sepolia().unwrap();
        assert_eq!(cfg.chain_id, 11155111);
        assert_eq!(cfg.relay_slug, "sepolia");
        assert_eq!(
            cfg.entrypoint,
            "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[test]
    fn builtin_lookup_is_case_insensitive() {
        assert_eq!(
            ChainConfig::builtin("Polygon-Mumbai").unwrap().chain_id,
            80001
        );
    }

    #[test]
    fn unknown_network_is_a_config_error() {
        let err = ChainConfig::builtin("goerli").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn service_urls_embed_slug_and_key() {
        let cfg = ChainConfig::sepolia().unwrap();
        assert_eq!(
            cfg.bundler_url("k123"),
            "https://api.pimlico.io/v1/sepolia/rpc?apikey=k123"
        );
        assert_eq!(
            cfg.paymaster_url("k123"),
            "https://api.pimlico.io/v2/sepolia/rpc?apikey=k123"
        );
    }

    #[test]
    fn custom_network_from_json() {
        let cfg: ChainConfig = serde_json::from_str(
            r#"{
                "name": "base-sepolia",
                "chainId": 84532,
                "rpcUrl": "https://sepolia.base.org",
                "relaySlug": "base-sepolia",
                "entrypoint": "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789",
                "factory": "0x9406Cc6185a346906296840746125a0E44976454",
                "token": "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238",
                "paymaster": "0x0000000000325602a77416A16136FDafd04b299f"
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.chain_id, 84532);
        assert_eq!(cfg.bundler_url("k"), "https://api.pimlico.io/v1/base-sepolia/rpc?apikey=k");
    }
}

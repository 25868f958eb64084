use crate::error::{Error, Result};
use crate::retry;
use ethers::abi::AbiParser;
use ethers::prelude::*;
use ethers::providers::Middleware;
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(350);

/// Read-only chain node access: nonce, token balance and deployment checks.
///
/// No caching anywhere; nonces and balances change between operations, so
/// every build re-reads current values. Reads are idempotent, so transient
/// provider failures get bounded retries; an error that outlives them is
/// fatal to the build.
#[derive(Debug, Clone)]
pub struct NodeClient {
    provider: Arc<Provider<Http>>,
}

impl NodeClient {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url = reqwest::Url::parse(rpc_url)
            .map_err(|e| Error::Config(format!("invalid rpc url {rpc_url}: {e}")))?;
        // same request deadline as the relay and sponsor clients
        let provider =
            Provider::new(Http::new_with_client(url, retry::http_client()?)).interval(POLL_INTERVAL);
        Ok(Self {
            provider: Arc::new(provider),
        })
    }

    pub async fn chain_id(&self) -> Result<u64> {
        retry::idempotent(retry::DEFAULT_ATTEMPTS, || self.chain_id_once()).await
    }

    async fn chain_id_once(&self) -> Result<u64> {
        let id = self
            .provider
            .get_chainid()
            .await
            .map_err(|e| Error::Provider(format!("eth_chainId failed: {e}")))?;
        Ok(id.as_u64())
    }

    /// Current account nonce from `EntryPoint.getNonce(sender, 0)`.
    pub async fn nonce(&self, entrypoint: Address, account: Address) -> Result<U256> {
        retry::idempotent(retry::DEFAULT_ATTEMPTS, || self.nonce_once(entrypoint, account)).await
    }

    async fn nonce_once(&self, entrypoint: Address, account: Address) -> Result<U256> {
        let abi = AbiParser::default()
            .parse(&["function getNonce(address sender, uint192 key) view returns (uint256)"])
            .map_err(|e| Error::Encoding(e.to_string()))?;
        let entrypoint_c = Contract::new(entrypoint, abi, self.provider.clone());

        entrypoint_c
            .method::<_, U256>("getNonce", (account, U256::zero()))
            .map_err(|e| Error::Encoding(e.to_string()))?
            .call()
            .await
            .map_err(|e| Error::Provider(format!("entryPoint.getNonce failed: {e}")))
    }

    /// ERC-20 balance, used for sponsored-action pre-flight checks.
    pub async fn token_balance(&self, token: Address, holder: Address) -> Result<U256> {
        retry::idempotent(retry::DEFAULT_ATTEMPTS, || self.token_balance_once(token, holder))
            .await
    }

    async fn token_balance_once(&self, token: Address, holder: Address) -> Result<U256> {
        let abi = AbiParser::default()
            .parse(&["function balanceOf(address owner) view returns (uint256)"])
            .map_err(|e| Error::Encoding(e.to_string()))?;
        let token_c = Contract::new(token, abi, self.provider.clone());

        token_c
            .method::<_, U256>("balanceOf", holder)
            .map_err(|e| Error::Encoding(e.to_string()))?
            .call()
            .await
            .map_err(|e| Error::Provider(format!("token.balanceOf failed: {e}")))
    }

    /// Whether the account contract exists on chain yet.
    pub async fn is_deployed(&self, account: Address) -> Result<bool> {
        retry::idempotent(retry::DEFAULT_ATTEMPTS, || self.is_deployed_once(account)).await
    }

    async fn is_deployed_once(&self, account: Address) -> Result<bool> {
        let code = self
            .provider
            .get_code(account, None)
            .await
            .map_err(|e| Error::Provider(format!("eth_getCode failed: {e}")))?;
        Ok(!code.as_ref().is_empty())
    }
}

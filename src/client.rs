use crate::account::{AccountResolver, ResolvedAccount, SetupCall};
use crate::builder::OperationBuilder;
use crate::bundler::BundlerClient;
use crate::chain::ChainConfig;
use crate::encoding;
use crate::error::{Error, Result};
use crate::node::NodeClient;
use crate::paymaster::PaymasterClient;
use crate::signer::OperationSigner;
use crate::types::{GasTier, Receipt};
use ethers::types::{Address, Bytes, U256};
use std::time::Duration;
use tokio::sync::Mutex;

const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(180);

/// Minimum fee-token balance a sponsored action requires by default
/// (1.000000 units of a 6-decimal token).
const DEFAULT_MIN_SPONSOR_BALANCE: u64 = 1_000_000;

/// Smart account client over one network and one owner key.
///
/// Composes the chain node, relay and fee-sponsor clients into two flows:
///
/// - [`send_transaction`](Self::send_transaction): the account pays its own
///   gas; limits come from the relay's dry-run estimate.
/// - [`send_user_operation`](Self::send_user_operation): gas is sponsored;
///   limits and the sponsorship payload come from the paymaster.
///
/// Both flows hold a per-account lock from nonce read through submission, so
/// concurrent calls on one client cannot sign the same nonce twice.
#[derive(Debug)]
pub struct SmartAccountClient {
    config: ChainConfig,
    node: NodeClient,
    bundler: BundlerClient,
    paymaster: PaymasterClient,
    builder: OperationBuilder,
    signer: OperationSigner,
    resolver: AccountResolver,
    setup_calls: Vec<SetupCall>,
    account: ResolvedAccount,
    min_sponsor_balance: U256,
    receipt_timeout: Duration,
    op_lock: Mutex<()>,
}

impl SmartAccountClient {
    /// Build a client from a network config, the relay/sponsor API key and
    /// the owner's private key. Fails before any network call on a bad key
    /// or RPC URL.
    pub fn new(config: ChainConfig, api_key: &str, owner_private_key: &str) -> Result<Self> {
        let bundler_url = config.bundler_url(api_key);
        let paymaster_url = config.paymaster_url(api_key);
        Self::with_service_urls(config, bundler_url, paymaster_url, owner_private_key)
    }

    /// Like [`new`](Self::new) but with explicit service endpoints, for
    /// self-hosted relays or tests pointing at local fakes.
    pub fn with_service_urls(
        config: ChainConfig,
        bundler_url: String,
        paymaster_url: String,
        owner_private_key: &str,
    ) -> Result<Self> {
        let node = NodeClient::new(&config.rpc_url)?;
        let bundler = BundlerClient::new(bundler_url)?;
        let paymaster = PaymasterClient::new(paymaster_url)?;
        let signer = OperationSigner::new(owner_private_key, config.chain_id, config.entrypoint)?;
        let resolver = AccountResolver::new(config.factory, config.entrypoint);
        let account = resolver.resolve(signer.owner(), &[])?;

        Ok(Self {
            config,
            node,
            bundler,
            paymaster,
            builder: OperationBuilder::new(),
            signer,
            resolver,
            setup_calls: Vec::new(),
            account,
            min_sponsor_balance: U256::from(DEFAULT_MIN_SPONSOR_BALANCE),
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
            op_lock: Mutex::new(()),
        })
    }

    /// One-time setup calls the factory runs atomically at deployment.
    /// Changes the counterfactual address.
    pub fn with_setup_calls(mut self, calls: Vec<SetupCall>) -> Result<Self> {
        self.account = self.resolver.resolve(self.signer.owner(), &calls)?;
        self.setup_calls = calls;
        Ok(self)
    }

    /// CREATE2 salt, for running several accounts off one owner key.
    pub fn with_salt(mut self, salt: U256) -> Result<Self> {
        self.resolver = self.resolver.with_salt(salt);
        self.account = self.resolver.resolve(self.signer.owner(), &self.setup_calls)?;
        Ok(self)
    }

    pub fn with_gas_tier(mut self, tier: GasTier) -> Self {
        self.builder = self.builder.with_tier(tier);
        self
    }

    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Fee-token balance a sponsored action must see before it proceeds.
    /// Zero disables the pre-flight check.
    pub fn with_min_sponsor_balance(mut self, min: U256) -> Self {
        self.min_sponsor_balance = min;
        self
    }

    /// The counterfactual smart account address. Stable for the client's
    /// lifetime, whether or not the account is deployed yet.
    pub fn account_address(&self) -> Address {
        self.account.address
    }

    /// The owner EOA derived from the private key.
    pub fn owner(&self) -> Address {
        self.signer.owner()
    }

    pub async fn is_deployed(&self) -> Result<bool> {
        self.node.is_deployed(self.account.address).await
    }

    /// Current account nonce at the entrypoint.
    pub async fn nonce(&self) -> Result<U256> {
        self.node.nonce(self.config.entrypoint, self.account.address).await
    }

    /// Fee-token balance of the smart account.
    pub async fn token_balance(&self) -> Result<U256> {
        self.node
            .token_balance(self.config.token, self.account.address)
            .await
    }

    /// Verify the RPC endpoint really serves the configured chain.
    pub async fn validate_chain(&self) -> Result<()> {
        let chain_id = self.node.chain_id().await?;
        if chain_id != self.config.chain_id {
            return Err(Error::Config(format!(
                "chain id mismatch: config has {}, rpc returned {chain_id}",
                self.config.chain_id
            )));
        }
        Ok(())
    }

    /// Call data granting the configured paymaster a fee-token allowance,
    /// wrapped in `execute` for submission through the account.
    pub fn approve_paymaster_spend(&self, amount: U256) -> Result<Bytes> {
        let approve = encoding::approve_call_data(self.config.paymaster, amount)?;
        encoding::execute_call_data(self.config.token, U256::zero(), &approve)
    }

    /// Direct flow: the account forwards a call and pays its own gas.
    ///
    /// resolve → fee tiers → nonce → draft `execute(to, value, data)` →
    /// relay gas estimate → sign → submit → receipt.
    pub async fn send_transaction(
        &self,
        to: Address,
        value: U256,
        data: Bytes,
    ) -> Result<Receipt> {
        let guard = self.op_lock.lock().await;

        let tiers = self.bundler.gas_price_tiers().await?;
        let nonce = self.nonce().await?;
        let call_data = encoding::execute_call_data(to, value, &data)?;
        let draft = self.builder.build(
            self.account.address,
            nonce,
            &self.account.init_code,
            call_data,
            &tiers,
        );

        let estimates = self
            .bundler
            .estimate_user_operation_gas(&draft, self.config.entrypoint)
            .await?;
        let signed = self.signer.sign(draft.apply_gas_estimates(estimates)).await?;

        tracing::info!(
            account = %encoding::fmt_address(self.account.address),
            nonce = %nonce,
            %to,
            "submitting direct transaction"
        );
        let user_op_hash = self
            .bundler
            .send_user_operation(&signed, self.config.entrypoint)
            .await?;
        drop(guard);

        self.bundler
            .wait_user_operation_receipt(user_op_hash, self.receipt_timeout)
            .await
    }

    /// Sponsored flow: the fee sponsor pays gas for an arbitrary call.
    ///
    /// `call_data` is the already-encoded account call (see
    /// [`execute_call_data`](crate::execute_call_data) and
    /// [`approve_paymaster_spend`](Self::approve_paymaster_spend)).
    ///
    /// pre-flight balance → nonce → fee tiers → draft → sponsor → sign →
    /// submit → receipt. Each step feeds the next; none is skippable.
    pub async fn send_user_operation(&self, call_data: Bytes) -> Result<Receipt> {
        let guard = self.op_lock.lock().await;

        if !self.min_sponsor_balance.is_zero() {
            let balance = self.token_balance().await?;
            check_sponsor_funds(self.account.address, self.min_sponsor_balance, balance)?;
        }

        let nonce = self.nonce().await?;
        let tiers = self.bundler.gas_price_tiers().await?;
        let draft = self.builder.build(
            self.account.address,
            nonce,
            &self.account.init_code,
            call_data,
            &tiers,
        );

        let sponsorship = self
            .paymaster
            .sponsor_user_operation(&draft, self.config.entrypoint)
            .await?;
        let sponsored = draft.apply_sponsorship(sponsorship);
        let signed = self.signer.sign(sponsored).await?;

        tracing::info!(
            account = %encoding::fmt_address(self.account.address),
            nonce = %nonce,
            "submitting sponsored user operation"
        );
        let user_op_hash = self
            .bundler
            .send_user_operation(&signed, self.config.entrypoint)
            .await?;
        drop(guard);

        self.bundler
            .wait_user_operation_receipt(user_op_hash, self.receipt_timeout)
            .await
    }
}

fn check_sponsor_funds(account: Address, required: U256, actual: U256) -> Result<()> {
    if actual < required {
        return Err(Error::InsufficientBalance {
            account,
            required,
            actual,
        });
    }
    Ok(())
}

use crate::encoding;
use crate::error::Result;
use ethers::types::{Address, Bytes, U256};
use ethers::utils::keccak256;

/// Account implementation version bound into the address derivation.
pub const ACCOUNT_VERSION: &str = "1.4.1";

/// A call the factory runs atomically right after deploying the account,
/// e.g. granting the fee sponsor a token allowance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetupCall {
    pub to: Address,
    pub data: Bytes,
}

/// The smart account's counterfactual address plus the init code that
/// deploys it on first use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedAccount {
    pub address: Address,
    /// Factory address followed by the deploy call data. Goes into
    /// `initCode` only while the account is undeployed (nonce 0).
    pub init_code: Bytes,
}

/// Derives the counterfactual account address and deployment payload.
///
/// Pure computation: the same (owner, factory, entrypoint, salt, setup
/// calls) always resolve to the same account, deployed or not.
#[derive(Clone, Debug)]
pub struct AccountResolver {
    factory: Address,
    entrypoint: Address,
    salt: U256,
}

impl AccountResolver {
    pub fn new(factory: Address, entrypoint: Address) -> Self {
        Self {
            factory,
            entrypoint,
            salt: U256::zero(),
        }
    }

    /// CREATE2 salt for the account. Distinct salts give the same owner
    /// independent accounts.
    pub fn with_salt(mut self, salt: U256) -> Self {
        self.salt = salt;
        self
    }

    pub fn resolve(&self, owner: Address, setup_calls: &[SetupCall]) -> Result<ResolvedAccount> {
        let deploy_call = if setup_calls.is_empty() {
            encoding::create_account_call_data(owner, self.salt)?
        } else {
            let dests: Vec<Address> = setup_calls.iter().map(|c| c.to).collect();
            let datas: Vec<Bytes> = setup_calls.iter().map(|c| c.data.clone()).collect();
            encoding::create_account_with_calls_call_data(owner, self.salt, &dests, &datas)?
        };

        let mut init_code = Vec::with_capacity(20 + deploy_call.len());
        init_code.extend_from_slice(self.factory.as_bytes());
        init_code.extend_from_slice(deploy_call.as_ref());

        Ok(ResolvedAccount {
            address: self.derive_address(&deploy_call),
            init_code: Bytes::from(init_code),
        })
    }

    /// CREATE2-style digest: keccak256(0xff || factory || salt ||
    /// keccak256(entrypoint || version || deploy call))[12..].
    ///
    /// The inner hash binds the account implementation (entrypoint +
    /// version) and the full deploy call, so owner, salt and the setup-call
    /// list all participate in the address.
    fn derive_address(&self, deploy_call: &Bytes) -> Address {
        let mut code_preimage =
            Vec::with_capacity(20 + ACCOUNT_VERSION.len() + deploy_call.len());
        code_preimage.extend_from_slice(self.entrypoint.as_bytes());
        code_preimage.extend_from_slice(ACCOUNT_VERSION.as_bytes());
        code_preimage.extend_from_slice(deploy_call.as_ref());
        let code_hash = keccak256(code_preimage);

        let mut salt32 = [0u8; 32];
        self.salt.to_big_endian(&mut salt32);

        let mut buf = Vec::with_capacity(1 + 20 + 32 + 32);
        buf.push(0xff);
        buf.extend_from_slice(self.factory.as_bytes());
        buf.extend_from_slice(&salt32);
        buf.extend_from_slice(&code_hash);

        Address::from_slice(&keccak256(buf)[12..])
    }
}

//! ERC-4337 smart account client (EntryPoint v0.6).
//!
//! Drives a counterfactual smart account from an owner key: derives the
//! account address, assembles user operations, obtains paymaster
//! sponsorship, signs over the canonical userOpHash and submits through a
//! bundler, then polls for the inclusion receipt.
//!
//! The operation pipeline is phase-typed — [`UnsignedOperation`] becomes a
//! [`SponsoredOperation`] only once gas fields are final, and only a
//! `SponsoredOperation` can be signed — so sign-before-sponsor ordering
//! bugs fail to compile instead of failing on chain.
//!
//! ```rust,ignore
//! use aa_smart_account::{ChainConfig, SmartAccountClient};
//! use ethers::types::{Bytes, U256};
//!
//! let client = SmartAccountClient::new(
//!     ChainConfig::sepolia()?,
//!     &api_key,
//!     &owner_private_key,
//! )?;
//!
//! // direct: the account pays its own gas
//! let receipt = client.send_transaction(to, U256::zero(), Bytes::default()).await?;
//!
//! // sponsored: grant the paymaster an allowance, gas paid by the sponsor
//! let call = client.approve_paymaster_spend(U256::from(10_000_000u64))?;
//! let receipt = client.send_user_operation(call).await?;
//! ```
//!
//! This crate installs no tracing subscriber and loads no secrets; both are
//! the embedding binary's job.

mod account;
mod builder;
mod bundler;
mod chain;
mod client;
mod encoding;
mod error;
mod node;
mod paymaster;
mod retry;
mod signer;
mod types;

pub use account::{AccountResolver, ResolvedAccount, SetupCall, ACCOUNT_VERSION};
pub use builder::OperationBuilder;
pub use bundler::BundlerClient;
pub use chain::ChainConfig;
pub use client::SmartAccountClient;
pub use encoding::{approve_call_data, execute_call_data, user_op_to_json};
pub use error::{Error, Result};
pub use node::NodeClient;
pub use paymaster::PaymasterClient;
pub use signer::{user_op_hash, OperationSigner};
pub use types::{
    dummy_signature, GasEstimates, GasFees, GasPriceTiers, GasTier, Receipt, SignedOperation,
    SponsoredOperation, SponsorshipResult, UnsignedOperation, UserOperation,
};

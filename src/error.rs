use ethers::types::{Address, H256, U256};
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Client-side error taxonomy.
///
/// `Transport` is the only retryable variant, and only for idempotent
/// read-only calls. A JSON-RPC level error means the service made a
/// decision; it is never retried.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad key, malformed address, unsupported network. Raised before any
    /// network call is made.
    #[error("configuration error: {0}")]
    Config(String),

    /// Sponsored-action pre-flight found the account underfunded.
    #[error("insufficient token balance for {account}: have {actual}, need at least {required}")]
    InsufficientBalance {
        account: Address,
        required: U256,
        actual: U256,
    },

    /// The fee sponsor declined or its simulation reverted. Not retryable;
    /// the call data or funding has to change.
    #[error("paymaster refused sponsorship: {0}")]
    SponsorshipRejected(String),

    /// The relay rejected a signed operation. The diagnostic is passed
    /// through verbatim.
    #[error("bundler rejected user operation: {0}")]
    SubmissionRejected(String),

    /// No receipt within the polling deadline. Distinct from rejection:
    /// the operation may still be included later.
    #[error("no receipt for user operation {user_op_hash:?} after {waited:?}; it may still be pending")]
    ReceiptTimeout { user_op_hash: H256, waited: Duration },

    /// JSON-RPC error object from a service, outside the cases above.
    #[error("rpc {method} failed: {message}")]
    Rpc { method: String, message: String },

    /// HTTP-level failure talking to a service.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Chain-node (provider) call failed.
    #[error("provider error: {0}")]
    Provider(String),

    #[error("abi encoding failed: {0}")]
    Encoding(String),

    #[error("signing failed: {0}")]
    Signing(String),

    /// A service answered with a shape we cannot interpret.
    #[error("unexpected response: {0}")]
    Response(String),
}

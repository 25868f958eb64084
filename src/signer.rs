use crate::error::{Error, Result};
use crate::types::{SignedOperation, SponsoredOperation, UserOperation};
use ethers::abi::{self, Token};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::keccak256;
use std::str::FromStr;

/// Canonical EntryPoint v0.6 userOpHash.
///
/// keccak256 of the packed operation fields (signature excluded), then bound
/// to the entrypoint address and chain id so a signature cannot be replayed
/// on another chain or through another entrypoint.
pub fn user_op_hash(op: &UserOperation, chain_id: u64, entrypoint: Address) -> H256 {
    let packed = abi::encode(&[
        Token::Address(op.sender),
        Token::Uint(op.nonce),
        Token::FixedBytes(keccak256(op.init_code.as_ref()).to_vec()),
        Token::FixedBytes(keccak256(op.call_data.as_ref()).to_vec()),
        Token::Uint(op.call_gas_limit),
        Token::Uint(op.verification_gas_limit),
        Token::Uint(op.pre_verification_gas),
        Token::Uint(op.max_fee_per_gas),
        Token::Uint(op.max_priority_fee_per_gas),
        Token::FixedBytes(keccak256(op.paymaster_and_data.as_ref()).to_vec()),
    ]);
    let inner = keccak256(packed);

    let bound = abi::encode(&[
        Token::FixedBytes(inner.to_vec()),
        Token::Address(entrypoint),
        Token::Uint(U256::from(chain_id)),
    ]);
    H256::from(keccak256(bound))
}

/// Produces the owner signature over the canonical operation hash.
///
/// Accepts only gas-finalized operations: signing a draft would produce a
/// signature the account's validation rejects once the sponsor's gas values
/// replace the placeholders. Signing is local and deterministic, so there
/// are no retries; any failure is reported immediately.
#[derive(Clone, Debug)]
pub struct OperationSigner {
    wallet: LocalWallet,
    chain_id: u64,
    entrypoint: Address,
}

impl OperationSigner {
    pub fn new(owner_private_key: &str, chain_id: u64, entrypoint: Address) -> Result<Self> {
        let wallet = LocalWallet::from_str(owner_private_key)
            .map_err(|e| Error::Config(format!("invalid owner private key: {e}")))?
            .with_chain_id(chain_id);
        Ok(Self {
            wallet,
            chain_id,
            entrypoint,
        })
    }

    /// Owner EOA address.
    pub fn owner(&self) -> Address {
        self.wallet.address()
    }

    /// Sign a gas-finalized operation. The signature is an EIP-191 personal
    /// message over the userOpHash, which is what SimpleAccount's
    /// `validateUserOp` checks.
    pub async fn sign(&self, op: SponsoredOperation) -> Result<SignedOperation> {
        let hash = user_op_hash(op.fields(), self.chain_id, self.entrypoint);

        let sig = self
            .wallet
            .sign_message(hash.as_bytes())
            .await
            .map_err(|e| Error::Signing(e.to_string()))?;

        let mut op = op.op;
        op.signature = Bytes::from(sig.to_vec());
        Ok(SignedOperation { op })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        dummy_signature, GasEstimates, SponsorshipResult, UnsignedOperation,
    };

    const OWNER_KEY: &str = "0x4646464646464646464646464646464646464646464646464646464646464646";
    const CHAIN_ID: u64 = 11155111;

    fn entrypoint() -> Address {
        Address::repeat_byte(0xee)
    }

    fn op() -> UserOperation {
        UserOperation {
            sender: Address::repeat_byte(0x11),
            nonce: U256::zero(),
            init_code: Bytes::from(vec![0xfa; 24]),
            call_data: Bytes::from(vec![0xb6, 0x1d, 0x27, 0xf6]),
            call_gas_limit: U256::from(90000),
            verification_gas_limit: U256::from(150000),
            pre_verification_gas: U256::from(21000),
            max_fee_per_gas: U256::from(100),
            max_priority_fee_per_gas: U256::from(10),
            paymaster_and_data: Bytes::from(vec![0xaa; 52]),
            signature: dummy_signature(),
        }
    }

    #[test]
    fn hash_is_deterministic_and_ignores_signature() {
        let a = user_op_hash(&op(), CHAIN_ID, entrypoint());
        let mut signed = op();
        signed.signature = Bytes::from(vec![0x77; 65]);
        let b = user_op_hash(&signed, CHAIN_ID, entrypoint());
        assert_eq!(a, b);
    }

    #[test]
    fn hash_binds_fields_chain_and_entrypoint() {
        let base = user_op_hash(&op(), CHAIN_ID, entrypoint());

        let mut bumped = op();
        bumped.call_gas_limit = U256::from(90001);
        assert_ne!(base, user_op_hash(&bumped, CHAIN_ID, entrypoint()));

        let mut other_pm = op();
        other_pm.paymaster_and_data = Bytes::default();
        assert_ne!(base, user_op_hash(&other_pm, CHAIN_ID, entrypoint()));

        assert_ne!(base, user_op_hash(&op(), CHAIN_ID + 1, entrypoint()));
        assert_ne!(base, user_op_hash(&op(), CHAIN_ID, Address::repeat_byte(0xef)));
    }

    #[tokio::test]
    async fn signature_recovers_to_owner() {
        let signer = OperationSigner::new(OWNER_KEY, CHAIN_ID, entrypoint()).unwrap();
        let sponsored = SponsoredOperation { op: op() };
        let signed = signer.sign(sponsored).await.unwrap();

        // recompute the hash from the exact signed fields
        let hash = user_op_hash(signed.fields(), CHAIN_ID, entrypoint());
        let sig = ethers::types::Signature::try_from(signed.signature().as_ref()).unwrap();
        let recovered = sig.recover(hash.as_bytes().to_vec()).unwrap();
        assert_eq!(recovered, signer.owner());
    }

    #[tokio::test]
    async fn signature_no_longer_matches_if_gas_had_differed() {
        // The regression this guards: signing before the sponsor's gas
        // values are merged produces a signature the final operation fails.
        let signer = OperationSigner::new(OWNER_KEY, CHAIN_ID, entrypoint()).unwrap();

        let draft = UnsignedOperation { op: op() };
        let pre_sponsor = signer
            .sign(draft.clone().apply_gas_estimates(GasEstimates {
                call_gas_limit: U256::from(1),
                verification_gas_limit: U256::from(2),
                pre_verification_gas: U256::from(3),
            }))
            .await
            .unwrap();

        let final_op = draft
            .apply_sponsorship(SponsorshipResult {
                pre_verification_gas: U256::from(21000),
                verification_gas_limit: U256::from(150000),
                call_gas_limit: U256::from(90000),
                paymaster_and_data: Bytes::from(vec![0xaa; 52]),
            })
            .op;

        let final_hash = user_op_hash(&final_op, CHAIN_ID, entrypoint());
        let stale_sig =
            ethers::types::Signature::try_from(pre_sponsor.signature().as_ref()).unwrap();
        let recovered = stale_sig.recover(final_hash.as_bytes().to_vec()).unwrap();
        assert_ne!(recovered, signer.owner());
    }

    #[test]
    fn bad_key_is_a_config_error() {
        let err = OperationSigner::new("0xnot-a-key", CHAIN_ID, entrypoint()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}

use crate::types::{
    dummy_signature, GasPriceTiers, GasTier, UnsignedOperation, UserOperation,
};
use ethers::types::{Address, Bytes, U256};

/// Assembles draft operations from fresh chain state and fee tiers.
///
/// Gas limits are seeded as zero placeholders; the fee sponsor (or a bundler
/// estimate) always overwrites them before signing.
#[derive(Clone, Copy, Debug, Default)]
pub struct OperationBuilder {
    tier: GasTier,
}

impl OperationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fee tier to draw `maxFeePerGas` / `maxPriorityFeePerGas` from.
    pub fn with_tier(mut self, tier: GasTier) -> Self {
        self.tier = tier;
        self
    }

    /// Build a draft. `init_code` ships only while the account is
    /// undeployed (nonce 0); for any later nonce it must be empty, or the
    /// entrypoint rejects the operation because the account already exists.
    pub fn build(
        &self,
        sender: Address,
        nonce: U256,
        init_code: &Bytes,
        call_data: Bytes,
        tiers: &GasPriceTiers,
    ) -> UnsignedOperation {
        let fees = tiers.tier(self.tier);
        let init_code = if nonce.is_zero() {
            init_code.clone()
        } else {
            Bytes::default()
        };

        UnsignedOperation {
            op: UserOperation {
                sender,
                nonce,
                init_code,
                call_data,
                call_gas_limit: U256::zero(),
                verification_gas_limit: U256::zero(),
                pre_verification_gas: U256::zero(),
                max_fee_per_gas: fees.max_fee_per_gas,
                max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
                paymaster_and_data: Bytes::default(),
                signature: dummy_signature(),
            },
        }
    }
}

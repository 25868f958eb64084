use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};

/// ERC-4337 UserOperation fields (EntryPoint v0.6 layout).
///
/// Note: EntryPoint v0.7 uses a *different* packed struct layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: Bytes,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub paymaster_and_data: Bytes,
    pub signature: Bytes,
}

/// Placeholder signature carried by drafts so account validation does not
/// revert on signature length during simulation.
pub fn dummy_signature() -> Bytes {
    Bytes::from(vec![0u8; 65])
}

/// EIP-1559 style fee pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GasFees {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

/// Current relay fee tiers, as returned by the gas price oracle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasPriceTiers {
    pub slow: GasFees,
    pub standard: GasFees,
    pub fast: GasFees,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GasTier {
    Slow,
    Standard,
    #[default]
    Fast,
}

impl GasPriceTiers {
    pub fn tier(&self, tier: GasTier) -> GasFees {
        match tier {
            GasTier::Slow => self.slow,
            GasTier::Standard => self.standard,
            GasTier::Fast => self.fast,
        }
    }
}

/// Authoritative gas limits plus sponsorship payload returned by the fee
/// sponsor. All four fields overwrite whatever the builder seeded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SponsorshipResult {
    pub pre_verification_gas: U256,
    pub verification_gas_limit: U256,
    pub call_gas_limit: U256,
    pub paymaster_and_data: Bytes,
}

/// Gas limits from the relay's dry-run estimate (unsponsored path).
#[derive(Debug, Clone)]
pub struct GasEstimates {
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
}

/// Draft operation. Gas limits are placeholders and the signature is a dummy;
/// both must be finalized before signing.
#[derive(Clone, Debug)]
pub struct UnsignedOperation {
    pub(crate) op: UserOperation,
}

/// Operation with final gas fields (set by the fee sponsor, or by a bundler
/// estimate when unsponsored). The only input `OperationSigner::sign` accepts.
#[derive(Clone, Debug)]
pub struct SponsoredOperation {
    pub(crate) op: UserOperation,
}

/// Signed operation. Immutable: any field change would invalidate the
/// signature, so no mutating access is exposed.
#[derive(Clone, Debug)]
pub struct SignedOperation {
    pub(crate) op: UserOperation,
}

impl UnsignedOperation {
    pub fn fields(&self) -> &UserOperation {
        &self.op
    }

    /// Merge the sponsor's result into the operation verbatim. This is the
    /// only path from draft to signable in the sponsored flow; a mismatch
    /// between sponsored and signed gas values fails validation on chain.
    pub fn apply_sponsorship(mut self, sponsorship: SponsorshipResult) -> SponsoredOperation {
        self.op.pre_verification_gas = sponsorship.pre_verification_gas;
        self.op.verification_gas_limit = sponsorship.verification_gas_limit;
        self.op.call_gas_limit = sponsorship.call_gas_limit;
        self.op.paymaster_and_data = sponsorship.paymaster_and_data;
        SponsoredOperation { op: self.op }
    }

    /// Finalize gas limits from a bundler estimate, without sponsorship.
    /// Used by the direct flow where the account pays its own gas.
    pub fn apply_gas_estimates(mut self, est: GasEstimates) -> SponsoredOperation {
        self.op.call_gas_limit = est.call_gas_limit;
        self.op.verification_gas_limit = est.verification_gas_limit;
        self.op.pre_verification_gas = est.pre_verification_gas;
        SponsoredOperation { op: self.op }
    }
}

impl SponsoredOperation {
    pub fn fields(&self) -> &UserOperation {
        &self.op
    }
}

impl SignedOperation {
    pub fn fields(&self) -> &UserOperation {
        &self.op
    }

    pub fn signature(&self) -> &Bytes {
        &self.op.signature
    }
}

/// Inclusion receipt from the relay network.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Relay-assigned operation hash.
    pub user_op_hash: H256,
    /// Whether the operation's execution succeeded.
    pub success: bool,
    /// Hash of the chain transaction the bundle landed in.
    pub transaction_hash: H256,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> UnsignedOperation {
        UnsignedOperation {
            op: UserOperation {
                sender: Address::repeat_byte(0x11),
                nonce: U256::from(7),
                init_code: Bytes::default(),
                call_data: Bytes::from(vec![0xde, 0xad]),
                call_gas_limit: U256::zero(),
                verification_gas_limit: U256::zero(),
                pre_verification_gas: U256::zero(),
                max_fee_per_gas: U256::from(100),
                max_priority_fee_per_gas: U256::from(10),
                paymaster_and_data: Bytes::default(),
                signature: dummy_signature(),
            },
        }
    }

    #[test]
    fn sponsorship_fields_are_copied_verbatim() {
        let sponsorship = SponsorshipResult {
            pre_verification_gas: U256::from(21000),
            verification_gas_limit: U256::from(150000),
            call_gas_limit: U256::from(90000),
            paymaster_and_data: Bytes::from(vec![0xaa; 52]),
        };
        let sponsored = draft().apply_sponsorship(sponsorship.clone());
        let op = sponsored.fields();
        assert_eq!(op.pre_verification_gas, sponsorship.pre_verification_gas);
        assert_eq!(op.verification_gas_limit, sponsorship.verification_gas_limit);
        assert_eq!(op.call_gas_limit, sponsorship.call_gas_limit);
        assert_eq!(op.paymaster_and_data, sponsorship.paymaster_and_data);
        // untouched fields survive the merge
        assert_eq!(op.nonce, U256::from(7));
        assert_eq!(op.max_fee_per_gas, U256::from(100));
    }

    #[test]
    fn gas_estimates_leave_paymaster_payload_empty() {
        let sponsored = draft().apply_gas_estimates(GasEstimates {
            call_gas_limit: U256::from(1),
            verification_gas_limit: U256::from(2),
            pre_verification_gas: U256::from(3),
        });
        assert!(sponsored.fields().paymaster_and_data.is_empty());
        assert_eq!(sponsored.fields().call_gas_limit, U256::from(1));
    }

    #[test]
    fn default_tier_is_fast() {
        let tiers = GasPriceTiers {
            slow: GasFees {
                max_fee_per_gas: U256::from(1),
                max_priority_fee_per_gas: U256::from(1),
            },
            standard: GasFees {
                max_fee_per_gas: U256::from(2),
                max_priority_fee_per_gas: U256::from(2),
            },
            fast: GasFees {
                max_fee_per_gas: U256::from(3),
                max_priority_fee_per_gas: U256::from(3),
            },
        };
        assert_eq!(tiers.tier(GasTier::default()).max_fee_per_gas, U256::from(3));
        assert_eq!(tiers.tier(GasTier::Slow).max_fee_per_gas, U256::from(1));
    }
}

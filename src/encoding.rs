use crate::error::{Error, Result};
use crate::types::UserOperation;
use ethers::abi::{AbiParser, Token};
use ethers::types::{Address, Bytes, H256, U256};
use serde_json::Value;

pub fn fmt_address(addr: Address) -> String {
    format!("0x{}", hex::encode(addr.as_bytes()))
}

pub fn fmt_h256(h: H256) -> String {
    format!("0x{}", hex::encode(h.as_bytes()))
}

/// JSON-RPC "quantity" encoding.
pub fn fmt_u256(v: U256) -> String {
    if v.is_zero() {
        "0x0".to_string()
    } else {
        format!("0x{:x}", v)
    }
}

pub fn fmt_bytes(b: &Bytes) -> String {
    format!("0x{}", hex::encode(b.as_ref()))
}

pub fn parse_u256_quantity(s: &str) -> Result<U256> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(s, 16).map_err(|e| Error::Response(format!("bad quantity {s:?}: {e}")))
}

pub fn parse_h256(s: &str) -> Result<H256> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| Error::Response(format!("bad hex: {e}")))?;
    if bytes.len() != 32 {
        return Err(Error::Response(format!(
            "expected 32-byte hex, got {} bytes",
            bytes.len()
        )));
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(H256(arr))
}

pub fn parse_bytes(s: &str) -> Result<Bytes> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| Error::Response(format!("bad hex: {e}")))?;
    Ok(Bytes::from(bytes))
}

/// Pull a quantity-encoded field out of a JSON-RPC result object.
pub(crate) fn parse_u256_field(v: &Value, key: &str) -> Result<U256> {
    let s = v
        .get(key)
        .and_then(|x| x.as_str())
        .ok_or_else(|| Error::Response(format!("missing or invalid field {key}")))?;
    parse_u256_quantity(s)
}

/// UserOperation as the JSON-RPC object bundlers and paymasters expect.
pub fn user_op_to_json(op: &UserOperation) -> Value {
    serde_json::json!({
        "sender": fmt_address(op.sender),
        "nonce": fmt_u256(op.nonce),
        "initCode": fmt_bytes(&op.init_code),
        "callData": fmt_bytes(&op.call_data),
        "callGasLimit": fmt_u256(op.call_gas_limit),
        "verificationGasLimit": fmt_u256(op.verification_gas_limit),
        "preVerificationGas": fmt_u256(op.pre_verification_gas),
        "maxFeePerGas": fmt_u256(op.max_fee_per_gas),
        "maxPriorityFeePerGas": fmt_u256(op.max_priority_fee_per_gas),
        "paymasterAndData": fmt_bytes(&op.paymaster_and_data),
        "signature": fmt_bytes(&op.signature),
    })
}

fn encode_call(decl: &str, name: &str, tokens: &[Token]) -> Result<Bytes> {
    let abi = AbiParser::default()
        .parse(&[decl])
        .map_err(|e| Error::Encoding(format!("{name}: {e}")))?;
    let func = abi
        .function(name)
        .map_err(|e| Error::Encoding(format!("{name}: {e}")))?;
    let data = func
        .encode_input(tokens)
        .map_err(|e| Error::Encoding(format!("{name}: {e}")))?;
    Ok(Bytes::from(data))
}

/// ERC-20 `approve(spender, amount)` call data.
pub fn approve_call_data(spender: Address, amount: U256) -> Result<Bytes> {
    encode_call(
        "function approve(address spender, uint256 amount) returns (bool)",
        "approve",
        &[Token::Address(spender), Token::Uint(amount)],
    )
}

/// `execute(dest, value, func)` on the smart account, wrapping an arbitrary
/// call for submission through a user operation.
pub fn execute_call_data(dest: Address, value: U256, data: &Bytes) -> Result<Bytes> {
    encode_call(
        "function execute(address dest, uint256 value, bytes func)",
        "execute",
        &[
            Token::Address(dest),
            Token::Uint(value),
            Token::Bytes(data.to_vec()),
        ],
    )
}

/// Factory `createAccount(owner, salt)` call data.
pub fn create_account_call_data(owner: Address, salt: U256) -> Result<Bytes> {
    encode_call(
        "function createAccount(address owner, uint256 salt) returns (address)",
        "createAccount",
        &[Token::Address(owner), Token::Uint(salt)],
    )
}

/// Factory call deploying the account and running one-time setup calls in the
/// same transaction.
pub fn create_account_with_calls_call_data(
    owner: Address,
    salt: U256,
    dests: &[Address],
    datas: &[Bytes],
) -> Result<Bytes> {
    encode_call(
        "function createAccountWithCalls(address owner, uint256 salt, address[] dests, bytes[] funcs) returns (address)",
        "createAccountWithCalls",
        &[
            Token::Address(owner),
            Token::Uint(salt),
            Token::Array(dests.iter().map(|d| Token::Address(*d)).collect()),
            Token::Array(datas.iter().map(|d| Token::Bytes(d.to_vec())).collect()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::dummy_signature;

    #[test]
    fn approve_selector_and_args() {
        let spender = Address::repeat_byte(0x22);
        let data = approve_call_data(spender, U256::from(1_000_000u64)).unwrap();
        // approve(address,uint256)
        assert_eq!(&data[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(data.len(), 4 + 32 + 32);
        // spender is right-aligned in the first word
        assert_eq!(&data[16..36], spender.as_bytes());
    }

    #[test]
    fn execute_selector() {
        let data = execute_call_data(
            Address::repeat_byte(0x33),
            U256::zero(),
            &Bytes::from(vec![0x68, 0x65, 0x6c, 0x6c, 0x6f]),
        )
        .unwrap();
        // execute(address,uint256,bytes)
        assert_eq!(&data[..4], &[0xb6, 0x1d, 0x27, 0xf6]);
    }

    #[test]
    fn create_account_selector() {
        let data = create_account_call_data(Address::repeat_byte(0x44), U256::zero()).unwrap();
        // createAccount(address,uint256)
        assert_eq!(&data[..4], &[0x5f, 0xbf, 0xb9, 0xcf]);
    }

    #[test]
    fn create_account_with_calls_is_deterministic() {
        let owner = Address::repeat_byte(0x55);
        let dests = [Address::repeat_byte(0x66)];
        let datas = [Bytes::from(vec![0x01, 0x02])];
        let a = create_account_with_calls_call_data(owner, U256::one(), &dests, &datas).unwrap();
        let b = create_account_with_calls_call_data(owner, U256::one(), &dests, &datas).unwrap();
        assert_eq!(a, b);
        assert_ne!(
            a,
            create_account_with_calls_call_data(owner, U256::from(2), &dests, &datas).unwrap()
        );
    }

    #[test]
    fn quantity_round_trip() {
        assert_eq!(fmt_u256(U256::zero()), "0x0");
        assert_eq!(fmt_u256(U256::from(255)), "0xff");
        assert_eq!(parse_u256_quantity("0xff").unwrap(), U256::from(255));
        assert_eq!(parse_u256_quantity("0x").unwrap(), U256::zero());
        assert!(parse_u256_quantity("0xzz").is_err());
    }

    #[test]
    fn h256_parsing_rejects_wrong_length() {
        assert!(parse_h256("0x1234").is_err());
        let h = parse_h256(&format!("0x{}", "11".repeat(32))).unwrap();
        assert_eq!(h, H256::repeat_byte(0x11));
    }

    #[test]
    fn user_op_json_field_names() {
        let op = UserOperation {
            sender: Address::repeat_byte(0x01),
            nonce: U256::zero(),
            init_code: Bytes::default(),
            call_data: Bytes::default(),
            call_gas_limit: U256::zero(),
            verification_gas_limit: U256::zero(),
            pre_verification_gas: U256::zero(),
            max_fee_per_gas: U256::from(7),
            max_priority_fee_per_gas: U256::from(7),
            paymaster_and_data: Bytes::default(),
            signature: dummy_signature(),
        };
        let v = user_op_to_json(&op);
        assert_eq!(v["nonce"], "0x0");
        assert_eq!(v["initCode"], "0x");
        assert_eq!(v["maxFeePerGas"], "0x7");
        assert_eq!(v["signature"].as_str().unwrap().len(), 2 + 65 * 2);
    }
}

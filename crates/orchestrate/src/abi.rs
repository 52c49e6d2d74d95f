//! Minimal static-word ABI encoding.
//!
//! The orchestrator only ever passes addresses, 32-byte identifiers,
//! amounts, and booleans, so a full ABI implementation is not needed:
//! every argument encodes to exactly one 32-byte word. Dynamic types
//! are intentionally unsupported.

use alloy_core::primitives::{Address, B256, U256, keccak256};

use crate::manifest::ArgValue;

/// Canonical call signature, e.g. `setCompanyTreasuryManagerAddress(address)`.
pub fn signature(method: &str, args: &[ArgValue]) -> String {
    let types: Vec<&str> = args.iter().map(ArgValue::sol_type).collect();
    format!("{}({})", method, types.join(","))
}

/// 4-byte function selector for a canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Encode a single value into its 32-byte ABI word.
pub fn encode_word(value: &ArgValue) -> B256 {
    match value {
        ArgValue::Bool(v) => B256::left_padding_from(&[u8::from(*v)]),
        ArgValue::Address(v) => B256::left_padding_from(v.as_slice()),
        ArgValue::Word(v) => *v,
        ArgValue::Uint(v) => B256::from(*v),
    }
}

/// The ABI word a view call returns when its result is `address`.
pub fn address_word(address: Address) -> B256 {
    B256::left_padding_from(address.as_slice())
}

/// Hex calldata for a method call: selector followed by one word per
/// argument.
pub fn encode_call(method: &str, args: &[ArgValue]) -> String {
    let mut data = String::with_capacity(10 + args.len() * 64);
    data.push_str("0x");
    data.push_str(&hex::encode(selector(&signature(method, args))));
    for arg in args {
        data.push_str(&hex::encode(encode_word(arg)));
    }
    data
}

/// Hex calldata for a deployment: creation bytecode followed by one
/// word per constructor argument (constructors have no selector).
pub fn encode_deployment(bytecode: &str, args: &[ArgValue]) -> String {
    let mut data = String::with_capacity(bytecode.len() + args.len() * 64);
    data.push_str(bytecode);
    for arg in args {
        data.push_str(&hex::encode(encode_word(arg)));
    }
    data
}

/// Parse a 32-byte word from the hex payload of an `eth_call` result.
pub fn decode_word(hex_result: &str) -> Option<B256> {
    let stripped = hex_result.trim_start_matches("0x");
    // Static returns are a single word; take the first one. `get`
    // rather than a slice: the payload came off the wire and may be
    // short or not even hex.
    stripped.get(..64)?.parse().ok()
}

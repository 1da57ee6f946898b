//! Suspension payloads for the CALL and CREATE families.
//!
//! The interpreter decodes the operands, decides the forwarded gas and
//! packages everything the executor needs to push a child frame. The parent's
//! memory and stack are not touched again until the child's result is fed
//! back on resumption.

use primitive_types::{H160, H256, U256};
use rlp::RlpStream;
use sha3::{Digest, Keccak256};

use crate::frame::Context;

/// Flavor of a nested message call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CallScheme {
	/// `CALL`
	Call,
	/// `CALLCODE`
	CallCode,
	/// `DELEGATECALL`
	DelegateCall,
	/// `STATICCALL`
	StaticCall,
}

/// Balance movement performed at child-frame entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Transfer {
	/// Paying account.
	pub source: H160,
	/// Receiving account.
	pub target: H160,
	/// Amount moved.
	pub value: U256,
}

/// A decoded, gas-funded nested call waiting for a child frame.
#[derive(Clone, Debug)]
pub struct CallPlan {
	/// Call flavor.
	pub scheme: CallScheme,
	/// Account whose code runs.
	pub code_address: H160,
	/// Identity the child executes under.
	pub context: Context,
	/// Value movement, `None` for DELEGATECALL and STATICCALL.
	pub transfer: Option<Transfer>,
	/// Input data captured from the parent's memory.
	pub input: Vec<u8>,
	/// Gas handed to the child, stipend included.
	pub gas: u64,
	/// Whether the child runs in a static context.
	pub is_static: bool,
	/// Destination of the clamped output in the parent's memory.
	pub out_offset: usize,
	/// Output length the parent asked for.
	pub out_len: usize,
}

/// A decoded, collision-checked contract creation waiting for a child frame.
#[derive(Clone, Debug)]
pub struct CreatePlan {
	/// Address the contract will live at.
	pub address: H160,
	/// Creating account.
	pub caller: H160,
	/// Endowment moved into the new account.
	pub value: U256,
	/// Init code to run.
	pub init_code: Vec<u8>,
	/// Gas handed to the child.
	pub gas: u64,
}

/// Either kind of suspended child.
#[derive(Clone, Debug)]
pub enum ChildPlan {
	/// Message call.
	Call(CallPlan),
	/// Contract creation.
	Create(CreatePlan),
}

/// `CREATE` address: `keccak(rlp([sender, sender_nonce]))[12..]`.
pub fn legacy_create_address(caller: H160, nonce: U256) -> H160 {
	let mut stream = RlpStream::new_list(2);
	stream.append(&caller);
	stream.append(&nonce);
	let hash = Keccak256::digest(stream.out());
	H160::from_slice(&hash[12..])
}

/// `CREATE2` address: `keccak(0xff ++ caller ++ salt ++ keccak(init_code))[12..]`.
pub fn salted_create_address(caller: H160, salt: H256, code_hash: H256) -> H160 {
	let mut hasher = Keccak256::new();
	hasher.update([0xff]);
	hasher.update(caller.as_bytes());
	hasher.update(salt.as_bytes());
	hasher.update(code_hash.as_bytes());
	let hash = hasher.finalize();
	H160::from_slice(&hash[12..])
}

#[cfg(test)]
mod tests {
	use super::*;
	use hex_literal::hex;

	#[test]
	fn legacy_address_derivation() {
		// Well-known vector: sender 0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0, nonce 0.
		let caller = H160::from_slice(&hex!("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0"));
		assert_eq!(
			legacy_create_address(caller, U256::zero()),
			H160::from_slice(&hex!("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"))
		);
		assert_eq!(
			legacy_create_address(caller, U256::one()),
			H160::from_slice(&hex!("343c43a37d37dff08ae8c4a11544c718abb4fcf8"))
		);
	}

	#[test]
	fn salted_address_derivation() {
		// EIP-1014 example 0: deployer 0x00..00, salt 0, init code 0x00.
		let code_hash = crate::utils::keccak256(&hex!("00"));
		assert_eq!(
			salted_create_address(H160::zero(), H256::zero(), code_hash),
			H160::from_slice(&hex!("4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38"))
		);
	}
}

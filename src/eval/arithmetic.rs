//! Arithmetic opcode semantics, mod 2^256.

use primitive_types::{U256, U512};

/// Sign-and-magnitude view of a word. `U256::MAX` reads as -1.
fn strip_sign(value: U256) -> (U256, bool) {
	let negative = value.bit(255);
	if negative {
		((!value).overflowing_add(U256::one()).0, true)
	} else {
		(value, false)
	}
}

fn apply_sign(magnitude: U256, negative: bool) -> U256 {
	if negative {
		(!magnitude).overflowing_add(U256::one()).0
	} else {
		magnitude
	}
}

pub fn div(op1: U256, op2: U256) -> U256 {
	if op2.is_zero() {
		U256::zero()
	} else {
		op1 / op2
	}
}

pub fn sdiv(op1: U256, op2: U256) -> U256 {
	if op2.is_zero() {
		return U256::zero();
	}

	let min = U256::one() << 255;
	if op1 == min && op2 == U256::MAX {
		// -2^255 / -1 overflows; clamp to -2^255.
		return min;
	}

	let (dividend, dividend_negative) = strip_sign(op1);
	let (divisor, divisor_negative) = strip_sign(op2);
	apply_sign(dividend / divisor, dividend_negative ^ divisor_negative)
}

pub fn rem(op1: U256, op2: U256) -> U256 {
	if op2.is_zero() {
		U256::zero()
	} else {
		op1 % op2
	}
}

pub fn srem(op1: U256, op2: U256) -> U256 {
	if op2.is_zero() {
		return U256::zero();
	}

	let (dividend, dividend_negative) = strip_sign(op1);
	let (divisor, _) = strip_sign(op2);
	// Result sign follows the dividend.
	apply_sign(dividend % divisor, dividend_negative)
}

pub fn addmod(op1: U256, op2: U256, op3: U256) -> U256 {
	if op3.is_zero() {
		return U256::zero();
	}
	let sum = U512::from(op1) + U512::from(op2);
	let reduced = sum % U512::from(op3);
	U256::try_from(reduced).expect("modulus fits 256 bits, so does the remainder")
}

pub fn mulmod(op1: U256, op2: U256, op3: U256) -> U256 {
	if op3.is_zero() {
		return U256::zero();
	}
	let product = U512::from(op1) * U512::from(op2);
	let reduced = product % U512::from(op3);
	U256::try_from(reduced).expect("modulus fits 256 bits, so does the remainder")
}

pub fn exp(op1: U256, op2: U256) -> U256 {
	op1.overflowing_pow(op2).0
}

pub fn signextend(op1: U256, op2: U256) -> U256 {
	if op1 >= U256::from(31) {
		return op2;
	}
	let bit_position = op1.as_usize() * 8 + 7;
	let mask = (U256::one() << bit_position) - U256::one();
	if op2.bit(bit_position) {
		op2 | !mask
	} else {
		op2 & mask
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn neg(value: u64) -> U256 {
		(!U256::from(value)).overflowing_add(U256::one()).0
	}

	#[test]
	fn division_by_zero_is_zero() {
		assert_eq!(div(U256::from(7), U256::zero()), U256::zero());
		assert_eq!(rem(U256::from(7), U256::zero()), U256::zero());
		assert_eq!(sdiv(neg(7), U256::zero()), U256::zero());
		assert_eq!(srem(neg(7), U256::zero()), U256::zero());
	}

	#[test]
	fn signed_division() {
		assert_eq!(sdiv(neg(100), U256::from(2)), neg(50));
		assert_eq!(sdiv(U256::from(100), neg(2)), neg(50));
		assert_eq!(sdiv(neg(100), neg(2)), U256::from(50));

		// Overflow clamp: -2^255 / -1 = -2^255.
		let min = U256::one() << 255;
		assert_eq!(sdiv(min, U256::MAX), min);
	}

	#[test]
	fn signed_remainder_follows_dividend() {
		assert_eq!(srem(neg(7), U256::from(3)), neg(1));
		assert_eq!(srem(U256::from(7), neg(3)), U256::from(1));
	}

	#[test]
	fn modular_ops_with_zero_modulus() {
		assert_eq!(addmod(U256::MAX, U256::MAX, U256::zero()), U256::zero());
		assert_eq!(mulmod(U256::MAX, U256::MAX, U256::zero()), U256::zero());
	}

	#[test]
	fn modular_ops_compute_in_wide_precision() {
		// (2^256 - 1) + 1 would wrap in 256 bits.
		assert_eq!(addmod(U256::MAX, U256::one(), U256::from(7)), {
			// 2^256 mod 7 = 4 (2^256 = 7k + 4)
			U256::from(4)
		});
		assert_eq!(
			mulmod(U256::MAX, U256::MAX, U256::MAX),
			U256::zero()
		);
	}

	#[test]
	fn sign_extension() {
		// Byte 0 = 0xff extends to -1.
		assert_eq!(signextend(U256::zero(), U256::from(0xff)), U256::MAX);
		assert_eq!(signextend(U256::zero(), U256::from(0x7f)), U256::from(0x7f));
		// k >= 31 is the identity.
		assert_eq!(signextend(U256::from(31), U256::MAX), U256::MAX);
		assert_eq!(signextend(U256::from(100), U256::from(5)), U256::from(5));
	}

	#[test]
	fn exp_wraps() {
		assert_eq!(exp(U256::from(2), U256::from(256)), U256::zero());
		assert_eq!(exp(U256::from(3), U256::from(4)), U256::from(81));
	}
}

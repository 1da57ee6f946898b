//! Fork gates and gas constants.

/// Fork-parameterized feature gates and pricing. The interpreter and the
/// executor never hard-code a fork: everything they vary on is queried here.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Schedule {
	/// Contract creation fails instead of deploying empty code when the
	/// deposit cannot be paid.
	pub eip2: bool,
	/// DELEGATECALL is available.
	pub eip7: bool,
	/// Gas repricing of state-reading opcodes, 63/64 gas forwarding.
	pub eip150: bool,
	/// Replay-protected transaction signatures. Carried for transaction-level
	/// callers; the interpreter itself does not consult it.
	pub eip155: bool,
	/// Empty-account semantics: dead accounts, touch-and-sweep.
	pub eip158: bool,
	/// EXP per-byte repricing.
	pub eip160: bool,
	/// REVERT is available.
	pub eip140: bool,
	/// RETURNDATASIZE / RETURNDATACOPY are available.
	pub eip211: bool,
	/// STATICCALL is available.
	pub eip214: bool,
	/// SHL / SHR / SAR are available.
	pub eip145: bool,
	/// CREATE2 is available.
	pub eip1014: bool,
	/// EXTCODEHASH is available.
	pub eip1052: bool,
}

impl Schedule {
	/// Frontier rules.
	pub const fn frontier() -> Schedule {
		Schedule {
			eip2: false,
			eip7: false,
			eip150: false,
			eip155: false,
			eip158: false,
			eip160: false,
			eip140: false,
			eip211: false,
			eip214: false,
			eip145: false,
			eip1014: false,
			eip1052: false,
		}
	}

	/// Homestead.
	pub const fn homestead() -> Schedule {
		let mut schedule = Self::frontier();
		schedule.eip2 = true;
		schedule.eip7 = true;
		schedule
	}

	/// Tangerine Whistle.
	pub const fn tangerine_whistle() -> Schedule {
		let mut schedule = Self::homestead();
		schedule.eip150 = true;
		schedule
	}

	/// Spurious Dragon.
	pub const fn spurious_dragon() -> Schedule {
		let mut schedule = Self::tangerine_whistle();
		schedule.eip155 = true;
		schedule.eip158 = true;
		schedule.eip160 = true;
		schedule
	}

	/// Byzantium.
	pub const fn byzantium() -> Schedule {
		let mut schedule = Self::spurious_dragon();
		schedule.eip140 = true;
		schedule.eip211 = true;
		schedule.eip214 = true;
		schedule
	}

	/// Constantinople.
	pub const fn constantinople() -> Schedule {
		let mut schedule = Self::byzantium();
		schedule.eip145 = true;
		schedule.eip1014 = true;
		schedule.eip1052 = true;
		schedule
	}
}

impl Schedule {
	/// Gas for BALANCE.
	pub const fn gas_balance(&self) -> u64 {
		if self.eip150 {
			400
		} else {
			20
		}
	}

	/// Gas for EXTCODESIZE.
	pub const fn gas_ext_code_size(&self) -> u64 {
		if self.eip150 {
			700
		} else {
			20
		}
	}

	/// Base gas for EXTCODECOPY.
	pub const fn gas_ext_code(&self) -> u64 {
		if self.eip150 {
			700
		} else {
			20
		}
	}

	/// Gas for EXTCODEHASH.
	pub const fn gas_ext_code_hash(&self) -> u64 {
		400
	}

	/// Gas for SLOAD.
	pub const fn gas_sload(&self) -> u64 {
		if self.eip150 {
			200
		} else {
			50
		}
	}

	/// Gas for SSTORE writing a non-zero value into an empty slot.
	pub const fn gas_sstore_set(&self) -> u64 {
		20000
	}

	/// Gas for every other SSTORE.
	pub const fn gas_sstore_reset(&self) -> u64 {
		5000
	}

	/// Refund for clearing a storage slot.
	pub const fn refund_sstore_clear(&self) -> u64 {
		15000
	}

	/// Refund for the first SELFDESTRUCT of an account.
	pub const fn refund_selfdestruct(&self) -> u64 {
		24000
	}

	/// Base gas for the CALL family.
	pub const fn gas_call(&self) -> u64 {
		if self.eip150 {
			700
		} else {
			40
		}
	}

	/// Surcharge for a value-transferring CALL or CALLCODE.
	pub const fn gas_call_value(&self) -> u64 {
		9000
	}

	/// Gas handed to the callee of a value transfer on top of what the
	/// caller paid for.
	pub const fn call_stipend(&self) -> u64 {
		2300
	}

	/// Surcharge for a CALL that brings a new account into existence.
	pub const fn gas_new_account(&self) -> u64 {
		25000
	}

	/// Gas for SELFDESTRUCT.
	pub const fn gas_selfdestruct(&self) -> u64 {
		if self.eip150 {
			5000
		} else {
			0
		}
	}

	/// Surcharge for SELFDESTRUCT whose inheritor must be created.
	pub const fn gas_selfdestruct_new_account(&self) -> u64 {
		if self.eip150 {
			25000
		} else {
			0
		}
	}

	/// Base gas for SHA3.
	pub const fn gas_sha3(&self) -> u64 {
		30
	}

	/// Gas per hashed word.
	pub const fn gas_sha3_word(&self) -> u64 {
		6
	}

	/// Gas per memory word.
	pub const fn gas_memory(&self) -> u64 {
		3
	}

	/// Divisor of the quadratic memory term.
	pub const fn quad_coeff_div(&self) -> u64 {
		512
	}

	/// Gas per byte of deployed contract code.
	pub const fn gas_code_deposit(&self) -> u64 {
		200
	}

	/// Gas for JUMPDEST.
	pub const fn gas_jumpdest(&self) -> u64 {
		1
	}

	/// Base gas for LOGn.
	pub const fn gas_log(&self) -> u64 {
		375
	}

	/// Gas per log topic.
	pub const fn gas_log_topic(&self) -> u64 {
		375
	}

	/// Gas per byte of log data.
	pub const fn gas_log_data(&self) -> u64 {
		8
	}

	/// Base gas for EXP.
	pub const fn gas_exp(&self) -> u64 {
		10
	}

	/// Gas per byte of the EXP exponent.
	pub const fn gas_exp_byte(&self) -> u64 {
		if self.eip160 {
			50
		} else {
			10
		}
	}

	/// Base gas for CREATE and CREATE2.
	pub const fn gas_create(&self) -> u64 {
		32000
	}

	/// Gas per copied word for the COPY instructions.
	pub const fn gas_copy(&self) -> u64 {
		3
	}

	/// Gas for BLOCKHASH.
	pub const fn gas_blockhash(&self) -> u64 {
		20
	}

	/// Base gas of the fixed pricing tiers, indexed Zero..High.
	pub const fn tier_step_gas(&self) -> [u64; 6] {
		[0, 2, 3, 5, 8, 10]
	}

	/// Maximum nesting depth of call frames.
	pub const fn max_call_depth(&self) -> usize {
		1024
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fork_ladder_is_monotonic() {
		let frontier = Schedule::frontier();
		assert!(!frontier.eip150 && !frontier.eip7);

		let tangerine = Schedule::tangerine_whistle();
		assert!(tangerine.eip2 && tangerine.eip7 && tangerine.eip150);
		assert!(!tangerine.eip158);

		let byzantium = Schedule::byzantium();
		assert!(byzantium.eip140 && byzantium.eip211 && byzantium.eip214);
		assert!(!byzantium.eip145);

		let constantinople = Schedule::constantinople();
		assert!(constantinople.eip145 && constantinople.eip1014 && constantinople.eip1052);
	}

	#[test]
	fn repricing_follows_gates() {
		assert_eq!(Schedule::homestead().gas_call(), 40);
		assert_eq!(Schedule::tangerine_whistle().gas_call(), 700);
		assert_eq!(Schedule::homestead().gas_exp_byte(), 10);
		assert_eq!(Schedule::spurious_dragon().gas_exp_byte(), 50);
	}
}

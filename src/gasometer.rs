//! Gas accounting.
//!
//! Every instruction is priced before any of its effects happen: base tier,
//! schedule-dependent flat costs, operand-dependent surcharges, memory
//! growth, and for CALL/CREATE the gas forwarded to the child. The charge is
//! taken in one piece; if it does not fit the remaining gas the frame faults
//! with `OutOfGas` and nothing was mutated.

use primitive_types::{H256, U256};

use crate::error::Fault;
use crate::frame::Frame;
use crate::host::Host;
use crate::opcode::{InstructionInfo, Opcode, Tier};
use crate::schedule::Schedule;
use crate::state::StorageKey;
use crate::utils;

/// Priced requirements of one instruction.
#[derive(Clone, Copy, Debug)]
pub struct Requirements {
	/// Total gas to charge, forwarded child gas included.
	pub gas_cost: u64,
	/// Gas handed to the child; `Some` exactly for the CALL/CREATE family.
	pub provided_gas: Option<u64>,
	/// Memory size in bytes the instruction needs, word-aligned.
	pub memory_required_size: usize,
	/// Total memory gas after the instruction, for carrying forward.
	pub memory_total_gas: u64,
}

/// Running gas state of one step batch.
#[derive(Clone, Copy, Debug)]
pub struct Gasometer {
	/// Remaining gas.
	pub gas: u64,
	/// Gas already paid for the current memory size.
	pub memory_gas: u64,
}

enum Pricing {
	/// Flat cost.
	Gas(u64),
	/// Flat cost plus growth to a memory end offset.
	GasMem(u64, U256),
	/// Flat cost, growth, and gas forwarded to a child. `None` requests
	/// everything that remains.
	GasMemProvide(u64, U256, Option<U256>),
	/// Flat cost, growth, and a per-word copy surcharge.
	GasMemCopy(u64, U256, U256),
}

impl Gasometer {
	/// Gasometer for a frame that currently holds `gas` and has grown its
	/// memory to `memory_words` words. The memory gas already paid is derived
	/// from the size, so a resumed frame is charged only for further growth.
	pub fn new(gas: u64, memory_words: usize, schedule: &Schedule) -> Result<Self, Fault> {
		Ok(Self {
			gas,
			memory_gas: memory_gas(schedule, memory_words as u64)?,
		})
	}

	/// Subtract `cost`, faulting with `OutOfGas` when it does not fit.
	pub fn charge(&mut self, cost: u64) -> Result<(), Fault> {
		self.gas = self.gas.checked_sub(cost).ok_or(Fault::OutOfGas)?;
		Ok(())
	}

	/// Return gas reserved for a child that was never spawned.
	pub fn refund(&mut self, unused: u64) {
		self.gas += unused;
	}

	/// Price `opcode` against the current frame and store state.
	pub fn requirements(
		&self,
		host: &Host,
		frame: &Frame,
		opcode: Opcode,
		info: &InstructionInfo,
	) -> Result<Requirements, Fault> {
		let schedule = host.schedule;
		let stack = &frame.stack;
		let default_gas = match info.tier {
			Tier::Zero => 0,
			Tier::Base => schedule.tier_step_gas()[1],
			Tier::VeryLow => schedule.tier_step_gas()[2],
			Tier::Low => schedule.tier_step_gas()[3],
			Tier::Mid => schedule.tier_step_gas()[4],
			Tier::High => schedule.tier_step_gas()[5],
			Tier::Ext | Tier::Special => 0,
			Tier::Invalid => return Err(Fault::InvalidInstruction(opcode)),
		};

		let pricing = match opcode {
			Opcode::JUMPDEST => Pricing::Gas(schedule.gas_jumpdest()),
			Opcode::SLOAD => Pricing::Gas(schedule.gas_sload()),
			Opcode::BALANCE => Pricing::Gas(schedule.gas_balance()),
			Opcode::EXTCODESIZE => Pricing::Gas(schedule.gas_ext_code_size()),
			Opcode::EXTCODEHASH => Pricing::Gas(schedule.gas_ext_code_hash()),
			Opcode::BLOCKHASH => Pricing::Gas(schedule.gas_blockhash()),
			Opcode::SSTORE => {
				let index = utils::u256_to_h256(stack.peek(0)?);
				let new_value = stack.peek(1)?;
				let key = StorageKey::new(frame.context.address, index);
				let current = U256::from_big_endian(&host.storage.get(&key));

				// SReset is charged unconditionally; setting a zero slot to a
				// non-zero value pays the difference up to SSet. The clear
				// refund is granted when the write happens.
				let mut gas = schedule.gas_sstore_reset();
				if current.is_zero() && !new_value.is_zero() {
					gas += schedule.gas_sstore_set() - schedule.gas_sstore_reset();
				}
				Pricing::Gas(gas)
			}
			Opcode::SELFDESTRUCT => {
				let inheritor = utils::u256_to_address(stack.peek(0)?);
				let mut gas = schedule.gas_selfdestruct();
				let needs_new_account = if schedule.eip158 {
					!host.state.get_balance(frame.context.address).is_zero()
						&& host.state.is_dead_account(inheritor)
				} else {
					!host.state.account_exists(inheritor)
				};
				if needs_new_account {
					gas = gas
						.checked_add(schedule.gas_selfdestruct_new_account())
						.ok_or(Fault::ArithmeticOverflow)?;
				}
				Pricing::Gas(gas)
			}
			Opcode::EXP => {
				let exponent = stack.peek(1)?;
				let byte_len = (exponent.bits() as u64 + 7) / 8;
				Pricing::Gas(schedule.gas_exp() + schedule.gas_exp_byte() * byte_len)
			}
			Opcode::MLOAD | Opcode::MSTORE => {
				Pricing::GasMem(default_gas, mem_end(stack.peek(0)?, U256::from(32))?)
			}
			Opcode::MSTORE8 => Pricing::GasMem(default_gas, mem_end(stack.peek(0)?, U256::one())?),
			Opcode::RETURN | Opcode::REVERT => {
				Pricing::GasMem(default_gas, mem_end(stack.peek(0)?, stack.peek(1)?)?)
			}
			Opcode::SHA3 => {
				let len = stack.peek(1)?;
				let words = word_count(len)?;
				let gas = schedule
					.gas_sha3()
					.checked_add(
						schedule
							.gas_sha3_word()
							.checked_mul(words)
							.ok_or(Fault::ArithmeticOverflow)?,
					)
					.ok_or(Fault::ArithmeticOverflow)?;
				Pricing::GasMem(gas, mem_end(stack.peek(0)?, len)?)
			}
			Opcode::CALLDATACOPY | Opcode::CODECOPY | Opcode::RETURNDATACOPY => Pricing::GasMemCopy(
				default_gas,
				mem_end(stack.peek(0)?, stack.peek(2)?)?,
				stack.peek(2)?,
			),
			Opcode::EXTCODECOPY => Pricing::GasMemCopy(
				schedule.gas_ext_code(),
				mem_end(stack.peek(1)?, stack.peek(3)?)?,
				stack.peek(3)?,
			),
			_ if opcode.is_log().is_some() => {
				let topics = opcode.is_log().expect("guard checked is_log") as u64;
				let len = stack.peek(1)?;
				let data_gas = u256_to_gas(len)?
					.checked_mul(schedule.gas_log_data())
					.ok_or(Fault::ArithmeticOverflow)?;
				let gas = (schedule.gas_log() + schedule.gas_log_topic() * topics)
					.checked_add(data_gas)
					.ok_or(Fault::ArithmeticOverflow)?;
				Pricing::GasMem(gas, mem_end(stack.peek(0)?, len)?)
			}
			Opcode::CALL | Opcode::CALLCODE => {
				let mut gas = schedule.gas_call();
				let end = core::cmp::max(
					mem_end(stack.peek(3)?, stack.peek(4)?)?,
					mem_end(stack.peek(5)?, stack.peek(6)?)?,
				);

				let target = utils::u256_to_address(stack.peek(1)?);
				let transfers_value = !stack.peek(2)?.is_zero();

				if opcode == Opcode::CALL {
					let brings_to_life = if schedule.eip158 {
						transfers_value && host.state.is_dead_account(target)
					} else {
						!host.state.account_exists(target)
					};
					if brings_to_life {
						gas += schedule.gas_new_account();
					}
				}
				if transfers_value {
					gas += schedule.gas_call_value();
				}

				Pricing::GasMemProvide(gas, end, Some(stack.peek(0)?))
			}
			Opcode::DELEGATECALL | Opcode::STATICCALL => {
				let end = core::cmp::max(
					mem_end(stack.peek(2)?, stack.peek(3)?)?,
					mem_end(stack.peek(4)?, stack.peek(5)?)?,
				);
				Pricing::GasMemProvide(schedule.gas_call(), end, Some(stack.peek(0)?))
			}
			Opcode::CREATE => Pricing::GasMemProvide(
				schedule.gas_create(),
				mem_end(stack.peek(1)?, stack.peek(2)?)?,
				None,
			),
			Opcode::CREATE2 => {
				let len = stack.peek(2)?;
				let words = word_count(len)?;
				let gas = schedule
					.gas_create()
					.checked_add(
						schedule
							.gas_sha3_word()
							.checked_mul(words)
							.ok_or(Fault::ArithmeticOverflow)?,
					)
					.ok_or(Fault::ArithmeticOverflow)?;
				Pricing::GasMemProvide(gas, mem_end(stack.peek(1)?, len)?, None)
			}
			_ => Pricing::Gas(default_gas),
		};

		self.finish(schedule, frame.memory.len(), pricing)
	}

	fn finish(
		&self,
		schedule: &Schedule,
		current_mem_size: usize,
		pricing: Pricing,
	) -> Result<Requirements, Fault> {
		Ok(match pricing {
			Pricing::Gas(gas) => Requirements {
				gas_cost: gas,
				provided_gas: None,
				memory_required_size: current_mem_size,
				memory_total_gas: self.memory_gas,
			},
			Pricing::GasMem(gas, end) => {
				let (growth, total, size) = self.mem_growth(schedule, current_mem_size, end)?;
				Requirements {
					gas_cost: gas.checked_add(growth).ok_or(Fault::ArithmeticOverflow)?,
					provided_gas: None,
					memory_required_size: size,
					memory_total_gas: total,
				}
			}
			Pricing::GasMemProvide(gas, end, requested) => {
				let (growth, total, size) = self.mem_growth(schedule, current_mem_size, end)?;
				let needed = gas.checked_add(growth).ok_or(Fault::ArithmeticOverflow)?;
				let provided = self.gas_provided(schedule, needed, requested)?;
				Requirements {
					gas_cost: needed
						.checked_add(provided)
						.ok_or(Fault::ArithmeticOverflow)?,
					provided_gas: Some(provided),
					memory_required_size: size,
					memory_total_gas: total,
				}
			}
			Pricing::GasMemCopy(gas, end, copied) => {
				let (growth, total, size) = self.mem_growth(schedule, current_mem_size, end)?;
				let copy_gas = word_count(copied)?
					.checked_mul(schedule.gas_copy())
					.ok_or(Fault::ArithmeticOverflow)?;
				let gas_cost = gas
					.checked_add(growth)
					.and_then(|gas| gas.checked_add(copy_gas))
					.ok_or(Fault::ArithmeticOverflow)?;
				Requirements {
					gas_cost,
					provided_gas: None,
					memory_required_size: size,
					memory_total_gas: total,
				}
			}
		})
	}

	/// Growth charge for extending memory to the byte offset `end`: the cost
	/// difference between the new and the current word count, charged exactly
	/// once per size transition.
	fn mem_growth(
		&self,
		schedule: &Schedule,
		current_mem_size: usize,
		end: U256,
	) -> Result<(u64, u64, usize), Fault> {
		let end = u256_to_gas(end)?;
		let new_words = end.checked_add(31).ok_or(Fault::ArithmeticOverflow)? / 32;
		let new_size = new_words
			.checked_mul(32)
			.ok_or(Fault::ArithmeticOverflow)?;

		if new_size <= current_mem_size as u64 {
			return Ok((0, self.memory_gas, current_mem_size));
		}

		let total = memory_gas(schedule, new_words)?;
		let growth = total - self.memory_gas;
		let new_size = usize::try_from(new_size).map_err(|_| Fault::ArithmeticOverflow)?;
		Ok((growth, total, new_size))
	}

	/// Gas handed to a CALL/CREATE child, given that `needed` is about to be
	/// charged for the operation itself. With EIP-150 the request is capped
	/// at 63/64 of what would remain; before it, requesting more gas than is
	/// available is an out-of-gas fault at charge time.
	fn gas_provided(
		&self,
		schedule: &Schedule,
		needed: u64,
		requested: Option<U256>,
	) -> Result<u64, Fault> {
		if schedule.eip150 {
			let after = self.gas.saturating_sub(needed);
			let max_provided = after - after / 64;
			Ok(match requested {
				Some(requested) if requested <= U256::from(max_provided) => requested.as_u64(),
				_ => max_provided,
			})
		} else {
			match requested {
				Some(requested) => u256_to_gas(requested).map_err(|_| Fault::OutOfGas),
				None => Ok(self.gas.saturating_sub(needed)),
			}
		}
	}
}

/// `cost(words) = Memory · words + words² / QuadCoeffDiv`.
fn memory_gas(schedule: &Schedule, words: u64) -> Result<u64, Fault> {
	let linear = (words as u128) * schedule.gas_memory() as u128;
	let quadratic = (words as u128) * (words as u128) / schedule.quad_coeff_div() as u128;
	u64::try_from(linear + quadratic).map_err(|_| Fault::ArithmeticOverflow)
}

/// End offset of a memory access; zero-length accesses never touch memory.
fn mem_end(offset: U256, len: U256) -> Result<U256, Fault> {
	if len.is_zero() {
		return Ok(U256::zero());
	}
	offset.checked_add(len).ok_or(Fault::ArithmeticOverflow)
}

fn u256_to_gas(value: U256) -> Result<u64, Fault> {
	if value > U256::from(u64::MAX) {
		return Err(Fault::ArithmeticOverflow);
	}
	Ok(value.as_u64())
}

/// Words covering `len` bytes.
fn word_count(len: U256) -> Result<u64, Fault> {
	let len = u256_to_gas(len)?;
	Ok(len
		.checked_add(31)
		.ok_or(Fault::ArithmeticOverflow)?
		/ 32)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn quadratic_memory_pricing() {
		let schedule = Schedule::byzantium();
		assert_eq!(memory_gas(&schedule, 0).unwrap(), 0);
		assert_eq!(memory_gas(&schedule, 1).unwrap(), 3);
		assert_eq!(memory_gas(&schedule, 32).unwrap(), 98);
		// 1024 words: 3072 + 2048
		assert_eq!(memory_gas(&schedule, 1024).unwrap(), 5120);
	}

	#[test]
	fn growth_charged_once_per_transition() {
		let schedule = Schedule::byzantium();
		let mut meter = Gasometer::new(10_000, 0, &schedule).unwrap();

		let (growth, total, size) = meter
			.mem_growth(&schedule, 0, U256::from(32))
			.unwrap();
		assert_eq!((growth, total, size), (3, 3, 32));
		meter.memory_gas = total;

		// Same size again: free.
		let (growth, _, _) = meter
			.mem_growth(&schedule, 32, U256::from(16))
			.unwrap();
		assert_eq!(growth, 0);
	}

	#[test]
	fn sixty_three_sixty_fourths_cap() {
		let schedule = Schedule::tangerine_whistle();
		let meter = Gasometer::new(6400, 0, &schedule).unwrap();
		let provided = meter
			.gas_provided(&schedule, 0, Some(U256::MAX))
			.unwrap();
		assert_eq!(provided, 6400 - 6400 / 64);
	}

	#[test]
	fn pre_eip150_overlarge_request_is_oog() {
		let schedule = Schedule::homestead();
		let meter = Gasometer::new(6400, 0, &schedule).unwrap();
		assert_eq!(
			meter.gas_provided(&schedule, 0, Some(U256::MAX)),
			Err(Fault::OutOfGas)
		);
		assert_eq!(
			meter.gas_provided(&schedule, 0, Some(U256::from(10_000))),
			Ok(10_000)
		);
	}
}

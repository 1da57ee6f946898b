//! The call orchestrator.
//!
//! Owns a LIFO of suspended frames. The interpreter runs exactly one frame
//! at a time; when it suspends on a CALL/CREATE the executor pushes a child,
//! and when a frame terminates the executor applies its result to the parent:
//! gas and accumulators merge on success, snapshots roll back on revert and
//! fault, and the child's result word and output are staged for the parent's
//! resumption.

use std::rc::Rc;
use std::sync::Arc;

use log::debug;
use primitive_types::{H160, U256};

use crate::call::{CallPlan, CallScheme, ChildPlan, CreatePlan, Transfer};
use crate::code::{CodeCache, CodeInfo};
use crate::error::{Fault, StepOutcome};
use crate::frame::{Context, Environment, Frame, FrameKind, Resume, Substate};
use crate::host::Host;
use crate::interpreter;
use crate::precompile::Precompiles;
use crate::schedule::Schedule;
use crate::state::{BalanceDelta, BlockHashOracle, StateStore, StorageStore};
use crate::tracing::TraceSink;
use crate::utils;

/// Reborrow an `Option<&mut dyn TraceSink>` field for a shorter lifetime.
/// Written as a standalone generic function (rather than inlined via
/// `as_deref_mut`) so the borrow checker can shrink the trait object's
/// lifetime instead of forcing it to match the field's declared lifetime.
fn reborrow_tracer<'s, 't: 's>(
	tracer: &'s mut Option<&'t mut dyn TraceSink>,
) -> Option<&'s mut dyn TraceSink> {
	match tracer {
		Some(tracer) => Some(&mut **tracer),
		None => None,
	}
}

/// Result of a completed (non-faulted) transaction-level execution.
#[derive(Debug)]
pub struct Executed {
	/// Output bytes of the root frame.
	pub output: Vec<u8>,
	/// Gas remaining in the root frame.
	pub gas_left: u64,
	/// Merged transaction substate.
	pub substate: Substate,
}

/// Drives frames against a set of stores for one transaction.
pub struct Executor<'a> {
	schedule: &'a Schedule,
	env: Environment,
	state: &'a mut dyn StateStore,
	storage: &'a mut dyn StorageStore,
	block_hashes: &'a dyn BlockHashOracle,
	precompiles: &'a Precompiles,
	code_cache: &'a CodeCache,
	tracer: Option<&'a mut dyn TraceSink>,
	/// Account whose EIP-158 touch must survive an out-of-gas precompile
	/// call with a zero value transfer, replicating the historical Parity
	/// behavior. At most one such call can be in flight.
	pending_touch: Option<H160>,
}

impl<'a> Executor<'a> {
	/// Executor over the given collaborators.
	pub fn new(
		schedule: &'a Schedule,
		env: Environment,
		state: &'a mut dyn StateStore,
		storage: &'a mut dyn StorageStore,
		block_hashes: &'a dyn BlockHashOracle,
		precompiles: &'a Precompiles,
		code_cache: &'a CodeCache,
	) -> Self {
		Self {
			schedule,
			env,
			state,
			storage,
			block_hashes,
			precompiles,
			code_cache,
			tracer: None,
			pending_touch: None,
		}
	}

	/// Attach a per-opcode trace sink.
	pub fn set_tracer(&mut self, tracer: &'a mut dyn TraceSink) {
		self.tracer = Some(tracer);
	}

	/// Run `frame` (a root frame whose snapshots were taken at construction)
	/// to completion. Halts and reverts return the output and substate; a
	/// fault on the root surfaces as a transaction-level failure with all
	/// gas consumed.
	pub fn run(&mut self, frame: Frame) -> Result<Executed, Fault> {
		let mut suspended: Vec<Frame> = Vec::new();
		let mut current = frame;

		loop {
			let outcome = if current.kind.is_precompile() {
				self.run_precompile(&mut current)
			} else {
				self.step(&mut current)
			};

			match outcome {
				StepOutcome::Suspend(plan) => {
					debug!(target: "vm", "frame at depth {} suspended", current.depth);
					let child = match *plan {
						ChildPlan::Call(plan) => self.enter_call(&current, plan),
						ChildPlan::Create(plan) => self.enter_create(&current, plan),
					};
					suspended.push(current);
					current = child;
				}
				StepOutcome::Halt(output) => {
					if current.kind.is_root() {
						return Ok(self.finish_root(current, output, false));
					}
					let child = current;
					current = suspended.pop().expect("non-root frame has a parent; qed");
					self.exit_halt(child, &mut current, output);
				}
				StepOutcome::Revert(output) => {
					if current.kind.is_root() {
						return Ok(self.finish_root(current, output, true));
					}
					let child = current;
					current = suspended.pop().expect("non-root frame has a parent; qed");
					self.exit_revert(child, &mut current, output);
				}
				StepOutcome::Fault(fault) => {
					debug!(target: "vm", "frame at depth {} faulted: {}", current.depth, fault);
					if current.kind.is_root() {
						self.unwind(&current, &fault);
						return Err(fault);
					}
					let child = current;
					current = suspended.pop().expect("non-root frame has a parent; qed");
					self.exit_fault(child, &mut current, fault);
				}
			}
		}
	}

	/// Run one interpreter step for `current` against a freshly-borrowed
	/// [`Host`]. Split out of [`Self::run`] so the host's borrow of `self`'s
	/// fields is scoped to this call instead of the loop's `'a`.
	fn step(&mut self, current: &mut Frame) -> StepOutcome {
		let mut host = Host {
			state: &mut *self.state,
			storage: &mut *self.storage,
			block_hashes: self.block_hashes,
			schedule: self.schedule,
			env: &self.env,
			tracer: reborrow_tracer(&mut self.tracer),
		};
		interpreter::run_frame(current, &mut host)
	}

	/// Convenience entry: a top-level message call. Takes the entry
	/// snapshots, bumps the caller nonce and moves the value the way a
	/// transaction processor would before handing the frame to [`Self::run`].
	/// The caller is assumed to have been balance-checked upstream.
	pub fn transact_call(
		&mut self,
		caller: H160,
		address: H160,
		value: U256,
		data: Vec<u8>,
		gas: u64,
	) -> Result<Executed, Fault> {
		// The nonce bump happens outside the frame snapshot: a reverting
		// root undoes the transfer but not the nonce.
		self.state.increment_nonce(caller);
		let state_snapshot = self.state.take_snapshot();
		let storage_snapshot = self.storage.take_snapshot();

		self.transfer(Transfer {
			source: caller,
			target: address,
			value,
		});

		let (kind, code) = if self.precompiles.contains(address) {
			(
				FrameKind::DirectPrecompile,
				Arc::new(CodeInfo::precompile(address)),
			)
		} else {
			(FrameKind::Transaction, self.load_code(address))
		};

		let frame = Frame::new(
			kind,
			Context {
				address,
				caller,
				apparent_value: value,
			},
			value,
			Rc::new(data),
			code,
			gas,
			state_snapshot,
			storage_snapshot,
			0,
			0,
			false,
			0,
		);
		self.run(frame)
	}

	/// Convenience entry: a top-level contract creation. Returns the created
	/// address along with the execution result; the deposit rules have been
	/// applied and, on success, the code installed.
	pub fn transact_create(
		&mut self,
		caller: H160,
		value: U256,
		init_code: Vec<u8>,
		gas: u64,
	) -> Result<(H160, Executed), Fault> {
		let nonce = self.state.get_nonce(caller);
		let address = crate::call::legacy_create_address(caller, nonce);
		self.state.increment_nonce(caller);

		let state_snapshot = self.state.take_snapshot();
		let storage_snapshot = self.storage.take_snapshot();

		if self.state.account_exists(address) {
			self.state
				.update_balance(address, BalanceDelta::Add(value), self.schedule);
		} else {
			self.state.create_account(address, value);
		}
		self.state
			.update_balance(caller, BalanceDelta::Sub(value), self.schedule);
		if self.schedule.eip158 {
			self.state.increment_nonce(address);
		}

		let mut frame = Frame::new(
			FrameKind::DirectCreate,
			Context {
				address,
				caller,
				apparent_value: value,
			},
			value,
			Rc::new(Vec::new()),
			Arc::new(CodeInfo::new(init_code)),
			gas,
			state_snapshot,
			storage_snapshot,
			0,
			0,
			false,
			0,
		);
		frame.created_address = Some(address);

		let mut executed = self.run(frame)?;
		if !executed.substate.reverted {
			let deposit_cost = self
				.schedule
				.gas_code_deposit()
				.saturating_mul(executed.output.len() as u64);
			if executed.gas_left >= deposit_cost {
				executed.gas_left -= deposit_cost;
				let hash = self.state.update_code(executed.output.clone());
				self.state.update_code_hash(address, hash, self.schedule);
			} else if self.schedule.eip2 {
				self.state.restore(state_snapshot);
				self.storage.restore(storage_snapshot);
				return Err(Fault::OutOfGas);
			} else {
				// Pre-Homestead the deposit is best effort: the code is
				// installed without the charge.
				let hash = self.state.update_code(executed.output.clone());
				self.state.update_code_hash(address, hash, self.schedule);
			}
		}
		Ok((address, executed))
	}

	fn load_code(&self, address: H160) -> Arc<CodeInfo> {
		let hash = self.state.get_code_hash(address);
		let state = &*self.state;
		self.code_cache
			.get_or_insert(hash, || state.get_code(hash))
	}

	/// Build and enter a call child: snapshots first, then the value
	/// transfer, so a failing child rolls the transfer back.
	fn enter_call(&mut self, parent: &Frame, plan: CallPlan) -> Frame {
		let state_snapshot = self.state.take_snapshot();
		let storage_snapshot = self.storage.take_snapshot();

		if let Some(transfer) = plan.transfer {
			self.transfer(transfer);
		}

		let is_precompile = self.precompiles.contains(plan.code_address);
		let (kind, code) = if is_precompile {
			if self.schedule.eip158
				&& plan
					.transfer
					.map(|transfer| transfer.value.is_zero())
					.unwrap_or(false)
			{
				self.pending_touch = Some(plan.code_address);
			}
			(
				FrameKind::Precompile,
				Arc::new(CodeInfo::precompile(plan.code_address)),
			)
		} else {
			let kind = match plan.scheme {
				CallScheme::CallCode => FrameKind::CallCode,
				_ => FrameKind::Call,
			};
			(kind, self.load_code(plan.code_address))
		};

		Frame::new(
			kind,
			plan.context,
			plan.transfer.map(|transfer| transfer.value).unwrap_or_default(),
			Rc::new(plan.input),
			code,
			plan.gas,
			state_snapshot,
			storage_snapshot,
			plan.out_offset,
			plan.out_len,
			plan.is_static,
			parent.depth + 1,
		)
	}

	/// Build and enter a create child. The caller nonce bump happens before
	/// the snapshots: it survives a reverting init frame.
	fn enter_create(&mut self, parent: &Frame, plan: CreatePlan) -> Frame {
		self.state.increment_nonce(plan.caller);

		let state_snapshot = self.state.take_snapshot();
		let storage_snapshot = self.storage.take_snapshot();

		if self.state.account_exists(plan.address) {
			self.state
				.update_balance(plan.address, BalanceDelta::Add(plan.value), self.schedule);
		} else {
			self.state.create_account(plan.address, plan.value);
		}
		self.state
			.update_balance(plan.caller, BalanceDelta::Sub(plan.value), self.schedule);
		if self.schedule.eip158 {
			self.state.increment_nonce(plan.address);
		}

		let mut frame = Frame::new(
			FrameKind::Create,
			Context {
				address: plan.address,
				caller: plan.caller,
				apparent_value: plan.value,
			},
			plan.value,
			Rc::new(Vec::new()),
			Arc::new(CodeInfo::new(plan.init_code)),
			plan.gas,
			state_snapshot,
			storage_snapshot,
			0,
			0,
			parent.is_static,
			parent.depth + 1,
		);
		frame.created_address = Some(plan.address);
		frame
	}

	/// Invoke the precompile handler backing a precompile frame.
	fn run_precompile(&mut self, frame: &mut Frame) -> StepOutcome {
		let address = frame
			.code
			.precompile_address()
			.expect("precompile frames carry the precompile tag; qed");
		let handler = self
			.precompiles
			.get(address)
			.expect("frames are only tagged for registered precompiles; qed");

		let cost = handler
			.base_cost(self.schedule)
			.saturating_add(handler.data_cost(&frame.data, self.schedule));
		if frame.gas < cost {
			frame.gas = 0;
			return StepOutcome::Fault(Fault::OutOfGas);
		}
		frame.gas -= cost;

		let (output, ok) = handler.run(&frame.data);
		if ok {
			StepOutcome::Halt(output)
		} else {
			StepOutcome::Fault(Fault::PrecompileFailure)
		}
	}

	/// A child halted: keep its effects, merge its accumulators and gas, and
	/// stage its result for the parent.
	fn exit_halt(&mut self, child: Frame, parent: &mut Frame, output: Vec<u8>) {
		self.pending_touch = None;

		if child.kind.is_create() {
			let address = child
				.created_address
				.expect("create frames record their address; qed");
			let mut child_gas = child.gas;

			let deposit_cost = self
				.schedule
				.gas_code_deposit()
				.saturating_mul(output.len() as u64);
			if child_gas >= deposit_cost {
				child_gas -= deposit_cost;
				let hash = self.state.update_code(output);
				self.state.update_code_hash(address, hash, self.schedule);
			} else if self.schedule.eip2 {
				// The deposit cannot be paid: the create fails outright and
				// the entry snapshot erases the half-made account.
				self.state.restore(child.state_snapshot);
				self.storage.restore(child.storage_snapshot);
				parent.retbuf = Vec::new();
				parent.resume = Some(Resume {
					result: U256::zero(),
					output: Vec::new(),
					out_offset: 0,
					out_len: 0,
				});
				return;
			} else {
				// Pre-Homestead the deposit is best effort: the code is
				// installed without the charge.
				let hash = self.state.update_code(output);
				self.state.update_code_hash(address, hash, self.schedule);
			}

			parent.gas += child_gas;
			parent.absorb(child.refund, child.destroys, child.logs);
			parent.retbuf = Vec::new();
			parent.resume = Some(Resume {
				result: utils::address_to_u256(address),
				output: Vec::new(),
				out_offset: 0,
				out_len: 0,
			});
		} else {
			parent.gas += child.gas;
			parent.absorb(child.refund, child.destroys, child.logs);
			parent.retbuf = output.clone();
			parent.resume = Some(Resume {
				result: U256::one(),
				output,
				out_offset: child.out_offset,
				out_len: child.out_len,
			});
		}
	}

	/// A child reverted: roll back to its entry snapshots, hand its unused
	/// gas and its output to the parent, and drop its accumulators.
	fn exit_revert(&mut self, child: Frame, parent: &mut Frame, output: Vec<u8>) {
		self.pending_touch = None;
		self.state.restore(child.state_snapshot);
		self.storage.restore(child.storage_snapshot);

		parent.gas += child.gas;
		parent.retbuf = output.clone();
		parent.resume = Some(Resume {
			result: U256::zero(),
			output,
			out_offset: child.out_offset,
			out_len: child.out_len,
		});
	}

	/// A child faulted: roll back, lose its gas, and give the parent a zero
	/// word with empty output and return data.
	fn exit_fault(&mut self, child: Frame, parent: &mut Frame, fault: Fault) {
		if fault == Fault::PrecompileFailure {
			// Handler failure is not an exception: state stays, the child's
			// gas is forfeited, the caller just sees a zero word.
			self.pending_touch = None;
			parent.retbuf = Vec::new();
			parent.resume = Some(Resume {
				result: U256::zero(),
				output: Vec::new(),
				out_offset: 0,
				out_len: 0,
			});
			return;
		}

		self.unwind(&child, &fault);
		parent.retbuf = Vec::new();
		parent.resume = Some(Resume {
			result: U256::zero(),
			output: Vec::new(),
			out_offset: 0,
			out_len: 0,
		});
	}

	/// Snapshot rollback shared by nested and root faults, with the Parity
	/// touch carve-out applied after the restore.
	fn unwind(&mut self, frame: &Frame, fault: &Fault) {
		self.state.restore(frame.state_snapshot);
		self.storage.restore(frame.storage_snapshot);

		if let Some(address) = self.pending_touch.take() {
			if *fault == Fault::OutOfGas && frame.kind.is_precompile() {
				// Re-touch with a zero delta so the empty account is still
				// swept, exactly as Parity did.
				self.state
					.update_balance(address, BalanceDelta::Add(U256::zero()), self.schedule);
			}
		}
	}

	fn finish_root(&mut self, frame: Frame, output: Vec<u8>, reverted: bool) -> Executed {
		if reverted {
			self.state.restore(frame.state_snapshot);
			self.storage.restore(frame.storage_snapshot);
		}
		let gas_left = frame.gas;
		Executed {
			output,
			gas_left,
			substate: frame.into_substate(reverted),
		}
	}

	fn transfer(&mut self, transfer: Transfer) {
		self.state
			.update_balance(transfer.source, BalanceDelta::Sub(transfer.value), self.schedule);
		self.state
			.update_balance(transfer.target, BalanceDelta::Add(transfer.value), self.schedule);
	}
}

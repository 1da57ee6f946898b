//! Ethereum Virtual Machine interpreter with suspendable call frames.
//!
//! The interpreter runs exactly one [`Frame`] at a time and is a pure
//! function of that frame plus its collaborators: it returns a
//! [`StepOutcome`] of halt, revert, fault, or a suspension carrying a
//! decoded CALL/CREATE. The [`Executor`] owns the frame LIFO, enters
//! children (snapshots, transfers, nonces), and applies child results back
//! to parents. Faults are values, never panics; the executor is the only
//! place they turn into frame unwinding.
//!
//! World state lives behind the [`StateStore`] and [`StorageStore`]
//! contracts, which must support LIFO snapshot/restore. Fork behavior is
//! parameterized by a [`Schedule`], from Frontier through Constantinople.

mod backend;
mod call;
mod code;
mod error;
mod eval;
mod executor;
mod frame;
mod gasometer;
mod host;
mod interpreter;
mod memory;
mod opcode;
mod precompile;
mod schedule;
mod stack;
mod state;
mod tracing;
pub mod utils;
mod valids;

pub use crate::backend::{InMemoryState, InMemoryStorage, MapBlockHashes};
pub use crate::call::{
	legacy_create_address, salted_create_address, CallPlan, CallScheme, ChildPlan, CreatePlan,
	Transfer,
};
pub use crate::code::{CodeCache, CodeInfo, CODE_CACHE_CAPACITY};
pub use crate::error::{Fault, StepOutcome};
pub use crate::executor::{Executed, Executor};
pub use crate::frame::{Context, Environment, Frame, FrameKind, Log, Resume, Substate};
pub use crate::memory::Memory;
pub use crate::opcode::{InstructionInfo, Opcode, Tier, INSTRUCTIONS};
pub use crate::precompile::{Identity, Precompile, Precompiles, Sha256Hash};
pub use crate::schedule::Schedule;
pub use crate::stack::{Stack, STACK_LIMIT};
pub use crate::state::{
	BalanceDelta, BlockHashOracle, Snapshot, StateStore, StorageKey, StorageStore,
};
pub use crate::tracing::{CollectingSink, TraceRecord, TraceSink, TraceStep};
pub use crate::valids::Valids;

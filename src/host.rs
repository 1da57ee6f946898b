//! Collaborators visible to a running frame.

use crate::frame::Environment;
use crate::schedule::Schedule;
use crate::state::{BlockHashOracle, StateStore, StorageStore};
use crate::tracing::TraceSink;

/// Borrowed bundle of everything the interpreter may consult while stepping
/// one frame. Owned by the executor and rebuilt per step batch.
pub struct Host<'a> {
	/// Accounts, balances, nonces, code.
	pub state: &'a mut dyn StateStore,
	/// Persistent storage slots.
	pub storage: &'a mut dyn StorageStore,
	/// Historical block hashes.
	pub block_hashes: &'a dyn BlockHashOracle,
	/// Active fork rules.
	pub schedule: &'a Schedule,
	/// Transaction and block environment.
	pub env: &'a Environment,
	/// Optional per-opcode trace sink.
	pub tracer: Option<&'a mut dyn TraceSink>,
}

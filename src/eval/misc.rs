//! Stack, memory, flow and data opcodes.

use primitive_types::U256;

use super::{Control, Exit, Step};
use crate::error::Fault;
use crate::frame::Frame;
use crate::utils;

pub fn stop(_frame: &mut Frame) -> Control {
	Control::Exit(Exit::Halt(Vec::new()))
}

pub fn pop(frame: &mut Frame) -> Control {
	pop_u256!(frame, _value);
	Control::Continue(1)
}

pub fn mload(frame: &mut Frame) -> Control {
	pop_u256!(frame, offset);
	let offset = as_usize_or_fault!(offset, Fault::ArithmeticOverflow);
	let word = frame.memory.load_word(offset);
	push_u256!(frame, utils::h256_to_u256(word));
	Control::Continue(1)
}

pub fn mstore(frame: &mut Frame) -> Control {
	pop_u256!(frame, offset, value);
	let offset = as_usize_or_fault!(offset, Fault::ArithmeticOverflow);
	frame.memory.store_word(offset, value);
	Control::Continue(1)
}

pub fn mstore8(frame: &mut Frame) -> Control {
	pop_u256!(frame, offset, value);
	let offset = as_usize_or_fault!(offset, Fault::ArithmeticOverflow);
	frame.memory.store_byte(offset, value.low_u32() as u8);
	Control::Continue(1)
}

pub fn msize(frame: &mut Frame) -> Control {
	push_u256!(frame, U256::from(frame.memory.len()));
	Control::Continue(1)
}

pub fn pc(frame: &mut Frame, step: Step) -> Control {
	push_u256!(frame, U256::from(step.position));
	Control::Continue(1)
}

pub fn gas(frame: &mut Frame, step: Step) -> Control {
	push_u256!(frame, U256::from(step.gas));
	Control::Continue(1)
}

pub fn jump(frame: &mut Frame) -> Control {
	pop_u256!(frame, dest);
	let dest = as_usize_or_fault!(dest, Fault::InvalidJump);
	Control::Jump(dest)
}

pub fn jumpi(frame: &mut Frame) -> Control {
	pop_u256!(frame, dest, condition);
	if condition.is_zero() {
		Control::Continue(1)
	} else {
		let dest = as_usize_or_fault!(dest, Fault::InvalidJump);
		Control::Jump(dest)
	}
}

pub fn push(frame: &mut Frame, width: usize, step: Step) -> Control {
	let code = frame.code.bytes();
	let end = core::cmp::min(step.position + 1 + width, code.len());
	let slice = &code[step.position + 1..end];

	// Missing immediate bytes at end-of-code read as zero.
	let mut bytes = [0u8; 32];
	bytes[32 - width..32 - width + slice.len()].copy_from_slice(slice);

	push_u256!(frame, U256::from_big_endian(&bytes));
	Control::Continue(1 + width)
}

pub fn dup(frame: &mut Frame, position: usize) -> Control {
	match frame.stack.dup(position) {
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(Exit::Fault(e)),
	}
}

pub fn swap(frame: &mut Frame, depth: usize) -> Control {
	match frame.stack.swap(depth) {
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(Exit::Fault(e)),
	}
}

pub fn calldataload(frame: &mut Frame) -> Control {
	pop_u256!(frame, index);
	let word = utils::slice_padded(&frame.data, index, 32);
	push_u256!(frame, U256::from_big_endian(&word));
	Control::Continue(1)
}

pub fn calldatasize(frame: &mut Frame) -> Control {
	push_u256!(frame, U256::from(frame.data.len()));
	Control::Continue(1)
}

pub fn calldatacopy(frame: &mut Frame) -> Control {
	copy_to_memory(frame, |frame| frame.data.clone())
}

pub fn codesize(frame: &mut Frame) -> Control {
	push_u256!(frame, U256::from(frame.code.len()));
	Control::Continue(1)
}

pub fn codecopy(frame: &mut Frame) -> Control {
	pop_u256!(frame, memory_offset, code_offset, len);
	if len.is_zero() {
		return Control::Continue(1);
	}
	let memory_offset = as_usize_or_fault!(memory_offset, Fault::ArithmeticOverflow);
	let len = as_usize_or_fault!(len, Fault::ArithmeticOverflow);
	let code = frame.code.clone();
	frame
		.memory
		.copy_from(memory_offset, code_offset, len, code.bytes());
	Control::Continue(1)
}

pub fn returndatasize(frame: &mut Frame) -> Control {
	push_u256!(frame, U256::from(frame.retbuf.len()));
	Control::Continue(1)
}

pub fn returndatacopy(frame: &mut Frame) -> Control {
	pop_u256!(frame, memory_offset, data_offset, len);

	// Unlike the other copies, reading past the return buffer is a fault,
	// not zero fill.
	let buffer_len = U256::from(frame.retbuf.len());
	match data_offset.checked_add(len) {
		Some(end) if end <= buffer_len => (),
		_ => return Control::Exit(Exit::Fault(Fault::AccessViolation)),
	}

	if len.is_zero() {
		return Control::Continue(1);
	}
	let memory_offset = as_usize_or_fault!(memory_offset, Fault::ArithmeticOverflow);
	let len = as_usize_or_fault!(len, Fault::ArithmeticOverflow);
	let data = core::mem::take(&mut frame.retbuf);
	frame.memory.copy_from(memory_offset, data_offset, len, &data);
	frame.retbuf = data;
	Control::Continue(1)
}

pub fn ret(frame: &mut Frame) -> Control {
	pop_u256!(frame, offset, len);
	Control::Exit(Exit::Halt(capture_output(frame, offset, len)))
}

pub fn revert(frame: &mut Frame) -> Control {
	pop_u256!(frame, offset, len);
	Control::Exit(Exit::Revert(capture_output(frame, offset, len)))
}

fn capture_output(frame: &Frame, offset: U256, len: U256) -> Vec<u8> {
	// Growth for [offset, offset+len) was charged before evaluation, so the
	// conversions cannot fail on a path that got this far.
	if len.is_zero() {
		return Vec::new();
	}
	frame.memory.get(offset.low_u64() as usize, len.low_u64() as usize)
}

fn copy_to_memory<F>(frame: &mut Frame, source: F) -> Control
where
	F: FnOnce(&Frame) -> std::rc::Rc<Vec<u8>>,
{
	pop_u256!(frame, memory_offset, data_offset, len);
	if len.is_zero() {
		return Control::Continue(1);
	}
	let memory_offset = as_usize_or_fault!(memory_offset, Fault::ArithmeticOverflow);
	let len = as_usize_or_fault!(len, Fault::ArithmeticOverflow);
	let data = source(frame);
	frame.memory.copy_from(memory_offset, data_offset, len, &data);
	Control::Continue(1)
}

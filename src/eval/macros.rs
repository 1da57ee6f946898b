macro_rules! try_or_fault {
	( $e:expr ) => {
		match $e {
			Ok(v) => v,
			Err(e) => return Control::Exit(Exit::Fault(e)),
		}
	};
}

macro_rules! pop_u256 {
	( $frame:expr, $( $x:ident ),* ) => (
		$(
			let $x = match $frame.stack.pop() {
				Ok(value) => value,
				Err(e) => return Control::Exit(Exit::Fault(e)),
			};
		)*
	);
}

macro_rules! push_u256 {
	( $frame:expr, $( $x:expr ),* ) => (
		$(
			match $frame.stack.push($x) {
				Ok(()) => (),
				Err(e) => return Control::Exit(Exit::Fault(e)),
			}
		)*
	)
}

macro_rules! as_usize_or_fault {
	( $v:expr, $fault:expr ) => {{
		if $v > U256::from(usize::MAX) {
			return Control::Exit(Exit::Fault($fault));
		}
		$v.as_usize()
	}};
}

macro_rules! op1_u256_fn {
	( $frame:expr, $op:path ) => {{
		pop_u256!($frame, op1);
		let ret = $op(op1);
		push_u256!($frame, ret);
		Control::Continue(1)
	}};
}

macro_rules! op2_u256_tuple {
	( $frame:expr, $op:ident ) => {{
		pop_u256!($frame, op1, op2);
		let (ret, _) = op1.$op(op2);
		push_u256!($frame, ret);
		Control::Continue(1)
	}};
}

macro_rules! op2_u256 {
	( $frame:expr, $op:ident ) => {{
		pop_u256!($frame, op1, op2);
		let ret = op1.$op(op2);
		push_u256!($frame, ret);
		Control::Continue(1)
	}};
}

macro_rules! op2_u256_bool_ref {
	( $frame:expr, $op:ident ) => {{
		pop_u256!($frame, op1, op2);
		let ret = op1.$op(&op2);
		push_u256!($frame, if ret { U256::one() } else { U256::zero() });
		Control::Continue(1)
	}};
}

macro_rules! op2_u256_fn {
	( $frame:expr, $op:path ) => {{
		pop_u256!($frame, op1, op2);
		let ret = $op(op1, op2);
		push_u256!($frame, ret);
		Control::Continue(1)
	}};
}

macro_rules! op3_u256_fn {
	( $frame:expr, $op:path ) => {{
		pop_u256!($frame, op1, op2, op3);
		let ret = $op(op1, op2, op3);
		push_u256!($frame, ret);
		Control::Continue(1)
	}};
}

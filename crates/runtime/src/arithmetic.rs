//! Arithmetic and comparison built-ins.
//!
//! Each built-in is a static `ManagedType` descriptor whose invoke
//! function reads its operands from the top of the spill stack (last
//! argument first) and leaves the result in `top`. Arithmetic uses
//! wrapping semantics; comparisons and the bitwise operators produce
//! plain numbers, with 1/0 standing in for true/false.

use crate::error::fatal_error;
use crate::stack::{pop_operand, set_top};
use crate::value::{ManagedType, ManagedVariable};

/// Pop two operands and require both to be numbers.
fn binary_numbers(op_name: &str) -> Option<(i64, i64)> {
    let b = pop_operand();
    let a = pop_operand();
    if !a.is_number() || !b.is_number() {
        fatal_error(&format!("{op_name} expects numbers"));
        return None;
    }
    Some((unsafe { a.as_number() }, unsafe { b.as_number() }))
}

unsafe extern "C" fn invoke_add() {
    if let Some((a, b)) = binary_numbers("+") {
        set_top(ManagedVariable::number(a.wrapping_add(b)));
    }
}

unsafe extern "C" fn invoke_subtract() {
    if let Some((a, b)) = binary_numbers("-") {
        set_top(ManagedVariable::number(a.wrapping_sub(b)));
    }
}

unsafe extern "C" fn invoke_equals() {
    if let Some((a, b)) = binary_numbers("=") {
        set_top(ManagedVariable::number((a == b) as i64));
    }
}

unsafe extern "C" fn invoke_less_than() {
    if let Some((a, b)) = binary_numbers("<") {
        set_top(ManagedVariable::number((a < b) as i64));
    }
}

unsafe extern "C" fn invoke_bitwise_or() {
    if let Some((a, b)) = binary_numbers("or") {
        set_top(ManagedVariable::number(a | b));
    }
}

unsafe extern "C" fn invoke_bitwise_and() {
    if let Some((a, b)) = binary_numbers("and") {
        set_top(ManagedVariable::number(a & b));
    }
}

#[unsafe(export_name = "sup_builtin_add")]
pub static BUILTIN_ADD: ManagedType = ManagedType {
    name: c"+".as_ptr(),
    invoke: invoke_add,
};

#[unsafe(export_name = "sup_builtin_subtract")]
pub static BUILTIN_SUBTRACT: ManagedType = ManagedType {
    name: c"-".as_ptr(),
    invoke: invoke_subtract,
};

#[unsafe(export_name = "sup_builtin_equals")]
pub static BUILTIN_EQUALS: ManagedType = ManagedType {
    name: c"=".as_ptr(),
    invoke: invoke_equals,
};

#[unsafe(export_name = "sup_builtin_less_than")]
pub static BUILTIN_LESS_THAN: ManagedType = ManagedType {
    name: c"<".as_ptr(),
    invoke: invoke_less_than,
};

#[unsafe(export_name = "sup_builtin_bitwise_or")]
pub static BUILTIN_BITWISE_OR: ManagedType = ManagedType {
    name: c"or".as_ptr(),
    invoke: invoke_bitwise_or,
};

#[unsafe(export_name = "sup_builtin_bitwise_and")]
pub static BUILTIN_BITWISE_AND: ManagedType = ManagedType {
    name: c"and".as_ptr(),
    invoke: invoke_bitwise_and,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{set_silent_fatals, take_crash_message};
    use crate::stack::{reset, sup_push_number, top_value};
    use serial_test::serial;

    fn binary_op(invoke: unsafe extern "C" fn(), a: i64, b: i64) -> i64 {
        reset();
        sup_push_number(a);
        sup_push_number(b);
        // Simulate the call site: the callee descriptor replaces `top`,
        // and the operands sit spilled on the stack.
        unsafe { invoke() };
        unsafe { top_value().as_number() }
    }

    #[test]
    #[serial]
    fn test_add_subtract() {
        assert_eq!(binary_op(invoke_add, 40, 2), 42);
        assert_eq!(binary_op(invoke_subtract, 40, 2), 38);
        assert_eq!(binary_op(invoke_add, i64::MAX, 1), i64::MIN);
    }

    #[test]
    #[serial]
    fn test_comparisons() {
        assert_eq!(binary_op(invoke_equals, 3, 3), 1);
        assert_eq!(binary_op(invoke_equals, 3, 4), 0);
        assert_eq!(binary_op(invoke_less_than, 3, 4), 1);
        assert_eq!(binary_op(invoke_less_than, 4, 3), 0);
        assert_eq!(binary_op(invoke_less_than, -1, 0), 1);
    }

    #[test]
    #[serial]
    fn test_bitwise() {
        assert_eq!(binary_op(invoke_bitwise_or, 0b1010, 0b0110), 0b1110);
        assert_eq!(binary_op(invoke_bitwise_and, 0b1010, 0b0110), 0b0010);
    }

    #[test]
    #[serial]
    fn test_non_number_operand_is_fatal() {
        reset();
        set_silent_fatals(true);
        let _ = take_crash_message();
        unsafe { crate::stack::sup_push_string(c"3".as_ptr()) };
        sup_push_number(4);
        unsafe { invoke_add() };
        assert_eq!(take_crash_message().as_deref(), Some("+ expects numbers"));
    }
}

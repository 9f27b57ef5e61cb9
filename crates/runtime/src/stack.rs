//! The spill stack, the bind array, and the accumulator.
//!
//! Generated code keeps the value it is currently working on in `top`
//! and spills to `stack` when it needs to start a new sub-expression:
//! every push operation saves the previous `top` with `supStackDup`, and
//! every consumer (`supBind`, `supSet`, the built-ins) restores it, so a
//! fully evaluated expression nets exactly one spilled slot with its
//! result in `top`.
//!
//! `binds` holds lexical locals, 1-based from the bottom. `supGet(h)`
//! reads `binds[binds_index - h]`, so hop 0 is the innermost binding.
//! Scope save/restore of `binds_index` is emitted by the code generator;
//! this module only moves values.
//!
//! All state is process-global with C linkage because compiled programs
//! address the symbols directly (`top.v.number` in conditionals, the
//! snapshot locals around scopes).

use crate::closures;
use crate::error::fatal_error;
use crate::value::{ManagedType, ManagedVariable, VmGlobal};

pub const STACK_SIZE: usize = 1024;

#[unsafe(export_name = "top")]
pub static TOP: VmGlobal<ManagedVariable> = VmGlobal::new(ManagedVariable::number(0));

#[unsafe(export_name = "stack")]
pub static STACK: VmGlobal<[ManagedVariable; STACK_SIZE]> =
    VmGlobal::new([ManagedVariable::number(0); STACK_SIZE]);

#[unsafe(export_name = "stack_index")]
pub static STACK_INDEX: VmGlobal<i64> = VmGlobal::new(0);

#[unsafe(export_name = "binds")]
pub static BINDS: VmGlobal<[ManagedVariable; STACK_SIZE]> =
    VmGlobal::new([ManagedVariable::number(0); STACK_SIZE]);

#[unsafe(export_name = "binds_index")]
pub static BINDS_INDEX: VmGlobal<i64> = VmGlobal::new(0);

/// Read the accumulator.
pub fn top_value() -> ManagedVariable {
    unsafe { *TOP.get() }
}

pub(crate) fn set_top(value: ManagedVariable) {
    unsafe { *TOP.get() = value }
}

/// Pop one operand off the spill stack. Built-ins read their arguments
/// this way, last argument first.
pub(crate) fn pop_operand() -> ManagedVariable {
    unsafe {
        let index = *STACK_INDEX.get() - 1;
        if index < 0 {
            fatal_error("stack underflow");
            return ManagedVariable::number(0);
        }
        *STACK_INDEX.get() = index;
        (*STACK.get())[index as usize]
    }
}

/// Spill `top` onto the stack.
#[unsafe(export_name = "supStackDup")]
pub extern "C" fn sup_stack_dup() {
    unsafe {
        let index = *STACK_INDEX.get();
        (*STACK.get())[index as usize] = *TOP.get();
        *STACK_INDEX.get() = index + 1;
    }
}

/// Pop the stack back into `top`.
#[unsafe(export_name = "supStackDrop")]
pub extern "C" fn sup_stack_drop() {
    unsafe {
        let index = *STACK_INDEX.get() - 1;
        if index < 0 {
            fatal_error("stack underflow");
            return;
        }
        *STACK_INDEX.get() = index;
        *TOP.get() = (*STACK.get())[index as usize];
    }
}

/// Push a number literal: spill the old `top`, make the number current.
#[unsafe(export_name = "supPushNumber")]
pub extern "C" fn sup_push_number(value: i64) {
    sup_stack_dup();
    set_top(ManagedVariable::number(value));
}

/// Push a string literal.
///
/// # Safety
/// `text` must be a valid NUL-terminated string that outlives all uses
/// of the value (generated code passes C string literals).
#[unsafe(export_name = "supPushString")]
pub unsafe extern "C" fn sup_push_string(text: *const std::ffi::c_char) {
    sup_stack_dup();
    set_top(ManagedVariable::string(text));
}

/// Push a callable value, snapshotting the current closure chain into
/// its payload.
///
/// # Safety
/// `kind` must point to a static descriptor.
#[unsafe(export_name = "supPushLambda")]
pub unsafe extern "C" fn sup_push_lambda(kind: *const ManagedType) {
    sup_stack_dup();
    set_top(ManagedVariable::lambda(kind, closures::context()));
}

/// Advance `binds_index`, store `top` there, and restore the previous
/// `top` from the stack.
#[unsafe(export_name = "supBind")]
pub extern "C" fn sup_bind() {
    unsafe {
        let index = *BINDS_INDEX.get() + 1;
        *BINDS_INDEX.get() = index;
        (*BINDS.get())[index as usize] = *TOP.get();
    }
    sup_stack_drop();
}

/// Load the binding `hops` slots below the innermost into `top`.
#[unsafe(export_name = "supGet")]
pub extern "C" fn sup_get(hops: i64) {
    sup_stack_dup();
    unsafe {
        let slot = *BINDS_INDEX.get() - hops;
        if slot < 1 {
            fatal_error("bind reference out of range");
            return;
        }
        *TOP.get() = (*BINDS.get())[slot as usize];
    }
}

/// Overwrite the binding `hops` slots below the innermost with `top`,
/// then restore the previous `top`.
#[unsafe(export_name = "supSet")]
pub extern "C" fn sup_set(hops: i64) {
    unsafe {
        let slot = *BINDS_INDEX.get() - hops;
        if slot < 1 {
            fatal_error("bind reference out of range");
            return;
        }
        (*BINDS.get())[slot as usize] = *TOP.get();
    }
    sup_stack_drop();
}

/// Invoke the value in `top` through its descriptor.
///
/// # Safety
/// `top.kind` must point to a live descriptor; the callee's stack-effect
/// contract is the caller's responsibility.
#[unsafe(export_name = "supCall")]
pub unsafe extern "C" fn sup_call() {
    unsafe {
        let callee = *TOP.get();
        ((*callee.kind).invoke)();
    }
}

/// Reset the whole VM to its startup state. Test support.
pub fn reset() {
    unsafe {
        *TOP.get() = ManagedVariable::number(0);
        *STACK_INDEX.get() = 0;
        *BINDS_INDEX.get() = 0;
    }
    closures::reset_context();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{set_silent_fatals, take_crash_message};
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_dup_drop_round_trip() {
        reset();
        sup_push_number(7);
        sup_stack_dup();
        set_top(ManagedVariable::number(99));
        sup_stack_drop();
        assert_eq!(unsafe { top_value().as_number() }, 7);
    }

    #[test]
    #[serial]
    fn test_push_spills_previous_top() {
        reset();
        sup_push_number(1);
        sup_push_number(2);
        // The first push spilled the startup zero, the second spilled 1.
        assert_eq!(unsafe { top_value().as_number() }, 2);
        sup_stack_drop();
        assert_eq!(unsafe { top_value().as_number() }, 1);
    }

    #[test]
    #[serial]
    fn test_bind_stores_and_restores() {
        reset();
        sup_push_number(41);
        sup_bind();
        // Bind consumed the 41 and restored the startup zero.
        assert_eq!(unsafe { top_value().as_number() }, 0);
        sup_get(0);
        assert_eq!(unsafe { top_value().as_number() }, 41);
    }

    #[test]
    #[serial]
    fn test_get_by_hops_reads_outer_bindings() {
        reset();
        sup_push_number(10);
        sup_bind();
        sup_push_number(20);
        sup_bind();
        sup_get(1);
        assert_eq!(unsafe { top_value().as_number() }, 10);
        sup_get(0);
        assert_eq!(unsafe { top_value().as_number() }, 20);
    }

    #[test]
    #[serial]
    fn test_set_overwrites_slot() {
        reset();
        sup_push_number(0);
        sup_bind();
        sup_push_number(55);
        sup_set(0);
        sup_get(0);
        assert_eq!(unsafe { top_value().as_number() }, 55);
    }

    #[test]
    #[serial]
    fn test_call_on_number_is_fatal() {
        reset();
        set_silent_fatals(true);
        let _ = take_crash_message();
        sup_push_number(3);
        unsafe { sup_call() };
        assert_eq!(
            take_crash_message().as_deref(),
            Some("attempted to invoke a number")
        );
    }

    #[test]
    #[serial]
    fn test_call_on_string_is_fatal() {
        reset();
        set_silent_fatals(true);
        let _ = take_crash_message();
        unsafe { sup_push_string(c"oops".as_ptr()) };
        unsafe { sup_call() };
        assert_eq!(
            take_crash_message().as_deref(),
            Some("attempted to invoke a string")
        );
    }

    #[test]
    #[serial]
    fn test_drop_underflow_is_fatal() {
        reset();
        set_silent_fatals(true);
        let _ = take_crash_message();
        sup_stack_drop();
        assert_eq!(take_crash_message().as_deref(), Some("stack underflow"));
    }
}

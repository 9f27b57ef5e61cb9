//! Program-argument access.
//!
//! The generated `main` stores argc/argv into `program_args_count` and
//! `program_args` before running any LOL code; `prog-arg i` then returns
//! the i-th argument as a string. Index 0 is the program name.

use crate::error::fatal_error;
use crate::gc;
use crate::stack::{pop_operand, set_top};
use crate::value::{ManagedType, ManagedVariable, VmGlobal};
use std::ffi::c_char;
use std::ptr;

#[unsafe(export_name = "program_args")]
pub static PROGRAM_ARGS: VmGlobal<*const *const c_char> = VmGlobal::new(ptr::null());

#[unsafe(export_name = "program_args_count")]
pub static PROGRAM_ARGS_COUNT: VmGlobal<i64> = VmGlobal::new(0);

/// Install an argument vector the way generated `main` does. The copies
/// live for the rest of the process.
pub fn set_program_args(args: &[&str]) {
    let argv: Vec<*const c_char> = args.iter().map(|arg| gc::alloc_cstring(arg)).collect();
    let argv = argv.leak();
    unsafe {
        *PROGRAM_ARGS.get() = argv.as_ptr();
        *PROGRAM_ARGS_COUNT.get() = args.len() as i64;
    }
}

unsafe extern "C" fn invoke_program_argument() {
    let operand = pop_operand();
    if !operand.is_number() {
        fatal_error("prog-arg expects a number");
        return;
    }
    let index = unsafe { operand.as_number() };
    let count = unsafe { *PROGRAM_ARGS_COUNT.get() };
    if index < 0 || index >= count {
        fatal_error(&format!("program argument index out of range: {index}"));
        return;
    }
    let argv = unsafe { *PROGRAM_ARGS.get() };
    if argv.is_null() {
        fatal_error("program arguments not initialized");
        return;
    }
    let text = unsafe { *argv.offset(index as isize) };
    set_top(ManagedVariable::string(text));
}

#[unsafe(export_name = "sup_builtin_program_argument")]
pub static BUILTIN_PROGRAM_ARGUMENT: ManagedType = ManagedType {
    name: c"prog-arg".as_ptr(),
    invoke: invoke_program_argument,
};

//! LOL runtime: the stack VM that compiled programs link against.
//!
//! The compiler emits one C function per lambda; those functions drive
//! this library through a small C ABI declared in `include/support.h`:
//!
//! - an accumulator (`top`), a spill stack (`stack`/`stack_index`), and a
//!   lexical bind array (`binds`/`binds_index`),
//! - a heap-chained closure context (`context_stack`),
//! - push/dup/drop/bind/get/set entry points (`supPushNumber`,
//!   `supBind`, `supGet`, ...),
//! - static descriptors for the built-ins (`sup_builtin_add`, ...).
//!
//! The state is process-global: generated code reads fields
//! like `top.v.number` directly, so the symbols must exist with C
//! linkage and fixed layout. Build as a `staticlib` and link the
//! generated translation unit against it.

pub mod args;
pub mod arithmetic;
pub mod closures;
pub mod error;
pub mod gc;
pub mod io;
pub mod stack;
pub mod string_ops;
pub mod value;

pub use closures::{HeapVariable, sup_bind_captured, sup_get_captured, sup_set_captured};
pub use error::{fatal_error, has_crashed, set_silent_fatals, take_crash_message};
pub use stack::{
    sup_bind, sup_call, sup_get, sup_push_lambda, sup_push_number, sup_push_string, sup_set,
    sup_stack_drop, sup_stack_dup, top_value,
};
pub use value::{ManagedType, ManagedVariable, Payload};

/// Reset all VM state to its startup values. Test support.
pub fn reset_vm() {
    stack::reset();
    let _ = error::take_crash_message();
}

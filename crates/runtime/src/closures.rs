//! The closure context chain.
//!
//! Captured bindings live on a singly-linked list of heap cells rooted
//! at `context_stack`, most recent first. `supPushLambda` snapshots the
//! chain head into the closure value; a lambda's prologue restores it,
//! so the body sees exactly the bindings that were visible at creation.
//!
//! Cells come from the leaking `gc` allocator, which is what lets a
//! closure outlive the scope that created its bindings. Chains are
//! forward-only, so cycles are impossible by construction.

use crate::error::fatal_error;
use crate::gc;
use crate::stack;
use crate::value::{ManagedVariable, VmGlobal};
use std::ptr;

/// One captured binding.
#[repr(C)]
pub struct HeapVariable {
    pub value: ManagedVariable,
    pub next: *mut HeapVariable,
}

#[unsafe(export_name = "context_stack")]
pub static CONTEXT_STACK: VmGlobal<*mut HeapVariable> = VmGlobal::new(ptr::null_mut());

/// Current chain head.
pub fn context() -> *mut HeapVariable {
    unsafe { *CONTEXT_STACK.get() }
}

pub fn set_context(head: *mut HeapVariable) {
    unsafe { *CONTEXT_STACK.get() = head }
}

pub fn reset_context() {
    set_context(ptr::null_mut());
}

fn walk(hops: i64) -> Option<*mut HeapVariable> {
    let mut cell = context();
    for _ in 0..hops {
        if cell.is_null() {
            return None;
        }
        cell = unsafe { (*cell).next };
    }
    if cell.is_null() { None } else { Some(cell) }
}

/// Prepend a cell holding `top` to the chain, then restore the previous
/// `top` from the stack.
#[unsafe(export_name = "supBindCaptured")]
pub extern "C" fn sup_bind_captured() {
    let cell = gc::alloc_cell(stack::top_value(), context());
    set_context(cell);
    stack::sup_stack_drop();
}

/// Load the captured binding `hops` links up the chain into `top`.
#[unsafe(export_name = "supGetCaptured")]
pub extern "C" fn sup_get_captured(hops: i64) {
    stack::sup_stack_dup();
    match walk(hops) {
        Some(cell) => stack::set_top(unsafe { (*cell).value }),
        None => fatal_error("captured reference out of range"),
    }
}

/// Overwrite the captured binding `hops` links up the chain with `top`,
/// then restore the previous `top`.
#[unsafe(export_name = "supSetCaptured")]
pub extern "C" fn sup_set_captured(hops: i64) {
    match walk(hops) {
        Some(cell) => unsafe { (*cell).value = stack::top_value() },
        None => {
            fatal_error("captured reference out of range");
            return;
        }
    }
    stack::sup_stack_drop();
}

//! Trivial allocation for runtime-owned heap objects.
//!
//! Closure-chain cells and strings built at runtime are allocated here
//! and never reclaimed. A copying collector can later replace these two
//! entry points without touching any caller; until then every allocation
//! lives for the remainder of the process.

use crate::closures::HeapVariable;
use crate::value::ManagedVariable;
use std::ffi::{CString, c_char};

/// Allocate a closure-chain cell holding `value`, linked to `next`.
pub fn alloc_cell(value: ManagedVariable, next: *mut HeapVariable) -> *mut HeapVariable {
    Box::into_raw(Box::new(HeapVariable { value, next }))
}

/// Allocate a NUL-terminated copy of `text`.
///
/// Interior NUL bytes cannot occur in text produced by the built-ins;
/// should one appear anyway, the result is the empty string.
pub fn alloc_cstring(text: &str) -> *const c_char {
    let owned = CString::new(text).unwrap_or_default();
    owned.into_raw() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_alloc_cell_links() {
        let first = alloc_cell(ManagedVariable::number(1), std::ptr::null_mut());
        let second = alloc_cell(ManagedVariable::number(2), first);
        unsafe {
            assert_eq!((*second).value.as_number(), 2);
            assert_eq!((*(*second).next).value.as_number(), 1);
            assert!((*first).next.is_null());
        }
    }

    #[test]
    fn test_alloc_cstring_round_trip() {
        let ptr = alloc_cstring("332");
        assert_eq!(unsafe { CStr::from_ptr(ptr) }.to_bytes(), b"332");
    }
}

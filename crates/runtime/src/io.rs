//! Output built-in.
//!
//! `put-str` is the language's only I/O primitive besides program
//! arguments: it writes its string operand to stdout followed by a
//! newline and leaves 0 in `top`.

use crate::error::fatal_error;
use crate::stack::{pop_operand, set_top};
use crate::value::{ManagedType, ManagedVariable};

unsafe extern "C" fn invoke_put_string() {
    let operand = pop_operand();
    if !operand.is_string() {
        fatal_error("put-str expects a string");
        return;
    }
    let text = unsafe { operand.as_text() }.to_string_lossy();
    println!("{text}");
    set_top(ManagedVariable::number(0));
}

#[unsafe(export_name = "sup_builtin_put_string")]
pub static BUILTIN_PUT_STRING: ManagedType = ManagedType {
    name: c"put-str".as_ptr(),
    invoke: invoke_put_string,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{set_silent_fatals, take_crash_message};
    use crate::stack::{reset, sup_push_number, sup_push_string, top_value};
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_put_string_leaves_zero() {
        reset();
        unsafe { sup_push_string(c"hello".as_ptr()) };
        unsafe { invoke_put_string() };
        assert_eq!(unsafe { top_value().as_number() }, 0);
    }

    #[test]
    #[serial]
    fn test_put_string_on_number_is_fatal() {
        reset();
        set_silent_fatals(true);
        let _ = take_crash_message();
        sup_push_number(1);
        unsafe { invoke_put_string() };
        assert_eq!(
            take_crash_message().as_deref(),
            Some("put-str expects a string")
        );
    }
}

//! String conversion built-ins.

use crate::error::fatal_error;
use crate::gc;
use crate::stack::{pop_operand, set_top};
use crate::value::{ManagedType, ManagedVariable};

unsafe extern "C" fn invoke_string_to_number() {
    let operand = pop_operand();
    if !operand.is_string() {
        fatal_error("str-to-num expects a string");
        return;
    }
    let text = unsafe { operand.as_text() }.to_string_lossy();
    match text.trim().parse::<i64>() {
        Ok(value) => set_top(ManagedVariable::number(value)),
        Err(_) => fatal_error(&format!("str-to-num: not a number: {text}")),
    }
}

unsafe extern "C" fn invoke_number_to_string() {
    let operand = pop_operand();
    if !operand.is_number() {
        fatal_error("num-to-str expects a number");
        return;
    }
    let text = gc::alloc_cstring(&unsafe { operand.as_number() }.to_string());
    set_top(ManagedVariable::string(text));
}

#[unsafe(export_name = "sup_builtin_string_to_number")]
pub static BUILTIN_STRING_TO_NUMBER: ManagedType = ManagedType {
    name: c"str-to-num".as_ptr(),
    invoke: invoke_string_to_number,
};

#[unsafe(export_name = "sup_builtin_number_to_string")]
pub static BUILTIN_NUMBER_TO_STRING: ManagedType = ManagedType {
    name: c"num-to-str".as_ptr(),
    invoke: invoke_number_to_string,
};

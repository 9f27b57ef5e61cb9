//! Fatal-error funnel.
//!
//! Every unrecoverable runtime failure goes through [`fatal_error`],
//! which records the message in a crash slot and terminates the process
//! with status 1. Tests flip on silent mode with [`set_silent_fatals`]
//! so they can observe the message instead of dying.

use std::cell::{Cell, RefCell};
use std::ffi::{CStr, c_char};

thread_local! {
    /// The last fatal message, if any.
    static CRASH_MESSAGE: RefCell<Option<String>> = const { RefCell::new(None) };

    /// When set, fatal errors record their message and return instead of
    /// exiting the process.
    static SILENT: Cell<bool> = const { Cell::new(false) };
}

/// Record `msg` as the crash message, print it, and exit with status 1.
///
/// In silent mode the message is recorded and control returns to the
/// caller, which is expected to bail out of whatever it was doing.
pub fn fatal_error(msg: &str) {
    CRASH_MESSAGE.with(|slot| *slot.borrow_mut() = Some(msg.to_string()));
    if !SILENT.with(Cell::get) {
        eprintln!("fatal error: {msg}");
        std::process::exit(1);
    }
}

/// Route fatal errors into the crash slot instead of exiting.
pub fn set_silent_fatals(silent: bool) {
    SILENT.with(|flag| flag.set(silent));
}

/// Take (and clear) the last crash message.
pub fn take_crash_message() -> Option<String> {
    CRASH_MESSAGE.with(|slot| slot.borrow_mut().take())
}

/// Check whether a fatal error has been recorded.
pub fn has_crashed() -> bool {
    CRASH_MESSAGE.with(|slot| slot.borrow().is_some())
}

/// C-visible entry point for generated code.
///
/// # Safety
/// `msg` must be null or a valid NUL-terminated string.
#[unsafe(export_name = "fatalError")]
pub unsafe extern "C" fn fatal_error_c(msg: *const c_char) {
    if msg.is_null() {
        fatal_error("unknown fatal error");
        return;
    }
    let text = unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned();
    fatal_error(&text);
}

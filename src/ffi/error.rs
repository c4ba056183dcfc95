use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use crate::session::SessionError;
use crate::ffi::types::BareTiffResult;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::default();
    });
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let message = message.into();
    let sanitized = message.replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> BareTiffResult {
    set_error_message(message);
    BareTiffResult::InvalidArgument
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

pub(crate) fn map_session_error(err: &SessionError) -> BareTiffResult {
    set_error_message(err.message());
    match err {
        SessionError::Argument(_) => BareTiffResult::InvalidArgument,
        SessionError::Open(_) | SessionError::Decode(_) | SessionError::Encode(_) => BareTiffResult::CodecError,
    }
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}

//! Process-wide error reporting for the codec
//!
//! Every failing public codec entry point reports its error here before
//! returning it. A registered handler receives the module name and the
//! formatted message; without one the message goes to the `log` facade.
//! [`with_error_handler`] overrides the handler for the calling thread only.

use lazy_static::lazy_static;
use log::error;
use std::cell::Cell;
use std::fmt;
use std::sync::RwLock;

use crate::tiff::errors::{TiffError, TiffResult};

/// Signature of an error handler: module name plus the formatted message
pub type ErrorHandler = fn(module: &str, message: fmt::Arguments<'_>);

lazy_static! {
    static ref ERROR_HANDLER: RwLock<Option<ErrorHandler>> = RwLock::new(None);
}

thread_local! {
    static SCOPED_HANDLER: Cell<Option<ErrorHandler>> = const { Cell::new(None) };
}

struct ScopeGuard(Option<ErrorHandler>);

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPED_HANDLER.with(|scoped| scoped.set(self.0));
    }
}

/// Installs (or with `None` removes) the error handler, returning the previous one
pub fn set_error_handler(handler: Option<ErrorHandler>) -> Option<ErrorHandler> {
    let mut slot = ERROR_HANDLER.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    std::mem::replace(&mut *slot, handler)
}

/// Returns the currently installed error handler
pub fn error_handler() -> Option<ErrorHandler> {
    *ERROR_HANDLER.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Runs `f` with `handler` receiving this thread's errors in place of the
/// process-wide handler
pub fn with_error_handler<T>(handler: ErrorHandler, f: impl FnOnce() -> T) -> T {
    let _guard = ScopeGuard(SCOPED_HANDLER.with(|scoped| scoped.replace(Some(handler))));
    f()
}

/// Sends an error to the installed handler, or to the log when there is none
pub fn report_error(module: &str, err: &TiffError) {
    let handler = SCOPED_HANDLER.with(Cell::get).or_else(error_handler);
    match handler {
        Some(handler) => handler(module, format_args!("{}", err)),
        None => error!("{}: {}", module, err),
    }
}

/// Reports the error of a failed result and passes the result through
pub(crate) fn reported<T>(module: &str, result: TiffResult<T>) -> TiffResult<T> {
    if let Err(err) = &result {
        report_error(module, err);
    }
    result
}

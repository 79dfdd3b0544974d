//! Owned exchange records (spec.md §9: "Shared-pointer exchange state
//! with late destruction → owned records + identifiers"). An
//! [`ExchangeId`] names the exchange; the timer and completion paths
//! reference the id rather than a pointer, so a timer firing after the
//! exchange already completed is a harmless no-op (the id is simply
//! absent from the active slot).

use std::time::Duration;

use bytes::Bytes;

use crate::error::Error;
use crate::pattern::Kind;

/// Monotonically increasing within one `CommandManager`; never reused.
pub type ExchangeId = u64;

/// Owned capture groups (see [`crate::pattern::owned_captures`]), passed
/// to completion handlers instead of borrowed `regex::Captures` so the
/// handler can be invoked after crossing an `await` point.
pub type Captures = Vec<Option<String>>;

pub type CompletionHandler = Box<dyn FnOnce(Captures) + Send>;
pub type ErrorHandler = Box<dyn FnOnce(Error) + Send>;

/// One request/response round trip, queued on the [`crate::runloop`]
/// until it becomes the active exchange (spec.md §4.4.1).
pub struct ExchangeState {
    pub request: Bytes,
    pub completion_kind: Kind,
    pub timeout: Duration,
    pub on_complete: CompletionHandler,
    pub on_error: ErrorHandler,
}

impl std::fmt::Debug for ExchangeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeState")
            .field("request", &self.request)
            .field("completion_kind", &self.completion_kind)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ExchangeState {
    pub fn new(
        request: Bytes,
        completion_kind: Kind,
        timeout: Duration,
        on_complete: CompletionHandler,
        on_error: ErrorHandler,
    ) -> Self {
        ExchangeState {
            request,
            completion_kind,
            timeout,
            on_complete,
            on_error,
        }
    }

    pub fn fail(self, err: Error) {
        (self.on_error)(err);
    }

    pub fn complete(self, captures: Captures) {
        (self.on_complete)(captures);
    }
}

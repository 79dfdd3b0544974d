//! Notification handler table (spec.md §4.4.4 / §4.4's "Handler
//! registration"): one handler per [`Kind`], consulted in the shared
//! [`PatternRegistry`]'s specificity order.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::pattern::{owned_captures, Kind, PatternRegistry};

pub type NotificationHandler = Box<dyn FnMut(Vec<Option<String>>) + Send>;

pub struct HandlerTable {
    registry: Arc<PatternRegistry>,
    handlers: HashMap<Kind, NotificationHandler>,
}

impl HandlerTable {
    pub fn new(registry: Arc<PatternRegistry>) -> Self {
        HandlerTable {
            registry,
            handlers: HashMap::new(),
        }
    }

    /// `AlreadyExists` on a duplicate registration for the same `kind`
    /// (spec.md §4.4: "Duplicate registration for the same pattern
    /// fails with `AlreadyExists`").
    pub fn register(&mut self, kind: Kind, handler: NotificationHandler) -> Result<()> {
        if self.handlers.contains_key(&kind) {
            return Err(Error::already_exists());
        }
        self.handlers.insert(kind, handler);
        Ok(())
    }

    pub fn unregister(&mut self, kind: Kind) {
        self.handlers.remove(&kind);
    }

    /// Matches an already delimiter-stripped line and invokes the
    /// handler registered for whichever kind matched, if any. Frames
    /// that match nothing are discarded (spec.md §4.4.4: "If no pattern
    /// matches, the frame is discarded (with a debug log), never
    /// buffered.").
    pub fn dispatch_line(&mut self, line: &str) {
        match self.registry.match_line(line) {
            Some((kind, captures)) => {
                let owned = owned_captures(&captures);
                drop(captures);
                if let Some(handler) = self.handlers.get_mut(&kind) {
                    handler(owned);
                }
            }
            None => {
                tracing::debug!(frame = %line, "unmatched notification frame discarded");
            }
        }
    }
}

//! Server-side request handler table (spec.md §4.5): mirrors
//! [`crate::client::handlers::HandlerTable`]'s registration rules, but
//! each handler runs synchronously against the locked model and returns
//! the response frame's body directly rather than mutating state through
//! a queued exchange.

use std::collections::HashMap;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::pattern::Kind;

pub type RequestHandler = Box<dyn Fn(Vec<Option<String>>) -> Result<Bytes> + Send + Sync>;

/// One handler per request [`Kind`]. `QueryCurrentConfiguration` is
/// handled specially by [`crate::server::ServerCommandManager`] itself
/// rather than through this table, since its response is a whole-model
/// dump, not a single computed frame.
#[derive(Default)]
pub struct RequestHandlerTable {
    handlers: HashMap<Kind, RequestHandler>,
}

impl RequestHandlerTable {
    pub fn new() -> Self {
        RequestHandlerTable {
            handlers: HashMap::new(),
        }
    }

    /// `AlreadyExists` on a duplicate registration for the same `kind`
    /// (spec.md §4.4's registration rule applies symmetrically here).
    pub fn register(&mut self, kind: Kind, handler: RequestHandler) -> Result<()> {
        if self.handlers.contains_key(&kind) {
            return Err(Error::already_exists());
        }
        self.handlers.insert(kind, handler);
        Ok(())
    }

    pub fn get(&self, kind: Kind) -> Option<&RequestHandler> {
        self.handlers.get(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_registration_fails() {
        let mut table = RequestHandlerTable::new();
        assert!(table
            .register(Kind::ZoneVolumeLevel, Box::new(|_| Ok(Bytes::new())))
            .is_ok());
        assert!(table
            .register(Kind::ZoneVolumeLevel, Box::new(|_| Ok(Bytes::new())))
            .is_err());
    }

    #[test]
    fn get_returns_none_for_unregistered_kind() {
        let table = RequestHandlerTable::new();
        assert!(table.get(Kind::ZoneVolumeLevel).is_none());
    }
}

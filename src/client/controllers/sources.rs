//! Sources controller (spec.md §4.6, component H). `Source` carries
//! only a name; the `OName`-prefixed wire shape is the simplest
//! instance of the controller pattern `zones`/`groups` demonstrate in
//! full.

use crate::client::controller::{parse_identifier_capture, Roles, SharedState};
use crate::client::handlers::HandlerTable;
use crate::error::Result;
use crate::model::Assignment;
use crate::notify::StateChange;
use crate::pattern::Kind;

#[derive(Clone)]
pub struct SourcesController {
    shared: SharedState,
    roles: Roles,
}

impl SourcesController {
    pub fn new(shared: SharedState) -> Self {
        SourcesController {
            shared,
            roles: Roles::proxy(),
        }
    }

    pub fn with_roles(mut self, roles: Roles) -> Self {
        self.roles = roles;
        self
    }

    pub fn init_client(&self, handlers: &mut HandlerTable) -> Result<()> {
        if !self.roles.client {
            return Ok(());
        }
        let shared = self.shared.clone();
        handlers.register(
            Kind::SourceName,
            Box::new(move |caps| {
                let (Some(id), Some(name)) =
                    (parse_identifier_capture(&caps, 0), caps.get(1).cloned().flatten())
                else {
                    return;
                };
                let mut model = shared.model.lock().unwrap();
                let Ok(source) = model.sources.get_mut(id) else {
                    return;
                };
                let Ok(assignment) = source.set_name(name.clone()) else {
                    return;
                };
                drop(model);
                if assignment == Assignment::Initialized {
                    shared
                        .notifier
                        .lock()
                        .unwrap()
                        .notify(StateChange::SourceName { id, name });
                }
            }),
        )
    }
}

//! Favorites controller (spec.md §4.6, component H). Mirrors
//! [`super::sources::SourcesController`]; a `Favorite` is also just
//! `{ id, name }`.

use crate::client::controller::{parse_identifier_capture, Roles, SharedState};
use crate::client::handlers::HandlerTable;
use crate::error::Result;
use crate::model::Assignment;
use crate::notify::StateChange;
use crate::pattern::Kind;

#[derive(Clone)]
pub struct FavoritesController {
    shared: SharedState,
    roles: Roles,
}

impl FavoritesController {
    pub fn new(shared: SharedState) -> Self {
        FavoritesController {
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
            Kind::FavoriteName,
            Box::new(move |caps| {
                let (Some(id), Some(name)) =
                    (parse_identifier_capture(&caps, 0), caps.get(1).cloned().flatten())
                else {
                    return;
                };
                let mut model = shared.model.lock().unwrap();
                let Ok(favorite) = model.favorites.get_mut(id) else {
                    return;
                };
                let Ok(assignment) = favorite.set_name(name.clone()) else {
                    return;
                };
                drop(model);
                if assignment == Assignment::Initialized {
                    shared
                        .notifier
                        .lock()
                        .unwrap()
                        .notify(StateChange::FavoriteName { id, name });
                }
            }),
        )
    }
}

//! EqualizerPresets controller (spec.md §4.6, component H). Name
//! updates follow the same shape as [`super::sources`]; per-band level
//! notifications are part of the mechanical `Set*`/`Get*` family spec.md
//! §1 scopes out, so only the name handler is registered here.

use crate::client::controller::{parse_identifier_capture, Roles, SharedState};
use crate::client::handlers::HandlerTable;
use crate::error::Result;
use crate::model::Assignment;
use crate::notify::StateChange;
use crate::pattern::Kind;

#[derive(Clone)]
pub struct EqualizerPresetsController {
    shared: SharedState,
    roles: Roles,
}

impl EqualizerPresetsController {
    pub fn new(shared: SharedState) -> Self {
        EqualizerPresetsController {
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
            Kind::EqualizerPresetName,
            Box::new(move |caps| {
                let (Some(id), Some(name)) =
                    (parse_identifier_capture(&caps, 0), caps.get(1).cloned().flatten())
                else {
                    return;
                };
                let mut model = shared.model.lock().unwrap();
                let Ok(preset) = model.equalizer_presets.get_mut(id) else {
                    return;
                };
                let Ok(assignment) = preset.set_name(name.clone()) else {
                    return;
                };
                drop(model);
                if assignment == Assignment::Initialized {
                    shared
                        .notifier
                        .lock()
                        .unwrap()
                        .notify(StateChange::EqualizerPresetName { id, name });
                }
            }),
        )
    }
}

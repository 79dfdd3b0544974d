//! FrontPanel controller (spec.md §4.6, component H). `FrontPanel` is a
//! singleton; its wire patterns are part of the mechanical `Set*`/`Get*`
//! family spec.md §1 scopes out, so this controller exposes direct,
//! lock-guarded model access for the application layer rather than its
//! own notification handlers.

use crate::client::controller::SharedState;
use crate::error::Result;
use crate::model::field::Assignment;

#[derive(Clone)]
pub struct FrontPanelController {
    shared: SharedState,
}

impl FrontPanelController {
    pub fn new(shared: SharedState) -> Self {
        FrontPanelController { shared }
    }

    pub fn brightness(&self) -> Result<u8> {
        self.shared.model.lock().unwrap().front_panel.brightness()
    }

    pub fn locked(&self) -> Result<bool> {
        self.shared.model.lock().unwrap().front_panel.locked()
    }

    pub fn set_brightness(&self, brightness: u8) -> Result<Assignment> {
        self.shared
            .model
            .lock()
            .unwrap()
            .front_panel
            .set_brightness(brightness)
    }

    pub fn set_locked(&self, locked: bool) -> Result<Assignment> {
        self.shared.model.lock().unwrap().front_panel.set_locked(locked)
    }
}

//! Infrared controller (spec.md §4.6, component H). See
//! [`super::front_panel`] for why this is a direct accessor rather than
//! a notification-handler registrant.

use crate::client::controller::SharedState;
use crate::error::Result;
use crate::model::field::Assignment;

#[derive(Clone)]
pub struct InfraredController {
    shared: SharedState,
}

impl InfraredController {
    pub fn new(shared: SharedState) -> Self {
        InfraredController { shared }
    }

    pub fn disabled(&self) -> Result<bool> {
        self.shared.model.lock().unwrap().infrared.disabled()
    }

    pub fn set_disabled(&self, disabled: bool) -> Result<Assignment> {
        self.shared.model.lock().unwrap().infrared.set_disabled(disabled)
    }
}

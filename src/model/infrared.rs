//! Infrared singleton: `{ disabled: bool }` (spec.md §3).

use super::field::{Assignment, Field};
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct Infrared {
    disabled: Field<bool>,
}

impl Infrared {
    pub(crate) fn new() -> Self {
        Infrared::default()
    }

    pub fn disabled(&self) -> Result<bool> {
        self.disabled.get().copied()
    }

    pub fn set_disabled(&mut self, disabled: bool) -> Result<Assignment> {
        self.disabled.set(disabled)
    }
}

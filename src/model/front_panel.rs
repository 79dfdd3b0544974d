//! FrontPanel singleton: `{ brightness ∈ [0,3], locked: bool }` (spec.md §3).

use super::field::{Assignment, Field};
use crate::error::{Error, Result};

pub const BRIGHTNESS_MIN: u8 = 0;
pub const BRIGHTNESS_MAX: u8 = 3;

#[derive(Debug, Clone, Default)]
pub struct FrontPanel {
    brightness: Field<u8>,
    locked: Field<bool>,
}

impl FrontPanel {
    pub(crate) fn new() -> Self {
        FrontPanel::default()
    }

    pub fn brightness(&self) -> Result<u8> {
        self.brightness.get().copied()
    }

    pub fn set_brightness(&mut self, brightness: u8) -> Result<Assignment> {
        self.brightness.try_set(brightness, |v| {
            if (BRIGHTNESS_MIN..=BRIGHTNESS_MAX).contains(v) {
                Ok(())
            } else {
                Err(Error::out_of_range())
            }
        })
    }

    pub fn locked(&self) -> Result<bool> {
        self.locked.get().copied()
    }

    pub fn set_locked(&mut self, locked: bool) -> Result<Assignment> {
        self.locked.set(locked)
    }
}

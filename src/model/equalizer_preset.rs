//! EqualizerPreset entity: `{ id, name, per-band-levels[10] }`, fixed
//! cardinality 10 (spec.md §3).

use super::field::{Assignment, Field};
use super::identifier::{Identifier, IdentifierRange};
use crate::error::{Error, Result};

pub const BAND_COUNT: usize = 10;
pub const BAND_LEVEL_MIN: i8 = -10;
pub const BAND_LEVEL_MAX: i8 = 10;

pub struct EqualizerPresetRange;
impl IdentifierRange for EqualizerPresetRange {
    const MAX: u8 = 10;
}

fn validate_band_level(level: i8) -> Result<()> {
    if (BAND_LEVEL_MIN..=BAND_LEVEL_MAX).contains(&level) {
        Ok(())
    } else {
        Err(Error::out_of_range())
    }
}

fn validate_band_index(band: usize) -> Result<()> {
    if band < BAND_COUNT {
        Ok(())
    } else {
        Err(Error::out_of_range())
    }
}

#[derive(Debug, Clone)]
pub struct EqualizerPreset {
    id: Identifier,
    name: Field<String>,
    band_levels: [Field<i8>; BAND_COUNT],
}

impl EqualizerPreset {
    pub(crate) fn new(id: Identifier) -> Self {
        EqualizerPreset {
            id,
            name: Field::new(),
            band_levels: Default::default(),
        }
    }

    pub fn id(&self) -> Identifier {
        self.id
    }

    pub fn name(&self) -> Result<&str> {
        self.name.get().map(String::as_str)
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<Assignment> {
        self.name.set(name.into())
    }

    pub fn band_level(&self, band: usize) -> Result<i8> {
        validate_band_index(band)?;
        self.band_levels[band].get().copied()
    }

    pub fn set_band_level(&mut self, band: usize, level: i8) -> Result<Assignment> {
        validate_band_index(band)?;
        self.band_levels[band].try_set(level, |v| validate_band_level(*v))
    }
}

/// The fixed collection of 10 equalizer presets.
#[derive(Debug, Clone)]
pub struct EqualizerPresets {
    entries: Vec<EqualizerPreset>,
}

impl EqualizerPresets {
    pub(crate) fn new() -> Self {
        EqualizerPresets {
            entries: (EqualizerPresetRange::MIN..=EqualizerPresetRange::MAX)
                .map(|raw| EqualizerPreset::new(Identifier::new(raw)))
                .collect(),
        }
    }

    pub fn validate_identifier(&self, id: Identifier) -> Result<()> {
        EqualizerPresetRange::validate_identifier(id)
    }

    pub fn get(&self, id: Identifier) -> Result<&EqualizerPreset> {
        self.validate_identifier(id)?;
        Ok(&self.entries[(id.get() - EqualizerPresetRange::MIN) as usize])
    }

    pub fn get_mut(&mut self, id: Identifier) -> Result<&mut EqualizerPreset> {
        self.validate_identifier(id)?;
        Ok(&mut self.entries[(id.get() - EqualizerPresetRange::MIN) as usize])
    }

    pub fn iter(&self) -> impl Iterator<Item = &EqualizerPreset> {
        self.entries.iter()
    }
}

//! Zone entity (spec.md §3): the largest and most constrained entity in
//! the model — volume, balance, a six-mode sound stage, and a source
//! reference.

use super::equalizer_preset::{BAND_COUNT, BAND_LEVEL_MAX, BAND_LEVEL_MIN};
use super::field::{Assignment, Field};
use super::identifier::{Identifier, IdentifierRange};
use super::source::SourceRange;
use crate::error::{Error, Result};

pub const VOLUME_LEVEL_MIN: i8 = -80;
pub const VOLUME_LEVEL_MAX: i8 = 0;
pub const BALANCE_MIN: i8 = -10;
pub const BALANCE_MAX: i8 = 10;
pub const TONE_MIN: i8 = -10;
pub const TONE_MAX: i8 = 10;
pub const CROSSOVER_MIN: u16 = 1;
pub const CROSSOVER_MAX: u16 = 20011;

/// Zone count is a deployment-time constant (8 or 12 per spec.md §3); the
/// dispatch core is generic over it through `ZoneRange::MAX`, set here to
/// the more common 8-zone configuration.
pub struct ZoneRange;
impl IdentifierRange for ZoneRange {
    const MAX: u8 = 8;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundMode {
    Disabled,
    Tone,
    PresetEqualizer,
    PerBand,
    Highpass,
    Lowpass,
}

#[derive(Debug, Clone, Default)]
pub struct Volume {
    level: Field<i8>,
    mute: Field<bool>,
    fixed: bool,
}

impl Volume {
    pub fn level(&self) -> Result<i8> {
        self.level.get().copied()
    }

    pub fn mute(&self) -> Result<bool> {
        self.mute.get().copied()
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    fn set_level(&mut self, level: i8) -> Result<Assignment> {
        if self.fixed {
            return Err(Error::volume_fixed());
        }
        self.level.try_set(level, |v| {
            if (VOLUME_LEVEL_MIN..=VOLUME_LEVEL_MAX).contains(v) {
                Ok(())
            } else {
                Err(Error::out_of_range())
            }
        })
    }

    fn set_mute(&mut self, mute: bool) -> Result<Assignment> {
        self.mute.set(mute)
    }

    fn toggle_mute(&mut self) -> Result<bool> {
        let current = self.mute().unwrap_or(false);
        self.mute.set(!current)?;
        Ok(!current)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Tone {
    bass: Field<i8>,
    treble: Field<i8>,
}

impl Tone {
    pub fn bass(&self) -> Result<i8> {
        self.bass.get().copied()
    }

    pub fn treble(&self) -> Result<i8> {
        self.treble.get().copied()
    }
}

fn validate_tone(v: &i8) -> Result<()> {
    if (TONE_MIN..=TONE_MAX).contains(v) {
        Ok(())
    } else {
        Err(Error::out_of_range())
    }
}

fn validate_crossover(v: &u16) -> Result<()> {
    if (CROSSOVER_MIN..=CROSSOVER_MAX).contains(v) {
        Ok(())
    } else {
        Err(Error::out_of_range())
    }
}

fn validate_band_level(v: &i8) -> Result<()> {
    if (BAND_LEVEL_MIN..=BAND_LEVEL_MAX).contains(v) {
        Ok(())
    } else {
        Err(Error::out_of_range())
    }
}

#[derive(Debug, Clone)]
pub struct Sound {
    mode: Field<SoundMode>,
    tone: Tone,
    preset_ref: Field<Identifier>,
    highpass_crossover: Field<u16>,
    lowpass_crossover: Field<u16>,
    band_levels: [Field<i8>; BAND_COUNT],
}

impl Default for Sound {
    fn default() -> Self {
        Sound {
            mode: Field::new(),
            tone: Tone::default(),
            preset_ref: Field::new(),
            highpass_crossover: Field::new(),
            lowpass_crossover: Field::new(),
            band_levels: Default::default(),
        }
    }
}

impl Sound {
    pub fn mode(&self) -> Result<SoundMode> {
        self.mode.get().copied()
    }

    pub fn tone(&self) -> &Tone {
        &self.tone
    }

    pub fn preset_ref(&self) -> Result<Identifier> {
        self.preset_ref.get().copied()
    }

    pub fn highpass_crossover(&self) -> Result<u16> {
        self.highpass_crossover.get().copied()
    }

    pub fn lowpass_crossover(&self) -> Result<u16> {
        self.lowpass_crossover.get().copied()
    }

    pub fn band_level(&self, band: usize) -> Result<i8> {
        if band >= BAND_COUNT {
            return Err(Error::out_of_range());
        }
        self.band_levels[band].get().copied()
    }
}

#[derive(Debug, Clone)]
pub struct Zone {
    id: Identifier,
    name: Field<String>,
    volume: Volume,
    balance: Field<i8>,
    sound: Sound,
    source_ref: Field<Identifier>,
}

impl Zone {
    pub(crate) fn new(id: Identifier) -> Self {
        Zone {
            id,
            name: Field::new(),
            volume: Volume::default(),
            balance: Field::new(),
            sound: Sound::default(),
            source_ref: Field::new(),
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

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub fn set_volume_level(&mut self, level: i8) -> Result<Assignment> {
        self.volume.set_level(level)
    }

    pub fn set_volume_mute(&mut self, mute: bool) -> Result<Assignment> {
        self.volume.set_mute(mute)
    }

    pub fn toggle_volume_mute(&mut self) -> Result<bool> {
        self.volume.toggle_mute()
    }

    /// Marks the volume as administratively fixed; further level changes
    /// are rejected with `Error::VolumeFixed` rather than `OutOfRange`.
    pub fn set_volume_fixed(&mut self, fixed: bool) {
        self.volume.fixed = fixed;
    }

    pub fn balance(&self) -> Result<i8> {
        self.balance.get().copied()
    }

    pub fn set_balance(&mut self, balance: i8) -> Result<Assignment> {
        self.balance.try_set(balance, |v| {
            if (BALANCE_MIN..=BALANCE_MAX).contains(v) {
                Ok(())
            } else {
                Err(Error::out_of_range())
            }
        })
    }

    pub fn sound(&self) -> &Sound {
        &self.sound
    }

    pub fn set_sound_mode(&mut self, mode: SoundMode) -> Result<Assignment> {
        self.sound.mode.set(mode)
    }

    pub fn set_bass(&mut self, bass: i8) -> Result<Assignment> {
        self.sound.tone.bass.try_set(bass, validate_tone)
    }

    pub fn set_treble(&mut self, treble: i8) -> Result<Assignment> {
        self.sound.tone.treble.try_set(treble, validate_tone)
    }

    pub fn set_preset_ref(&mut self, preset: Identifier, presets_max: u8) -> Result<Assignment> {
        self.sound.preset_ref.try_set(preset, |id| {
            if id.get() >= 1 && id.get() <= presets_max {
                Ok(())
            } else {
                Err(Error::out_of_range())
            }
        })
    }

    pub fn set_highpass_crossover(&mut self, hz: u16) -> Result<Assignment> {
        self.sound
            .highpass_crossover
            .try_set(hz, validate_crossover)
    }

    pub fn set_lowpass_crossover(&mut self, hz: u16) -> Result<Assignment> {
        self.sound
            .lowpass_crossover
            .try_set(hz, validate_crossover)
    }

    pub fn set_band_level(&mut self, band: usize, level: i8) -> Result<Assignment> {
        if band >= BAND_COUNT {
            return Err(Error::out_of_range());
        }
        self.sound.band_levels[band].try_set(level, validate_band_level)
    }

    pub fn source_ref(&self) -> Result<Identifier> {
        self.source_ref.get().copied()
    }

    /// `source-ref` must reference an existing Source id (spec.md §3).
    pub fn set_source_ref(&mut self, source: Identifier) -> Result<Assignment> {
        self.source_ref
            .try_set(source, |id| SourceRange::validate_identifier(*id))
    }
}

/// The fixed collection of zones.
#[derive(Debug, Clone)]
pub struct Zones {
    entries: Vec<Zone>,
}

impl Zones {
    pub(crate) fn new() -> Self {
        Zones {
            entries: (ZoneRange::MIN..=ZoneRange::MAX)
                .map(|raw| Zone::new(Identifier::new(raw)))
                .collect(),
        }
    }

    pub fn validate_identifier(&self, id: Identifier) -> Result<()> {
        ZoneRange::validate_identifier(id)
    }

    pub fn get(&self, id: Identifier) -> Result<&Zone> {
        self.validate_identifier(id)?;
        Ok(&self.entries[(id.get() - ZoneRange::MIN) as usize])
    }

    pub fn get_mut(&mut self, id: Identifier) -> Result<&mut Zone> {
        self.validate_identifier(id)?;
        Ok(&mut self.entries[(id.get() - ZoneRange::MIN) as usize])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_level_range_law() {
        let mut z = Zone::new(Identifier::new(1));
        assert!(z.set_volume_level(-81).unwrap_err().is_out_of_range());
        assert!(z.set_volume_level(1).unwrap_err().is_out_of_range());
        assert_eq!(z.set_volume_level(-20).unwrap(), Assignment::Initialized);
        assert_eq!(z.volume().level().unwrap(), -20);
        assert_eq!(z.set_volume_level(-20).unwrap(), Assignment::AlreadySet);
    }

    #[test]
    fn fixed_volume_rejects_level_changes() {
        let mut z = Zone::new(Identifier::new(1));
        z.set_volume_fixed(true);
        let err = z.set_volume_level(-10).unwrap_err();
        assert!(err.is_volume_fixed());
        assert!(!err.is_out_of_range());
    }

    #[test]
    fn toggle_mute_flips_and_reports_new_value() {
        let mut z = Zone::new(Identifier::new(1));
        assert_eq!(z.toggle_volume_mute().unwrap(), true);
        assert_eq!(z.toggle_volume_mute().unwrap(), false);
    }

    #[test]
    fn source_ref_must_exist() {
        let mut z = Zone::new(Identifier::new(1));
        assert!(z.set_source_ref(Identifier::new(9)).unwrap_err().is_out_of_range());
        assert!(z.set_source_ref(Identifier::new(1)).is_ok());
    }
}

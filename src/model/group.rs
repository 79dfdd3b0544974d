//! Group entity (spec.md §3): an aggregate over member zones.
//!
//! Group volume mutation is a shorthand for applying the same mutation to
//! every member zone; group mute derives by majority. `sources` is a
//! derived set, the union of every member zone's `source-ref`.

use std::collections::BTreeSet;

use super::field::{Assignment, Field};
use super::identifier::{Identifier, IdentifierRange};
use super::zone::{ZoneRange, Zones};
use crate::error::{Error, Result};

pub struct GroupRange;
impl IdentifierRange for GroupRange {
    const MAX: u8 = 8;
}

#[derive(Debug, Clone, Default)]
pub struct GroupVolume {
    level: Field<i8>,
    mute: Field<bool>,
}

impl GroupVolume {
    pub fn level(&self) -> Result<i8> {
        self.level.get().copied()
    }

    pub fn mute(&self) -> Result<bool> {
        self.mute.get().copied()
    }
}

#[derive(Debug, Clone)]
pub struct Group {
    id: Identifier,
    name: Field<String>,
    volume: GroupVolume,
    zones: BTreeSet<Identifier>,
}

impl Group {
    pub(crate) fn new(id: Identifier) -> Self {
        Group {
            id,
            name: Field::new(),
            volume: GroupVolume::default(),
            zones: BTreeSet::new(),
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

    pub fn volume(&self) -> &GroupVolume {
        &self.volume
    }

    pub fn contains(&self, zone: Identifier) -> bool {
        self.zones.contains(&zone)
    }

    pub fn zones(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.zones.iter().copied()
    }

    /// `AddZone` (spec.md §6's group-add operation). Idempotent: adding a
    /// member already present is `AlreadySet`.
    pub fn add_zone(&mut self, zone: Identifier) -> Result<Assignment> {
        ZoneRange::validate_identifier(zone)?;
        if self.zones.insert(zone) {
            Ok(Assignment::Initialized)
        } else {
            Ok(Assignment::AlreadySet)
        }
    }

    /// `RemoveZone` (spec.md §6's group-remove operation).
    pub fn remove_zone(&mut self, zone: Identifier) -> Result<()> {
        if self.zones.remove(&zone) {
            Ok(())
        } else {
            Err(Error::not_found())
        }
    }

    /// The derived set of sources in use by member zones, recomputed
    /// against the authoritative `Zones` collection.
    pub fn sources(&self, zones: &Zones) -> Result<BTreeSet<Identifier>> {
        let mut out = BTreeSet::new();
        for zone_id in &self.zones {
            let zone = zones.get(*zone_id)?;
            if let Ok(source) = zone.source_ref() {
                out.insert(source);
            }
        }
        Ok(out)
    }

    /// Applies a volume-level mutation to the group and every member
    /// zone, reporting `Initialized` if any member actually changed.
    pub fn set_volume_level(&mut self, level: i8, zones: &mut Zones) -> Result<Assignment> {
        let group_assignment = self.volume.level.try_set(level, |v| {
            if (super::zone::VOLUME_LEVEL_MIN..=super::zone::VOLUME_LEVEL_MAX).contains(v) {
                Ok(())
            } else {
                Err(Error::out_of_range())
            }
        })?;
        let mut any_changed = group_assignment == Assignment::Initialized;
        for zone_id in &self.zones {
            let zone = zones.get_mut(*zone_id)?;
            if zone.set_volume_level(level).is_ok_and(|a| a == Assignment::Initialized) {
                any_changed = true;
            }
        }
        Ok(if any_changed {
            Assignment::Initialized
        } else {
            Assignment::AlreadySet
        })
    }

    /// Computes the current majority mute state across member zones.
    /// Strict majority decides the *current* aggregate; an even split
    /// (tie) reads as unmuted (see DESIGN.md, Open Question resolution).
    pub fn aggregate_mute(&self, zones: &Zones) -> Result<bool> {
        let mut muted = 0usize;
        let mut total = 0usize;
        for zone_id in &self.zones {
            let zone = zones.get(*zone_id)?;
            total += 1;
            if zone.volume().mute().unwrap_or(false) {
                muted += 1;
            }
        }
        Ok(total > 0 && muted * 2 > total)
    }

    /// Toggles mute on the group and every member zone based on the
    /// current majority, returning the new aggregate value.
    pub fn toggle_mute(&mut self, zones: &mut Zones) -> Result<bool> {
        let currently_muted = self.aggregate_mute(zones)?;
        let new_value = !currently_muted;
        self.volume.mute.set(new_value)?;
        for zone_id in &self.zones {
            let zone = zones.get_mut(*zone_id)?;
            let _ = zone.set_volume_mute(new_value);
        }
        Ok(new_value)
    }

    /// Sets the group and every member zone to `mute` directly, rather
    /// than recomputing a toggle from majority state. Used to apply a
    /// value already settled upstream (a `(GiVM*)` reply or
    /// notification), so redelivery of the same frame is a no-op
    /// instead of flipping the aggregate a second time.
    pub fn set_mute(&mut self, mute: bool, zones: &mut Zones) -> Result<MuteApplyResult> {
        let group_changed = self.volume.mute.set(mute)? == Assignment::Initialized;
        let mut changed_zones = Vec::new();
        for zone_id in &self.zones {
            let zone = zones.get_mut(*zone_id)?;
            if zone.set_volume_mute(mute).is_ok_and(|a| a == Assignment::Initialized) {
                changed_zones.push(*zone_id);
            }
        }
        Ok(MuteApplyResult {
            group_changed,
            changed_zones,
        })
    }
}

/// What actually changed when applying a settled mute value via
/// [`Group::set_mute`] — only these need a notification fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuteApplyResult {
    pub group_changed: bool,
    pub changed_zones: Vec<Identifier>,
}

/// The fixed collection of groups.
#[derive(Debug, Clone)]
pub struct Groups {
    entries: Vec<Group>,
}

impl Groups {
    pub(crate) fn new() -> Self {
        Groups {
            entries: (GroupRange::MIN..=GroupRange::MAX)
                .map(|raw| Group::new(Identifier::new(raw)))
                .collect(),
        }
    }

    pub fn validate_identifier(&self, id: Identifier) -> Result<()> {
        GroupRange::validate_identifier(id)
    }

    pub fn get(&self, id: Identifier) -> Result<&Group> {
        self.validate_identifier(id)?;
        Ok(&self.entries[(id.get() - GroupRange::MIN) as usize])
    }

    pub fn get_mut(&mut self, id: Identifier) -> Result<&mut Group> {
        self.validate_identifier(id)?;
        Ok(&mut self.entries[(id.get() - GroupRange::MIN) as usize])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_remove_zone_round_trip() {
        let mut g = Group::new(Identifier::new(1));
        assert_eq!(g.add_zone(Identifier::new(1)).unwrap(), Assignment::Initialized);
        assert_eq!(g.add_zone(Identifier::new(1)).unwrap(), Assignment::AlreadySet);
        assert!(g.contains(Identifier::new(1)));
        g.remove_zone(Identifier::new(1)).unwrap();
        assert!(!g.contains(Identifier::new(1)));
    }

    #[test]
    fn remove_zone_round_trip_preserves_sources() {
        let mut zones = Zones::new();
        zones
            .get_mut(Identifier::new(1))
            .unwrap()
            .set_source_ref(Identifier::new(2))
            .unwrap();
        let mut g = Group::new(Identifier::new(1));
        g.add_zone(Identifier::new(1)).unwrap();
        let before = g.sources(&zones).unwrap();
        g.add_zone(Identifier::new(2)).unwrap();
        g.remove_zone(Identifier::new(2)).unwrap();
        let after = g.sources(&zones).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn majority_mute_toggle_scenario_s6() {
        // S6: 3 member zones whose mutes are {true, false, true}.
        let mut zones = Zones::new();
        zones.get_mut(Identifier::new(1)).unwrap().set_volume_mute(true).unwrap();
        zones.get_mut(Identifier::new(2)).unwrap().set_volume_mute(false).unwrap();
        zones.get_mut(Identifier::new(3)).unwrap().set_volume_mute(true).unwrap();

        let mut g = Group::new(Identifier::new(1));
        g.add_zone(Identifier::new(1)).unwrap();
        g.add_zone(Identifier::new(2)).unwrap();
        g.add_zone(Identifier::new(3)).unwrap();

        assert!(g.aggregate_mute(&zones).unwrap());
        let new_value = g.toggle_mute(&mut zones).unwrap();
        assert!(!new_value, "majority muted -> toggles to unmuted, x=0");
        assert!(!zones.get(Identifier::new(1)).unwrap().volume().mute().unwrap());
        assert!(!zones.get(Identifier::new(2)).unwrap().volume().mute().unwrap());
        assert!(!zones.get(Identifier::new(3)).unwrap().volume().mute().unwrap());
    }
}

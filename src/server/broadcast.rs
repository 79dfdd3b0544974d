//! Encodes authoritative [`StateChange`]s back into wire notification
//! frames, for fan-out to every connected peer (spec.md §4.5: "a state
//! change on the authoritative model is broadcast, as a notification
//! frame, to every connected peer").

use bytes::Bytes;

use crate::notify::StateChange;
use crate::wire;

/// Returns `None` for changes this protocol subset doesn't expose as a
/// standalone wire frame (per-band EQ, front-panel, and infrared
/// notifications are part of the mechanically-derivable family spec.md
/// §1 scopes out).
pub fn encode(change: &StateChange) -> Option<Bytes> {
    let body = match change {
        StateChange::SourceName { id, name } => format!("OName{}\"{}\"", id, name),
        StateChange::ZoneName { id, name } => format!("ZName{}\"{}\"", id, name),
        StateChange::ZoneVolume { id, level } => format!("Z{}VUL{}", id, level),
        StateChange::ZoneMute { id, mute } => format!("Z{}VM{}", id, *mute as u8),
        StateChange::GroupName { id, name } => format!("GName{}\"{}\"", id, name),
        StateChange::GroupVolume { id, level } => format!("G{}VUL{}", id, level),
        StateChange::GroupMute { id, mute } => format!("G{}VM{}", id, *mute as u8),
        StateChange::GroupZoneAdded { id, zone } => format!("G{}AO{}", id, zone),
        StateChange::GroupZoneRemoved { id, zone } => format!("G{}RO{}", id, zone),
        StateChange::EqualizerPresetName { id, name } => format!("EName{}\"{}\"", id, name),
        StateChange::FavoriteName { id, name } => format!("FName{}\"{}\"", id, name),
        StateChange::ConfigurationSavingToBackup => "SAVING".to_string(),
        StateChange::ConfigurationSavedToBackup => "SAVED".to_string(),
        StateChange::ZoneSource { .. }
        | StateChange::EqualizerPresetBand { .. }
        | StateChange::FrontPanelBrightness { .. }
        | StateChange::FrontPanelLocked { .. }
        | StateChange::InfraredDisabled { .. } => return None,
    };
    Some(Bytes::from(wire::build_response(&body)))
}

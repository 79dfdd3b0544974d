//! The typed data model with invariants (spec.md §3, component E).
//!
//! All entities are owned by their parent collection; collections are
//! owned by the [`DataModel`], which each per-property controller
//! (component H) holds its own slice of. The model has no cycles: `Zone`
//! and `Group` reference `Source`/`EqualizerPreset` only by
//! [`Identifier`], never by pointer.

pub mod equalizer_preset;
pub mod favorite;
pub mod field;
pub mod front_panel;
pub mod group;
pub mod identifier;
pub mod infrared;
pub mod network;
pub mod source;
pub mod zone;

pub use equalizer_preset::EqualizerPresets;
pub use favorite::Favorites;
pub use field::{Assignment, Field};
pub use front_panel::FrontPanel;
pub use group::Groups;
pub use identifier::{Identifier, IdentifierRange};
pub use infrared::Infrared;
pub use network::Network;
pub use source::Sources;
pub use zone::Zones;

/// The complete authoritative state, owned by the top-level application
/// object (spec.md §3: "controllers are owned by the top-level
/// application object").
#[derive(Debug, Clone)]
pub struct DataModel {
    pub sources: Sources,
    pub zones: Zones,
    pub groups: Groups,
    pub equalizer_presets: EqualizerPresets,
    pub favorites: Favorites,
    pub front_panel: FrontPanel,
    pub infrared: Infrared,
    pub network: Network,
}

impl DataModel {
    pub fn new() -> Self {
        DataModel {
            sources: Sources::new(),
            zones: Zones::new(),
            groups: Groups::new(),
            equalizer_presets: EqualizerPresets::new(),
            favorites: Favorites::new(),
            front_panel: FrontPanel::new(),
            infrared: Infrared::new(),
            network: Network::new(),
        }
    }
}

impl Default for DataModel {
    fn default() -> Self {
        DataModel::new()
    }
}

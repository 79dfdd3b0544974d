//! One module per logical domain (spec.md §4.6, component H).

pub mod equalizer_presets;
pub mod favorites;
pub mod front_panel;
pub mod groups;
pub mod infrared;
pub mod network;
pub mod sources;
pub mod zones;

pub use equalizer_presets::EqualizerPresetsController;
pub use favorites::FavoritesController;
pub use front_panel::FrontPanelController;
pub use groups::GroupsController;
pub use infrared::InfraredController;
pub use network::NetworkController;
pub use sources::SourcesController;
pub use zones::ZonesController;

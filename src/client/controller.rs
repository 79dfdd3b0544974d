//! Composition root for per-property controllers (spec.md §4.6,
//! component H; §9: "Inheritance triangle of Common/Client/Server
//! `*ControllerBasis` → composition + role-selector"). Each controller
//! type is a small struct over shared model/notifier handles; which
//! handler bundles it registers is a runtime choice (`Roles`), not a
//! base-class hierarchy.

use std::sync::{Arc, Mutex};

use crate::model::DataModel;
use crate::notify::Notifier;

/// Which of the three roles a controller participates in (spec.md
/// §4.6). A plain client process sets only `client`; the device
/// simulator sets only `server`; the proxy sets all three.
#[derive(Debug, Clone, Copy, Default)]
pub struct Roles {
    pub client: bool,
    pub server: bool,
    pub proxy: bool,
}

impl Roles {
    pub fn client_only() -> Self {
        Roles {
            client: true,
            ..Default::default()
        }
    }

    pub fn server_only() -> Self {
        Roles {
            server: true,
            ..Default::default()
        }
    }

    pub fn proxy() -> Self {
        Roles {
            client: true,
            server: true,
            proxy: true,
        }
    }
}

/// Handles shared by every controller: the authoritative model and the
/// notifier fanning out its mutations. Controllers never own the model
/// outright (spec.md §3: "controllers are owned by the top-level
/// application object"); the application object owns exactly one of
/// each and clones the handle into every controller it constructs.
#[derive(Clone)]
pub struct SharedState {
    pub model: Arc<Mutex<DataModel>>,
    pub notifier: Arc<Mutex<Notifier>>,
}

impl SharedState {
    pub fn new() -> Self {
        SharedState {
            model: Arc::new(Mutex::new(DataModel::new())),
            notifier: Arc::new(Mutex::new(Notifier::new())),
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        SharedState::new()
    }
}

/// Parses capture group `index` (0-based, post `owned_captures`) as an
/// `Identifier`. Malformed or out-of-range captures are a silently
/// discarded notification, not a panic: the registry already validated
/// shape, but the network is never trusted for numeric range.
pub(super) fn parse_identifier_capture(
    captures: &[Option<String>],
    index: usize,
) -> Option<crate::model::Identifier> {
    captures
        .get(index)?
        .as_deref()?
        .parse::<u8>()
        .ok()
        .map(crate::model::Identifier::new)
}

pub(super) fn parse_i8_capture(captures: &[Option<String>], index: usize) -> Option<i8> {
    captures.get(index)?.as_deref()?.parse::<i8>().ok()
}

pub(super) fn parse_bool_flag_capture(captures: &[Option<String>], index: usize) -> Option<bool> {
    match captures.get(index)?.as_deref()? {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}

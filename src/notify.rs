//! State-Change Notifier (spec.md §4, component K): a tagged-union
//! notification delivered to every subscriber on each authoritative model
//! mutation. Notifications carry identifiers and, where cheap, post-image
//! values — never references into the model (spec.md §3).

use crate::model::identifier::Identifier;

/// One authoritative model mutation, or a verbatim device notification
/// that the core surfaces without interpreting (spec.md §6: `(SAVING)`/
/// `(SAVED)`).
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    SourceName {
        id: Identifier,
        name: String,
    },
    ZoneName {
        id: Identifier,
        name: String,
    },
    ZoneVolume {
        id: Identifier,
        level: i8,
    },
    ZoneMute {
        id: Identifier,
        mute: bool,
    },
    ZoneSource {
        id: Identifier,
        source: Identifier,
    },
    GroupName {
        id: Identifier,
        name: String,
    },
    GroupVolume {
        id: Identifier,
        level: i8,
    },
    GroupMute {
        id: Identifier,
        mute: bool,
    },
    GroupZoneAdded {
        id: Identifier,
        zone: Identifier,
    },
    GroupZoneRemoved {
        id: Identifier,
        zone: Identifier,
    },
    EqualizerPresetName {
        id: Identifier,
        name: String,
    },
    EqualizerPresetBand {
        id: Identifier,
        band: usize,
        level: i8,
    },
    FavoriteName {
        id: Identifier,
        name: String,
    },
    FrontPanelBrightness {
        brightness: u8,
    },
    FrontPanelLocked {
        locked: bool,
    },
    InfraredDisabled {
        disabled: bool,
    },
    /// `(SAVING)` — the device has begun a periodic configuration
    /// snapshot. Surfaced verbatim; the core does not persist anything
    /// itself (spec.md §6, Non-goals).
    ConfigurationSavingToBackup,
    /// `(SAVED)` — the periodic snapshot completed.
    ConfigurationSavedToBackup,
}

type Subscriber = Box<dyn FnMut(&StateChange) + Send>;

/// Fans a `StateChange` out to every registered subscriber, in
/// registration order. Mutation happens before the subscriber is called
/// (spec.md §5: "within a frame the model is mutated before the
/// state-change subscriber is called").
#[derive(Default)]
pub struct Notifier {
    subscribers: Vec<Subscriber>,
}

impl Notifier {
    pub fn new() -> Self {
        Notifier {
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, f: F)
    where
        F: FnMut(&StateChange) + Send + 'static,
    {
        self.subscribers.push(Box::new(f));
    }

    pub fn notify(&mut self, change: StateChange) {
        for subscriber in &mut self.subscribers {
            subscriber(&change);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn notify_fans_out_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut notifier = Notifier::new();

        let log1 = log.clone();
        notifier.subscribe(move |_| log1.lock().unwrap().push(1));
        let log2 = log.clone();
        notifier.subscribe(move |_| log2.lock().unwrap().push(2));

        notifier.notify(StateChange::ConfigurationSavingToBackup);
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
    }
}

//! Zones controller (spec.md §4.6, component H): client-role mutators
//! and notification handlers, plus the server-role request handlers
//! that mirror the same mutations against the authoritative model.
//!
//! The full `Set*`/`Get*`/`Toggle*`/`Increase*`/`Decrease*` family is a
//! mechanical, out-of-scope derivative of the pattern below (spec.md
//! §1); volume level, mute toggle, and name are implemented in full as
//! the representative slice exercised by the testable properties in
//! spec.md §8.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::client::controller::{parse_i8_capture, parse_identifier_capture, Roles, SharedState};
use crate::client::exchange::ExchangeState;
use crate::client::handlers::HandlerTable;
use crate::error::{Error, Result};
use crate::model::{field::Assignment, Identifier};
use crate::notify::StateChange;
use crate::pattern::Kind;
use crate::runloop::RunLoopQueue;
use crate::wire;

#[derive(Clone)]
pub struct ZonesController {
    queue: RunLoopQueue<ExchangeState>,
    shared: SharedState,
    roles: Roles,
}

impl ZonesController {
    pub fn new(queue: RunLoopQueue<ExchangeState>, shared: SharedState) -> Self {
        ZonesController {
            queue,
            shared,
            roles: Roles::proxy(),
        }
    }

    /// Restricts which of `init_client`/`init_server` actually register
    /// anything (spec.md §4.6: "controllers declare which roles they
    /// perform"). Defaults to every role; a plain client or device
    /// simulator narrows it with `Roles::client_only()`/`server_only()`.
    pub fn with_roles(mut self, roles: Roles) -> Self {
        self.roles = roles;
        self
    }

    /// Client role init (spec.md §4.6): registers this controller's
    /// notification handlers so inbound `(ZName...)`/`(ZiVUL...)`/
    /// `(ZiVM...)` frames update the local model. A no-op if `roles`
    /// doesn't include the client role.
    pub fn init_client(&self, handlers: &mut HandlerTable) -> Result<()> {
        if !self.roles.client {
            return Ok(());
        }
        let shared = self.shared.clone();
        handlers.register(
            Kind::ZoneName,
            Box::new(move |caps| {
                let (Some(id), Some(name)) =
                    (parse_identifier_capture(&caps, 0), caps.get(1).cloned().flatten())
                else {
                    return;
                };
                apply_and_notify(&shared, id, |zone| zone.set_name(name.clone()), |id| {
                    StateChange::ZoneName {
                        id,
                        name: name.clone(),
                    }
                });
            }),
        )?;

        let shared = self.shared.clone();
        handlers.register(
            Kind::ZoneVolumeLevel,
            Box::new(move |caps| {
                let (Some(id), Some(level)) =
                    (parse_identifier_capture(&caps, 0), parse_i8_capture(&caps, 1))
                else {
                    return;
                };
                apply_and_notify(
                    &shared,
                    id,
                    |zone| zone.set_volume_level(level),
                    |id| StateChange::ZoneVolume { id, level },
                );
            }),
        )?;

        let shared = self.shared.clone();
        handlers.register(
            Kind::ZoneVolumeMuteToggleResult,
            Box::new(move |caps| {
                let (Some(id), Some(mute)) = (
                    parse_identifier_capture(&caps, 0),
                    caps.get(1).and_then(|c| c.as_deref()).map(|v| v == "1"),
                ) else {
                    return;
                };
                apply_and_notify(
                    &shared,
                    id,
                    |zone| zone.set_volume_mute(mute),
                    |id| StateChange::ZoneMute { id, mute },
                );
            }),
        )?;

        Ok(())
    }

    /// Server role (spec.md §4.5): registers this controller's request
    /// handlers with a server-side `RequestHandlerTable`. A no-op if
    /// `roles` doesn't include the server role.
    pub fn init_server(&self, handlers: &mut crate::server::RequestHandlerTable) -> Result<()> {
        if !self.roles.server {
            return Ok(());
        }
        let shared = self.shared.clone();
        handlers.register(
            Kind::QueryZone,
            Box::new(move |caps| {
                let id = parse_identifier_capture(&caps, 0).ok_or_else(Error::bad_command)?;
                let model = shared.model.lock().unwrap();
                let zone = model.zones.get(id)?;
                // `?` on an uninitialized name surfaces `NotInitialized`,
                // which `ServerCommandManager::dispatch_frame` reads as
                // "cache miss, forward through the Proxy Splice" rather
                // than a genuine failure (spec.md §4.8, scenario S3).
                let name = zone.name()?;
                Ok(Bytes::from(format!("ZName{}\"{}\"", id, name)))
            }),
        )?;

        let shared = self.shared.clone();
        handlers.register(
            Kind::ZoneVolumeLevel,
            Box::new(move |caps| {
                let id = parse_identifier_capture(&caps, 0).ok_or_else(Error::bad_command)?;
                let level = parse_i8_capture(&caps, 1).ok_or_else(Error::bad_command)?;
                let mut model = shared.model.lock().unwrap();
                let zone = model.zones.get_mut(id)?;
                let assignment = zone.set_volume_level(level)?;
                drop(model);
                if assignment == Assignment::Initialized {
                    shared
                        .notifier
                        .lock()
                        .unwrap()
                        .notify(StateChange::ZoneVolume { id, level });
                }
                Ok(Bytes::from(format!("Z{}VUL{}", id, level)))
            }),
        )?;

        let shared = self.shared.clone();
        handlers.register(
            Kind::ZoneVolumeMuteToggle,
            Box::new(move |caps| {
                let id = parse_identifier_capture(&caps, 0).ok_or_else(Error::bad_command)?;
                let mut model = shared.model.lock().unwrap();
                let zone = model.zones.get_mut(id)?;
                let mute = zone.toggle_volume_mute()?;
                drop(model);
                shared
                    .notifier
                    .lock()
                    .unwrap()
                    .notify(StateChange::ZoneMute { id, mute });
                Ok(Bytes::from(format!("Z{}VM{}", id, mute as u8)))
            }),
        )?;

        Ok(())
    }

    /// Client-role mutator. Builds `[ZiVULn]`, queues it, and on
    /// completion applies the same post-image the notification handler
    /// would have (the wire protocol answers a direct request with the
    /// identical frame shape it also uses for notifications).
    pub async fn set_volume_level(&self, id: Identifier, level: i8) -> Result<()> {
        let body = format!("Z{}VUL{}", id, level);
        let shared = self.shared.clone();
        let (tx, rx) = oneshot::channel::<Result<()>>();

        let exchange = ExchangeState::new(
            Bytes::from(wire::build_request(&body)),
            Kind::ZoneVolumeLevel,
            Duration::from_secs(5),
            Box::new(move |_captures| {
                apply_and_notify(
                    &shared,
                    id,
                    |zone| zone.set_volume_level(level),
                    |id| StateChange::ZoneVolume { id, level },
                );
                let _ = tx.send(Ok(()));
            }),
            Box::new(move |err| {
                let _ = tx.send(Err(err));
            }),
        );
        self.queue.push(exchange).await?;
        rx.await.map_err(|_| Error::disconnected())?
    }

    /// Client-role mutator for `[ZiVMT]`.
    pub async fn toggle_mute(&self, id: Identifier) -> Result<bool> {
        let body = format!("Z{}VMT", id);
        let shared = self.shared.clone();
        let (tx, rx) = oneshot::channel::<Result<bool>>();

        let exchange = ExchangeState::new(
            Bytes::from(wire::build_request(&body)),
            Kind::ZoneVolumeMuteToggleResult,
            Duration::from_secs(5),
            Box::new(move |captures| {
                let mute = captures
                    .get(1)
                    .and_then(|c| c.as_deref())
                    .map(|v| v == "1")
                    .unwrap_or(false);
                apply_and_notify(
                    &shared,
                    id,
                    |zone| zone.set_volume_mute(mute),
                    |id| StateChange::ZoneMute { id, mute },
                );
                let _ = tx.send(Ok(mute));
            }),
            Box::new(move |err| {
                let _ = tx.send(Err(err));
            }),
        );
        self.queue.push(exchange).await?;
        rx.await.map_err(|_| Error::disconnected())?
    }
}

/// Applies `mutate` to the zone identified by `id` and, if it produced
/// a real (non-`AlreadySet`) change, fires the notification `change`
/// builds. Shared by both the notification-handler path (spec.md §3:
/// "Assignment to the same value succeeds with `AlreadySet`... so
/// higher layers can suppress redundant notifications") and the
/// client-mutator completion path.
fn apply_and_notify(
    shared: &SharedState,
    id: Identifier,
    mutate: impl FnOnce(&mut crate::model::zone::Zone) -> Result<Assignment>,
    change: impl FnOnce(Identifier) -> StateChange,
) {
    let mut model = shared.model.lock().unwrap();
    let Ok(zone) = model.zones.get_mut(id) else {
        return;
    };
    let Ok(assignment) = mutate(zone) else {
        return;
    };
    drop(model);
    if assignment == Assignment::Initialized {
        shared.notifier.lock().unwrap().notify(change(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Identifier;

    #[test]
    fn apply_and_notify_suppresses_duplicate_notifications() {
        let shared = SharedState::new();
        let fired = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let fired2 = fired.clone();
        shared.notifier.lock().unwrap().subscribe(move |_| {
            fired2.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        let id = Identifier::new(1);
        apply_and_notify(&shared, id, |z| z.set_volume_level(-20), |id| StateChange::ZoneVolume { id, level: -20 });
        apply_and_notify(&shared, id, |z| z.set_volume_level(-20), |id| StateChange::ZoneVolume { id, level: -20 });

        assert_eq!(fired.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn client_only_role_skips_server_registration() {
        let (queue, _consumer) = crate::runloop::channel(1);
        let zones = ZonesController::new(queue, SharedState::new()).with_roles(Roles::client_only());

        let mut request_handlers = crate::server::RequestHandlerTable::new();
        zones.init_server(&mut request_handlers).unwrap();
        assert!(request_handlers.get(Kind::QueryZone).is_none());

        let registry = Arc::new(crate::pattern::PatternRegistry::responses().unwrap());
        let mut notification_handlers = HandlerTable::new(registry);
        zones.init_client(&mut notification_handlers).unwrap();
        // A second registration for the same kind only fails if
        // `init_client` already claimed it.
        assert!(notification_handlers
            .register(Kind::ZoneName, Box::new(|_| {}))
            .is_err());
    }

    #[test]
    fn server_only_role_skips_client_registration() {
        let (queue, _consumer) = crate::runloop::channel(1);
        let zones = ZonesController::new(queue, SharedState::new()).with_roles(Roles::server_only());

        let registry = Arc::new(crate::pattern::PatternRegistry::responses().unwrap());
        let mut notification_handlers = HandlerTable::new(registry);
        zones.init_client(&mut notification_handlers).unwrap();
        assert!(notification_handlers
            .register(Kind::ZoneName, Box::new(|_| {}))
            .is_ok());

        let mut request_handlers = crate::server::RequestHandlerTable::new();
        zones.init_server(&mut request_handlers).unwrap();
        assert!(request_handlers.get(Kind::QueryZone).is_some());
    }
}

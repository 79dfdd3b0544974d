//! Groups controller (spec.md §4.6, component H). Group volume is a
//! shorthand applied to every member zone; group mute toggles by
//! majority (spec.md §3, and scenario S6 in spec.md §8).

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::client::controller::{parse_identifier_capture, Roles, SharedState};
use crate::client::exchange::ExchangeState;
use crate::client::handlers::HandlerTable;
use crate::error::{Error, Result};
use crate::model::Identifier;
use crate::notify::StateChange;
use crate::pattern::Kind;
use crate::runloop::RunLoopQueue;
use crate::wire;

#[derive(Clone)]
pub struct GroupsController {
    queue: RunLoopQueue<ExchangeState>,
    shared: SharedState,
    roles: Roles,
}

impl GroupsController {
    pub fn new(queue: RunLoopQueue<ExchangeState>, shared: SharedState) -> Self {
        GroupsController {
            queue,
            shared,
            roles: Roles::proxy(),
        }
    }

    pub fn with_roles(mut self, roles: Roles) -> Self {
        self.roles = roles;
        self
    }

    /// A no-op if `roles` doesn't include the client role.
    pub fn init_client(&self, handlers: &mut HandlerTable) -> Result<()> {
        if !self.roles.client {
            return Ok(());
        }
        let shared = self.shared.clone();
        handlers.register(
            Kind::GroupName,
            Box::new(move |caps| {
                let (Some(id), Some(name)) =
                    (parse_identifier_capture(&caps, 0), caps.get(1).cloned().flatten())
                else {
                    return;
                };
                let mut model = shared.model.lock().unwrap();
                let Ok(group) = model.groups.get_mut(id) else {
                    return;
                };
                let Ok(assignment) = group.set_name(name.clone()) else {
                    return;
                };
                drop(model);
                if assignment == crate::model::Assignment::Initialized {
                    shared
                        .notifier
                        .lock()
                        .unwrap()
                        .notify(StateChange::GroupName { id, name });
                }
            }),
        )?;

        let shared = self.shared.clone();
        handlers.register(
            Kind::GroupVolumeMuteToggleResult,
            Box::new(move |caps| {
                let (Some(id), Some(mute)) = (
                    parse_identifier_capture(&caps, 0),
                    caps.get(1).and_then(|c| c.as_deref()).map(|v| v == "1"),
                ) else {
                    return;
                };
                apply_mute_value(&shared, id, mute);
            }),
        )?;

        let shared = self.shared.clone();
        handlers.register(
            Kind::GroupZoneAdd,
            Box::new(move |caps| {
                let (Some(id), Some(zone)) =
                    (parse_identifier_capture(&caps, 0), parse_identifier_capture(&caps, 1))
                else {
                    return;
                };
                let mut model = shared.model.lock().unwrap();
                let Ok(group) = model.groups.get_mut(id) else {
                    return;
                };
                let Ok(assignment) = group.add_zone(zone) else {
                    return;
                };
                drop(model);
                if assignment == crate::model::Assignment::Initialized {
                    shared
                        .notifier
                        .lock()
                        .unwrap()
                        .notify(StateChange::GroupZoneAdded { id, zone });
                }
            }),
        )?;

        let shared = self.shared.clone();
        handlers.register(
            Kind::GroupZoneRemove,
            Box::new(move |caps| {
                let (Some(id), Some(zone)) =
                    (parse_identifier_capture(&caps, 0), parse_identifier_capture(&caps, 1))
                else {
                    return;
                };
                let mut model = shared.model.lock().unwrap();
                let Ok(group) = model.groups.get_mut(id) else {
                    return;
                };
                if group.remove_zone(zone).is_err() {
                    return;
                }
                drop(model);
                shared
                    .notifier
                    .lock()
                    .unwrap()
                    .notify(StateChange::GroupZoneRemoved { id, zone });
            }),
        )?;

        Ok(())
    }

    /// A no-op if `roles` doesn't include the server role.
    pub fn init_server(&self, handlers: &mut crate::server::RequestHandlerTable) -> Result<()> {
        if !self.roles.server {
            return Ok(());
        }
        let shared = self.shared.clone();
        handlers.register(
            Kind::GroupVolumeMuteToggle,
            Box::new(move |caps| {
                let id = parse_identifier_capture(&caps, 0).ok_or_else(Error::bad_command)?;
                let mute = toggle_mute_locked(&shared, id)?;
                Ok(Bytes::from(format!("G{}VM{}", id, mute as u8)))
            }),
        )?;

        let shared = self.shared.clone();
        handlers.register(
            Kind::GroupZoneAdd,
            Box::new(move |caps| {
                let id = parse_identifier_capture(&caps, 0).ok_or_else(Error::bad_command)?;
                let zone = parse_identifier_capture(&caps, 1).ok_or_else(Error::bad_command)?;
                let mut model = shared.model.lock().unwrap();
                let group = model.groups.get_mut(id)?;
                let assignment = group.add_zone(zone)?;
                drop(model);
                if assignment == crate::model::Assignment::Initialized {
                    shared
                        .notifier
                        .lock()
                        .unwrap()
                        .notify(StateChange::GroupZoneAdded { id, zone });
                }
                Ok(Bytes::from(format!("G{}AO{}", id, zone)))
            }),
        )?;

        let shared = self.shared.clone();
        handlers.register(
            Kind::GroupZoneRemove,
            Box::new(move |caps| {
                let id = parse_identifier_capture(&caps, 0).ok_or_else(Error::bad_command)?;
                let zone = parse_identifier_capture(&caps, 1).ok_or_else(Error::bad_command)?;
                let mut model = shared.model.lock().unwrap();
                let group = model.groups.get_mut(id)?;
                group.remove_zone(zone)?;
                drop(model);
                shared
                    .notifier
                    .lock()
                    .unwrap()
                    .notify(StateChange::GroupZoneRemoved { id, zone });
                Ok(Bytes::from(format!("G{}RO{}", id, zone)))
            }),
        )?;

        Ok(())
    }

    /// Client-role mutator for `[GiVMT]` (scenario S6).
    pub async fn toggle_mute(&self, id: Identifier) -> Result<bool> {
        let body = format!("G{}VMT", id);
        let shared = self.shared.clone();
        let (tx, rx) = oneshot::channel::<Result<bool>>();

        let exchange = ExchangeState::new(
            Bytes::from(wire::build_request(&body)),
            Kind::GroupVolumeMuteToggleResult,
            Duration::from_secs(5),
            Box::new(move |captures| {
                let mute = captures
                    .get(1)
                    .and_then(|c| c.as_deref())
                    .map(|v| v == "1")
                    .unwrap_or(false);
                apply_mute_value(&shared, id, mute);
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

/// Fires one `ZoneMute` per member zone plus one `GroupMute`, all
/// before returning, matching S6's "all four notifications fire before
/// the completion handler returns".
fn toggle_mute_locked(shared: &SharedState, id: Identifier) -> Result<bool> {
    let mut model = shared.model.lock().unwrap();
    let crate::model::DataModel { groups, zones, .. } = &mut *model;
    let group = groups.get_mut(id)?;
    let new_value = group.toggle_mute(zones)?;
    let member_zones: Vec<Identifier> = group.zones().collect();
    drop(model);

    let mut notifier = shared.notifier.lock().unwrap();
    for zone_id in member_zones {
        notifier.notify(StateChange::ZoneMute {
            id: zone_id,
            mute: new_value,
        });
    }
    notifier.notify(StateChange::GroupMute {
        id,
        mute: new_value,
    });
    Ok(new_value)
}

/// Applies a mute value already settled upstream (a captured `(GiVM*)`
/// reply or notification) to the group and its member zones, firing a
/// notification only for whichever of them actually changed. Mirrors
/// `zones.rs`'s `apply_and_notify`: redelivery of the same frame sets
/// every field to the value it already holds, so nothing fires twice.
fn apply_mute_value(shared: &SharedState, id: Identifier, mute: bool) {
    let mut model = shared.model.lock().unwrap();
    let crate::model::DataModel { groups, zones, .. } = &mut *model;
    let Ok(group) = groups.get_mut(id) else {
        return;
    };
    let Ok(result) = group.set_mute(mute, zones) else {
        return;
    };
    drop(model);

    let mut notifier = shared.notifier.lock().unwrap();
    for zone_id in result.changed_zones {
        notifier.notify(StateChange::ZoneMute { id: zone_id, mute });
    }
    if result.group_changed {
        notifier.notify(StateChange::GroupMute { id, mute });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_mute_locked_fires_one_notification_per_member_plus_group() {
        let shared = SharedState::new();
        {
            let mut model = shared.model.lock().unwrap();
            model.groups.get_mut(Identifier::new(1)).unwrap().add_zone(Identifier::new(1)).unwrap();
            model.groups.get_mut(Identifier::new(1)).unwrap().add_zone(Identifier::new(2)).unwrap();
        }
        let count = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let count2 = count.clone();
        shared.notifier.lock().unwrap().subscribe(move |_| {
            count2.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        toggle_mute_locked(&shared, Identifier::new(1)).unwrap();
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[test]
    fn apply_mute_value_suppresses_duplicate_notifications() {
        let shared = SharedState::new();
        {
            let mut model = shared.model.lock().unwrap();
            model.groups.get_mut(Identifier::new(1)).unwrap().add_zone(Identifier::new(1)).unwrap();
            model.groups.get_mut(Identifier::new(1)).unwrap().add_zone(Identifier::new(2)).unwrap();
        }
        let count = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let count2 = count.clone();
        shared.notifier.lock().unwrap().subscribe(move |_| {
            count2.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        apply_mute_value(&shared, Identifier::new(1), true);
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 3);
        // Redelivery of the same settled value: every field is already
        // at `true`, so nothing fires a second time.
        apply_mute_value(&shared, Identifier::new(1), true);
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[test]
    fn client_only_role_skips_server_registration() {
        let (queue, _consumer) = crate::runloop::channel(1);
        let groups = GroupsController::new(queue, SharedState::new()).with_roles(Roles::client_only());

        let mut request_handlers = crate::server::RequestHandlerTable::new();
        groups.init_server(&mut request_handlers).unwrap();
        assert!(request_handlers.get(Kind::GroupVolumeMuteToggle).is_none());

        let registry = std::sync::Arc::new(crate::pattern::PatternRegistry::responses().unwrap());
        let mut notification_handlers = HandlerTable::new(registry);
        groups.init_client(&mut notification_handlers).unwrap();
        assert!(notification_handlers
            .register(Kind::GroupName, Box::new(|_| {}))
            .is_err());
    }

    #[test]
    fn server_only_role_skips_client_registration() {
        let (queue, _consumer) = crate::runloop::channel(1);
        let groups = GroupsController::new(queue, SharedState::new()).with_roles(Roles::server_only());

        let registry = std::sync::Arc::new(crate::pattern::PatternRegistry::responses().unwrap());
        let mut notification_handlers = HandlerTable::new(registry);
        groups.init_client(&mut notification_handlers).unwrap();
        assert!(notification_handlers
            .register(Kind::GroupName, Box::new(|_| {}))
            .is_ok());

        let mut request_handlers = crate::server::RequestHandlerTable::new();
        groups.init_server(&mut request_handlers).unwrap();
        assert!(request_handlers.get(Kind::GroupVolumeMuteToggle).is_some());
    }
}


//! Controller Lifecycle (spec.md §4.7, component I): the application-
//! level state machine driven by Connection Manager lifecycle events
//! plus the aggregate refresh-completion signal.
//!
//! Refresh collapses to a single `[QX]` exchange for this protocol: the
//! wire grammar (spec.md §6) defines exactly one query operation, and
//! scenario S2 shows every controller's state arriving as notifications
//! interleaved ahead of that one exchange's `(QX)` terminator. So unlike
//! spec.md §4.6's per-controller "expected count" framing, there is
//! nothing here to aggregate across controllers — the lifecycle treats
//! the single QX completion as 100% refresh progress in one step (see
//! DESIGN.md, Open Question resolution).

use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Disconnected,
    Resolving,
    Connecting,
    Refreshing,
    Steady,
    Disconnecting,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleTransition {
    DidBeginResolving,
    DidNotResolve(String),
    DidBeginConnecting,
    DidConnect,
    DidNotConnect(String),
    DidBeginRefreshing,
    DidRefresh,
    DidNotRefresh(String),
    DidBeginDisconnecting,
    DidDisconnect,
}

pub struct ControllerLifecycle {
    state: std::sync::Mutex<LifecycleState>,
    events_tx: broadcast::Sender<LifecycleTransition>,
}

impl ControllerLifecycle {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(32);
        ControllerLifecycle {
            state: std::sync::Mutex::new(LifecycleState::Disconnected),
            events_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleTransition> {
        self.events_tx.subscribe()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap()
    }

    fn transition(&self, state: LifecycleState, event: LifecycleTransition) {
        *self.state.lock().unwrap() = state;
        let _ = self.events_tx.send(event);
    }

    pub fn begin_resolving(&self) {
        self.transition(LifecycleState::Resolving, LifecycleTransition::DidBeginResolving);
    }

    pub fn did_not_resolve(&self, reason: impl Into<String>) {
        self.transition(
            LifecycleState::Disconnected,
            LifecycleTransition::DidNotResolve(reason.into()),
        );
    }

    pub fn begin_connecting(&self) {
        self.transition(
            LifecycleState::Connecting,
            LifecycleTransition::DidBeginConnecting,
        );
    }

    /// `DidConnect` immediately begins refresh (spec.md §4.7's
    /// `Connecting → Refreshing` edge has no other gate).
    pub fn did_connect(&self) {
        self.transition(LifecycleState::Refreshing, LifecycleTransition::DidConnect);
        let _ = self.events_tx.send(LifecycleTransition::DidBeginRefreshing);
    }

    pub fn did_not_connect(&self, reason: impl Into<String>) {
        self.transition(
            LifecycleState::Disconnected,
            LifecycleTransition::DidNotConnect(reason.into()),
        );
    }

    /// Property 6 (spec.md §8): fires exactly once per refresh cycle.
    pub fn did_refresh(&self) {
        self.transition(LifecycleState::Steady, LifecycleTransition::DidRefresh);
    }

    pub fn did_not_refresh(&self, reason: impl Into<String>) {
        self.transition(
            LifecycleState::Disconnecting,
            LifecycleTransition::DidNotRefresh(reason.into()),
        );
    }

    pub fn begin_disconnecting(&self) {
        self.transition(
            LifecycleState::Disconnecting,
            LifecycleTransition::DidBeginDisconnecting,
        );
    }

    pub fn did_disconnect(&self) {
        self.transition(LifecycleState::Disconnected, LifecycleTransition::DidDisconnect);
    }
}

impl Default for ControllerLifecycle {
    fn default() -> Self {
        ControllerLifecycle::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_steady() {
        let lifecycle = ControllerLifecycle::new();
        lifecycle.begin_resolving();
        lifecycle.begin_connecting();
        lifecycle.did_connect();
        assert_eq!(lifecycle.state(), LifecycleState::Refreshing);
        lifecycle.did_refresh();
        assert_eq!(lifecycle.state(), LifecycleState::Steady);
    }

    #[test]
    fn scenario_s5_timed_out_connect_returns_to_disconnected() {
        let lifecycle = ControllerLifecycle::new();
        let mut events = lifecycle.subscribe();
        lifecycle.begin_resolving();
        lifecycle.begin_connecting();
        lifecycle.did_not_connect("operation timed out");
        assert_eq!(lifecycle.state(), LifecycleState::Disconnected);

        let mut saw_did_not_connect = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, LifecycleTransition::DidNotConnect(_)) {
                saw_did_not_connect += 1;
            }
        }
        assert_eq!(saw_did_not_connect, 1);
    }

    #[test]
    fn refresh_failure_moves_to_disconnecting() {
        let lifecycle = ControllerLifecycle::new();
        lifecycle.did_connect();
        lifecycle.did_not_refresh("disconnected mid-refresh");
        assert_eq!(lifecycle.state(), LifecycleState::Disconnecting);
    }
}

//! Client role: Command Manager, notification dispatch, per-property
//! controllers, and the Controller Lifecycle state machine (spec.md
//! §4.4, §4.6, §4.7; components F, H, I).

pub mod command_manager;
pub mod controller;
pub mod controllers;
pub mod exchange;
pub mod handlers;
pub mod lifecycle;

pub use command_manager::CommandManager;
pub use controller::{Roles, SharedState};
pub use exchange::{Captures, ExchangeId, ExchangeState};
pub use handlers::HandlerTable;
pub use lifecycle::{ControllerLifecycle, LifecycleState, LifecycleTransition};

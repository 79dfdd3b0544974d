//! Server role: accepts connections, dispatches bracket-syntax requests
//! to per-controller handlers, and broadcasts state-change notifications
//! to every connected peer (spec.md §4.5, §4.6; components G, H).

pub mod broadcast;
pub mod command_manager;
pub mod handlers;

pub use command_manager::{ConnectionId, ServerCommandManager};
pub use handlers::{RequestHandler, RequestHandlerTable};

//! Connection (B) and Connection Manager (C) — spec.md §4.2.
//!
//! One task per `Connection` reads the socket and forwards chunks to the
//! single application-data delegate; a second task owns writes. This is
//! the "async task per connection, message-passing to the owning task"
//! shape spec.md §9 asks for in place of a run-loop/coroutine model,
//! grounded on the teacher's `server::tcp::AddrIncoming`/`AddrStream`
//! (tokio socket wrapping, keepalive/nodelay setters, accept-loop
//! resilience) generalized to also cover the outbound connect path.

pub mod io;
pub mod manager;

pub use io::{Connected, LifecycleEvent};
pub use manager::{ConnectionManager, ConnectionManagerBuilder, IpFilter};

pub(crate) use io::accept;

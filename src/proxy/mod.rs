//! Proxy role: splices a server-facing (downstream) Command Manager
//! with a client-facing (upstream) one, forwarding requests the local
//! cache can't answer and fanning the resulting state changes back out
//! (spec.md §4.8, component J).

pub mod splice;

pub use splice::{ProxyContext, ProxySplice};

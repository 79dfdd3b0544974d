//! `openhlx_core`: the protocol dispatch core shared by the client,
//! server-simulator, and proxy roles of a legacy multi-room audio
//! controller's ASCII command protocol (telnet transport).
//!
//! - [`pattern`] — the Pattern Registry (component A), shared by every
//!   role for matching request/response/notification frames.
//! - [`connection`] — the Connection and Connection Manager (B, C):
//!   dialing, accepting, and owning a socket's reader/writer tasks.
//! - [`runloop`] — the Run-Loop Queue (D): the single-producer,
//!   single-consumer FIFO an exchange waits on before becoming active.
//! - [`model`] — the typed data model with its invariants (E).
//! - [`client`] — Command Manager (F), per-property Controllers (H),
//!   and the Controller Lifecycle (I), client-role side.
//! - [`server`] — Command Manager (G) and per-property Controllers,
//!   server-role side, plus broadcast wiring to every connected peer.
//! - [`proxy`] — the Proxy Splice (J), which binds a server-facing
//!   Command Manager to a client-facing one.
//! - [`notify`] — the State-Change Notifier (K).
//! - [`error`] — the crate's error taxonomy.
//! - [`wire`] — the CR-LF frame grammar shared by every role.

pub mod client;
pub mod connection;
pub mod error;
pub mod model;
pub mod notify;
pub mod pattern;
pub mod proxy;
pub mod runloop;
pub mod server;
pub mod wire;

pub use error::{Error, Result};

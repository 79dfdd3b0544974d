//! The per-connection reader/writer tasks (spec.md §4.2, component B).
//!
//! Grounded on the teacher's `server::tcp::AddrStream` (a thin wrapper
//! around `TcpStream` exposing `set_nodelay`/peer and local addresses)
//! generalized from "accepted socket" to "either side of a dial", plus
//! `common::exec`'s task-per-connection spawn shape minus its pluggable
//! `Exec` trait — this crate has exactly one executor (`tokio::spawn`),
//! so that layer of indirection buys nothing spec.md asks for.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, Notify};

use crate::error::Error;

/// Connection lifecycle transitions (spec.md §4.2). Stringified error
/// detail rather than a structured [`Error`](crate::error::Error) so
/// this can be cheaply [`Clone`]d for `broadcast` fan-out to many
/// subscribers; the structured error for the *caller* of `connect`
/// still flows back through its `Result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    WillConnect,
    IsConnecting,
    DidConnect,
    DidNotConnect(String),
    WillDisconnect,
    DidDisconnect(Option<String>),
}

const READ_CHUNK: usize = 4096;

/// A live, connected socket. Dropping this (or calling
/// [`Connected::disconnect`]) tears down its reader and writer tasks.
pub struct Connected {
    write_tx: mpsc::UnboundedSender<Bytes>,
    shutdown: Arc<Notify>,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
}

impl Connected {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Enqueues `bytes` for the writer task. Fails with `Disconnected`
    /// if the connection has already torn down.
    pub fn send(&self, bytes: Bytes) -> crate::error::Result<()> {
        self.write_tx
            .send(bytes)
            .map_err(|_| Error::disconnected())
    }

    /// Signals both tasks to stop. Idempotent.
    pub fn disconnect(&self) {
        self.shutdown.notify_waiters();
    }
}

/// Splits `stream` into reader/writer halves and spawns one task per
/// half (spec.md §9: "an async task per connection, not a run-loop or a
/// coroutine").
pub(crate) fn spawn(
    stream: TcpStream,
    write_stall_timeout: Duration,
    app_data_delegate: Option<mpsc::UnboundedSender<Bytes>>,
    lifecycle_tx: broadcast::Sender<LifecycleEvent>,
) -> Connected {
    let local_addr = stream
        .local_addr()
        .unwrap_or_else(|_| ([0, 0, 0, 0], 0).into());
    let peer_addr = stream
        .peer_addr()
        .unwrap_or_else(|_| ([0, 0, 0, 0], 0).into());

    let _ = stream.set_nodelay(true);
    let (read_half, write_half) = stream.into_split();

    let shutdown = Arc::new(Notify::new());
    let (write_tx, write_rx) = mpsc::unbounded_channel::<Bytes>();

    tokio::spawn(reader_task(
        read_half,
        app_data_delegate,
        lifecycle_tx.clone(),
        shutdown.clone(),
    ));
    tokio::spawn(writer_task(
        write_half,
        write_rx,
        write_stall_timeout,
        lifecycle_tx,
        shutdown.clone(),
    ));

    Connected {
        write_tx,
        shutdown,
        local_addr,
        peer_addr,
    }
}

/// Accept-side entry point (spec.md §4.5): wraps a freshly `accept`ed
/// socket the same way `ConnectionManager::connect` wraps a dialed one,
/// minus the lifecycle multicast (the server-side Command Manager
/// tracks its connections by [`crate::server::ConnectionId`] instead).
/// Returns the inbound byte stream directly since each accepted
/// connection has exactly one reader, never a shared delegate slot.
pub(crate) fn accept(
    stream: TcpStream,
    write_stall_timeout: Duration,
) -> (Connected, mpsc::UnboundedReceiver<Bytes>) {
    let (app_tx, app_rx) = mpsc::unbounded_channel();
    let (lifecycle_tx, _) = broadcast::channel(1);
    let connected = spawn(stream, write_stall_timeout, Some(app_tx), lifecycle_tx);
    (connected, app_rx)
}

async fn reader_task(
    mut read_half: tokio::net::tcp::OwnedReadHalf,
    app_data_delegate: Option<mpsc::UnboundedSender<Bytes>>,
    lifecycle_tx: broadcast::Sender<LifecycleEvent>,
    shutdown: Arc<Notify>,
) {
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    loop {
        buf.clear();
        buf.resize(READ_CHUNK, 0);
        tokio::select! {
            _ = shutdown.notified() => {
                let _ = lifecycle_tx.send(LifecycleEvent::DidDisconnect(None));
                return;
            }
            result = read_half.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        let _ = lifecycle_tx.send(LifecycleEvent::DidDisconnect(None));
                        return;
                    }
                    Ok(n) => {
                        if let Some(tx) = &app_data_delegate {
                            // A closed receiver means the command manager has
                            // already torn down; nothing useful to do with the
                            // bytes in that case.
                            let _ = tx.send(Bytes::copy_from_slice(&buf[..n]));
                        }
                    }
                    Err(err) => {
                        let _ = lifecycle_tx
                            .send(LifecycleEvent::DidDisconnect(Some(err.to_string())));
                        return;
                    }
                }
            }
        }
    }
}

async fn writer_task(
    mut write_half: tokio::net::tcp::OwnedWriteHalf,
    mut write_rx: mpsc::UnboundedReceiver<Bytes>,
    write_stall_timeout: Duration,
    lifecycle_tx: broadcast::Sender<LifecycleEvent>,
    shutdown: Arc<Notify>,
) {
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                let _ = lifecycle_tx.send(LifecycleEvent::WillDisconnect);
                let _ = write_half.shutdown().await;
                return;
            }
            chunk = write_rx.recv() => {
                let Some(chunk) = chunk else {
                    // All `Connected` senders dropped; nothing left to write.
                    let _ = write_half.shutdown().await;
                    return;
                };
                match tokio::time::timeout(write_stall_timeout, write_half.write_all(&chunk)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        let _ = lifecycle_tx
                            .send(LifecycleEvent::DidDisconnect(Some(err.to_string())));
                        return;
                    }
                    Err(_elapsed) => {
                        let err = Error::write_stalled();
                        let _ = lifecycle_tx
                            .send(LifecycleEvent::DidDisconnect(Some(err.to_string())));
                        return;
                    }
                }
            }
        }
    }
}

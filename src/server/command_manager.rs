//! Command Manager — server side (spec.md §4.5, component G). Accepts
//! connections, matches each inbound bracket request against the
//! request pattern table, dispatches to the registered per-controller
//! handler, and answers `[QX]` with a full model dump. Grounded on the
//! teacher's `server::conn::Http::serve_connection` accept-loop shape
//! (spawn-per-connection, log-and-continue on transient accept errors)
//! generalized from HTTP's one-shot request/response to this protocol's
//! many-requests-per-connection, plus unsolicited broadcast.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::client::SharedState;
use crate::connection::Connected;
use crate::error::Result;
use crate::model::DataModel;
use crate::pattern::{Kind, PatternRegistry};
use crate::proxy::{ProxyContext, ProxySplice};
use crate::wire;

use super::broadcast;
use super::handlers::RequestHandlerTable;

/// Identifies one accepted connection for the lifetime of the process.
/// Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub(crate) u64);

thread_local! {
    /// The connection `dispatch_frame` is currently answering, for the
    /// duration of the (synchronous, no `.await` in between) call into a
    /// request handler. Read back by the notifier subscription
    /// `install_broadcast` sets up, so a state change the handler itself
    /// triggers broadcasts to every *other* peer instead of also
    /// duplicating the direct reply below.
    static CURRENT_CONNECTION: Cell<Option<ConnectionId>> = const { Cell::new(None) };
}

/// Owns the set of accepted connections and the request pattern table;
/// one instance serves every connection the process accepts (spec.md
/// §4.5, in contrast to the client-side Command Manager, which is
/// one-per-connection).
pub struct ServerCommandManager {
    shared: SharedState,
    registry: Arc<PatternRegistry>,
    handlers: RequestHandlerTable,
    connections: Mutex<HashMap<ConnectionId, Connected>>,
    next_id: AtomicU64,
    proxy: Mutex<Option<Weak<ProxySplice>>>,
}

impl ServerCommandManager {
    pub fn new(shared: SharedState, handlers: RequestHandlerTable) -> Result<Arc<Self>> {
        Ok(Arc::new(ServerCommandManager {
            shared,
            registry: Arc::new(PatternRegistry::requests()?),
            handlers,
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            proxy: Mutex::new(None),
        }))
    }

    /// Subscribes the shared notifier so every authoritative model
    /// mutation is broadcast to every connected peer (spec.md §4.5).
    /// Call once, after construction, before accepting connections.
    /// Excludes whichever connection `dispatch_frame` is currently
    /// answering (if any): that connection already gets the response
    /// frame directly, and a notifier subscriber fired synchronously
    /// from inside a request handler must not also reach it through the
    /// broadcast, or it receives the same frame twice.
    pub fn install_broadcast(self: &Arc<Self>) {
        let this = Arc::clone(self);
        self.shared.notifier.lock().unwrap().subscribe(move |change| {
            if let Some(frame) = broadcast::encode(change) {
                let exclude = CURRENT_CONNECTION.with(|c| c.get());
                this.broadcast(frame, exclude);
            }
        });
    }

    /// Wires a Proxy Splice so a request handler's `NotInitialized`
    /// (local cache miss) falls through to an upstream forward instead
    /// of `(ERROR)` (spec.md §4.8). Call once, after both are
    /// constructed. Held as a `Weak` reference: the Splice already owns
    /// an `Arc` back to this manager (`downstream`), and a strong cycle
    /// between the two would never be freed.
    pub fn install_proxy(&self, splice: &Arc<ProxySplice>) {
        *self.proxy.lock().unwrap() = Some(Arc::downgrade(splice));
    }

    /// Writes `frame` to every connection except `exclude` (proxy loop
    /// prevention, spec.md §4.8, reuses this same broadcast path).
    pub fn broadcast(&self, frame: Bytes, exclude: Option<ConnectionId>) {
        let connections = self.connections.lock().unwrap();
        for (id, connected) in connections.iter() {
            if Some(*id) == exclude {
                continue;
            }
            let _ = connected.send(frame.clone());
        }
    }

    /// Accepts connections from `listener` until the socket itself
    /// fails, spawning one task per connection (spec.md §9: "an async
    /// task per connection, not a run-loop or a coroutine"). A transient
    /// per-accept error is logged and the loop continues rather than
    /// tearing down the whole server.
    pub async fn accept_loop(self: Arc<Self>, listener: TcpListener, write_stall_timeout: Duration) {
        loop {
            let (stream, peer_addr) = match listener.accept().await {
                Ok(pair) => pair,
                Err(err) => {
                    tracing::warn!(error = %err, "accept failed, continuing");
                    continue;
                }
            };

            let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
            let (connected, inbound_rx) = crate::connection::accept(stream, write_stall_timeout);
            tracing::debug!(id = id.0, %peer_addr, "accepted connection");
            self.connections.lock().unwrap().insert(id, connected);

            let this = Arc::clone(&self);
            tokio::spawn(this.serve_connection(id, inbound_rx));
        }
    }

    async fn serve_connection(
        self: Arc<Self>,
        id: ConnectionId,
        mut inbound_rx: mpsc::UnboundedReceiver<Bytes>,
    ) {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = inbound_rx.recv().await {
            buffer.extend_from_slice(&chunk);
            loop {
                let Some((frame, consumed)) = wire::next_frame(&buffer) else {
                    break;
                };
                let frame_owned = frame.to_vec();
                buffer.advance(consumed);
                let Ok(text) = std::str::from_utf8(&frame_owned) else {
                    tracing::debug!("non-utf8 frame discarded");
                    continue;
                };
                self.dispatch_frame(id, text);
            }
        }
        self.connections.lock().unwrap().remove(&id);
        tracing::debug!(id = id.0, "connection closed");
    }

    /// Matches one already-delimited-checked frame against the request
    /// table and either answers it directly, answers it with a full
    /// model dump (`QX`), forwards it through a wired Proxy Splice when
    /// the handler reports its cache isn't initialized, or replies with
    /// the literal `(ERROR)` frame (spec.md §4.5, §4.8, §6).
    fn dispatch_frame(&self, id: ConnectionId, frame: &str) {
        let Some(body) = crate::pattern::strip_delimiters(frame) else {
            self.reply(id, Bytes::from_static(wire::ERROR_FRAME));
            return;
        };

        let Some((kind, captures)) = self.registry.match_line(body) else {
            self.reply(id, Bytes::from_static(wire::ERROR_FRAME));
            return;
        };
        let owned = crate::pattern::owned_captures(&captures);
        drop(captures);

        if kind == Kind::QueryCurrentConfiguration {
            self.reply_with_refresh(id);
            return;
        }

        let Some(handler) = self.handlers.get(kind) else {
            self.reply(id, Bytes::from_static(wire::ERROR_FRAME));
            return;
        };

        CURRENT_CONNECTION.with(|c| c.set(Some(id)));
        let outcome = handler(owned.clone());
        CURRENT_CONNECTION.with(|c| c.set(None));

        match outcome {
            Ok(response_body) => {
                let text = String::from_utf8_lossy(&response_body);
                self.reply(id, Bytes::from(wire::build_response(&text)));
            }
            Err(err) if kind == Kind::QueryZone && err.is_not_initialized() => {
                self.forward_to_proxy_or_error(id, kind, &owned);
            }
            Err(err) => {
                tracing::debug!(error = %err, "request handler failed");
                self.reply(id, Bytes::from_static(wire::ERROR_FRAME));
            }
        }
    }

    /// Builds the `ProxyContext` for `kind`'s forwardable request and
    /// hands it to the installed Splice, or replies `(ERROR)` if no
    /// Splice is wired or `captures` doesn't parse (spec.md §4.8).
    fn forward_to_proxy_or_error(&self, id: ConnectionId, kind: Kind, captures: &[Option<String>]) {
        let splice = self.proxy.lock().unwrap().as_ref().and_then(Weak::upgrade);
        let zone_id = (kind == Kind::QueryZone)
            .then(|| captures.first())
            .flatten()
            .and_then(|c| c.as_deref())
            .and_then(|s| s.parse::<u8>().ok())
            .map(crate::model::Identifier::new);

        if let (Some(splice), Some(zone_id)) = (splice, zone_id) {
            let context = ProxyContext::query_zone(id, zone_id);
            tokio::spawn(async move {
                let _ = splice.forward(context).await;
            });
        } else {
            self.reply(id, Bytes::from_static(wire::ERROR_FRAME));
        }
    }

    /// `[QX]` (spec.md §6, scenario S2): every currently-initialized
    /// property is written as its own notification frame, followed by
    /// the `(QX)` terminator. This is the single aggregate refresh
    /// exchange the Controller Lifecycle (component I) waits on (see
    /// DESIGN.md).
    fn reply_with_refresh(&self, id: ConnectionId) {
        let dump = {
            let model = self.shared.model.lock().unwrap();
            compose_full_dump(&model)
        };

        let connections = self.connections.lock().unwrap();
        let Some(connected) = connections.get(&id) else {
            return;
        };
        for frame in dump {
            let _ = connected.send(frame);
        }
        let _ = connected.send(Bytes::from(wire::build_response("QX")));
    }

    fn reply(&self, id: ConnectionId, frame: Bytes) {
        let connections = self.connections.lock().unwrap();
        if let Some(connected) = connections.get(&id) {
            let _ = connected.send(frame);
        }
    }

    /// Writes `frame` to exactly one connection, by id. Public for the
    /// Proxy Splice (spec.md §4.8), which answers the originating
    /// downstream connection directly rather than through `dispatch_frame`.
    pub fn send_to(&self, id: ConnectionId, frame: Bytes) {
        self.reply(id, frame);
    }
}

/// Every currently-initialized name/volume/mute frame across every
/// collection, in collection-then-identifier order. Properties still at
/// `NotInitialized` are silently skipped, not sent as empty frames.
fn compose_full_dump(model: &DataModel) -> Vec<Bytes> {
    let mut frames = Vec::new();

    for source in model.sources.iter() {
        if let Ok(name) = source.name() {
            frames.push(response(&format!("OName{}\"{}\"", source.id(), name)));
        }
    }

    for zone in model.zones.iter() {
        if let Ok(name) = zone.name() {
            frames.push(response(&format!("ZName{}\"{}\"", zone.id(), name)));
        }
        if let Ok(level) = zone.volume().level() {
            frames.push(response(&format!("Z{}VUL{}", zone.id(), level)));
        }
        if let Ok(mute) = zone.volume().mute() {
            frames.push(response(&format!("Z{}VM{}", zone.id(), mute as u8)));
        }
    }

    for group in model.groups.iter() {
        if let Ok(name) = group.name() {
            frames.push(response(&format!("GName{}\"{}\"", group.id(), name)));
        }
        if let Ok(level) = group.volume().level() {
            frames.push(response(&format!("G{}VUL{}", group.id(), level)));
        }
        if let Ok(mute) = group.volume().mute() {
            frames.push(response(&format!("G{}VM{}", group.id(), mute as u8)));
        }
    }

    for preset in model.equalizer_presets.iter() {
        if let Ok(name) = preset.name() {
            frames.push(response(&format!("EName{}\"{}\"", preset.id(), name)));
        }
    }

    for favorite in model.favorites.iter() {
        if let Ok(name) = favorite.name() {
            frames.push(response(&format!("FName{}\"{}\"", favorite.id(), name)));
        }
    }

    frames
}

fn response(body: &str) -> Bytes {
    Bytes::from(wire::build_response(body))
}

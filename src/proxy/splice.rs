//! Proxy Splice (spec.md §4.8, component J): forwards an unanswerable
//! downstream request onto the upstream client-side queue and reflects
//! the result back to the originating connection. Grounded on the
//! teacher's `client::pool`'s "reuse idle connection or open a new one"
//! admission control, generalized from connection reuse to per-
//! downstream-connection inflight admission.
//!
//! Rather than re-serializing the upstream response bytes verbatim
//! (spec.md §4.8 point 3), the Splice relies on the same notification-
//! handler → `Notifier` → broadcast pipeline already wired for the
//! proxy's client and server roles to update the cache and fan the
//! resulting state changes out to every connected peer, then writes
//! just the completion terminator `downstream_reply_body` names to the
//! connection that asked for it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::client::exchange::ExchangeState;
use crate::error::{Error, Result};
use crate::model::Identifier;
use crate::pattern::Kind;
use crate::runloop::RunLoopQueue;
use crate::server::{ConnectionId, ServerCommandManager};
use crate::wire;

/// Binds one forwarded request to the downstream connection that asked
/// for it (spec.md §4.8: "creates a `ProxyContext` binding the
/// downstream connection, the original request bytes, the server-side
/// captures... and the originally requested upstream response pattern").
pub struct ProxyContext {
    pub downstream: ConnectionId,
    pub request: Bytes,
    pub upstream_completion: Kind,
    /// The body `forward` wraps in `()` and writes downstream once the
    /// upstream exchange completes (e.g. `"QX"`, `"QZ1"`) — not
    /// necessarily identical to the upstream completion frame, since a
    /// per-zone query's solicited `ZName` notification is reflected
    /// separately through the broadcast pipeline (see module docs).
    pub downstream_reply_body: String,
}

impl ProxyContext {
    pub fn new(
        downstream: ConnectionId,
        request: Bytes,
        upstream_completion: Kind,
        downstream_reply_body: impl Into<String>,
    ) -> Self {
        ProxyContext {
            downstream,
            request,
            upstream_completion,
            downstream_reply_body: downstream_reply_body.into(),
        }
    }

    /// The aggregate `[QX]` refresh exchange.
    pub fn query_current_configuration(downstream: ConnectionId) -> Self {
        Self::new(
            downstream,
            Bytes::from(wire::build_request("QX")),
            Kind::QueryCurrentConfigurationTerminator,
            "QX",
        )
    }

    /// A per-zone `[QZ<id>]` query (spec.md §8 scenario S3): forwarded
    /// when the zone controller's own cache-initialized check fails
    /// (see `ZonesController::init_server`'s `QueryZone` handler).
    pub fn query_zone(downstream: ConnectionId, zone: Identifier) -> Self {
        let body = format!("QZ{}", zone);
        Self::new(
            downstream,
            Bytes::from(wire::build_request(&body)),
            Kind::QueryZoneTerminator,
            body,
        )
    }
}

/// Default per-connection inflight limit (spec.md §4.8: "additional
/// proxied requests from the same connection queue behind the first").
const DEFAULT_INFLIGHT_LIMIT: usize = 1;

pub struct ProxySplice {
    upstream_queue: RunLoopQueue<ExchangeState>,
    downstream: Arc<ServerCommandManager>,
    inflight: Mutex<HashMap<ConnectionId, usize>>,
    inflight_limit: usize,
    /// Requests this Splice itself sent upstream, so a reflected copy
    /// bouncing back through an upstream that is itself a proxy can be
    /// recognized and dropped rather than forwarded again (spec.md
    /// §4.8, "Loop prevention").
    forwarded: Mutex<HashSet<Bytes>>,
}

impl ProxySplice {
    pub fn new(upstream_queue: RunLoopQueue<ExchangeState>, downstream: Arc<ServerCommandManager>) -> Self {
        ProxySplice {
            upstream_queue,
            downstream,
            inflight: Mutex::new(HashMap::new()),
            inflight_limit: DEFAULT_INFLIGHT_LIMIT,
            forwarded: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_inflight_limit(mut self, limit: usize) -> Self {
        self.inflight_limit = limit;
        self
    }

    /// `true` if `request` is a copy of one this Splice is currently
    /// waiting on upstream for — i.e. it looped back rather than being a
    /// genuinely new downstream request.
    pub fn is_forwarded_by_me(&self, request: &Bytes) -> bool {
        self.forwarded.lock().unwrap().contains(request)
    }

    fn reserve(&self, connection: ConnectionId) -> Result<()> {
        let mut inflight = self.inflight.lock().unwrap();
        let count = inflight.entry(connection).or_insert(0);
        if *count >= self.inflight_limit {
            return Err(Error::in_progress());
        }
        *count += 1;
        Ok(())
    }

    fn release(&self, connection: ConnectionId) {
        let mut inflight = self.inflight.lock().unwrap();
        if let Some(count) = inflight.get_mut(&connection) {
            *count = count.saturating_sub(1);
        }
    }

    /// Builds the opaque passthrough exchange, queues it on the upstream
    /// Command Manager, and on completion or error answers the
    /// originating downstream connection (spec.md §4.8, steps 1-4).
    /// Returns `InProgress` immediately, without touching the upstream
    /// queue, if `context.downstream` is already at its inflight limit.
    pub async fn forward(&self, context: ProxyContext) -> Result<()> {
        self.reserve(context.downstream)?;
        self.forwarded.lock().unwrap().insert(context.request.clone());

        let (tx, rx) = oneshot::channel::<Result<()>>();
        let exchange = ExchangeState::new(
            context.request.clone(),
            context.upstream_completion,
            Duration::from_secs(5),
            Box::new(move |_captures| {
                let _ = tx.send(Ok(()));
            }),
            Box::new(move |err| {
                let _ = tx.send(Err(err));
            }),
        );

        let push_result = self.upstream_queue.push(exchange).await;
        self.forwarded.lock().unwrap().remove(&context.request);

        if let Err(err) = push_result {
            self.release(context.downstream);
            self.downstream
                .send_to(context.downstream, Bytes::from_static(wire::ERROR_FRAME));
            return Err(err);
        }

        let outcome = rx.await.map_err(|_| Error::disconnected());
        self.release(context.downstream);

        match outcome {
            Ok(Ok(())) => {
                self.downstream.send_to(
                    context.downstream,
                    Bytes::from(wire::build_response(&context.downstream_reply_body)),
                );
                Ok(())
            }
            Ok(Err(err)) | Err(err) => {
                self.downstream
                    .send_to(context.downstream, Bytes::from_static(wire::ERROR_FRAME));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SharedState;
    use crate::server::RequestHandlerTable;

    #[tokio::test]
    async fn second_forward_on_the_same_connection_is_rejected_while_the_first_is_inflight() {
        let (queue, _consumer) = crate::runloop::channel(8);
        let downstream = ServerCommandManager::new(SharedState::new(), RequestHandlerTable::new()).unwrap();
        let splice = Arc::new(ProxySplice::new(queue, downstream));

        let id = crate::server::ConnectionId(7);
        splice.reserve(id).unwrap();
        assert!(splice.reserve(id).is_err());
        splice.release(id);
        assert!(splice.reserve(id).is_ok());
    }
}

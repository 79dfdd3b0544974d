//! End-to-end scenarios from spec.md §8, driven over a real loopback
//! TCP socket rather than mocked transport — the Command Manager's
//! buffering and disambiguation logic is only meaningfully exercised
//! against actual partial/merged TCP reads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use openhlx_core::client::command_manager::CommandManager;
use openhlx_core::client::controllers::{GroupsController, ZonesController};
use openhlx_core::client::{ControllerLifecycle, ExchangeState, LifecycleState, SharedState};
use openhlx_core::connection::{Connected, ConnectionManagerBuilder};
use openhlx_core::model::Identifier;
use openhlx_core::notify::StateChange;
use openhlx_core::pattern::{Kind, PatternRegistry};
use openhlx_core::runloop;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Dials a loopback listener with an application-data delegate already
/// wired, returning the client-side `Connected` handle, the raw
/// server-side stream (so tests can write crafted byte sequences
/// directly onto the wire), and the delegate's receiving half.
async fn connected_pair_with_delegate() -> (Connected, TcpStream, tokio::sync::mpsc::UnboundedReceiver<bytes::Bytes>)
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (inbound_tx, inbound_rx) = tokio::sync::mpsc::unbounded_channel();

    let client_task = tokio::spawn(async move {
        let mut manager = ConnectionManagerBuilder::new().build();
        manager.set_application_data_delegate(inbound_tx).unwrap();
        manager.connect(&addr.to_string()).await.unwrap()
    });
    let (server_stream, _) = listener.accept().await.unwrap();
    let connected = client_task.await.unwrap();
    (connected, server_stream, inbound_rx)
}

/// Builds a `CommandManager` around `connected`/`inbound_rx`, returning
/// it (so tests can register notification handlers before `run` starts)
/// alongside the exchange queue controllers push onto.
fn build_command_manager(
    connected: Connected,
    inbound_rx: tokio::sync::mpsc::UnboundedReceiver<bytes::Bytes>,
) -> (CommandManager, runloop::RunLoopQueue<ExchangeState>) {
    let (queue, consumer) = runloop::channel(16);
    let registry = Arc::new(PatternRegistry::responses().unwrap());
    let manager = CommandManager::new(connected, inbound_rx, consumer, registry);
    (manager, queue)
}

async fn read_request(server_stream: &mut TcpStream) -> String {
    let mut buf = [0u8; 256];
    let n = server_stream.read(&mut buf).await.unwrap();
    String::from_utf8(buf[..n].to_vec()).unwrap()
}

/// **S1**: `[Z1VUL-25]` round trips to `(Z1VUL-25)`; the model updates
/// and exactly one `ZoneVolume` notification fires.
#[tokio::test]
async fn scenario_s1_zone_volume_round_trip_fires_exactly_one_notification() {
    let (connected, mut server_stream, inbound_rx) = connected_pair_with_delegate().await;
    let (manager, queue) = build_command_manager(connected, inbound_rx);
    tokio::spawn(manager.run());

    let shared = SharedState::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let fired2 = fired.clone();
    shared.notifier.lock().unwrap().subscribe(move |change| {
        if matches!(change, StateChange::ZoneVolume { id, level } if *id == Identifier::new(1) && *level == -25) {
            fired2.fetch_add(1, Ordering::SeqCst);
        }
    });

    let zones = ZonesController::new(queue, shared.clone());

    let client_task = tokio::spawn(async move { zones.set_volume_level(Identifier::new(1), -25).await });

    let request = read_request(&mut server_stream).await;
    assert_eq!(request, "[Z1VUL-25]\r\n");
    server_stream.write_all(b"(Z1VUL-25)\r\n").await.unwrap();

    client_task.await.unwrap().unwrap();
    assert_eq!(
        shared.model.lock().unwrap().zones.get(Identifier::new(1)).unwrap().volume().level().unwrap(),
        -25
    );
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

/// **S2** / Property 2 (disambiguation correctness): while `[QX]` is in
/// flight, `(SAVING)`, `(OName1"CD")`, and `(ZName1"Kitchen")` arrive
/// ahead of the `(QX)` terminator. All three solicited notifications
/// fire, in byte order, before the completion handler.
#[tokio::test]
async fn scenario_s2_interleaved_notifications_precede_completion_in_order() {
    let (connected, mut server_stream, inbound_rx) = connected_pair_with_delegate().await;
    let (mut manager, queue) = build_command_manager(connected, inbound_rx);

    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    let order1 = order.clone();
    manager
        .notification_handlers()
        .register(
            Kind::ConfigurationSaving,
            Box::new(move |_caps| order1.lock().unwrap().push("saving")),
        )
        .unwrap();
    let order2 = order.clone();
    manager
        .notification_handlers()
        .register(
            Kind::SourceName,
            Box::new(move |_caps| order2.lock().unwrap().push("source_name")),
        )
        .unwrap();
    let order3 = order.clone();
    manager
        .notification_handlers()
        .register(
            Kind::ZoneName,
            Box::new(move |_caps| order3.lock().unwrap().push("zone_name")),
        )
        .unwrap();

    tokio::spawn(manager.run());

    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    let order4 = order.clone();
    let exchange = ExchangeState::new(
        bytes::Bytes::from_static(b"[QX]\r\n"),
        Kind::QueryCurrentConfigurationTerminator,
        Duration::from_secs(2),
        Box::new(move |_caps| {
            order4.lock().unwrap().push("completion");
            let _ = done_tx.send(());
        }),
        Box::new(|_err| {}),
    );
    queue.push(exchange).await.unwrap();

    let request = read_request(&mut server_stream).await;
    assert_eq!(request, "[QX]\r\n");

    server_stream
        .write_all(b"(SAVING)\r\n(OName1\"CD\")\r\n(ZName1\"Kitchen\")\r\n(QX)\r\n")
        .await
        .unwrap();

    done_rx.await.unwrap();
    assert_eq!(
        *order.lock().unwrap(),
        vec!["saving", "source_name", "zone_name", "completion"]
    );
}

/// **S4**: `[Z1VUL-9999]` gets `(ERROR)` back; the exchange error
/// handler fires with `BadCommand` and the model is unchanged.
#[tokio::test]
async fn scenario_s4_error_response_fails_the_exchange_without_touching_the_model() {
    let (connected, mut server_stream, inbound_rx) = connected_pair_with_delegate().await;
    let (manager, queue) = build_command_manager(connected, inbound_rx);
    tokio::spawn(manager.run());

    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    let exchange = ExchangeState::new(
        bytes::Bytes::from_static(b"[Z1VUL-9999]\r\n"),
        Kind::ZoneVolumeLevel,
        Duration::from_secs(2),
        Box::new(|_caps| panic!("completion must not fire on an error reply")),
        Box::new(move |err| {
            let _ = done_tx.send(err);
        }),
    );
    queue.push(exchange).await.unwrap();

    let request = read_request(&mut server_stream).await;
    assert_eq!(request, "[Z1VUL-9999]\r\n");
    server_stream.write_all(b"(ERROR)\r\n").await.unwrap();

    let err = done_rx.await.unwrap();
    assert!(err.is_bad_command());
}

/// **S5**: a connect to an address that never responds (RFC 5737
/// TEST-NET-1, guaranteed non-routable) times out after the configured
/// window; the lifecycle emits `DidNotConnect` exactly once.
#[tokio::test]
async fn scenario_s5_connect_timeout_emits_did_not_connect_once() {
    let lifecycle = ControllerLifecycle::new();
    let mut events = lifecycle.subscribe();

    lifecycle.begin_resolving();
    lifecycle.begin_connecting();

    let manager = ConnectionManagerBuilder::new()
        .connect_timeout(Duration::from_millis(500))
        .build();

    let started = tokio::time::Instant::now();
    let result = manager.connect("192.0.2.1:23").await;
    let elapsed = started.elapsed();

    assert!(result.is_err(), "TEST-NET-1 must never accept a connection");
    lifecycle.did_not_connect(result.unwrap_err().to_string());
    assert!(
        elapsed < Duration::from_secs(5),
        "connect must be bounded by the configured timeout, took {:?}",
        elapsed
    );

    assert_eq!(lifecycle.state(), LifecycleState::Disconnected);
    let mut saw_did_not_connect = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(
            event,
            openhlx_core::client::LifecycleTransition::DidNotConnect(_)
        ) {
            saw_did_not_connect += 1;
        }
    }
    assert_eq!(saw_did_not_connect, 1);
}

/// **S6**: `[G1VMT]` with 3 member zones muted `{true, false, true}`
/// replies `(G1VM0)` (majority flips to unmuted) and, applying that
/// settled value (spec.md §3's `AlreadySet` suppression), fires a
/// `ZoneMute` for the two zones that actually flip plus one `GroupMute`
/// — zone2 was already unmuted, so setting it to `false` again fires
/// nothing.
#[tokio::test]
async fn scenario_s6_group_mute_toggle_majority_flips_and_notifies_every_member() {
    let (connected, mut server_stream, inbound_rx) = connected_pair_with_delegate().await;
    let (manager, queue) = build_command_manager(connected, inbound_rx);
    tokio::spawn(manager.run());

    let shared = SharedState::new();
    {
        let mut model = shared.model.lock().unwrap();
        for zone in [1u8, 2, 3] {
            model
                .groups
                .get_mut(Identifier::new(1))
                .unwrap()
                .add_zone(Identifier::new(zone))
                .unwrap();
        }
        model.zones.get_mut(Identifier::new(1)).unwrap().set_volume_mute(true).unwrap();
        model.zones.get_mut(Identifier::new(2)).unwrap().set_volume_mute(false).unwrap();
        model.zones.get_mut(Identifier::new(3)).unwrap().set_volume_mute(true).unwrap();
    }

    let notifications = Arc::new(std::sync::Mutex::new(Vec::new()));
    let notifications2 = notifications.clone();
    shared.notifier.lock().unwrap().subscribe(move |change| {
        notifications2.lock().unwrap().push(change.clone());
    });

    let groups = GroupsController::new(queue, shared.clone());
    let client_task = tokio::spawn(async move { groups.toggle_mute(Identifier::new(1)).await });

    let request = read_request(&mut server_stream).await;
    assert_eq!(request, "[G1VMT]\r\n");
    server_stream.write_all(b"(G1VM0)\r\n").await.unwrap();

    let result = client_task.await.unwrap().unwrap();
    assert!(!result, "majority muted -> toggles to unmuted");

    let seen = notifications.lock().unwrap();
    let zone_mutes = seen
        .iter()
        .filter(|c| matches!(c, StateChange::ZoneMute { mute: false, .. }))
        .count();
    let group_mutes = seen
        .iter()
        .filter(|c| matches!(c, StateChange::GroupMute { id, mute: false } if *id == Identifier::new(1)))
        .count();
    assert_eq!(zone_mutes, 2, "zone2 was already unmuted, so it doesn't fire again");
    assert_eq!(group_mutes, 1);
}

/// **S2 continuation / spec.md §4.5's broadcast mandate**: once
/// `install_broadcast` is wired, a mutating request's originating
/// connection gets exactly one reply (not a reply plus a duplicate
/// broadcast of its own change), while every other connected peer gets
/// the broadcast.
#[tokio::test]
async fn broadcast_excludes_the_requesting_connection_to_avoid_a_duplicate_reply() {
    use openhlx_core::client::controllers::ZonesController as ServerZonesController;
    use openhlx_core::server::{RequestHandlerTable, ServerCommandManager};

    let shared = SharedState::new();
    let mut request_handlers = RequestHandlerTable::new();
    let (server_queue, _server_consumer) = runloop::channel(1);
    let zones = ServerZonesController::new(server_queue, shared.clone());
    zones.init_server(&mut request_handlers).unwrap();

    let manager = ServerCommandManager::new(shared, request_handlers).unwrap();
    manager.install_broadcast();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(Arc::clone(&manager).accept_loop(listener, Duration::from_secs(5)));

    let mut requester = TcpStream::connect(addr).await.unwrap();
    let mut bystander = TcpStream::connect(addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    requester.write_all(b"[Z1VUL-30]\r\n").await.unwrap();

    let mut buf = [0u8; 256];
    let n = requester.read(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"(Z1VUL-30)\r\n");

    let n2 = bystander.read(&mut buf).await.unwrap();
    assert_eq!(&buf[..n2], b"(Z1VUL-30)\r\n");

    let second = tokio::time::timeout(Duration::from_millis(200), requester.read(&mut buf)).await;
    assert!(
        second.is_err(),
        "requester received an unexpected extra frame: broadcast was not excluded"
    );
}

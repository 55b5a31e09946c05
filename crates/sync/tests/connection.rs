use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::thread;
use std::time::Duration;

use glam::{Quat, Vec3};

use posesync::{
    Command, ConnectionConfig, ConnectionManager, ConnectionState, DisconnectReason, Identity,
    ObjectRegistry, Packet, Pose, SharedPose, SyncEngine, SyncEvent, Transport, UdpTransport,
};

static PORT_COUNTER: AtomicU16 = AtomicU16::new(41000);

fn next_port() -> u16 {
    PORT_COUNTER.fetch_add(10, Ordering::SeqCst)
}

type Engine = SyncEngine<UdpTransport, SharedPose>;

fn pose(x: f32, y: f32) -> Pose {
    Pose::new(Vec3::new(x, y, 0.0), Quat::IDENTITY)
}

fn authority(port: u16) -> Engine {
    let transport = UdpTransport::bind(("127.0.0.1", port)).unwrap();
    let connection = ConnectionManager::new(transport, ConnectionConfig::authority());
    let mut engine = SyncEngine::new(connection, ObjectRegistry::new());
    engine.start();
    engine
}

fn client(port: u16, authority_port: u16) -> Engine {
    let transport = UdpTransport::bind(("127.0.0.1", port)).unwrap();
    let remote: SocketAddr = format!("127.0.0.1:{}", authority_port).parse().unwrap();
    let connection = ConnectionManager::new(transport, ConnectionConfig::client(remote));
    let mut engine = SyncEngine::new(connection, ObjectRegistry::new());
    engine.start();
    engine
}

/// Ticks both engines until `done` holds or the timeout passes.
fn wait_for(
    server: &mut Engine,
    client: &mut Engine,
    timeout_ms: u64,
    mut done: impl FnMut(&mut Engine, &mut Engine) -> bool,
) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        client.tick();
        server.tick();
        if done(server, client) {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

#[test]
fn test_handshake_over_loopback() {
    let port = next_port();
    let mut server = authority(port);
    let mut client = client(port + 1, port);

    let connected = wait_for(&mut server, &mut client, 500, |s, c| {
        s.is_connected() && c.is_connected()
    });
    assert!(connected, "handshake did not complete");

    let client_events: Vec<_> = client.drain_events().collect();
    assert!(matches!(
        client_events.as_slice(),
        [SyncEvent::Connected { .. }]
    ));

    let server_events: Vec<_> = server.drain_events().collect();
    match server_events.as_slice() {
        [SyncEvent::Connected { peer }] => assert_eq!(peer.port(), port + 1),
        other => panic!("unexpected events: {:?}", other),
    }
}

#[test]
fn test_runtime_object_gets_global_id() {
    let port = next_port();
    let mut server = authority(port);
    let mut client = client(port + 1, port);

    client.register_static(0, SharedPose::new(pose(0.0, 0.0))).unwrap();
    server.register_static(0, SharedPose::new(pose(0.0, 0.0))).unwrap();
    let spawned = SharedPose::new(pose(3.0, 1.0));
    let local_id = client.add_new_item(spawned.clone());

    let mut promoted_to = None;
    let promoted = wait_for(&mut server, &mut client, 500, |_, c| {
        for event in c.drain_events() {
            if let SyncEvent::ObjectPromoted {
                local_id: from,
                global_id,
            } = event
            {
                assert_eq!(from, local_id);
                promoted_to = Some(global_id);
            }
        }
        promoted_to.is_some()
    });
    assert!(promoted, "no id assignment arrived");

    let global_id = promoted_to.unwrap();
    assert!(global_id > 0);
    assert!(!client.registry().contains(Identity::Provisional(local_id)));
    assert!(client.registry().contains(Identity::Authoritative(global_id)));

    let mirrored = server
        .registry()
        .get(Identity::Authoritative(global_id))
        .expect("authority should track the object");
    assert_eq!(mirrored.handle().get(), pose(3.0, 1.0));
}

#[test]
fn test_pose_updates_flow_both_ways() {
    let port = next_port();
    let mut server = authority(port);
    let mut client = client(port + 1, port);

    let client_side = SharedPose::new(pose(0.0, 0.0));
    let server_side = SharedPose::new(pose(0.0, 0.0));
    client.register_static(5, client_side.clone()).unwrap();
    server.register_static(5, server_side.clone()).unwrap();

    assert!(wait_for(&mut server, &mut client, 500, |s, c| {
        s.is_connected() && c.is_connected()
    }));

    client_side.set(pose(1.5, 2.5));
    let arrived = wait_for(&mut server, &mut client, 500, |_, _| {
        server_side.get().approx_eq(&pose(1.5, 2.5), 1e-6)
    });
    assert!(arrived, "client update never reached the authority");

    server_side.set(pose(-4.0, 0.25));
    let arrived = wait_for(&mut server, &mut client, 500, |_, _| {
        client_side.get().approx_eq(&pose(-4.0, 0.25), 1e-6)
    });
    assert!(arrived, "authority update never reached the client");

    assert!(client.stats().updates_applied >= 1);
    assert!(server.stats().updates_applied >= 1);
}

#[test]
fn test_shutdown_notifies_authority() {
    let port = next_port();
    let mut server = authority(port);
    let mut client = client(port + 1, port);

    assert!(wait_for(&mut server, &mut client, 500, |s, c| {
        s.is_connected() && c.is_connected()
    }));
    server.drain_events().for_each(drop);

    client.shutdown();
    assert!(!client.connection().transport().is_open());

    let mut left = false;
    let start = std::time::Instant::now();
    while start.elapsed() < Duration::from_millis(500) && !left {
        server.tick();
        left = server.drain_events().any(|event| {
            matches!(
                event,
                SyncEvent::Disconnected {
                    reason: DisconnectReason::PeerLeft
                }
            )
        });
        thread::sleep(Duration::from_millis(1));
    }

    assert!(left, "authority never saw Bye");
    assert_eq!(server.connection().state(), ConnectionState::Disconnected);
    assert_eq!(server.connection().peer(), None);
}

#[test]
fn test_foreign_datagrams_ignored() {
    let port = next_port();
    let mut server = authority(port);
    let mut client = client(port + 1, port);

    assert!(wait_for(&mut server, &mut client, 500, |s, c| {
        s.is_connected() && c.is_connected()
    }));

    let mut stranger = UdpTransport::bind(("127.0.0.1", port + 2)).unwrap();
    let client_addr = client.connection().local_addr().unwrap();
    stranger
        .send_to(&Packet::control(Command::Disconnect).encode(), client_addr)
        .unwrap();
    stranger
        .send_to(&[0x6D, 1, 2], client_addr)
        .unwrap();

    let dropped = wait_for(&mut server, &mut client, 500, |_, c| {
        c.network_stats().foreign_dropped >= 2
    });
    assert!(dropped);
    assert!(client.is_connected());
}

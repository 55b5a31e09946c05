use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use posesync::{
    ConnectionManager, NetworkStats, ObjectRegistry, SharedPose, SyncEngine, SyncEvent, SyncStats,
    UdpTransport,
};

use crate::config::ServerConfig;
use crate::events::ServerEvent;
use crate::scene::Scene;

pub struct PoseServer {
    engine: SyncEngine<UdpTransport, SharedPose>,
    scene: Scene,
    local_addr: SocketAddr,
    tick_duration: Duration,
    last_tick_time: Instant,
    accumulator: Duration,
    running: Arc<AtomicBool>,
    start_time: Instant,
    pending_events: VecDeque<ServerEvent>,
}

impl PoseServer {
    pub fn new(bind_addr: &str, config: ServerConfig) -> Result<Self> {
        let transport = UdpTransport::bind(bind_addr)
            .with_context(|| format!("failed to bind {}", bind_addr))?;
        let connection = ConnectionManager::new(transport, config.connection());
        let local_addr = connection.local_addr()?;

        let mut engine = SyncEngine::new(connection, ObjectRegistry::new());
        engine.start();

        let mut pending_events = VecDeque::new();
        pending_events.push_back(ServerEvent::Listening { addr: local_addr });

        Ok(Self {
            engine,
            scene: Scene::new(),
            local_addr,
            tick_duration: Duration::from_secs_f64(1.0 / config.tick_rate.max(1) as f64),
            last_tick_time: Instant::now(),
            accumulator: Duration::ZERO,
            running: Arc::new(AtomicBool::new(true)),
            start_time: Instant::now(),
            pending_events,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        self.pending_events.drain(..)
    }

    /// Headless loop: ticks until stopped, logging events as they happen.
    pub fn run(&mut self) {
        while self.running.load(Ordering::SeqCst) {
            self.tick_once();
            for event in self.drain_events() {
                if event.is_warning() {
                    log::warn!("{}", event.describe());
                } else {
                    log::info!("{}", event.describe());
                }
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        self.shutdown();
    }

    pub fn tick_once(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_tick_time;
        self.last_tick_time = now;
        self.accumulator += delta;

        while self.accumulator >= self.tick_duration {
            self.accumulator -= self.tick_duration;
            self.tick();
        }
    }

    fn tick(&mut self) {
        self.engine.tick();

        let events: Vec<SyncEvent<SharedPose>> = self.engine.drain_events().collect();
        for event in events {
            self.handle_sync_event(event);
        }
    }

    fn handle_sync_event(&mut self, event: SyncEvent<SharedPose>) {
        let event = match event {
            SyncEvent::Connected { peer } => ServerEvent::PeerConnected { addr: peer },
            SyncEvent::PeerRestarted { peer } => ServerEvent::PeerRestarted { addr: peer },
            SyncEvent::Disconnected { reason } => ServerEvent::PeerDisconnected { reason },
            SyncEvent::ObjectRegistered { global_id, handle } => {
                self.scene.attach(global_id, handle);
                ServerEvent::ObjectRegistered { global_id }
            }
            SyncEvent::ObjectPromoted { .. } => return,
        };
        self.pending_events.push_back(event);
    }

    pub fn shutdown(&mut self) {
        self.engine.shutdown();
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            uptime_secs: self.start_time.elapsed().as_secs(),
            tick: self.engine.stats().ticks,
            peer: self.engine.connection().peer(),
            connected: self.engine.is_connected(),
            object_count: self.scene.object_count(),
            sync_stats: self.engine.stats().clone(),
            network_stats: self.engine.network_stats().clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerStats {
    pub uptime_secs: u64,
    pub tick: u64,
    pub peer: Option<SocketAddr>,
    pub connected: bool,
    pub object_count: usize,
    pub sync_stats: SyncStats,
    pub network_stats: NetworkStats,
}

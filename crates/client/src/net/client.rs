use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use glam::Vec3;

use posesync::{
    ConnectionManager, ObjectRegistry, SharedPose, SyncEngine, SyncEvent, UdpTransport,
};

use super::config::ClientConfig;
use crate::game::DemoScene;

/// Host side of the demo: owns the scene and drives the engine at the
/// configured tick rate.
pub struct NetworkClient {
    engine: SyncEngine<UdpTransport, SharedPose>,
    scene: DemoScene,
    tick_duration: Duration,
    start_time: Instant,
}

impl NetworkClient {
    pub fn new(config: &ClientConfig, objects: usize) -> Result<Self> {
        let transport = UdpTransport::listen(config.listen_port)
            .with_context(|| format!("failed to listen on port {}", config.listen_port))?;
        let connection = ConnectionManager::new(transport, config.connection());

        let mut engine = SyncEngine::new(connection, ObjectRegistry::new());
        let scene = DemoScene::new(objects);
        for (global_id, handle) in scene.placed() {
            engine.register_static(global_id, handle.clone())?;
        }

        Ok(Self {
            engine,
            scene,
            tick_duration: Duration::from_secs_f64(1.0 / config.tick_rate.max(1) as f64),
            start_time: Instant::now(),
        })
    }

    /// Runs `max_ticks` ticks, or forever when `None`, spawning one object
    /// after `spawn_after` ticks.
    pub fn run(&mut self, max_ticks: Option<u64>, spawn_after: Option<u64>) {
        self.engine.start();

        let mut tick = 0u64;
        while max_ticks.is_none_or(|max| tick < max) {
            let frame_start = Instant::now();
            if spawn_after == Some(tick) {
                self.spawn(Vec3::new(0.0, 2.0, -3.0));
            }

            self.scene.animate(self.start_time.elapsed().as_secs_f32());
            self.engine.tick();
            self.log_events();
            tick += 1;

            if let Some(remaining) = self.tick_duration.checked_sub(frame_start.elapsed()) {
                std::thread::sleep(remaining);
            }
        }

        self.engine.shutdown();
        self.log_events();

        let stats = self.engine.stats();
        log::info!(
            "Done after {} ticks: {} updates sent, {} applied, {} promotions",
            stats.ticks,
            stats.updates_sent,
            stats.updates_applied,
            stats.promotions
        );
    }

    fn spawn(&mut self, position: Vec3) {
        let handle = self.scene.spawn(position);
        let local_id = self.engine.add_new_item(handle);
        log::info!(
            "Spawned object local#{} ({} spawned so far)",
            local_id,
            self.scene.spawned_count()
        );
    }

    fn log_events(&mut self) {
        for event in self.engine.drain_events() {
            match event {
                SyncEvent::Connected { peer } => log::info!("Connected to {}", peer),
                SyncEvent::PeerRestarted { peer } => log::info!("{} restarted its session", peer),
                SyncEvent::Disconnected { reason } => {
                    log::warn!("Disconnected: {}", reason.as_str())
                }
                SyncEvent::ObjectPromoted {
                    local_id,
                    global_id,
                } => log::info!("local#{} is now global#{}", local_id, global_id),
                SyncEvent::ObjectRegistered { global_id, .. } => {
                    log::debug!("Peer registered global#{}", global_id)
                }
            }
        }
    }
}

use std::collections::VecDeque;

use crate::error::{RegistryError, SyncResult};
use crate::net::{
    Command, ConnectionEvent, ConnectionManager, NetworkStats, Packet, PeerRole, Pose, Transport,
};
use crate::registry::{Identity, ObjectRegistry, PoseSource};

use super::events::SyncEvent;

/// Per-engine counters. Nothing in a tick fails outward; it lands here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub ticks: u64,
    pub updates_sent: u64,
    pub updates_applied: u64,
    pub stale_updates: u64,
    pub unknown_objects: u64,
    pub malformed_payloads: u64,
    pub promotions: u64,
    pub registrations: u64,
    pub ignored_commands: u64,
}

/// Drives pose replication between this process and its single peer.
///
/// The host owns the loop and calls [`tick`](SyncEngine::tick) at a fixed
/// rate. Each tick:
///
/// 1. drains datagrams through the connection manager,
/// 2. scans the registry and queues an update for every moved object,
/// 3. applies the peer's registrations, id assignments and pose updates,
/// 4. flushes the outgoing queue and runs liveness.
///
/// Objects added with [`add_new_item`](SyncEngine::add_new_item) are
/// registered immediately and announced as soon as the link is up.
pub struct SyncEngine<T: Transport, H> {
    connection: ConnectionManager<T>,
    registry: ObjectRegistry<H>,
    events: VecDeque<SyncEvent<H>>,
    stats: SyncStats,
}

impl<T, H> SyncEngine<T, H>
where
    T: Transport,
    H: PoseSource + Clone + From<Pose>,
{
    pub fn new(connection: ConnectionManager<T>, registry: ObjectRegistry<H>) -> Self {
        Self {
            connection,
            registry,
            events: VecDeque::new(),
            stats: SyncStats::default(),
        }
    }

    pub fn role(&self) -> PeerRole {
        self.connection.role()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn connection(&self) -> &ConnectionManager<T> {
        &self.connection
    }

    pub fn registry(&self) -> &ObjectRegistry<H> {
        &self.registry
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    pub fn network_stats(&self) -> &NetworkStats {
        self.connection.stats()
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = SyncEvent<H>> + '_ {
        self.events.drain(..)
    }

    pub fn start(&mut self) {
        self.connection.start();
    }

    /// Registers a pre-placed object under a known global id.
    ///
    /// Called during startup. A duplicate id is a programming error and is
    /// returned rather than logged.
    pub fn register_static(&mut self, global_id: i32, handle: H) -> SyncResult<()> {
        let pose = handle.pose();
        self.registry.register_global(global_id, handle)?;

        if self.should_announce() {
            self.connection.enqueue(Packet::new(
                Command::RegisterGlobal,
                0,
                global_id,
                pose.encode().to_vec(),
            ));
        }
        Ok(())
    }

    /// Registers an object spawned at runtime and returns its provisional id.
    pub fn add_new_item(&mut self, handle: H) -> i32 {
        let pose = handle.pose();
        let local_id = self.registry.register_local(handle);
        log::debug!("Registered local object {}", local_id);

        if self.should_announce() {
            self.connection.enqueue(Packet::new(
                Command::RegisterLocal,
                0,
                local_id,
                pose.encode().to_vec(),
            ));
        }
        local_id
    }

    pub fn tick(&mut self) {
        self.stats.ticks += 1;

        let incoming = self.connection.receive();
        self.forward_connection_events();

        self.send_changes();

        for packet in incoming {
            self.handle_packet(packet);
        }

        self.connection.finish_tick();
        self.forward_connection_events();
    }

    /// Sends `Bye` and releases the transport. Also runs on drop.
    pub fn shutdown(&mut self) {
        self.connection.shutdown();
        self.forward_connection_events();
    }

    fn should_announce(&self) -> bool {
        self.role() == PeerRole::Client && self.connection.is_connected()
    }

    fn forward_connection_events(&mut self) {
        let events: Vec<ConnectionEvent> = self.connection.drain_events().collect();

        for event in events {
            match event {
                ConnectionEvent::Connected { .. } => {
                    self.registry.reset_remote_timestamps();
                    self.announce_all();
                }
                ConnectionEvent::PeerRestarted { .. } => {
                    self.registry.reset_remote_timestamps();
                }
                ConnectionEvent::Disconnected { .. } => {}
            }
            self.events.push_back(event.into());
        }
    }

    /// Client side: tell a freshly connected authority about every object it
    /// may not know yet. The authority ignores global ids it already holds,
    /// so each authoritative object also gets one update carrying its current
    /// pose; moves made while disconnected would otherwise be lost.
    fn announce_all(&mut self) {
        if self.role() != PeerRole::Client {
            return;
        }

        let update_command = self.role().update_command();
        let mut announcements = Vec::new();
        let mut catch_up = Vec::new();

        for object in self.registry.iter() {
            let pose = object.last_observed().encode().to_vec();
            match object.identity() {
                Identity::Provisional(local_id) => {
                    announcements.push(Packet::new(Command::RegisterLocal, 0, local_id, pose));
                }
                Identity::Authoritative(global_id) => {
                    announcements.push(Packet::new(
                        Command::RegisterGlobal,
                        0,
                        global_id,
                        pose.clone(),
                    ));
                    catch_up.push(Packet::new(
                        update_command,
                        object.revision(),
                        global_id,
                        pose,
                    ));
                }
            }
        }

        if !announcements.is_empty() {
            log::info!("Announcing {} objects to peer", announcements.len());
        }
        self.stats.updates_sent += catch_up.len() as u64;
        for packet in announcements.into_iter().chain(catch_up) {
            self.connection.enqueue(packet);
        }
    }

    fn send_changes(&mut self) {
        let command = self.role().update_command();

        for change in self.registry.detect_changes() {
            // Provisional ids are meaningless to the peer; the pose goes out
            // once the object is promoted.
            let Identity::Authoritative(global_id) = change.identity else {
                continue;
            };

            self.connection.enqueue(Packet::new(
                command,
                change.revision,
                global_id,
                change.pose.encode().to_vec(),
            ));
            self.stats.updates_sent += 1;
        }
    }

    fn handle_packet(&mut self, packet: Packet) {
        match (self.role(), packet.command) {
            (_, Command::UpdateFromClient | Command::UpdateFromServer) => {
                self.handle_update(packet);
            }
            (PeerRole::Client, Command::IdAssignment) => {
                self.handle_id_assignment(packet);
            }
            (PeerRole::Authority, Command::RegisterLocal) => {
                self.handle_register_local(packet);
            }
            (PeerRole::Authority, Command::RegisterGlobal) => {
                self.handle_register_global(packet);
            }
            (role, command) => {
                self.stats.ignored_commands += 1;
                log::debug!("Ignoring {:?} as {:?}", command, role);
            }
        }
    }

    fn decode_pose(&mut self, packet: &Packet) -> Option<Pose> {
        match Pose::decode(&packet.payload) {
            Ok(pose) => Some(pose),
            Err(e) => {
                self.stats.malformed_payloads += 1;
                log::warn!(
                    "Dropping {:?} for object {}: {}",
                    packet.command,
                    packet.object_id,
                    e
                );
                None
            }
        }
    }

    fn handle_update(&mut self, packet: Packet) {
        let Some(pose) = self.decode_pose(&packet) else {
            return;
        };

        let identity = Identity::Authoritative(packet.object_id);
        match self
            .registry
            .apply_remote_update(identity, packet.timestamp, pose)
        {
            Ok(()) => self.stats.updates_applied += 1,
            Err(RegistryError::StaleUpdate { .. }) => {
                self.stats.stale_updates += 1;
                log::debug!(
                    "Dropping stale update for {} at {}",
                    identity,
                    packet.timestamp
                );
            }
            Err(e) => {
                self.stats.unknown_objects += 1;
                log::warn!("Dropping update: {}", e);
            }
        }
    }

    fn handle_id_assignment(&mut self, packet: Packet) {
        let global_id = packet.timestamp as i32;
        let local_id = packet.object_id;

        if let Err(e) = self.registry.promote(local_id, global_id) {
            self.stats.unknown_objects += 1;
            log::warn!("Cannot promote local#{} to global#{}: {}", local_id, global_id, e);
            return;
        }

        self.stats.promotions += 1;
        log::info!("Promoted local#{} to global#{}", local_id, global_id);
        self.events.push_back(SyncEvent::ObjectPromoted {
            local_id,
            global_id,
        });

        // Moves made while provisional were never sent.
        let identity = Identity::Authoritative(global_id);
        if let Some(object) = self.registry.get(identity) {
            let update = Packet::new(
                self.role().update_command(),
                object.revision(),
                global_id,
                object.last_observed().encode().to_vec(),
            );
            self.connection.enqueue(update);
            self.stats.updates_sent += 1;
        }
    }

    fn handle_register_local(&mut self, packet: Packet) {
        let Some(pose) = self.decode_pose(&packet) else {
            return;
        };

        let handle = H::from(pose);
        let global_id = self.registry.allocate_global(handle.clone());
        self.stats.registrations += 1;
        log::info!(
            "Assigned global#{} to peer's local#{}",
            global_id,
            packet.object_id
        );

        self.connection.enqueue(Packet::new(
            Command::IdAssignment,
            global_id as u32,
            packet.object_id,
            Vec::new(),
        ));
        self.events
            .push_back(SyncEvent::ObjectRegistered { global_id, handle });
    }

    fn handle_register_global(&mut self, packet: Packet) {
        let global_id = packet.object_id;
        if self.registry.contains(Identity::Authoritative(global_id)) {
            log::debug!("Already tracking global#{}", global_id);
            return;
        }

        let Some(pose) = self.decode_pose(&packet) else {
            return;
        };

        let handle = H::from(pose);
        if let Err(e) = self.registry.register_global(global_id, handle.clone()) {
            log::warn!("Cannot mirror global#{}: {}", global_id, e);
            return;
        }

        self.stats.registrations += 1;
        log::info!("Mirroring peer's global#{}", global_id);
        self.events
            .push_back(SyncEvent::ObjectRegistered { global_id, handle });
    }
}

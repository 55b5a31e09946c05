use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;

use super::protocol::{Command, MAX_PACKET_SIZE, Packet};
use super::stats::NetworkStats;
use super::transport::Transport;

const DEFAULT_PING_AFTER_TICKS: u32 = 100;
const DEFAULT_TIMEOUT_TICKS: u32 = 600;
const DEFAULT_HANDSHAKE_RETRY_TICKS: u32 = 120;
const DEFAULT_MAX_PACKETS_PER_TICK: usize = 256;
const DEFAULT_MAX_QUEUED_PACKETS: usize = 1024;

/// Which side of the link this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRole {
    /// Non-authoritative side. Initiates the handshake, receives id assignments.
    Client,
    /// Authoritative side. Accepts one peer, assigns global ids.
    Authority,
}

impl PeerRole {
    /// Command used for pose updates originating on this side.
    pub fn update_command(self) -> Command {
        match self {
            PeerRole::Client => Command::UpdateFromClient,
            PeerRole::Authority => Command::UpdateFromServer,
        }
    }

    pub fn is_authority(self) -> bool {
        self == PeerRole::Authority
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    HandshakeSent,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The authority sent `Disconnect`.
    Kicked,
    /// The counterpart sent `Bye`.
    PeerLeft,
    /// The peer stayed silent past `timeout_ticks`.
    TimedOut,
    /// Local teardown.
    Shutdown,
}

impl DisconnectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::Kicked => "disconnected by peer",
            DisconnectReason::PeerLeft => "peer left",
            DisconnectReason::TimedOut => "timed out",
            DisconnectReason::Shutdown => "shut down",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected { peer: SocketAddr },
    /// Authority only: the connected peer said `Hello` again, so it started
    /// a new session and its timestamps begin from scratch.
    PeerRestarted { peer: SocketAddr },
    Disconnected { reason: DisconnectReason },
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub role: PeerRole,
    /// Target address. Required on the client, ignored by the authority.
    pub remote: Option<SocketAddr>,
    /// Drop datagrams whose source IP differs from `remote` (client only).
    pub strict_source_ip: bool,
    /// Drop datagrams whose source port differs from `remote` (client only).
    pub strict_source_port: bool,
    /// Send `Ping` when nothing else went out for `ping_after_ticks`.
    pub manual_ping: bool,
    pub ping_after_ticks: u32,
    /// Authority drops a peer after this many silent ticks.
    pub timeout_ticks: u32,
    /// Client re-sends `Hello` this often while waiting for `HelloAck`.
    pub handshake_retry_ticks: u32,
    pub max_packets_per_tick: usize,
    pub max_queued_packets: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            role: PeerRole::Client,
            remote: None,
            strict_source_ip: true,
            strict_source_port: true,
            manual_ping: true,
            ping_after_ticks: DEFAULT_PING_AFTER_TICKS,
            timeout_ticks: DEFAULT_TIMEOUT_TICKS,
            handshake_retry_ticks: DEFAULT_HANDSHAKE_RETRY_TICKS,
            max_packets_per_tick: DEFAULT_MAX_PACKETS_PER_TICK,
            max_queued_packets: DEFAULT_MAX_QUEUED_PACKETS,
        }
    }
}

impl ConnectionConfig {
    pub fn client(remote: SocketAddr) -> Self {
        Self {
            role: PeerRole::Client,
            remote: Some(remote),
            ..Default::default()
        }
    }

    pub fn authority() -> Self {
        Self {
            role: PeerRole::Authority,
            ..Default::default()
        }
    }
}

/// Handshake and liveness state machine over a single datagram transport.
///
/// Control commands (`Hello`, `HelloAck`, `Ping`, `Disconnect`, `Bye`) are
/// handled here. Everything else is returned from [`receive`] for the sync
/// engine. Outgoing packets are queued and sent in order by [`finish_tick`].
///
/// The transport is closed, after a best-effort `Bye`, by [`shutdown`] or on drop.
///
/// [`receive`]: ConnectionManager::receive
/// [`finish_tick`]: ConnectionManager::finish_tick
/// [`shutdown`]: ConnectionManager::shutdown
pub struct ConnectionManager<T: Transport> {
    transport: T,
    config: ConnectionConfig,
    state: ConnectionState,
    peer: Option<SocketAddr>,
    outgoing: VecDeque<Packet>,
    pending_events: VecDeque<ConnectionEvent>,
    stats: NetworkStats,
    recv_buffer: [u8; MAX_PACKET_SIZE],
    ticks_since_last_send: u32,
    ticks_since_last_receive: u32,
    ticks_in_handshake: u32,
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(transport: T, config: ConnectionConfig) -> Self {
        let peer = match config.role {
            PeerRole::Client => config.remote,
            PeerRole::Authority => None,
        };

        Self {
            transport,
            state: ConnectionState::Disconnected,
            peer,
            outgoing: VecDeque::new(),
            pending_events: VecDeque::new(),
            stats: NetworkStats::default(),
            recv_buffer: [0u8; MAX_PACKET_SIZE],
            ticks_since_last_send: 0,
            ticks_since_last_receive: 0,
            ticks_in_handshake: 0,
            config,
        }
    }

    pub fn role(&self) -> PeerRole {
        self.config.role
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Current counterpart: the configured remote on the client, the
    /// adopted peer on the authority.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    pub fn queued(&self) -> impl Iterator<Item = &Packet> {
        self.outgoing.iter()
    }

    pub fn queued_len(&self) -> usize {
        self.outgoing.len()
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ConnectionEvent> + '_ {
        self.pending_events.drain(..)
    }

    /// Client: queue the first `Hello` and enter `HandshakeSent`.
    /// Authority: nothing to do until a peer says hello.
    pub fn start(&mut self) {
        match self.config.role {
            PeerRole::Client => {
                if let Some(remote) = self.peer {
                    log::info!("Connecting to {}", remote);
                } else {
                    log::warn!("Client started without a remote address");
                }
                self.enqueue(Packet::control(Command::Hello));
                self.state = ConnectionState::HandshakeSent;
                self.ticks_in_handshake = 0;
            }
            PeerRole::Authority => {
                if let Ok(addr) = self.transport.local_addr() {
                    log::info!("Waiting for peer on {}", addr);
                }
            }
        }
    }

    pub fn enqueue(&mut self, packet: Packet) {
        if self.outgoing.len() >= self.config.max_queued_packets {
            if let Some(evicted) = self.outgoing.pop_front() {
                self.stats.queue_overflow += 1;
                log::warn!(
                    "Outgoing queue full, dropping oldest {:?} packet",
                    evicted.command
                );
            }
        }
        self.outgoing.push_back(packet);
    }

    /// Drains at most `max_packets_per_tick` datagrams without blocking.
    ///
    /// Control commands are consumed. Sync commands from the counterpart are
    /// returned in arrival order.
    pub fn receive(&mut self) -> Vec<Packet> {
        let mut forwarded = Vec::new();

        for _ in 0..self.config.max_packets_per_tick {
            let (size, from) = match self.transport.try_recv(&mut self.recv_buffer) {
                Ok(Some(received)) => received,
                Ok(None) => break,
                Err(e) => {
                    self.stats.transport_errors += 1;
                    log::warn!("Receive failed: {}", e);
                    break;
                }
            };

            self.stats.packets_received += 1;
            self.stats.bytes_received += size as u64;

            if !self.accepts_source(from) {
                self.stats.foreign_dropped += 1;
                log::debug!("Dropping datagram from foreign source {}", from);
                continue;
            }

            let packet = match Packet::decode(&self.recv_buffer[..size]) {
                Ok(packet) => packet,
                Err(e) => {
                    self.stats.malformed_dropped += 1;
                    log::warn!("Dropping malformed packet from {}: {}", from, e);
                    continue;
                }
            };

            if self.config.role.is_authority()
                && packet.command != Command::Hello
                && self.peer != Some(from)
            {
                self.stats.foreign_dropped += 1;
                log::debug!(
                    "Dropping {:?} from {} before handshake",
                    packet.command,
                    from
                );
                continue;
            }

            self.ticks_since_last_receive = 0;

            if packet.command.is_control() {
                self.handle_control(packet.command, from);
            } else {
                forwarded.push(packet);
            }
        }

        forwarded
    }

    /// Advances the idle counters, queues liveness traffic, then flushes the
    /// outgoing queue in order.
    pub fn finish_tick(&mut self) {
        self.ticks_since_last_send = self.ticks_since_last_send.saturating_add(1);
        self.ticks_since_last_receive = self.ticks_since_last_receive.saturating_add(1);

        self.check_liveness();
        self.flush();
    }

    /// Sends a best-effort `Bye` and releases the transport.
    pub fn shutdown(&mut self) {
        if !self.transport.is_open() {
            return;
        }

        if let Some(addr) = self.peer {
            let bye = Packet::control(Command::Bye).encode();
            match self.transport.send_to(&bye, addr) {
                Ok(bytes) => {
                    self.stats.packets_sent += 1;
                    self.stats.bytes_sent += bytes as u64;
                }
                Err(e) => {
                    self.stats.transport_errors += 1;
                    log::warn!("Failed to send Bye to {}: {}", addr, e);
                }
            }
        }

        self.transport.close();
        self.outgoing.clear();

        if self.state != ConnectionState::Disconnected {
            self.state = ConnectionState::Disconnected;
            self.pending_events.push_back(ConnectionEvent::Disconnected {
                reason: DisconnectReason::Shutdown,
            });
        }
        log::info!("Connection shut down");
    }

    fn accepts_source(&self, from: SocketAddr) -> bool {
        if self.config.role.is_authority() {
            return true;
        }

        let Some(remote) = self.config.remote else {
            return true;
        };

        if self.config.strict_source_ip && from.ip() != remote.ip() {
            return false;
        }
        if self.config.strict_source_port && from.port() != remote.port() {
            return false;
        }
        true
    }

    fn handle_control(&mut self, command: Command, from: SocketAddr) {
        match (self.config.role, command) {
            (PeerRole::Authority, Command::Hello) => self.handle_hello(from),
            (PeerRole::Client, Command::HelloAck) => self.handle_hello_ack(from),
            (_, Command::Ping) => {
                log::debug!("Ping from {}", from);
            }
            (PeerRole::Client, Command::Disconnect) => {
                self.lose_connection(DisconnectReason::Kicked);
                self.enqueue(Packet::control(Command::Hello));
            }
            (PeerRole::Client, Command::Bye) => {
                self.lose_connection(DisconnectReason::PeerLeft);
                self.enqueue(Packet::control(Command::Hello));
            }
            (PeerRole::Authority, Command::Bye) => {
                self.lose_connection(DisconnectReason::PeerLeft);
                self.peer = None;
            }
            (role, command) => {
                log::debug!("Ignoring {:?} from {} as {:?}", command, from, role);
            }
        }
    }

    fn handle_hello(&mut self, from: SocketAddr) {
        match self.peer {
            Some(peer) if peer != from && self.state == ConnectionState::Connected => {
                self.stats.foreign_dropped += 1;
                log::warn!("Ignoring Hello from {}, already serving {}", from, peer);
                return;
            }
            _ => {}
        }

        self.peer = Some(from);
        self.enqueue(Packet::control(Command::HelloAck));

        if self.state != ConnectionState::Connected {
            log::info!("Discovered peer {}", from);
            self.state = ConnectionState::Connected;
            self.pending_events
                .push_back(ConnectionEvent::Connected { peer: from });
        } else {
            log::info!("Peer {} restarted its handshake", from);
            self.pending_events
                .push_back(ConnectionEvent::PeerRestarted { peer: from });
        }
    }

    fn handle_hello_ack(&mut self, from: SocketAddr) {
        if self.state == ConnectionState::Connected {
            return;
        }

        log::info!("Handshake complete with {}", from);
        self.state = ConnectionState::Connected;
        self.ticks_in_handshake = 0;
        self.pending_events
            .push_back(ConnectionEvent::Connected { peer: from });
    }

    fn lose_connection(&mut self, reason: DisconnectReason) {
        let was_connected = self.state == ConnectionState::Connected;
        self.state = ConnectionState::Disconnected;

        if was_connected {
            log::info!("Connection lost: {}", reason.as_str());
            self.pending_events
                .push_back(ConnectionEvent::Disconnected { reason });
        }
    }

    fn check_liveness(&mut self) {
        match (self.config.role, self.state) {
            (PeerRole::Client, ConnectionState::HandshakeSent) => {
                self.ticks_in_handshake += 1;
                if self.ticks_in_handshake > self.config.handshake_retry_ticks {
                    log::debug!("No HelloAck yet, re-sending Hello");
                    self.ticks_in_handshake = 0;
                    self.enqueue(Packet::control(Command::Hello));
                }
            }
            (PeerRole::Authority, ConnectionState::Connected)
                if self.ticks_since_last_receive > self.config.timeout_ticks =>
            {
                if let Some(peer) = self.peer {
                    log::warn!(
                        "Peer {} silent for {} ticks, disconnecting",
                        peer,
                        self.ticks_since_last_receive
                    );
                }
                // Goes out on this tick's flush, before the peer is forgotten.
                self.outgoing.clear();
                self.outgoing.push_back(Packet::control(Command::Disconnect));
                self.flush();
                self.lose_connection(DisconnectReason::TimedOut);
                self.peer = None;
                return;
            }
            _ => {}
        }

        if self.state == ConnectionState::Connected
            && self.config.manual_ping
            && self.outgoing.is_empty()
            && self.ticks_since_last_send > self.config.ping_after_ticks
        {
            self.stats.pings_sent += 1;
            self.enqueue(Packet::control(Command::Ping));
        }
    }

    fn flush(&mut self) {
        if self.outgoing.is_empty() {
            return;
        }

        let Some(addr) = self.peer else {
            log::debug!(
                "No peer, discarding {} queued packets",
                self.outgoing.len()
            );
            self.outgoing.clear();
            return;
        };

        while let Some(packet) = self.outgoing.front() {
            let command = packet.command;
            let data = packet.encode();

            match self.transport.send_to(&data, addr) {
                Ok(bytes) => {
                    self.outgoing.pop_front();
                    self.stats.packets_sent += 1;
                    self.stats.bytes_sent += bytes as u64;
                    self.ticks_since_last_send = 0;

                    if command == Command::Hello && self.state == ConnectionState::Disconnected {
                        self.state = ConnectionState::HandshakeSent;
                        self.ticks_in_handshake = 0;
                    }
                }
                Err(e) => {
                    // Left queued; retried on the next tick.
                    self.stats.transport_errors += 1;
                    log::warn!("Send to {} failed: {}", addr, e);
                    break;
                }
            }
        }
    }
}

impl<T: Transport> Drop for ConnectionManager<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

mod connection;
#[cfg(test)]
pub(crate) mod mock;
mod pose;
mod protocol;
mod stats;
mod transport;

pub use connection::{
    ConnectionConfig, ConnectionEvent, ConnectionManager, ConnectionState, DisconnectReason,
    PeerRole,
};
pub use pose::{POSE_EPSILON, POSE_SIZE, Pose};
pub use protocol::{
    Command, DEFAULT_LISTEN_PORT, DEFAULT_PORT, DEFAULT_TICK_RATE, HEADER_SIZE, MAX_PACKET_SIZE,
    Packet, encode,
};
pub use stats::NetworkStats;
pub use transport::{Transport, UdpTransport};

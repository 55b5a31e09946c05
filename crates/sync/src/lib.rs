pub mod error;
pub mod net;
pub mod registry;
pub mod sync;

pub use error::{PacketError, PoseError, RegistryError, SyncError, SyncResult};
pub use net::{
    Command, ConnectionConfig, ConnectionEvent, ConnectionManager, ConnectionState,
    DEFAULT_LISTEN_PORT, DEFAULT_PORT, DEFAULT_TICK_RATE, DisconnectReason, HEADER_SIZE,
    MAX_PACKET_SIZE, NetworkStats, POSE_EPSILON, POSE_SIZE, Packet, PeerRole, Pose, Transport,
    UdpTransport,
};
pub use registry::{Identity, NetworkedObject, ObjectRegistry, PoseChange, PoseSource, SharedPose};
pub use sync::{SyncEngine, SyncEvent, SyncStats};

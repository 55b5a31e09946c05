use std::net::SocketAddr;

use crate::net::{ConnectionEvent, DisconnectReason};

/// Something the host may want to react to, drained after each tick.
#[derive(Debug, Clone)]
pub enum SyncEvent<H> {
    Connected {
        peer: SocketAddr,
    },
    /// The connected peer began a new session without disconnecting first.
    PeerRestarted {
        peer: SocketAddr,
    },
    Disconnected {
        reason: DisconnectReason,
    },
    /// A provisional object now lives under an authoritative id.
    ObjectPromoted {
        local_id: i32,
        global_id: i32,
    },
    /// The peer announced an object; `handle` is the pose the registry now
    /// tracks for it and should be attached to the host scene.
    ObjectRegistered {
        global_id: i32,
        handle: H,
    },
}

impl<H> From<ConnectionEvent> for SyncEvent<H> {
    fn from(event: ConnectionEvent) -> Self {
        match event {
            ConnectionEvent::Connected { peer } => SyncEvent::Connected { peer },
            ConnectionEvent::PeerRestarted { peer } => SyncEvent::PeerRestarted { peer },
            ConnectionEvent::Disconnected { reason } => SyncEvent::Disconnected { reason },
        }
    }
}

use std::net::SocketAddr;

use posesync::DisconnectReason;

#[derive(Debug, Clone)]
pub enum ServerEvent {
    Listening { addr: SocketAddr },
    PeerConnected { addr: SocketAddr },
    PeerRestarted { addr: SocketAddr },
    PeerDisconnected { reason: DisconnectReason },
    ObjectRegistered { global_id: i32 },
}

impl ServerEvent {
    pub fn describe(&self) -> String {
        match self {
            ServerEvent::Listening { addr } => format!("Listening on {}", addr),
            ServerEvent::PeerConnected { addr } => format!("Peer connected from {}", addr),
            ServerEvent::PeerRestarted { addr } => format!("Peer {} started a new session", addr),
            ServerEvent::PeerDisconnected { reason } => format!("Peer {}", reason.as_str()),
            ServerEvent::ObjectRegistered { global_id } => {
                format!("Peer registered object global#{}", global_id)
            }
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            ServerEvent::PeerDisconnected {
                reason: DisconnectReason::TimedOut
            }
        )
    }
}

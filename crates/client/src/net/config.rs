use std::net::SocketAddr;

use posesync::{ConnectionConfig, DEFAULT_LISTEN_PORT, DEFAULT_TICK_RATE};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub target: SocketAddr,
    pub listen_port: u16,
    pub tick_rate: u32,
    pub ping_after_ticks: u32,
    pub strict_source_ip: bool,
    pub strict_source_port: bool,
    pub manual_ping: bool,
}

impl ClientConfig {
    pub fn new(target: SocketAddr) -> Self {
        let defaults = ConnectionConfig::client(target);
        Self {
            target,
            listen_port: DEFAULT_LISTEN_PORT,
            tick_rate: DEFAULT_TICK_RATE,
            ping_after_ticks: defaults.ping_after_ticks,
            strict_source_ip: defaults.strict_source_ip,
            strict_source_port: defaults.strict_source_port,
            manual_ping: defaults.manual_ping,
        }
    }

    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            strict_source_ip: self.strict_source_ip,
            strict_source_port: self.strict_source_port,
            manual_ping: self.manual_ping,
            ping_after_ticks: self.ping_after_ticks,
            ..ConnectionConfig::client(self.target)
        }
    }
}

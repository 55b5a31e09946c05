use posesync::{ConnectionConfig, DEFAULT_TICK_RATE};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub tick_rate: u32,
    pub ping_after_ticks: u32,
    pub timeout_ticks: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let connection = ConnectionConfig::authority();
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            ping_after_ticks: connection.ping_after_ticks,
            timeout_ticks: connection.timeout_ticks,
        }
    }
}

impl ServerConfig {
    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            ping_after_ticks: self.ping_after_ticks,
            timeout_ticks: self.timeout_ticks,
            ..ConnectionConfig::authority()
        }
    }
}

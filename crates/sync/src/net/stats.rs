#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// Datagrams that failed header decoding.
    pub malformed_dropped: u64,
    /// Datagrams from a source other than the counterpart.
    pub foreign_dropped: u64,
    pub transport_errors: u64,
    /// Outgoing packets evicted because the queue was full.
    pub queue_overflow: u64,
    pub pings_sent: u64,
}

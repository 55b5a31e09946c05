//! Error types for the synchronization core.
//!
//! None of these cross the tick boundary: the engine logs and counts them.
//! They are returned from the codecs and the registry so callers can decide.

use thiserror::Error;

use crate::registry::Identity;

/// Errors raised while decoding a datagram header.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Datagram shorter than the fixed header.
    #[error("packet too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    /// Leading byte is not one of the protocol's command codes.
    #[error("unknown command byte 0x{0:02x}")]
    UnknownCommand(u8),
}

/// Errors raised while decoding a pose payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoseError {
    #[error("pose payload too short: expected {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("pose payload contains a non-finite component")]
    NotFinite,
}

/// Registry lookup and ordering failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No object is tracked under this identity.
    #[error("unknown object {0}")]
    UnknownObject(Identity),

    /// Remote update older than (or equal to) the last one applied.
    #[error("stale update for {identity}: timestamp {timestamp} <= last applied {last_applied}")]
    StaleUpdate {
        identity: Identity,
        timestamp: u32,
        last_applied: u32,
    },

    /// An authoritative id was registered twice. Indicates a local bug.
    #[error("global id {0} is already registered")]
    DuplicateRegistration(i32),
}

/// Top-level error for the crate.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("malformed packet: {0}")]
    Packet(#[from] PacketError),

    #[error("malformed payload: {0}")]
    Pose(#[from] PoseError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;

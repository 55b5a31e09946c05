use crate::error::PacketError;

/// Command byte + timestamp + object id.
pub const HEADER_SIZE: usize = 1 + 4 + 4;
pub const MAX_PACKET_SIZE: usize = 1200;
pub const DEFAULT_PORT: u16 = 30000;
pub const DEFAULT_LISTEN_PORT: u16 = 3450;
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Wire command codes. The byte values are a closed contract with the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    Hello = b'a',
    HelloAck = b'b',
    Ping = b'c',
    Disconnect = b'd',
    Bye = b'e',
    RegisterGlobal = b'i',
    RegisterLocal = b'j',
    IdAssignment = b'k',
    UpdateFromClient = b'm',
    UpdateFromServer = b'n',
}

impl Command {
    pub const ALL: [Command; 10] = [
        Command::Hello,
        Command::HelloAck,
        Command::Ping,
        Command::Disconnect,
        Command::Bye,
        Command::RegisterGlobal,
        Command::RegisterLocal,
        Command::IdAssignment,
        Command::UpdateFromClient,
        Command::UpdateFromServer,
    ];

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'a' => Some(Self::Hello),
            b'b' => Some(Self::HelloAck),
            b'c' => Some(Self::Ping),
            b'd' => Some(Self::Disconnect),
            b'e' => Some(Self::Bye),
            b'i' => Some(Self::RegisterGlobal),
            b'j' => Some(Self::RegisterLocal),
            b'k' => Some(Self::IdAssignment),
            b'm' => Some(Self::UpdateFromClient),
            b'n' => Some(Self::UpdateFromServer),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Connection-level commands are consumed by the connection manager;
    /// everything else is forwarded to the sync engine.
    pub fn is_control(self) -> bool {
        matches!(
            self,
            Command::Hello | Command::HelloAck | Command::Ping | Command::Disconnect | Command::Bye
        )
    }
}

/// A decoded datagram. The payload is opaque at this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub command: Command,
    pub timestamp: u32,
    pub object_id: i32,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(command: Command, timestamp: u32, object_id: i32, payload: Vec<u8>) -> Self {
        Self {
            command,
            timestamp,
            object_id,
            payload,
        }
    }

    /// Header-only packet, used for the control commands.
    pub fn control(command: Command) -> Self {
        Self::new(command, 0, 0, Vec::new())
    }

    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    pub fn encode(&self) -> Vec<u8> {
        encode(self.command, self.timestamp, self.object_id, &self.payload)
    }

    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < HEADER_SIZE {
            return Err(PacketError::TooShort {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }

        let command = Command::from_byte(data[0]).ok_or(PacketError::UnknownCommand(data[0]))?;
        let timestamp = u32::from_le_bytes([data[1], data[2], data[3], data[4]]);
        let object_id = i32::from_le_bytes([data[5], data[6], data[7], data[8]]);

        Ok(Self {
            command,
            timestamp,
            object_id,
            payload: data[HEADER_SIZE..].to_vec(),
        })
    }
}

pub fn encode(command: Command, timestamp: u32, object_id: i32, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.push(command.as_byte());
    buf.extend_from_slice(&timestamp.to_le_bytes());
    buf.extend_from_slice(&object_id.to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_packet_layout() {
        let bytes = encode(Command::UpdateFromClient, 5, 7, &[1, 2, 3]);

        assert_eq!(
            bytes,
            vec![0x6D, 5, 0, 0, 0, 7, 0, 0, 0, 1, 2, 3],
        );

        let packet = Packet::decode(&bytes).unwrap();
        assert_eq!(packet.command, Command::UpdateFromClient);
        assert_eq!(packet.timestamp, 5);
        assert_eq!(packet.object_id, 7);
        assert_eq!(packet.payload, vec![1, 2, 3]);
    }

    #[test]
    fn test_every_command_roundtrips() {
        for command in Command::ALL {
            let packet = Packet::new(command, u32::MAX, -42, vec![9; 28]);
            let decoded = Packet::decode(&packet.encode()).unwrap();
            assert_eq!(decoded, packet);
        }
    }

    #[test]
    fn test_header_only_packet() {
        let bytes = Packet::control(Command::Ping).encode();
        assert_eq!(bytes.len(), HEADER_SIZE);

        let packet = Packet::decode(&bytes).unwrap();
        assert_eq!(packet.command, Command::Ping);
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn test_command_codes() {
        assert_eq!(Command::Hello.as_byte(), b'a');
        assert_eq!(Command::IdAssignment.as_byte(), b'k');
        assert_eq!(Command::UpdateFromServer.as_byte(), b'n');
        assert_eq!(Command::from_byte(b'f'), None);
        assert!(Command::Bye.is_control());
        assert!(!Command::RegisterLocal.is_control());
    }

    #[test]
    fn test_decode_too_short() {
        assert_eq!(
            Packet::decode(&[b'a', 0, 0]),
            Err(PacketError::TooShort {
                expected: HEADER_SIZE,
                actual: 3
            })
        );
        // Bare one-byte control datagrams are not valid frames.
        assert!(Packet::decode(b"e").is_err());
    }

    #[test]
    fn test_decode_unknown_command() {
        let mut bytes = encode(Command::Ping, 0, 0, &[]);
        bytes[0] = b'z';

        assert_eq!(Packet::decode(&bytes), Err(PacketError::UnknownCommand(b'z')));
    }

    #[test]
    fn test_negative_object_id() {
        let packet = Packet::decode(&encode(Command::RegisterLocal, 0, -1, &[])).unwrap();
        assert_eq!(packet.object_id, -1);
    }
}

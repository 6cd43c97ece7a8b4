//! Packet framing and the fixed parts of the client/server protocol.
//!
//! Every packet is a 3-byte little-endian payload length and a sequence
//! number, then the payload. A payload of exactly `MAX_PACKET_SIZE` bytes
//! means another packet continues it.

pub mod reader;
pub mod writer;

pub use reader::PacketReader;
pub use writer::PacketWriter;

pub const MAX_PACKET_SIZE: usize = 0xFF_FF_FF;

/// Capability flags this client reads or requests.
pub mod capabilities {
    pub const CLIENT_LONG_PASSWORD: u32 = 1;
    pub const CLIENT_LONG_FLAG: u32 = 1 << 2;
    pub const CLIENT_CONNECT_WITH_DB: u32 = 1 << 3;
    pub const CLIENT_PROTOCOL_41: u32 = 1 << 9;
    pub const CLIENT_TRANSACTIONS: u32 = 1 << 13;
    pub const CLIENT_SECURE_CONNECTION: u32 = 1 << 15;
    pub const CLIENT_MULTI_STATEMENTS: u32 = 1 << 16;
    pub const CLIENT_MULTI_RESULTS: u32 = 1 << 17;
    pub const CLIENT_PLUGIN_AUTH: u32 = 1 << 19;
    pub const CLIENT_CONNECT_ATTRS: u32 = 1 << 20;
    pub const CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA: u32 = 1 << 21;
    pub const CLIENT_DEPRECATE_EOF: u32 = 1 << 24;

    /// Requested on every connection. Multi-statements stay off so one
    /// query string is one statement.
    pub const DEFAULT_CLIENT_FLAGS: u32 = CLIENT_PROTOCOL_41
        | CLIENT_SECURE_CONNECTION
        | CLIENT_LONG_PASSWORD
        | CLIENT_LONG_FLAG
        | CLIENT_TRANSACTIONS
        | CLIENT_MULTI_RESULTS
        | CLIENT_PLUGIN_AUTH
        | CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA
        | CLIENT_DEPRECATE_EOF;
}

/// Commands (COM_xxx) sent by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Quit = 0x01,
    InitDb = 0x02,
    Query = 0x03,
}

pub mod server_status {
    pub const SERVER_MORE_RESULTS_EXISTS: u16 = 0x0008;
}

pub mod charset {
    /// utf8mb4_general_ci
    pub const DEFAULT_CHARSET: u8 = 45;
}

/// A MySQL packet header.
#[derive(Debug, Clone, Copy)]
pub struct PacketHeader {
    /// Payload length (3 bytes, max 16MB - 1)
    pub payload_length: u32,
    /// Sequence number (wraps at 255)
    pub sequence_id: u8,
}

impl PacketHeader {
    /// Total header size in bytes.
    pub const SIZE: usize = 4;

    /// Parse a packet header from 4 bytes.
    pub fn from_bytes(bytes: &[u8; 4]) -> Self {
        let payload_length =
            u32::from(bytes[0]) | (u32::from(bytes[1]) << 8) | (u32::from(bytes[2]) << 16);
        Self {
            payload_length,
            sequence_id: bytes[3],
        }
    }

    /// Encode the header to 4 bytes.
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_bytes(&self) -> [u8; 4] {
        [
            (self.payload_length & 0xFF) as u8,
            ((self.payload_length >> 8) & 0xFF) as u8,
            ((self.payload_length >> 16) & 0xFF) as u8,
            self.sequence_id,
        ]
    }
}

/// Server response packet types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// OK packet (0x00)
    Ok,
    /// Error packet (0xFF)
    Error,
    /// EOF packet (0xFE with a short payload)
    Eof,
    /// Local infile request (0xFB)
    LocalInfile,
    /// Anything else: column count, column definition, or row
    Data,
}

impl PacketType {
    /// Classify the first packet of a command response.
    pub fn from_first_byte(byte: u8, payload_len: u32) -> Self {
        match byte {
            0x00 => PacketType::Ok,
            0xFF => PacketType::Error,
            0xFE if payload_len < 9 => PacketType::Eof,
            0xFB => PacketType::LocalInfile,
            _ => PacketType::Data,
        }
    }

    /// Does this packet end a row stream?
    ///
    /// Rows may legitimately start with `0x00` (an empty first value), so
    /// only the `0xFE` marker terminates. With `CLIENT_DEPRECATE_EOF` the
    /// terminator is an OK packet that can be longer than an EOF packet.
    pub fn is_row_terminator(payload: &[u8], deprecate_eof: bool) -> bool {
        match payload.first() {
            Some(0xFE) if deprecate_eof => payload.len() < MAX_PACKET_SIZE,
            Some(0xFE) => payload.len() < 9,
            _ => false,
        }
    }
}

/// Parsed OK packet.
#[derive(Debug, Clone)]
pub struct OkPacket {
    /// Number of affected rows
    pub affected_rows: u64,
    /// Last insert ID
    pub last_insert_id: u64,
    /// Server status flags
    pub status_flags: u16,
    /// Number of warnings
    pub warnings: u16,
    /// Info string (if any)
    pub info: String,
}

/// Parsed Error packet.
#[derive(Debug, Clone)]
pub struct ErrPacket {
    /// Error code
    pub error_code: u16,
    /// SQL state (5 characters)
    pub sql_state: String,
    /// Error message
    pub error_message: String,
}

/// Parsed EOF packet (deprecated in newer MySQL versions).
#[derive(Debug, Clone, Copy)]
pub struct EofPacket {
    /// Number of warnings
    pub warnings: u16,
    /// Server status flags
    pub status_flags: u16,
}

//! MySQL packet writing utilities.

#![allow(clippy::cast_possible_truncation)]

use crate::protocol::{Command, MAX_PACKET_SIZE, PacketHeader};

/// Accumulates one packet payload.
#[derive(Debug, Default)]
pub struct PacketWriter {
    buffer: Vec<u8>,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_u16_le(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a 3-byte little-endian integer.
    pub fn write_u24_le(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes()[..3]);
    }

    pub fn write_u32_le(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64_le(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a length-encoded integer.
    pub fn write_lenenc_int(&mut self, value: u64) {
        if value < 251 {
            self.write_u8(value as u8);
        } else if value < 0x10000 {
            self.write_u8(0xFC);
            self.write_u16_le(value as u16);
        } else if value < 0x0100_0000 {
            self.write_u8(0xFD);
            self.write_u24_le(value as u32);
        } else {
            self.write_u8(0xFE);
            self.write_u64_le(value);
        }
    }

    pub fn write_lenenc_string(&mut self, s: &str) {
        self.write_lenenc_bytes(s.as_bytes());
    }

    pub fn write_lenenc_bytes(&mut self, data: &[u8]) {
        self.write_lenenc_int(data.len() as u64);
        self.buffer.extend_from_slice(data);
    }

    /// Write a null-terminated string.
    pub fn write_null_string(&mut self, s: &str) {
        self.buffer.extend_from_slice(s.as_bytes());
        self.buffer.push(0);
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Write zero padding.
    pub fn write_zeros(&mut self, count: usize) {
        self.buffer.resize(self.buffer.len() + count, 0);
    }

    /// Frame the accumulated payload.
    pub fn build_packet(&self, sequence_id: u8) -> Vec<u8> {
        build_packet_from_payload(&self.buffer, sequence_id)
    }
}

/// Frame `payload` into one or more wire packets.
///
/// Payloads of `MAX_PACKET_SIZE` bytes or more are split; a payload that
/// ends exactly on a boundary is followed by an empty packet.
pub fn build_packet_from_payload(payload: &[u8], mut sequence_id: u8) -> Vec<u8> {
    let mut result = Vec::with_capacity(payload.len() + PacketHeader::SIZE);

    if payload.len() < MAX_PACKET_SIZE {
        let header = PacketHeader {
            payload_length: payload.len() as u32,
            sequence_id,
        };
        result.extend_from_slice(&header.to_bytes());
        result.extend_from_slice(payload);
        return result;
    }

    let mut offset = 0;
    loop {
        let chunk_len = (payload.len() - offset).min(MAX_PACKET_SIZE);
        let header = PacketHeader {
            payload_length: chunk_len as u32,
            sequence_id,
        };
        result.extend_from_slice(&header.to_bytes());
        result.extend_from_slice(&payload[offset..offset + chunk_len]);
        offset += chunk_len;
        sequence_id = sequence_id.wrapping_add(1);
        if chunk_len < MAX_PACKET_SIZE {
            break;
        }
        if offset == payload.len() {
            let header = PacketHeader {
                payload_length: 0,
                sequence_id,
            };
            result.extend_from_slice(&header.to_bytes());
            break;
        }
    }

    result
}

/// Build a command packet; commands always start a new sequence at 0.
pub fn build_command_packet(command: Command, payload: &[u8]) -> Vec<u8> {
    let mut writer = PacketWriter::with_capacity(1 + payload.len());
    writer.write_u8(command as u8);
    writer.write_bytes(payload);
    writer.build_packet(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_lenenc_int() {
        let mut writer = PacketWriter::new();
        writer.write_lenenc_int(0x42);
        assert_eq!(writer.as_bytes(), &[0x42]);

        let mut writer = PacketWriter::new();
        writer.write_lenenc_int(251);
        assert_eq!(writer.as_bytes(), &[0xFC, 0xFB, 0x00]);

        let mut writer = PacketWriter::new();
        writer.write_lenenc_int(0x0012_3456);
        assert_eq!(writer.as_bytes(), &[0xFD, 0x56, 0x34, 0x12]);

        let mut writer = PacketWriter::new();
        writer.write_lenenc_int(0x0100_0000);
        assert_eq!(writer.len(), 9);
        assert_eq!(writer.as_bytes()[0], 0xFE);
    }

    #[test]
    fn test_write_strings() {
        let mut writer = PacketWriter::new();
        writer.write_null_string("root");
        writer.write_lenenc_string("ab");
        writer.write_zeros(2);
        assert_eq!(
            writer.as_bytes(),
            &[b'r', b'o', b'o', b't', 0, 2, b'a', b'b', 0, 0]
        );
    }

    #[test]
    fn test_build_command_packet() {
        let packet = build_command_packet(Command::Query, b"SELECT 1");
        assert_eq!(&packet[..4], &[9, 0, 0, 0]);
        assert_eq!(packet[4], 0x03);
        assert_eq!(&packet[5..], b"SELECT 1");
    }

    #[test]
    fn test_build_packet_sequence() {
        let mut writer = PacketWriter::new();
        writer.write_u32_le(0);
        let packet = writer.build_packet(3);
        assert_eq!(&packet[..4], &[4, 0, 0, 3]);
    }
}

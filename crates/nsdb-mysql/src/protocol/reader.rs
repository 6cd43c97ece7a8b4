//! MySQL packet reading utilities.
//!
//! Reads the protocol's primitive types (fixed-width little-endian
//! integers, length-encoded integers and strings) and the generic
//! OK/ERR/EOF packets.

#![allow(clippy::cast_possible_truncation)]

use crate::protocol::{EofPacket, ErrPacket, OkPacket};

/// Marker byte for a NULL value in a text-protocol row.
pub const NULL_MARKER: u8 = 0xFB;

/// A cursor over one packet payload.
#[derive(Debug)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Peek at the next byte without advancing.
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let byte = self.data.get(self.pos)?;
        self.pos += 1;
        Some(*byte)
    }

    pub fn read_u16_le(&mut self) -> Option<u16> {
        let bytes = self.read_array::<2>()?;
        Some(u16::from_le_bytes(bytes))
    }

    /// Read a 3-byte little-endian integer.
    pub fn read_u24_le(&mut self) -> Option<u32> {
        let [a, b, c] = self.read_array::<3>()?;
        Some(u32::from_le_bytes([a, b, c, 0]))
    }

    pub fn read_u32_le(&mut self) -> Option<u32> {
        let bytes = self.read_array::<4>()?;
        Some(u32::from_le_bytes(bytes))
    }

    pub fn read_u64_le(&mut self) -> Option<u64> {
        let bytes = self.read_array::<8>()?;
        Some(u64::from_le_bytes(bytes))
    }

    fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Some(out)
    }

    /// Read a length-encoded integer.
    ///
    /// - 0x00-0xFA: 1-byte value
    /// - 0xFC: 2-byte value follows
    /// - 0xFD: 3-byte value follows
    /// - 0xFE: 8-byte value follows
    /// - 0xFB (NULL) and 0xFF (error) are not integers
    pub fn read_lenenc_int(&mut self) -> Option<u64> {
        let first = self.read_u8()?;
        match first {
            0x00..=0xFA => Some(u64::from(first)),
            0xFC => self.read_u16_le().map(u64::from),
            0xFD => self.read_u24_le().map(u64::from),
            0xFE => self.read_u64_le(),
            0xFB | 0xFF => None,
        }
    }

    /// Read a length-encoded string.
    pub fn read_lenenc_string(&mut self) -> Option<String> {
        let len = self.read_lenenc_int()? as usize;
        self.read_string(len)
    }

    /// Read one text-protocol column value.
    ///
    /// Returns `Some(None)` for SQL NULL and `None` when the payload is
    /// truncated.
    pub fn read_text_value(&mut self) -> Option<Option<String>> {
        if self.peek() == Some(NULL_MARKER) {
            self.pos += 1;
            return Some(None);
        }
        self.read_lenenc_string().map(Some)
    }

    /// Read a null-terminated string. A missing terminator ends at the
    /// end of the payload.
    pub fn read_null_string(&mut self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let rest = &self.data[self.pos..];
        let len = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        let s = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += (len + 1).min(rest.len());
        Some(s)
    }

    /// Read a fixed-length string.
    pub fn read_string(&mut self, len: usize) -> Option<String> {
        let bytes = self.read_bytes(len)?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read remaining data as a string.
    pub fn read_rest_string(&mut self) -> String {
        String::from_utf8_lossy(self.read_rest()).into_owned()
    }

    /// Read a fixed number of bytes.
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.remaining() < len {
            return None;
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Some(bytes)
    }

    /// Read remaining bytes.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos.min(self.data.len())..];
        self.pos = self.data.len();
        rest
    }

    /// Skip a number of bytes.
    pub fn skip(&mut self, n: usize) -> bool {
        if self.remaining() >= n {
            self.pos += n;
            true
        } else {
            false
        }
    }

    /// Parse an OK packet.
    ///
    /// Accepts both the `0x00` header and the `0xFE` header used for the
    /// end-of-rows OK packet when `CLIENT_DEPRECATE_EOF` is negotiated.
    pub fn parse_ok_packet(&mut self) -> Option<OkPacket> {
        if matches!(self.peek(), Some(0x00 | 0xFE)) {
            self.skip(1);
        }

        let affected_rows = self.read_lenenc_int()?;
        let last_insert_id = self.read_lenenc_int()?;
        let status_flags = self.read_u16_le()?;
        let warnings = self.read_u16_le()?;
        let info = self.read_rest_string();

        Some(OkPacket {
            affected_rows,
            last_insert_id,
            status_flags,
            warnings,
            info,
        })
    }

    /// Parse an ERR packet: code, optional `#` + 5-byte SQLSTATE, message.
    pub fn parse_err_packet(&mut self) -> Option<ErrPacket> {
        if self.peek() == Some(0xFF) {
            self.skip(1);
        }

        let error_code = self.read_u16_le()?;

        let sql_state = if self.peek() == Some(b'#') {
            self.skip(1);
            self.read_string(5)?
        } else {
            String::from("HY000")
        };

        let error_message = self.read_rest_string();

        Some(ErrPacket {
            error_code,
            sql_state,
            error_message,
        })
    }

    /// Parse an EOF packet: warnings then status flags.
    pub fn parse_eof_packet(&mut self) -> Option<EofPacket> {
        if self.peek() == Some(0xFE) {
            self.skip(1);
        }

        let warnings = self.read_u16_le()?;
        let status_flags = self.read_u16_le()?;

        Some(EofPacket {
            warnings,
            status_flags,
        })
    }
}

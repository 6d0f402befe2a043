//! Chapter 10 packet header
//!
//! ```text
//! offset  size  field
//!      0     2  sync pattern (0xEB25)
//!      2     2  channel id
//!      4     4  packet length (header + body + filler)
//!      8     4  data length (CSDW + payload)
//!     12     1  data type version
//!     13     1  sequence number
//!     14     1  packet flags
//!     15     1  data type
//!     16     6  relative time counter
//!     22     2  header checksum
//! ```
//!
//! All fields are little-endian. A 12-byte secondary header follows when
//! bit 7 of the packet flags is set; that bit is the only source consulted
//! for secondary header presence.

use crate::types::{DataType, DecoderError, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Sync pattern opening every packet
pub const SYNC_PATTERN: u16 = 0xEB25;

/// Primary header size in bytes
pub const PRIMARY_HEADER_LEN: usize = 24;

/// Secondary header size in bytes
pub const SECONDARY_HEADER_LEN: usize = 12;

/// Channel-specific data word size in bytes
pub const CSDW_LEN: usize = 4;

/// Packet flag bits
pub mod flags {
    /// Secondary header present
    pub const SECONDARY_HEADER: u8 = 1 << 7;
    /// Intra-packet time stamps use the secondary header time format
    pub const IPTS_SECONDARY_TIME: u8 = 1 << 6;
    /// Relative time counter sync error
    pub const RTC_SYNC_ERROR: u8 = 1 << 5;
    /// Data overflow
    pub const DATA_OVERFLOW: u8 = 1 << 4;
}

/// Decoded primary packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub channel_id: u16,
    pub packet_length: u32,
    pub data_length: u32,
    pub data_type_version: u8,
    pub sequence_number: u8,
    pub flags: u8,
    pub data_type: u8,
    /// 48-bit relative time counter (10 MHz)
    pub rtc: u64,
    pub checksum: u16,
}

impl PacketHeader {
    /// Parse a primary header from the first 24 bytes of `buf`
    ///
    /// Only the sync pattern is validated here; length and checksum checks
    /// are left to the reader, which knows its configuration.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < PRIMARY_HEADER_LEN {
            return Err(DecoderError::InvalidHeader(format!(
                "need {} bytes, got {}",
                PRIMARY_HEADER_LEN,
                buf.len()
            )));
        }

        let sync = LittleEndian::read_u16(&buf[0..2]);
        if sync != SYNC_PATTERN {
            return Err(DecoderError::InvalidSync(sync));
        }

        Ok(PacketHeader {
            channel_id: LittleEndian::read_u16(&buf[2..4]),
            packet_length: LittleEndian::read_u32(&buf[4..8]),
            data_length: LittleEndian::read_u32(&buf[8..12]),
            data_type_version: buf[12],
            sequence_number: buf[13],
            flags: buf[14],
            data_type: buf[15],
            rtc: LittleEndian::read_uint(&buf[16..22], 6),
            checksum: LittleEndian::read_u16(&buf[22..24]),
        })
    }

    /// Serialize the header with a freshly computed checksum
    pub fn encode(&self) -> [u8; PRIMARY_HEADER_LEN] {
        let mut buf = [0u8; PRIMARY_HEADER_LEN];
        LittleEndian::write_u16(&mut buf[0..2], SYNC_PATTERN);
        LittleEndian::write_u16(&mut buf[2..4], self.channel_id);
        LittleEndian::write_u32(&mut buf[4..8], self.packet_length);
        LittleEndian::write_u32(&mut buf[8..12], self.data_length);
        buf[12] = self.data_type_version;
        buf[13] = self.sequence_number;
        buf[14] = self.flags;
        buf[15] = self.data_type;
        LittleEndian::write_uint(&mut buf[16..22], self.rtc & RTC_MASK, 6);
        let checksum = Self::compute_checksum(&buf);
        LittleEndian::write_u16(&mut buf[22..24], checksum);
        buf
    }

    /// Wrapping 16-bit sum of the first eleven header words
    pub fn compute_checksum(buf: &[u8]) -> u16 {
        buf[..PRIMARY_HEADER_LEN - 2]
            .chunks_exact(2)
            .fold(0u16, |acc, word| acc.wrapping_add(LittleEndian::read_u16(word)))
    }

    /// True if the stored checksum matches the header contents
    pub fn checksum_ok(&self) -> bool {
        let encoded = self.encode();
        self.checksum == LittleEndian::read_u16(&encoded[22..24])
    }

    pub fn data_type(&self) -> DataType {
        DataType::from_u8(self.data_type)
    }

    pub fn has_secondary_header(&self) -> bool {
        self.flags & flags::SECONDARY_HEADER != 0
    }

    /// Offset of the CSDW (end of primary and optional secondary header)
    pub fn body_offset(&self) -> usize {
        if self.has_secondary_header() {
            PRIMARY_HEADER_LEN + SECONDARY_HEADER_LEN
        } else {
            PRIMARY_HEADER_LEN
        }
    }

    /// Offset of the first payload byte after the CSDW
    pub fn payload_offset(&self) -> usize {
        self.body_offset() + CSDW_LEN
    }

    /// Smallest packet length consistent with this header
    pub fn min_packet_length(&self) -> usize {
        self.body_offset() + self.data_length as usize
    }
}

/// Mask for the 48-bit relative time counter
pub const RTC_MASK: u64 = (1 << 48) - 1;

//! MIL-STD-1553 format 1 payload
//!
//! Each message is preceded by a 14-byte intra-packet header:
//!
//! ```text
//! offset  size  field
//!      0     8  intra-packet time stamp (RTC in the low 48 bits)
//!      8     2  block status word
//!     10     2  gap times word
//!     12     2  length (bytes of message data)
//!     14     n  command word, status word(s) and data words
//! ```

use crate::formats::header::RTC_MASK;
use crate::types::{Bus, DecoderError, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Intra-packet header size in bytes
pub const INTRA_PACKET_HEADER_LEN: usize = 14;

/// Block status word bits
pub mod block_status {
    /// Bus the message was captured on (0 = A, 1 = B)
    pub const BUS_ID: u16 = 1 << 13;
    pub const MESSAGE_ERROR: u16 = 1 << 12;
    pub const RT_TO_RT: u16 = 1 << 11;
    pub const FORMAT_ERROR: u16 = 1 << 10;
    pub const RESPONSE_TIMEOUT: u16 = 1 << 9;
    pub const WORD_COUNT_ERROR: u16 = 1 << 5;
    pub const SYNC_TYPE_ERROR: u16 = 1 << 4;
    pub const INVALID_WORD_ERROR: u16 = 1 << 3;
}

/// 1553 channel-specific data word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ms1553Csdw {
    /// Time tag bits (bits 31-30)
    pub time_tag_bits: u8,
    /// Number of messages in the packet (bits 23-0)
    pub message_count: u32,
}

impl Ms1553Csdw {
    pub fn from_u32(raw: u32) -> Self {
        Self {
            time_tag_bits: (raw >> 30) as u8,
            message_count: raw & 0x00FF_FFFF,
        }
    }

    pub fn to_u32(&self) -> u32 {
        ((self.time_tag_bits as u32 & 0x3) << 30) | (self.message_count & 0x00FF_FFFF)
    }
}

/// One 1553 bus transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ms1553Message {
    /// Raw intra-packet time stamp
    pub ipts: u64,
    pub block_status: u16,
    pub gap_times: u16,
    /// Message bytes: command word, status word(s), data words
    pub data: Vec<u8>,
}

impl Ms1553Message {
    /// Build a message from 16-bit words (command word first)
    pub fn new(rtc: u64, bus: Bus, words: &[u16]) -> Self {
        let mut data = vec![0u8; words.len() * 2];
        LittleEndian::write_u16_into(words, &mut data);

        let mut message = Self {
            ipts: rtc & RTC_MASK,
            block_status: 0,
            gap_times: 0,
            data,
        };
        message.set_bus(bus);
        message
    }

    /// Parse one message from the start of `buf`
    ///
    /// Returns the message and the number of bytes it occupied.
    pub fn parse(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < INTRA_PACKET_HEADER_LEN {
            return Err(DecoderError::InvalidMessage(format!(
                "1553 intra-packet header needs {} bytes, {} left",
                INTRA_PACKET_HEADER_LEN,
                buf.len()
            )));
        }

        let length = LittleEndian::read_u16(&buf[12..14]) as usize;
        let end = INTRA_PACKET_HEADER_LEN + length;
        if buf.len() < end {
            return Err(DecoderError::InvalidMessage(format!(
                "1553 message claims {} data bytes, {} left",
                length,
                buf.len() - INTRA_PACKET_HEADER_LEN
            )));
        }

        let message = Self {
            ipts: LittleEndian::read_u64(&buf[0..8]),
            block_status: LittleEndian::read_u16(&buf[8..10]),
            gap_times: LittleEndian::read_u16(&buf[10..12]),
            data: buf[INTRA_PACKET_HEADER_LEN..end].to_vec(),
        };
        Ok((message, end))
    }

    /// Relative time counter of the message
    pub fn rtc(&self) -> u64 {
        self.ipts & RTC_MASK
    }

    /// Number of complete 16-bit words
    pub fn word_count(&self) -> usize {
        self.data.len() / 2
    }

    pub fn words(&self) -> impl Iterator<Item = u16> + '_ {
        self.data.chunks_exact(2).map(LittleEndian::read_u16)
    }

    /// Bounds-checked word access
    pub fn word(&self, index: usize) -> Option<u16> {
        let start = index.checked_mul(2)?;
        let bytes = self.data.get(start..start + 2)?;
        Some(LittleEndian::read_u16(bytes))
    }

    pub fn command_word(&self) -> Option<u16> {
        self.word(0)
    }

    pub fn bus(&self) -> Bus {
        Bus::from_bit(self.block_status & block_status::BUS_ID != 0)
    }

    pub fn set_bus(&mut self, bus: Bus) {
        match bus {
            Bus::A => self.block_status &= !block_status::BUS_ID,
            Bus::B => self.block_status |= block_status::BUS_ID,
        }
    }

    pub fn is_rt_to_rt(&self) -> bool {
        self.block_status & block_status::RT_TO_RT != 0
    }

    pub fn has_error(&self) -> bool {
        self.block_status
            & (block_status::MESSAGE_ERROR
                | block_status::FORMAT_ERROR
                | block_status::RESPONSE_TIMEOUT
                | block_status::WORD_COUNT_ERROR
                | block_status::SYNC_TYPE_ERROR
                | block_status::INVALID_WORD_ERROR)
            != 0
    }

    /// Size of the serialized message including its intra-packet header
    pub fn encoded_len(&self) -> usize {
        INTRA_PACKET_HEADER_LEN + self.data.len()
    }

    /// Append the serialized message to `out`
    pub fn write_to(&self, out: &mut Vec<u8>) {
        let mut header = [0u8; INTRA_PACKET_HEADER_LEN];
        LittleEndian::write_u64(&mut header[0..8], self.ipts);
        LittleEndian::write_u16(&mut header[8..10], self.block_status);
        LittleEndian::write_u16(&mut header[10..12], self.gap_times);
        LittleEndian::write_u16(&mut header[12..14], self.data.len() as u16);
        out.extend_from_slice(&header);
        out.extend_from_slice(&self.data);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csdw_fields() {
        let csdw = Ms1553Csdw::from_u32(0x4000_0003);
        assert_eq!(csdw.time_tag_bits, 1);
        assert_eq!(csdw.message_count, 3);
        assert_eq!(csdw.to_u32(), 0x4000_0003);
    }

    #[test]
    fn test_parse_message() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0x0000_0000_0001_0203u64.to_le_bytes());
        buf.extend_from_slice(&block_status::BUS_ID.to_le_bytes());
        buf.extend_from_slice(&0x0011u16.to_le_bytes());
        buf.extend_from_slice(&4u16.to_le_bytes());
        buf.extend_from_slice(&0x1234u16.to_le_bytes());
        buf.extend_from_slice(&0xBEEFu16.to_le_bytes());
        buf.extend_from_slice(&[0xAA, 0xBB]); // next message

        let (message, used) = Ms1553Message::parse(&buf).unwrap();
        assert_eq!(used, 18);
        assert_eq!(message.rtc(), 0x0001_0203);
        assert_eq!(message.bus(), Bus::B);
        assert_eq!(message.gap_times, 0x0011);
        assert_eq!(message.word_count(), 2);
        assert_eq!(message.command_word(), Some(0x1234));
        assert_eq!(message.word(1), Some(0xBEEF));
        assert_eq!(message.word(2), None);
        assert_eq!(message.to_bytes(), &buf[..18]);
    }

    #[test]
    fn test_truncated_message() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&[0u8; 12]);
        buf.extend_from_slice(&10u16.to_le_bytes());
        buf.extend_from_slice(&[0u8; 4]);
        assert!(Ms1553Message::parse(&buf).is_err());
        assert!(Ms1553Message::parse(&buf[..8]).is_err());
    }

    #[test]
    fn test_set_bus_only_touches_bus_bit() {
        let mut message = Ms1553Message::new(42, Bus::A, &[0x0821, 0x0001]);
        message.block_status |= block_status::RT_TO_RT | block_status::MESSAGE_ERROR;

        message.set_bus(Bus::B);
        assert_eq!(message.bus(), Bus::B);
        assert!(message.is_rt_to_rt());
        assert!(message.has_error());

        message.set_bus(Bus::A);
        assert_eq!(message.bus(), Bus::A);
        assert_eq!(
            message.block_status,
            block_status::RT_TO_RT | block_status::MESSAGE_ERROR
        );
    }

    #[test]
    fn test_word_index_overflow() {
        let message = Ms1553Message::new(0, Bus::A, &[1]);
        assert_eq!(message.word(usize::MAX), None);
    }
}

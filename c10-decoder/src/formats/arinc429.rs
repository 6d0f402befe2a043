//! ARINC-429 format 0 payload
//!
//! Every message is a 4-byte intra-packet data header followed by one
//! 32-bit ARINC word:
//!
//! ```text
//! IPDH bits 19-0   gap time (0.1 us units)
//!      bit  21     bus speed (1 = high)
//!      bit  22     parity error
//!      bit  23     format error
//!      bits 31-24  bus number
//! word bits 7-0    label
//!      bits 9-8    SDI
//!      bits 28-10  data
//!      bits 30-29  SSM
//!      bit  31     parity
//! ```

use crate::types::{DecoderError, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

/// Serialized message size (IPDH + word)
pub const MESSAGE_LEN: usize = 8;

/// ARINC-429 channel-specific data word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arinc429Csdw {
    /// Number of words in the packet (bits 15-0)
    pub message_count: u16,
}

impl Arinc429Csdw {
    pub fn from_u32(raw: u32) -> Self {
        Self {
            message_count: (raw & 0xFFFF) as u16,
        }
    }
}

/// One ARINC-429 word with its intra-packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arinc429Message {
    pub gap_time: u32,
    pub high_speed: bool,
    pub parity_error: bool,
    pub format_error: bool,
    pub bus: u8,
    pub word: u32,
}

impl Arinc429Message {
    pub fn new(bus: u8, word: u32) -> Self {
        Self {
            gap_time: 0,
            high_speed: false,
            parity_error: false,
            format_error: false,
            bus,
            word,
        }
    }

    pub fn parse(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < MESSAGE_LEN {
            return Err(DecoderError::InvalidMessage(format!(
                "ARINC-429 message needs {} bytes, {} left",
                MESSAGE_LEN,
                buf.len()
            )));
        }

        let ipdh = LittleEndian::read_u32(&buf[0..4]);
        let message = Self {
            gap_time: ipdh & 0x000F_FFFF,
            high_speed: ipdh & (1 << 21) != 0,
            parity_error: ipdh & (1 << 22) != 0,
            format_error: ipdh & (1 << 23) != 0,
            bus: (ipdh >> 24) as u8,
            word: LittleEndian::read_u32(&buf[4..8]),
        };
        Ok((message, MESSAGE_LEN))
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        let mut ipdh = (self.gap_time & 0x000F_FFFF) | ((self.bus as u32) << 24);
        if self.high_speed {
            ipdh |= 1 << 21;
        }
        if self.parity_error {
            ipdh |= 1 << 22;
        }
        if self.format_error {
            ipdh |= 1 << 23;
        }
        out.extend_from_slice(&ipdh.to_le_bytes());
        out.extend_from_slice(&self.word.to_le_bytes());
    }

    pub fn label(&self) -> u8 {
        (self.word & 0xFF) as u8
    }

    pub fn sdi(&self) -> u8 {
        ((self.word >> 8) & 0x3) as u8
    }

    pub fn data(&self) -> u32 {
        (self.word >> 10) & 0x7_FFFF
    }

    pub fn ssm(&self) -> u8 {
        ((self.word >> 29) & 0x3) as u8
    }

    pub fn parity(&self) -> u8 {
        (self.word >> 31) as u8
    }
}

impl fmt::Display for Arinc429Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ARINC-429 bus {} label {:03o} sdi {} data 0x{:05X} ssm {} parity {} gap {}",
            self.bus,
            self.label(),
            self.sdi(),
            self.data(),
            self.ssm(),
            self.parity(),
            self.gap_time
        )?;
        if self.parity_error {
            write!(f, " [parity error]")?;
        }
        if self.format_error {
            write!(f, " [format error]")?;
        }
        Ok(())
    }
}

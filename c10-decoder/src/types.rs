//! Core types for the Chapter 10 decoder library
//!
//! This module defines the fundamental types the decoder hands out while
//! streaming a recording. The decoder is stateless: it frames packets and
//! exposes typed views of their payloads, nothing more.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Absolute time type used throughout the decoder
///
/// IRIG time carries no time zone, so a naive date-time is used.
pub type Timestamp = NaiveDateTime;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Packet payload kind, taken from the data type byte of the primary header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Time data, format 1 (0x11)
    TimeF1,
    /// MIL-STD-1553 data, format 1 (0x19)
    Ms1553F1,
    /// ARINC-429 data, format 0 (0x38)
    Arinc429F0,
    /// Any other payload; handled as opaque bytes
    Other(u8),
}

impl DataType {
    pub const TIME_F1: u8 = 0x11;
    pub const MS1553_F1: u8 = 0x19;
    pub const ARINC429_F0: u8 = 0x38;

    /// Map the raw data type byte to a known payload kind
    pub fn from_u8(value: u8) -> Self {
        match value {
            Self::TIME_F1 => DataType::TimeF1,
            Self::MS1553_F1 => DataType::Ms1553F1,
            Self::ARINC429_F0 => DataType::Arinc429F0,
            other => DataType::Other(other),
        }
    }

    /// Raw data type byte
    pub fn as_u8(&self) -> u8 {
        match self {
            DataType::TimeF1 => Self::TIME_F1,
            DataType::Ms1553F1 => Self::MS1553_F1,
            DataType::Arinc429F0 => Self::ARINC429_F0,
            DataType::Other(v) => *v,
        }
    }

    /// True if packets of this type carry a sequence of messages
    pub fn has_messages(&self) -> bool {
        matches!(self, DataType::Ms1553F1 | DataType::Arinc429F0)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::TimeF1 => write!(f, "Time F1"),
            DataType::Ms1553F1 => write!(f, "1553 F1"),
            DataType::Arinc429F0 => write!(f, "ARINC-429 F0"),
            DataType::Other(v) => write!(f, "0x{:02X}", v),
        }
    }
}

/// 1553 bus designator (dual-redundant bus)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bus {
    /// Bus A (primary)
    A,
    /// Bus B (redundant)
    B,
}

impl Bus {
    /// Bit value stored in the block status word (0 = A, 1 = B)
    pub fn as_bit(&self) -> u8 {
        match self {
            Bus::A => 0,
            Bus::B => 1,
        }
    }

    pub fn from_bit(bit: bool) -> Self {
        if bit {
            Bus::B
        } else {
            Bus::A
        }
    }
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bus::A => write!(f, "A"),
            Bus::B => write!(f, "B"),
        }
    }
}

/// Errors that can occur during decoding
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Invalid sync pattern 0x{0:04X}")]
    InvalidSync(u16),

    #[error("Invalid packet header: {0}")]
    InvalidHeader(String),

    #[error("Packet at offset {offset} truncated: expected {expected} bytes, found {actual}")]
    Truncated {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Invalid time data: {0}")]
    InvalidTime(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DecoderError {
    /// Framing errors can be recovered from by resynchronising on the next packet
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            DecoderError::InvalidSync(_) | DecoderError::InvalidHeader(_)
        )
    }
}

//! Chapter 10 packet and payload formats
//!
//! This module contains the framing rules shared by every packet (primary and
//! secondary header, CSDW) and parsers for the payload formats the tools
//! understand. Everything else is carried as opaque bytes.

pub mod arinc429;
pub mod header;
pub mod ms1553;
pub mod time;

// Re-export format types
pub use arinc429::{Arinc429Csdw, Arinc429Message};
pub use header::{
    PacketHeader, CSDW_LEN, PRIMARY_HEADER_LEN, RTC_MASK, SECONDARY_HEADER_LEN, SYNC_PATTERN,
};
pub use ms1553::{Ms1553Csdw, Ms1553Message};
pub use time::{DateFormat, TimeBody, TimeF1, TimeF1Csdw};

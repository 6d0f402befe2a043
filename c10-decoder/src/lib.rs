//! IRIG 106 Chapter 10 Decoder Library
//!
//! A stateless, reusable library for reading Chapter 10 flight-test recordings.
//!
//! # Architecture
//!
//! This library is intentionally minimal and focused on decoding:
//! - Frames packets from a byte stream (primary header, optional secondary
//!   header, CSDW, payload, filler)
//! - Recovers from malformed headers by resynchronising on the next sync pattern
//! - Exposes typed views of 1553 format 1, ARINC-429 format 0 and time format 1
//!   payloads, and re-serializes 1553 messages byte for byte
//!
//! The library does NOT:
//! - Filter or search messages
//! - Correlate message time stamps with time packets
//! - Rewrite recordings
//!
//! All higher-level functionality is in the application layer (c10-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use c10_decoder::{DataType, Decoder, DecoderConfig, Message};
//! use std::path::Path;
//!
//! let decoder = Decoder::with_config(DecoderConfig::new().with_header_checksum(true));
//!
//! for packet in decoder.open(Path::new("flight.c10")).unwrap() {
//!     let packet = packet.unwrap();
//!     if packet.data_type() != DataType::Ms1553F1 {
//!         continue;
//!     }
//!     for message in packet.messages() {
//!         if let Ok(Message::Ms1553(msg)) = message {
//!             println!("bus {} command 0x{:04X}", msg.bus(), msg.command_word().unwrap_or(0));
//!         }
//!     }
//! }
//! ```

// Public modules
pub mod builder;
pub mod config;
pub mod decoder;
pub mod formats;
pub mod packet;
pub mod types;

// Re-export main types for convenience
pub use builder::PacketBuilder;
pub use config::DecoderConfig;
pub use decoder::{Decoder, PacketReader, ReaderStats};
pub use formats::{Arinc429Message, Ms1553Message, TimeF1};
pub use packet::{Message, Messages, Packet};
pub use types::{Bus, DataType, DecoderError, Result, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_library_basics() {
        // Smoke test: an empty stream yields no packets
        let decoder = Decoder::new();
        assert_eq!(decoder.read(Cursor::new(Vec::new())).count(), 0);
        assert!(!VERSION.is_empty());
    }
}

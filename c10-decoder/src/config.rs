//! Decoder configuration types
//!
//! The decoder only needs to know how strictly to treat packet framing.
//! Filtering, time correlation and rewriting belong to the application layer.

use serde::{Deserialize, Serialize};

/// Largest packet the Chapter 10 standard allows (512 KiB)
pub const MAX_PACKET_LENGTH: u32 = 524_288;

/// Configuration for the decoder library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Reject packets whose primary header checksum does not match
    #[serde(default)]
    pub verify_header_checksum: bool,

    /// Scan forward to the next sync pattern after a malformed header
    /// (false = return the error and stop)
    #[serde(default = "default_true")]
    pub resync: bool,

    /// Packets claiming more than this many bytes are treated as malformed
    #[serde(default = "default_max_packet_length")]
    pub max_packet_length: u32,
}

fn default_true() -> bool {
    true
}

fn default_max_packet_length() -> u32 {
    MAX_PACKET_LENGTH
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            verify_header_checksum: false,
            resync: true,
            max_packet_length: MAX_PACKET_LENGTH,
        }
    }
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: enable or disable header checksum verification
    pub fn with_header_checksum(mut self, enabled: bool) -> Self {
        self.verify_header_checksum = enabled;
        self
    }

    /// Builder method: enable or disable resynchronisation
    pub fn with_resync(mut self, enabled: bool) -> Self {
        self.resync = enabled;
        self
    }

    /// Builder method: set the packet length ceiling
    pub fn with_max_packet_length(mut self, length: u32) -> Self {
        self.max_packet_length = length;
        self
    }
}

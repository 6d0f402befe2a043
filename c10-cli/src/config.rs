//! Configuration loading and option parsing
//!
//! Search defaults can come from a TOML file; command-line flags override
//! them. Numeric options accept decimal or `0x` hex.

use crate::filter::MatchValue;
use crate::report::OutputFormat;
use anyhow::{Context, Result};
use c10_decoder::DecoderConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration (loaded from a TOML file)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub time: TimeConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilterConfig {
    pub channel: Option<u16>,
    pub cmd: Option<u16>,
    pub bus: Option<u8>,
    pub word_offset: Option<usize>,
    pub mask: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub parallel: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeConfig {
    /// Year assumed for day-of-year time packets
    #[serde(default = "default_year")]
    pub year: i32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            year: default_year(),
        }
    }
}

fn default_year() -> i32 {
    1970
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    log::debug!("Loaded configuration from {:?}", path);
    Ok(config)
}

/// Parse a decimal or `0x`-prefixed hexadecimal integer
pub fn parse_int(s: &str) -> std::result::Result<u64, String> {
    let trimmed = s.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|_| format!("Invalid value \"{}\"", s))
}

pub fn parse_u16(s: &str) -> std::result::Result<u16, String> {
    let value = parse_int(s)?;
    u16::try_from(value).map_err(|_| format!("Value \"{}\" does not fit in 16 bits", s))
}

pub fn parse_u8(s: &str) -> std::result::Result<u8, String> {
    let value = parse_int(s)?;
    u8::try_from(value).map_err(|_| format!("Value \"{}\" does not fit in 8 bits", s))
}

pub fn parse_usize(s: &str) -> std::result::Result<usize, String> {
    let value = parse_int(s)?;
    usize::try_from(value).map_err(|_| format!("Value \"{}\" is too large", s))
}

/// Parse the search value: `*` or an integer
pub fn parse_match_value(s: &str) -> std::result::Result<MatchValue, String> {
    if s.trim() == "*" {
        return Ok(MatchValue::Any);
    }
    parse_u16(s).map(MatchValue::Exact)
}

//! Streaming filter framework.
//!
//! A [`FilterEngine`] drives one codec through a begin/block/end session and
//! owns the output sink while the session is open. A [`FilterChain`] stacks
//! engines the way a PDF `/Filter` array does.

pub mod chain;
pub mod engine;
pub mod params;
pub mod sink;

pub use chain::FilterChain;
pub use engine::{FilterEngine, FilterState};
pub use params::{DecodeParms, ParamValue};
pub use sink::{OutputSink, WriteSink};

use crate::error::{PdfError, Result};
use std::fmt;
use std::str::FromStr;

/// The filters this crate implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    RunLength,
    Lzw,
    Ascii85,
    AsciiHex,
    Flate,
    Crypt,
}

impl FilterKind {
    pub const ALL: [FilterKind; 6] = [
        Self::RunLength,
        Self::Lzw,
        Self::Ascii85,
        Self::AsciiHex,
        Self::Flate,
        Self::Crypt,
    ];

    /// PDF filter name, without the leading slash.
    pub fn name(self) -> &'static str {
        match self {
            Self::RunLength => "RunLengthDecode",
            Self::Lzw => "LZWDecode",
            Self::Ascii85 => "ASCII85Decode",
            Self::AsciiHex => "ASCIIHexDecode",
            Self::Flate => "FlateDecode",
            Self::Crypt => "Crypt",
        }
    }

    /// Abbreviation allowed in inline images.
    pub fn abbreviation(self) -> Option<&'static str> {
        match self {
            Self::RunLength => Some("RL"),
            Self::Lzw => Some("LZW"),
            Self::Ascii85 => Some("A85"),
            Self::AsciiHex => Some("AHx"),
            Self::Flate => Some("Fl"),
            Self::Crypt => None,
        }
    }

    /// Look up a filter by full name or abbreviation. A leading `/` is ignored.
    pub fn from_name(name: &str) -> Result<Self> {
        let name = name.strip_prefix('/').unwrap_or(name);
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name || kind.abbreviation() == Some(name))
            .ok_or_else(|| PdfError::config(format!("unsupported filter {name}")))
    }
}

impl FromStr for FilterKind {
    type Err = PdfError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

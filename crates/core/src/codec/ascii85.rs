//! ASCII85 stream encoder and decoder.
//!
//! Handles: z-encoding, <~ ~> markers, whitespace, missing EOD, and groups
//! or markers split across block boundaries.

use super::StreamCodec;
use crate::error::{PdfError, Result};
use crate::filter::sink::put;
use crate::filter::{DecodeParms, OutputSink};

/// End-of-data marker written after the last group.
pub const EOD: &[u8] = b"~>";

const POW85: [u32; 5] = [85 * 85 * 85 * 85, 85 * 85 * 85, 85 * 85, 85, 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    /// Nothing but whitespace seen so far; a `<~` prefix is still allowed.
    Start,
    /// Saw `<` at the start: a `<~` prefix if `~` follows, otherwise the
    /// digit 27.
    Open,
    Body,
    /// Saw `~`, `>` must follow.
    Close,
    Done,
}

/// ASCII85Decode filter.
#[derive(Debug)]
pub struct Ascii85Codec {
    group: [u8; 5],
    len: usize,
    marker: Marker,
}

impl Default for Ascii85Codec {
    fn default() -> Self {
        Self::new()
    }
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c' | b'\x00')
}

/// Encode a 4-byte group into 5 characters.
fn encode_group(bytes: [u8; 4]) -> [u8; 5] {
    let mut value = u32::from_be_bytes(bytes);
    let mut out = [0u8; 5];
    for slot in out.iter_mut().rev() {
        *slot = b'!' + (value % 85) as u8;
        value /= 85;
    }
    out
}

/// Decode 5 digits (already reduced to 0..85) into 4 bytes.
fn decode_group(digits: &[u8; 5]) -> Result<[u8; 4]> {
    let value: u64 = digits
        .iter()
        .zip(POW85)
        .map(|(&d, p)| u64::from(d) * u64::from(p))
        .sum();
    let value = u32::try_from(value)
        .map_err(|_| PdfError::decode("ASCII85 group exceeds 2^32 - 1"))?;
    Ok(value.to_be_bytes())
}

impl Ascii85Codec {
    pub fn new() -> Self {
        Self {
            group: [0; 5],
            len: 0,
            marker: Marker::Start,
        }
    }

    fn flush_partial_decode(&mut self, sink: &mut dyn OutputSink) -> Result<()> {
        match self.len {
            0 => Ok(()),
            1 => Err(PdfError::decode("ASCII85 final group has a single character")),
            n => {
                let mut digits = [84u8; 5];
                digits[..n].copy_from_slice(&self.group[..n]);
                let bytes = decode_group(&digits)?;
                self.len = 0;
                put(sink, &bytes[..n - 1])
            }
        }
    }

    fn push_digit(&mut self, sink: &mut dyn OutputSink, digit: u8) -> Result<()> {
        self.group[self.len] = digit;
        self.len += 1;
        if self.len == 5 {
            let bytes = decode_group(&self.group)?;
            self.len = 0;
            put(sink, &bytes)?;
        }
        Ok(())
    }
}

impl StreamCodec for Ascii85Codec {
    fn begin_encode(&mut self, _sink: &mut dyn OutputSink) -> Result<()> {
        self.len = 0;
        Ok(())
    }

    fn encode_block(&mut self, sink: &mut dyn OutputSink, data: &[u8]) -> Result<()> {
        let mut out = Vec::with_capacity((data.len() + self.len) / 4 * 5 + 5);
        for &byte in data {
            self.group[self.len] = byte;
            self.len += 1;
            if self.len == 4 {
                let bytes = [self.group[0], self.group[1], self.group[2], self.group[3]];
                if bytes == [0; 4] {
                    out.push(b'z');
                } else {
                    out.extend_from_slice(&encode_group(bytes));
                }
                self.len = 0;
            }
        }
        put(sink, &out)
    }

    fn end_encode(&mut self, sink: &mut dyn OutputSink) -> Result<()> {
        if self.len > 0 {
            // A partial group never uses `z`: pad with zeros, keep n + 1 chars.
            let mut bytes = [0u8; 4];
            bytes[..self.len].copy_from_slice(&self.group[..self.len]);
            let chars = encode_group(bytes);
            put(sink, &chars[..self.len + 1])?;
            self.len = 0;
        }
        put(sink, EOD)
    }

    fn begin_decode(&mut self, _sink: &mut dyn OutputSink, _parms: Option<&DecodeParms>) -> Result<()> {
        self.len = 0;
        self.marker = Marker::Start;
        Ok(())
    }

    fn decode_block(&mut self, sink: &mut dyn OutputSink, data: &[u8]) -> Result<()> {
        for &byte in data {
            match self.marker {
                Marker::Done => return Ok(()),
                Marker::Open => {
                    self.marker = Marker::Body;
                    if byte == b'~' {
                        continue;
                    }
                    self.push_digit(sink, b'<' - b'!')?;
                }
                Marker::Close => {
                    if byte != b'>' {
                        return Err(PdfError::decode(format!(
                            "ASCII85 '~' followed by {byte:#04x} instead of '>'"
                        )));
                    }
                    self.marker = Marker::Done;
                    return self.flush_partial_decode(sink);
                }
                Marker::Start | Marker::Body => {}
            }

            if is_whitespace(byte) {
                continue;
            }
            let at_start = self.marker == Marker::Start;
            self.marker = Marker::Body;
            match byte {
                b'<' if at_start => self.marker = Marker::Open,
                b'~' => self.marker = Marker::Close,
                b'z' => {
                    if self.len != 0 {
                        return Err(PdfError::decode("ASCII85 'z' inside a group"));
                    }
                    put(sink, &[0; 4])?;
                }
                b'!'..=b'u' => self.push_digit(sink, byte - b'!')?,
                other => {
                    return Err(PdfError::decode(format!(
                        "invalid ASCII85 character {other:#04x}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn end_decode(&mut self, sink: &mut dyn OutputSink) -> Result<()> {
        match self.marker {
            Marker::Done => Ok(()),
            Marker::Open => {
                self.marker = Marker::Done;
                self.push_digit(sink, b'<' - b'!')?;
                self.flush_partial_decode(sink)
            }
            // Missing or partial `~>` is tolerated.
            Marker::Start | Marker::Body | Marker::Close => {
                self.marker = Marker::Done;
                self.flush_partial_decode(sink)
            }
        }
    }
}

/// Decode ASCII85-encoded data (PDF variant) in one call.
pub fn ascii85decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut codec = Ascii85Codec::new();
    let mut out = Vec::with_capacity(data.len() / 5 * 4 + 4);
    codec.begin_decode(&mut out, None)?;
    codec.decode_block(&mut out, data)?;
    codec.end_decode(&mut out)?;
    Ok(out)
}

/// Encode data as ASCII85 in one call, terminated by `~>`.
pub fn ascii85encode(data: &[u8]) -> Result<Vec<u8>> {
    let mut codec = Ascii85Codec::new();
    let mut out = Vec::with_capacity(data.len() / 4 * 5 + 7);
    codec.begin_encode(&mut out)?;
    codec.encode_block(&mut out, data)?;
    codec.end_encode(&mut out)?;
    Ok(out)
}

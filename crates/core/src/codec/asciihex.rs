//! ASCIIHex stream encoder and decoder.

use super::StreamCodec;
use crate::error::{PdfError, Result};
use crate::filter::sink::put;
use crate::filter::{DecodeParms, OutputSink};

/// ASCIIHexDecode filter.
#[derive(Debug, Default)]
pub struct AsciiHexCodec {
    /// High nibble waiting for its partner.
    pending: Option<u8>,
    done: bool,
}

fn hex_nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

impl AsciiHexCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamCodec for AsciiHexCodec {
    fn encode_block(&mut self, sink: &mut dyn OutputSink, data: &[u8]) -> Result<()> {
        put(sink, hex::encode_upper(data).as_bytes())
    }

    fn end_encode(&mut self, sink: &mut dyn OutputSink) -> Result<()> {
        put(sink, b">")
    }

    fn begin_decode(&mut self, _sink: &mut dyn OutputSink, _parms: Option<&DecodeParms>) -> Result<()> {
        self.pending = None;
        self.done = false;
        Ok(())
    }

    fn decode_block(&mut self, sink: &mut dyn OutputSink, data: &[u8]) -> Result<()> {
        if self.done {
            return Ok(());
        }
        let mut out = Vec::with_capacity(data.len() / 2 + 1);
        for &byte in data {
            if let Some(nibble) = hex_nibble(byte) {
                match self.pending.take() {
                    Some(high) => out.push((high << 4) | nibble),
                    None => self.pending = Some(nibble),
                }
                continue;
            }
            match byte {
                b' ' | b'\t' | b'\n' | b'\r' | b'\x0c' | b'\x00' => {}
                b'>' => {
                    self.done = true;
                    break;
                }
                other => {
                    return Err(PdfError::decode(format!(
                        "invalid ASCIIHex character {other:#04x}"
                    )));
                }
            }
        }
        put(sink, &out)
    }

    fn end_decode(&mut self, sink: &mut dyn OutputSink) -> Result<()> {
        // An odd trailing digit behaves as if followed by 0.
        if let Some(high) = self.pending.take() {
            put(sink, &[high << 4])?;
        }
        self.done = true;
        Ok(())
    }
}

/// Decode ASCIIHex-encoded data in one call.
pub fn asciihexdecode(data: &[u8]) -> Result<Vec<u8>> {
    let mut codec = AsciiHexCodec::new();
    let mut out = Vec::with_capacity(data.len() / 2);
    codec.begin_decode(&mut out, None)?;
    codec.decode_block(&mut out, data)?;
    codec.end_decode(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_mixed_case_with_whitespace() {
        assert_eq!(
            asciihexdecode(b"61 62 2e6364   65>").unwrap(),
            b"ab.cde"
        );
    }

    #[test]
    fn odd_digit_is_padded() {
        assert_eq!(asciihexdecode(b"61 62 2e6364   657>").unwrap(), b"ab.cdep");
    }

    #[test]
    fn decode_stops_at_eod() {
        assert_eq!(asciihexdecode(b"7>junk").unwrap(), b"p");
    }

    #[test]
    fn invalid_digit_is_error() {
        assert!(asciihexdecode(b"6G>").unwrap_err().is_decode());
    }

    #[test]
    fn encode_uppercase_with_eod() {
        let mut codec = AsciiHexCodec::new();
        let mut out = Vec::new();
        codec.begin_encode(&mut out).unwrap();
        codec.encode_block(&mut out, b"\x01\xab").unwrap();
        codec.end_encode(&mut out).unwrap();
        assert_eq!(out, b"01AB>");
    }
}

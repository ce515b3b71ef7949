//! RunLength stream encoder and decoder.
//!
//! Format:
//! - Length byte 0-127: Copy next (length + 1) bytes literally
//! - Length byte 128: End of data (EOD marker)
//! - Length byte 129-255: Repeat next byte (257 - length) times

use super::StreamCodec;
use crate::error::{PdfError, Result};
use crate::filter::sink::put;
use crate::filter::{DecodeParms, OutputSink};

/// End-of-data marker.
pub const EOD: u8 = 128;

/// Longest literal or repeat record.
pub const MAX_RUN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Expecting a length byte.
    Header,
    /// Copying this many more literal bytes.
    Literal(usize),
    /// Waiting for the byte to repeat this many times.
    Repeat(usize),
    /// EOD seen; remaining input is ignored.
    Done,
}

/// RunLengthDecode filter.
#[derive(Debug)]
pub struct RunLengthCodec {
    literal: Vec<u8>,
    run_byte: u8,
    run_len: usize,
    state: DecodeState,
}

impl Default for RunLengthCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLengthCodec {
    pub fn new() -> Self {
        Self {
            literal: Vec::with_capacity(MAX_RUN),
            run_byte: 0,
            run_len: 0,
            state: DecodeState::Header,
        }
    }

    fn flush_literal(&mut self, sink: &mut dyn OutputSink) -> Result<()> {
        if self.literal.is_empty() {
            return Ok(());
        }
        put(sink, &[(self.literal.len() - 1) as u8])?;
        put(sink, &self.literal)?;
        self.literal.clear();
        Ok(())
    }

    /// Close the pending run: two or more bytes become a repeat record,
    /// a single byte joins the literal buffer.
    fn close_run(&mut self, sink: &mut dyn OutputSink) -> Result<()> {
        match self.run_len {
            0 => {}
            1 => {
                if self.literal.len() == MAX_RUN {
                    self.flush_literal(sink)?;
                }
                self.literal.push(self.run_byte);
            }
            n => {
                self.flush_literal(sink)?;
                put(sink, &[(257 - n) as u8, self.run_byte])?;
            }
        }
        self.run_len = 0;
        Ok(())
    }
}

impl StreamCodec for RunLengthCodec {
    fn begin_encode(&mut self, _sink: &mut dyn OutputSink) -> Result<()> {
        self.literal.clear();
        self.run_len = 0;
        Ok(())
    }

    fn encode_block(&mut self, sink: &mut dyn OutputSink, data: &[u8]) -> Result<()> {
        for &byte in data {
            if self.run_len > 0 && byte == self.run_byte && self.run_len < MAX_RUN {
                self.run_len += 1;
                continue;
            }
            self.close_run(sink)?;
            self.run_byte = byte;
            self.run_len = 1;
        }
        Ok(())
    }

    fn end_encode(&mut self, sink: &mut dyn OutputSink) -> Result<()> {
        self.close_run(sink)?;
        self.flush_literal(sink)?;
        put(sink, &[EOD])
    }

    fn begin_decode(&mut self, _sink: &mut dyn OutputSink, _parms: Option<&DecodeParms>) -> Result<()> {
        self.state = DecodeState::Header;
        Ok(())
    }

    fn decode_block(&mut self, sink: &mut dyn OutputSink, data: &[u8]) -> Result<()> {
        let mut i = 0;
        while i < data.len() {
            match self.state {
                DecodeState::Done => return Ok(()),
                DecodeState::Header => {
                    let length = data[i];
                    i += 1;
                    self.state = match length {
                        EOD => DecodeState::Done,
                        0..=127 => DecodeState::Literal(length as usize + 1),
                        129..=255 => DecodeState::Repeat(257 - length as usize),
                    };
                }
                DecodeState::Literal(remaining) => {
                    let take = remaining.min(data.len() - i);
                    put(sink, &data[i..i + take])?;
                    i += take;
                    self.state = if take == remaining {
                        DecodeState::Header
                    } else {
                        DecodeState::Literal(remaining - take)
                    };
                }
                DecodeState::Repeat(count) => {
                    let run = [data[i]; MAX_RUN];
                    i += 1;
                    put(sink, &run[..count])?;
                    self.state = DecodeState::Header;
                }
            }
        }
        Ok(())
    }

    fn end_decode(&mut self, _sink: &mut dyn OutputSink) -> Result<()> {
        match self.state {
            DecodeState::Header | DecodeState::Done => Ok(()),
            DecodeState::Literal(remaining) => Err(PdfError::decode(format!(
                "RunLength literal record truncated, {remaining} bytes missing"
            ))),
            DecodeState::Repeat(_) => Err(PdfError::decode(
                "RunLength repeat record truncated before its byte",
            )),
        }
    }
}

/// Decode RunLength-encoded data in one call.
pub fn rldecode(data: &[u8]) -> Result<Vec<u8>> {
    let mut codec = RunLengthCodec::new();
    let mut out = Vec::with_capacity(data.len() * 2);
    codec.begin_decode(&mut out, None)?;
    codec.decode_block(&mut out, data)?;
    codec.end_decode(&mut out)?;
    Ok(out)
}

/// Encode data with RunLength in one call.
pub fn rlencode(data: &[u8]) -> Result<Vec<u8>> {
    let mut codec = RunLengthCodec::new();
    let mut out = Vec::with_capacity(data.len() + data.len() / MAX_RUN + 2);
    codec.begin_encode(&mut out)?;
    codec.encode_block(&mut out, data)?;
    codec.end_encode(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rldecode_pdfminer_vector() {
        let input = b"\x05123456\xfa7\x04abcde\x80junk";
        assert_eq!(rldecode(input).unwrap(), b"1234567777777abcde");
    }

    #[test]
    fn rlencode_mixed_literal_and_run() {
        let encoded = rlencode(b"abcXXXXd").unwrap();
        assert_eq!(encoded, b"\x02abc\xfdX\x00d\x80");
    }

    #[test]
    fn rlencode_empty_is_just_eod() {
        assert_eq!(rlencode(b"").unwrap(), vec![EOD]);
    }

    #[test]
    fn run_of_max_length_is_one_record() {
        let encoded = rlencode(&[7u8; MAX_RUN]).unwrap();
        assert_eq!(encoded, vec![129, 7, EOD]);
    }

    #[test]
    fn run_of_130_splits_at_boundary() {
        let data = [0xAAu8; 130];
        let encoded = rlencode(&data).unwrap();
        assert_eq!(encoded, vec![129, 0xAA, 255, 0xAA, EOD]);
        assert_eq!(rldecode(&encoded).unwrap(), data);
    }

    #[test]
    fn long_literal_splits_at_128() {
        let data: Vec<u8> = (0..=255u8).cycle().take(300).collect();
        let encoded = rlencode(&data).unwrap();
        assert_eq!(encoded[0], 127);
        assert_eq!(rldecode(&encoded).unwrap(), data);
    }

    #[test]
    fn truncated_literal_is_error() {
        assert!(rldecode(b"\x05abc").unwrap_err().is_decode());
    }

    #[test]
    fn truncated_repeat_is_error() {
        assert!(rldecode(b"\x00a\xfe").unwrap_err().is_decode());
    }

    #[test]
    fn missing_eod_is_accepted() {
        assert_eq!(rldecode(b"\x01ab").unwrap(), b"ab");
    }

    #[test]
    fn records_may_straddle_blocks() {
        let encoded = b"\x05123456\xfa7\x80";
        let mut codec = RunLengthCodec::new();
        let mut out = Vec::new();
        codec.begin_decode(&mut out, None).unwrap();
        for byte in encoded.iter() {
            codec.decode_block(&mut out, std::slice::from_ref(byte)).unwrap();
        }
        codec.end_decode(&mut out).unwrap();
        assert_eq!(out, b"1234567777777");
    }
}

//! LZW stream encoder and decoder using the weezl crate.
//!
//! PDF variant: MSB-first codes, 8-bit literals, clear code 256, EOD 257,
//! code width growing from 9 to 12 bits. `EarlyChange` = 1 (the default)
//! switches code width one code early.

use super::StreamCodec;
use super::predictor::PredictorDecoder;
use crate::error::{PdfError, Result};
use crate::filter::sink::put;
use crate::filter::{DecodeParms, OutputSink};
use weezl::{BitOrder, BufferResult, LzwStatus, decode::Decoder, encode::Encoder};

const CHUNK: usize = 4096;

fn make_decoder(early_change: bool) -> Decoder {
    if early_change {
        Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
    } else {
        Decoder::new(BitOrder::Msb, 8)
    }
}

fn make_encoder(early_change: bool) -> Encoder {
    if early_change {
        Encoder::with_tiff_size_switch(BitOrder::Msb, 8)
    } else {
        Encoder::new(BitOrder::Msb, 8)
    }
}

/// LZWDecode filter.
pub struct LzwCodec {
    early_change: bool,
    encoder: Option<Encoder>,
    decoder: Option<Decoder>,
    predictor: Option<PredictorDecoder>,
    /// EOD code seen while decoding.
    finished: bool,
    buf: Box<[u8; CHUNK]>,
}

impl Default for LzwCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LzwCodec {
    pub fn new() -> Self {
        Self::with_early_change(true)
    }

    /// Encoder setting; decoding takes `/EarlyChange` from the parameters.
    pub fn with_early_change(early_change: bool) -> Self {
        Self {
            early_change,
            encoder: None,
            decoder: None,
            predictor: None,
            finished: false,
            buf: Box::new([0u8; CHUNK]),
        }
    }

    fn emit_decoded(&mut self, sink: &mut dyn OutputSink, len: usize) -> Result<()> {
        let chunk = &self.buf[..len];
        match self.predictor.as_mut() {
            Some(predictor) => predictor.push(sink, chunk),
            None => put(sink, chunk),
        }
    }
}

fn lzw_error(result: &BufferResult) -> Option<PdfError> {
    result
        .status
        .as_ref()
        .err()
        .map(|e| PdfError::decode(format!("LZW: {e}")))
}

impl StreamCodec for LzwCodec {
    fn begin_encode(&mut self, _sink: &mut dyn OutputSink) -> Result<()> {
        self.encoder = Some(make_encoder(self.early_change));
        Ok(())
    }

    fn encode_block(&mut self, sink: &mut dyn OutputSink, mut data: &[u8]) -> Result<()> {
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| PdfError::usage("LZW encoder not started"))?;
        while !data.is_empty() {
            let result = encoder.encode_bytes(data, &mut self.buf[..]);
            if let Some(err) = lzw_error(&result) {
                return Err(err);
            }
            put(sink, &self.buf[..result.consumed_out])?;
            data = &data[result.consumed_in..];
        }
        Ok(())
    }

    fn end_encode(&mut self, sink: &mut dyn OutputSink) -> Result<()> {
        let mut encoder = self
            .encoder
            .take()
            .ok_or_else(|| PdfError::usage("LZW encoder not started"))?;
        encoder.finish();
        loop {
            let result = encoder.encode_bytes(&[], &mut self.buf[..]);
            if let Some(err) = lzw_error(&result) {
                return Err(err);
            }
            put(sink, &self.buf[..result.consumed_out])?;
            match result.status {
                Ok(LzwStatus::Done) => return Ok(()),
                Ok(LzwStatus::NoProgress) if result.consumed_out == 0 => {
                    return Err(PdfError::engine("LZW encoder stalled while finishing"));
                }
                _ => {}
            }
        }
    }

    fn begin_decode(&mut self, _sink: &mut dyn OutputSink, parms: Option<&DecodeParms>) -> Result<()> {
        let early_change = match parms {
            Some(p) => p.int_or("EarlyChange", 1)? != 0,
            None => true,
        };
        self.predictor = PredictorDecoder::from_parms(parms)?;
        self.decoder = Some(make_decoder(early_change));
        self.finished = false;
        Ok(())
    }

    fn decode_block(&mut self, sink: &mut dyn OutputSink, mut data: &[u8]) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        loop {
            let decoder = self
                .decoder
                .as_mut()
                .ok_or_else(|| PdfError::usage("LZW decoder not started"))?;
            let result = decoder.decode_bytes(data, &mut self.buf[..]);
            if let Some(err) = lzw_error(&result) {
                return Err(err);
            }
            self.emit_decoded(sink, result.consumed_out)?;
            data = &data[result.consumed_in..];
            if matches!(result.status, Ok(LzwStatus::Done)) {
                self.finished = true;
                return Ok(());
            }
            if result.consumed_in == 0 && result.consumed_out == 0 {
                return Ok(());
            }
            if data.is_empty() && result.consumed_out < CHUNK {
                return Ok(());
            }
        }
    }

    fn end_decode(&mut self, sink: &mut dyn OutputSink) -> Result<()> {
        // Drain codes that were buffered but not yet expanded.
        self.decode_block(sink, &[])?;
        self.decoder = None;
        if !self.finished {
            return Err(PdfError::decode("LZW stream ended before EOD code"));
        }
        if let Some(predictor) = self.predictor.as_mut() {
            predictor.finish(sink)?;
        }
        Ok(())
    }
}

/// Decode LZW-encoded data (PDF variant: MSB first, 8-bit, EarlyChange=1).
pub fn lzwdecode(data: &[u8]) -> Result<Vec<u8>> {
    lzwdecode_with_earlychange(data, 1)
}

/// Decode LZW-encoded data with an explicit EarlyChange setting.
pub fn lzwdecode_with_earlychange(data: &[u8], early_change: i64) -> Result<Vec<u8>> {
    let parms = DecodeParms::new().with_int("EarlyChange", early_change);
    let mut codec = LzwCodec::new();
    let mut out = Vec::new();
    codec.begin_decode(&mut out, Some(&parms))?;
    codec.decode_block(&mut out, data)?;
    codec.end_decode(&mut out)?;
    Ok(out)
}

//! FlateDecode: zlib deflate/inflate via flate2's streaming API.

use super::StreamCodec;
use super::predictor::PredictorDecoder;
use crate::error::{PdfError, Result};
use crate::filter::sink::put;
use crate::filter::{DecodeParms, OutputSink};
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

const CHUNK: usize = 8192;

/// FlateDecode filter.
pub struct FlateCodec {
    level: Compression,
    compress: Option<Compress>,
    decompress: Option<Decompress>,
    predictor: Option<PredictorDecoder>,
    /// zlib stream end seen while decoding.
    finished: bool,
    buf: Vec<u8>,
}

impl Default for FlateCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FlateCodec {
    pub fn new() -> Self {
        Self::with_level(Compression::default())
    }

    /// Codec compressing at `level` (0-9).
    pub fn with_level(level: Compression) -> Self {
        Self {
            level,
            compress: None,
            decompress: None,
            predictor: None,
            finished: false,
            buf: vec![0u8; CHUNK],
        }
    }

    fn run_compress(&mut self, sink: &mut dyn OutputSink, mut data: &[u8], flush: FlushCompress) -> Result<()> {
        let compress = self
            .compress
            .as_mut()
            .ok_or_else(|| PdfError::usage("Flate encoder not started"))?;
        loop {
            let before_in = compress.total_in();
            let before_out = compress.total_out();
            let status = compress
                .compress(data, &mut self.buf, flush)
                .map_err(|e| PdfError::engine(format!("deflate failed: {e}")))?;
            let consumed = (compress.total_in() - before_in) as usize;
            let produced = (compress.total_out() - before_out) as usize;
            put(sink, &self.buf[..produced])?;
            data = &data[consumed..];
            match status {
                Status::StreamEnd => return Ok(()),
                Status::Ok | Status::BufError => {
                    let drained = produced < self.buf.len();
                    if matches!(flush, FlushCompress::None) && data.is_empty() && drained {
                        return Ok(());
                    }
                    if consumed == 0 && produced == 0 {
                        return Err(PdfError::engine("deflate made no progress"));
                    }
                }
            }
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

impl StreamCodec for FlateCodec {
    fn begin_encode(&mut self, _sink: &mut dyn OutputSink) -> Result<()> {
        self.compress = Some(Compress::new(self.level, true));
        Ok(())
    }

    fn encode_block(&mut self, sink: &mut dyn OutputSink, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.run_compress(sink, data, FlushCompress::None)
    }

    fn end_encode(&mut self, sink: &mut dyn OutputSink) -> Result<()> {
        self.run_compress(sink, &[], FlushCompress::Finish)?;
        self.compress = None;
        Ok(())
    }

    fn begin_decode(&mut self, _sink: &mut dyn OutputSink, parms: Option<&DecodeParms>) -> Result<()> {
        self.predictor = PredictorDecoder::from_parms(parms)?;
        self.decompress = Some(Decompress::new(true));
        self.finished = false;
        Ok(())
    }

    fn decode_block(&mut self, sink: &mut dyn OutputSink, mut data: &[u8]) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        loop {
            let decompress = self
                .decompress
                .as_mut()
                .ok_or_else(|| PdfError::usage("Flate decoder not started"))?;
            let before_in = decompress.total_in();
            let before_out = decompress.total_out();
            let status = decompress
                .decompress(data, &mut self.buf, FlushDecompress::None)
                .map_err(|e| PdfError::decode(format!("corrupt deflate stream: {e}")))?;
            let consumed = (decompress.total_in() - before_in) as usize;
            let produced = (decompress.total_out() - before_out) as usize;
            self.emit_decoded(sink, produced)?;
            data = &data[consumed..];
            match status {
                Status::StreamEnd => {
                    self.finished = true;
                    return Ok(());
                }
                Status::Ok | Status::BufError => {
                    if consumed == 0 && produced == 0 {
                        return Ok(());
                    }
                    if data.is_empty() && produced < self.buf.len() {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn end_decode(&mut self, sink: &mut dyn OutputSink) -> Result<()> {
        self.decode_block(sink, &[])?;
        self.decompress = None;
        if !self.finished {
            return Err(PdfError::decode("deflate stream truncated before end marker"));
        }
        if let Some(predictor) = self.predictor.as_mut() {
            predictor.finish(sink)?;
        }
        Ok(())
    }
}

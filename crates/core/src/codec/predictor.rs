//! PNG and TIFF predictors applied to Flate/LZW decode output.
//!
//! Rows may arrive split across any number of blocks, so the decoder keeps
//! the partially filled row and the previous row between calls.

use crate::error::{PdfError, Result};
use crate::filter::DecodeParms;
use crate::filter::sink::{OutputSink, put};

/// Upper bound on one predictor row, in bytes.
pub const MAX_ROW_BYTES: usize = 1 << 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheme {
    /// TIFF Predictor 2 (horizontal differencing).
    Tiff,
    /// PNG predictors 10-15; every row carries its own filter byte.
    Png,
}

/// Streaming predictor decoder.
#[derive(Debug)]
pub struct PredictorDecoder {
    scheme: Scheme,
    bits_per_component: usize,
    colors: usize,
    /// Bytes per row, excluding the PNG filter byte.
    row_bytes: usize,
    /// Bytes per pixel, at least 1.
    bpp: usize,
    /// Last completed row, already un-predicted.
    prev: Vec<u8>,
    cur: Vec<u8>,
    pending: Vec<u8>,
}

impl PredictorDecoder {
    /// Build a decoder from `/Predictor`, `/Colors`, `/BitsPerComponent`
    /// and `/Columns`. Returns `None` when no prediction is requested.
    pub fn from_parms(parms: Option<&DecodeParms>) -> Result<Option<Self>> {
        let Some(parms) = parms else {
            return Ok(None);
        };
        let predictor = parms.int_or("Predictor", 1)?;
        let scheme = match predictor {
            1 => return Ok(None),
            2 => Scheme::Tiff,
            10..=15 => Scheme::Png,
            other => {
                return Err(PdfError::config(format!("unsupported predictor {other}")));
            }
        };
        let colors = positive(parms.int_or("Colors", 1)?, "Colors")?;
        let bits = positive(parms.int_or("BitsPerComponent", 8)?, "BitsPerComponent")?;
        let columns = positive(parms.int_or("Columns", 1)?, "Columns")?;
        Self::new(scheme == Scheme::Png, colors, bits, columns).map(Some)
    }

    fn new(png: bool, colors: usize, bits_per_component: usize, columns: usize) -> Result<Self> {
        if !matches!(bits_per_component, 1 | 2 | 4 | 8 | 16) {
            return Err(PdfError::config(format!(
                "unsupported BitsPerComponent {bits_per_component}"
            )));
        }
        if !png && !matches!(bits_per_component, 8 | 16) {
            return Err(PdfError::config(format!(
                "TIFF predictor supports 8 or 16 bits per component, got {bits_per_component}"
            )));
        }
        let row_bits = colors
            .checked_mul(bits_per_component)
            .and_then(|v| v.checked_mul(columns))
            .ok_or_else(|| PdfError::config("predictor row size overflows"))?;
        let row_bytes = row_bits.div_ceil(8);
        if row_bytes > MAX_ROW_BYTES {
            return Err(PdfError::config(format!(
                "predictor row of {row_bytes} bytes exceeds {MAX_ROW_BYTES}"
            )));
        }
        let bpp = std::cmp::max(1, colors * bits_per_component / 8);
        Ok(Self {
            scheme: if png { Scheme::Png } else { Scheme::Tiff },
            bits_per_component,
            colors,
            row_bytes,
            bpp,
            prev: vec![0u8; row_bytes],
            cur: vec![0u8; row_bytes],
            pending: Vec::with_capacity(row_bytes + 1),
        })
    }

    fn row_size(&self) -> usize {
        match self.scheme {
            Scheme::Png => self.row_bytes + 1,
            Scheme::Tiff => self.row_bytes,
        }
    }

    /// Feed decoded bytes; every completed row is written to `sink`.
    pub fn push(&mut self, sink: &mut dyn OutputSink, mut data: &[u8]) -> Result<()> {
        let row_size = self.row_size();
        while !data.is_empty() {
            let take = (row_size - self.pending.len()).min(data.len());
            self.pending.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.pending.len() == row_size {
                match self.scheme {
                    Scheme::Png => self.finish_png_row()?,
                    Scheme::Tiff => self.finish_tiff_row(),
                }
                put(sink, &self.prev)?;
                self.pending.clear();
            }
        }
        Ok(())
    }

    /// End of input. An incomplete trailing row is dropped.
    pub fn finish(&mut self, _sink: &mut dyn OutputSink) -> Result<()> {
        if !self.pending.is_empty() {
            tracing::debug!(
                dropped = self.pending.len(),
                "predictor dropped incomplete trailing row"
            );
            self.pending.clear();
        }
        Ok(())
    }

    /// Reverse the PNG row filter of `pending` into `cur`, using `prev` as
    /// the row above.
    fn finish_png_row(&mut self) -> Result<()> {
        let bpp = self.bpp;
        let filter_type = self.pending[0];
        let row = &self.pending[1..];
        let prev = &self.prev;
        let cur = &mut self.cur;
        match filter_type {
            0 => cur.copy_from_slice(row),
            1 => {
                for i in 0..row.len() {
                    let left = if i >= bpp { cur[i - bpp] } else { 0 };
                    cur[i] = row[i].wrapping_add(left);
                }
            }
            2 => {
                for i in 0..row.len() {
                    cur[i] = row[i].wrapping_add(prev[i]);
                }
            }
            3 => {
                for i in 0..row.len() {
                    let left = if i >= bpp { cur[i - bpp] as u16 } else { 0 };
                    let above = prev[i] as u16;
                    cur[i] = row[i].wrapping_add(((left + above) / 2) as u8);
                }
            }
            4 => {
                for i in 0..row.len() {
                    let left = if i >= bpp { cur[i - bpp] } else { 0 };
                    let above = prev[i];
                    let upper_left = if i >= bpp { prev[i - bpp] } else { 0 };
                    cur[i] = row[i].wrapping_add(paeth_predictor(left, above, upper_left));
                }
            }
            other => {
                return Err(PdfError::decode(format!("invalid PNG row filter {other}")));
            }
        }
        std::mem::swap(&mut self.prev, &mut self.cur);
        Ok(())
    }

    /// Undo TIFF horizontal differencing of `pending` into `prev`.
    fn finish_tiff_row(&mut self) {
        let colors = self.colors;
        let row = &mut self.pending;
        match self.bits_per_component {
            8 => {
                for i in colors..row.len() {
                    row[i] = row[i].wrapping_add(row[i - colors]);
                }
            }
            _ => {
                let stride = colors * 2;
                let mut i = stride;
                while i + 1 < row.len() {
                    let left = u16::from_be_bytes([row[i - stride], row[i - stride + 1]]);
                    let cur = u16::from_be_bytes([row[i], row[i + 1]]);
                    let value = cur.wrapping_add(left).to_be_bytes();
                    row[i] = value[0];
                    row[i + 1] = value[1];
                    i += 2;
                }
            }
        }
        self.prev.copy_from_slice(row);
    }
}

fn positive(value: i64, key: &str) -> Result<usize> {
    usize::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| PdfError::config(format!("decode parameter {key} must be positive")))
}

/// Paeth predictor function used in PNG filtering.
const fn paeth_predictor(left: u8, above: u8, upper_left: u8) -> u8 {
    let a = left as i32;
    let b = above as i32;
    let c = upper_left as i32;
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();

    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        upper_left
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(parms: &DecodeParms, data: &[u8]) -> Result<Vec<u8>> {
        let mut predictor = PredictorDecoder::from_parms(Some(parms))?.expect("predictor");
        let mut out = Vec::new();
        predictor.push(&mut out, data)?;
        predictor.finish(&mut out)?;
        Ok(out)
    }

    fn png(columns: i64) -> DecodeParms {
        DecodeParms::new()
            .with_int("Predictor", 12)
            .with_int("Columns", columns)
    }

    #[test]
    fn predictor_1_is_passthrough() {
        let parms = DecodeParms::new().with_int("Predictor", 1);
        assert!(PredictorDecoder::from_parms(Some(&parms)).unwrap().is_none());
        assert!(PredictorDecoder::from_parms(None).unwrap().is_none());
    }

    #[test]
    fn png_up_rows() {
        let data = [2, 1, 2, 3, 4, 2, 1, 1, 1, 1];
        assert_eq!(run(&png(4), &data).unwrap(), [1, 2, 3, 4, 2, 3, 4, 5]);
    }

    #[test]
    fn png_sub_average_and_none() {
        let data = [0, 10, 20, 1, 5, 5, 3, 4, 4];
        // Row 1 none: [10, 20]. Row 2 sub: [5, 10]. Row 3 average with above [5, 10]:
        // first = 4 + (0 + 5) / 2 = 6, second = 4 + (6 + 10) / 2 = 12.
        assert_eq!(run(&png(2), &data).unwrap(), [10, 20, 5, 10, 6, 12]);
    }

    #[test]
    fn png_paeth_matches_reference() {
        // Row 1 none [1, 2, 3]; row 2 paeth with zero residuals copies the
        // predictor: first byte picks above (1), then left wins each time.
        let data = [0, 1, 2, 3, 4, 0, 0, 0];
        let out = run(&png(3), &data).unwrap();
        assert_eq!(&out[..3], &[1, 2, 3]);
        let mut expected = Vec::new();
        let above = [1u8, 2, 3];
        let mut row = [0u8; 3];
        for i in 0..3 {
            let left = if i > 0 { row[i - 1] } else { 0 };
            let ul = if i > 0 { above[i - 1] } else { 0 };
            row[i] = paeth_predictor(left, above[i], ul);
        }
        expected.extend_from_slice(&row);
        assert_eq!(&out[3..], &expected[..]);
    }

    #[test]
    fn rows_split_across_pushes() {
        let data = [2, 1, 2, 3, 4, 2, 1, 1, 1, 1];
        let mut predictor = PredictorDecoder::from_parms(Some(&png(4))).unwrap().unwrap();
        let mut out = Vec::new();
        for chunk in data.chunks(3) {
            predictor.push(&mut out, chunk).unwrap();
        }
        predictor.finish(&mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4, 2, 3, 4, 5]);
    }

    #[test]
    fn incomplete_row_is_dropped() {
        let data = [0, 1, 2, 0, 9];
        assert_eq!(run(&png(2), &data).unwrap(), [1, 2]);
    }

    #[test]
    fn invalid_png_filter_is_decode_error() {
        assert!(run(&png(2), &[7, 1, 2]).unwrap_err().is_decode());
    }

    #[test]
    fn tiff_8bit_rgb() {
        let parms = DecodeParms::new()
            .with_int("Predictor", 2)
            .with_int("Colors", 3)
            .with_int("Columns", 2);
        let data = [10, 20, 30, 1, 2, 3];
        assert_eq!(run(&parms, &data).unwrap(), [10, 20, 30, 11, 22, 33]);
    }

    #[test]
    fn tiff_16bit_gray() {
        let parms = DecodeParms::new()
            .with_int("Predictor", 2)
            .with_int("BitsPerComponent", 16)
            .with_int("Columns", 2);
        let data = [0x01, 0xFF, 0x00, 0x02];
        assert_eq!(run(&parms, &data).unwrap(), [0x01, 0xFF, 0x02, 0x01]);
    }

    #[test]
    fn unsupported_predictor_is_config_error() {
        let parms = DecodeParms::new().with_int("Predictor", 5);
        assert!(
            PredictorDecoder::from_parms(Some(&parms))
                .unwrap_err()
                .is_configuration()
        );
    }

    #[test]
    fn oversized_row_is_config_error() {
        let parms = png(1 << 46);
        assert!(
            PredictorDecoder::from_parms(Some(&parms))
                .unwrap_err()
                .is_configuration()
        );
        let parms = DecodeParms::new()
            .with_int("Predictor", 2)
            .with_int("Colors", 4)
            .with_int("BitsPerComponent", 16)
            .with_int("Columns", 1 << 22);
        assert!(PredictorDecoder::from_parms(Some(&parms)).is_err());
    }
}

//! Codec modules for PDF stream compression, text encoding and encryption.
//!
//! This module contains:
//! - `runlength`: RunLength encoding/decoding
//! - `lzw`: LZW encoding/decoding
//! - `ascii85`: ASCII85 encoding/decoding
//! - `asciihex`: ASCIIHex encoding/decoding
//! - `flate`: zlib deflate/inflate
//! - `crypt`: RC4 / AES-CBC crypt filter
//! - `predictor`: PNG and TIFF predictors applied after decoding
//! - `arcfour`, `aes`: cipher primitives used by `crypt`
//!
//! Every codec implements [`StreamCodec`]; [`Codec`] is the closed set the
//! filter engine dispatches over.

pub mod aes;
pub mod arcfour;
pub mod ascii85;
pub mod asciihex;
pub mod crypt;
pub mod flate;
pub mod lzw;
pub mod predictor;
pub mod runlength;

pub use ascii85::Ascii85Codec;
pub use asciihex::AsciiHexCodec;
pub use crypt::CryptCodec;
pub use flate::FlateCodec;
pub use lzw::LzwCodec;
pub use runlength::RunLengthCodec;

use crate::error::{PdfError, Result};
use crate::filter::{DecodeParms, FilterKind, OutputSink};

/// Encode/decode hooks of one filter algorithm.
///
/// The filter engine guarantees the call order: a `begin_*` hook, any
/// number of `*_block` hooks, then the matching `end_*` hook. A codec must
/// reset its state in `begin_*`, must copy whatever it keeps from a block,
/// and must have written everything to the sink when `end_*` returns.
pub trait StreamCodec {
    fn can_encode(&self) -> bool {
        true
    }

    fn can_decode(&self) -> bool {
        true
    }

    fn begin_encode(&mut self, _sink: &mut dyn OutputSink) -> Result<()> {
        Ok(())
    }

    fn encode_block(&mut self, sink: &mut dyn OutputSink, data: &[u8]) -> Result<()>;

    fn end_encode(&mut self, _sink: &mut dyn OutputSink) -> Result<()> {
        Ok(())
    }

    fn begin_decode(
        &mut self,
        _sink: &mut dyn OutputSink,
        _parms: Option<&DecodeParms>,
    ) -> Result<()> {
        Ok(())
    }

    fn decode_block(&mut self, sink: &mut dyn OutputSink, data: &[u8]) -> Result<()>;

    fn end_decode(&mut self, _sink: &mut dyn OutputSink) -> Result<()> {
        Ok(())
    }
}

/// A codec tagged with its filter kind.
pub enum Codec {
    RunLength(RunLengthCodec),
    Lzw(LzwCodec),
    Ascii85(Ascii85Codec),
    AsciiHex(AsciiHexCodec),
    Flate(FlateCodec),
    Crypt(CryptCodec),
}

impl Codec {
    /// Default codec for `kind`.
    ///
    /// `Crypt` needs key material and a crypto context, so it has to be
    /// built with [`CryptCodec::new`] instead.
    pub fn for_kind(kind: FilterKind) -> Result<Self> {
        Ok(match kind {
            FilterKind::RunLength => Self::RunLength(RunLengthCodec::new()),
            FilterKind::Lzw => Self::Lzw(LzwCodec::new()),
            FilterKind::Ascii85 => Self::Ascii85(Ascii85Codec::new()),
            FilterKind::AsciiHex => Self::AsciiHex(AsciiHexCodec::new()),
            FilterKind::Flate => Self::Flate(FlateCodec::new()),
            FilterKind::Crypt => {
                return Err(PdfError::config(
                    "Crypt filter requires key material; build it with CryptCodec::new",
                ));
            }
        })
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Self::RunLength(_) => FilterKind::RunLength,
            Self::Lzw(_) => FilterKind::Lzw,
            Self::Ascii85(_) => FilterKind::Ascii85,
            Self::AsciiHex(_) => FilterKind::AsciiHex,
            Self::Flate(_) => FilterKind::Flate,
            Self::Crypt(_) => FilterKind::Crypt,
        }
    }

    fn inner(&self) -> &dyn StreamCodec {
        match self {
            Self::RunLength(c) => c,
            Self::Lzw(c) => c,
            Self::Ascii85(c) => c,
            Self::AsciiHex(c) => c,
            Self::Flate(c) => c,
            Self::Crypt(c) => c,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn StreamCodec {
        match self {
            Self::RunLength(c) => c,
            Self::Lzw(c) => c,
            Self::Ascii85(c) => c,
            Self::AsciiHex(c) => c,
            Self::Flate(c) => c,
            Self::Crypt(c) => c,
        }
    }
}

impl StreamCodec for Codec {
    fn can_encode(&self) -> bool {
        self.inner().can_encode()
    }

    fn can_decode(&self) -> bool {
        self.inner().can_decode()
    }

    fn begin_encode(&mut self, sink: &mut dyn OutputSink) -> Result<()> {
        self.inner_mut().begin_encode(sink)
    }

    fn encode_block(&mut self, sink: &mut dyn OutputSink, data: &[u8]) -> Result<()> {
        self.inner_mut().encode_block(sink, data)
    }

    fn end_encode(&mut self, sink: &mut dyn OutputSink) -> Result<()> {
        self.inner_mut().end_encode(sink)
    }

    fn begin_decode(&mut self, sink: &mut dyn OutputSink, parms: Option<&DecodeParms>) -> Result<()> {
        self.inner_mut().begin_decode(sink, parms)
    }

    fn decode_block(&mut self, sink: &mut dyn OutputSink, data: &[u8]) -> Result<()> {
        self.inner_mut().decode_block(sink, data)
    }

    fn end_decode(&mut self, sink: &mut dyn OutputSink) -> Result<()> {
        self.inner_mut().end_decode(sink)
    }
}

macro_rules! impl_from_codec {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Codec {
                fn from(codec: $ty) -> Self {
                    Self::$variant(codec)
                }
            }
        )*
    };
}

impl_from_codec!(
    RunLength(RunLengthCodec),
    Lzw(LzwCodec),
    Ascii85(Ascii85Codec),
    AsciiHex(AsciiHexCodec),
    Flate(FlateCodec),
    Crypt(CryptCodec),
);

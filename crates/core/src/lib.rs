//! quire - streaming PDF stream filters and the crypto services behind PDF
//! encryption and signing.
//!
//! - [`filter`]: the filter engine, filter chains, sinks and decode parameters
//! - [`codec`]: RunLength, LZW, ASCII85, ASCIIHex, Flate and Crypt codecs
//! - [`crypto`]: the lazily initialized crypto context and signing helpers

pub mod codec;
pub mod crypto;
pub mod error;
pub mod filter;

pub use crypto::{CryptoContext, CryptoOptions, HashingAlgorithm};
pub use error::{PdfError, Result};
pub use filter::{DecodeParms, FilterChain, FilterEngine, FilterKind, OutputSink};

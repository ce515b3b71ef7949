//! Error types for quire stream filters and crypto services.

use thiserror::Error;

/// Primary error type for filter and crypto operations.
#[derive(Error, Debug)]
pub enum PdfError {
    /// A lifecycle contract was violated (e.g. a block call outside a session).
    #[error("usage error: {0}")]
    Usage(String),

    /// Malformed, truncated or out-of-range codec input.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("crypto engine error: {0}")]
    CryptoEngine(String),

    /// Unsupported selector, filter or parameter combination.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("short write: sink accepted {written} of {expected} bytes")]
    ShortWrite { expected: usize, written: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ASN.1 encoding error: {0}")]
    Asn1(#[from] der::Error),

    #[error("RSA error: {0}")]
    Rsa(#[from] rsa::Error),
}

impl PdfError {
    pub(crate) fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub(crate) fn engine(msg: impl Into<String>) -> Self {
        Self::CryptoEngine(msg.into())
    }

    /// Whether this error reports a violated lifecycle contract.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Convenience Result type alias for PdfError.
pub type Result<T> = std::result::Result<T, PdfError>;

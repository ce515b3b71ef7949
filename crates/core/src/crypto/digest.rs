//! Digest selectors, the hashing-algorithm selector used by signatures, and
//! digest handles.

use super::provider::Provider;
use crate::error::{PdfError, Result};
use der::asn1::ObjectIdentifier;
use sha2::Digest;
use std::fmt;
use std::str::FromStr;

/// Largest digest any handle produces (SHA-512).
pub const MAX_DIGEST_LEN: usize = 64;

pub const OID_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
pub const OID_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2");
pub const OID_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3");

/// Digests the crypto context can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestKind {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestKind {
    pub const ALL: [DigestKind; 5] = [
        Self::Md5,
        Self::Sha1,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA2-256",
            Self::Sha384 => "SHA2-384",
            Self::Sha512 => "SHA2-512",
        }
    }

    pub fn output_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

/// Hash selector for signature digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashingAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
    /// Placeholder for an unrecognized selector; rejected wherever used.
    Unknown,
}

impl HashingAlgorithm {
    fn known(self) -> Result<DigestKind> {
        match self {
            Self::Sha256 => Ok(DigestKind::Sha256),
            Self::Sha384 => Ok(DigestKind::Sha384),
            Self::Sha512 => Ok(DigestKind::Sha512),
            Self::Unknown => Err(PdfError::config("unknown hashing algorithm")),
        }
    }

    pub fn digest_kind(self) -> Result<DigestKind> {
        self.known()
    }

    /// Digest length in bytes: 32, 48 or 64.
    pub fn digest_len(self) -> Result<usize> {
        self.known().map(DigestKind::output_len)
    }

    pub fn oid(self) -> Result<ObjectIdentifier> {
        match self.known()? {
            DigestKind::Sha384 => Ok(OID_SHA384),
            DigestKind::Sha512 => Ok(OID_SHA512),
            _ => Ok(OID_SHA256),
        }
    }
}

impl FromStr for HashingAlgorithm {
    type Err = PdfError;

    /// Accepts `sha256`, `SHA-256`, `SHA2-256` and the like.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "sha256" | "sha2256" => Ok(Self::Sha256),
            "sha384" | "sha2384" => Ok(Self::Sha384),
            "sha512" | "sha2512" => Ok(Self::Sha512),
            _ => Err(PdfError::config(format!("unknown hashing algorithm {s:?}"))),
        }
    }
}

impl fmt::Display for HashingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A digest resolved from a loaded provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestHandle {
    kind: DigestKind,
    provider: Provider,
}

impl DigestHandle {
    pub(crate) fn new(kind: DigestKind, provider: Provider) -> Self {
        Self { kind, provider }
    }

    pub fn kind(&self) -> DigestKind {
        self.kind
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn output_len(&self) -> usize {
        self.kind.output_len()
    }

    /// Hash `data` into the front of `out`, returning the produced length.
    pub fn digest_into(&self, data: &[u8], out: &mut [u8; MAX_DIGEST_LEN]) -> usize {
        fn copy(out: &mut [u8], digest: &[u8]) -> usize {
            out[..digest.len()].copy_from_slice(digest);
            digest.len()
        }
        match self.kind {
            DigestKind::Md5 => copy(out, &md5::compute(data).0),
            DigestKind::Sha1 => copy(out, &sha1::Sha1::digest(data)),
            DigestKind::Sha256 => copy(out, &sha2::Sha256::digest(data)),
            DigestKind::Sha384 => copy(out, &sha2::Sha384::digest(data)),
            DigestKind::Sha512 => copy(out, &sha2::Sha512::digest(data)),
        }
    }
}

//! Symmetric cipher selectors and the handles the crypto context resolves.

use super::provider::Provider;
use crate::codec::aes::{AesCbcDecryptor, AesCbcEncryptor};
use crate::codec::arcfour::Arcfour;
use crate::error::{PdfError, Result};

/// Ciphers used by PDF security handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherKind {
    /// RC4 (`/CFM /V2`), only available from the legacy provider.
    Rc4,
    /// AES-128 in CBC mode (`/CFM /AESV2`).
    Aes128Cbc,
    /// AES-256 in CBC mode (`/CFM /AESV3`).
    Aes256Cbc,
}

impl CipherKind {
    pub const ALL: [CipherKind; 3] = [Self::Rc4, Self::Aes128Cbc, Self::Aes256Cbc];

    /// Algorithm name as registered by the providers.
    pub fn name(self) -> &'static str {
        match self {
            Self::Rc4 => "RC4",
            Self::Aes128Cbc => "AES-128-CBC",
            Self::Aes256Cbc => "AES-256-CBC",
        }
    }

    /// Map a crypt filter `/CFM` value.
    pub fn from_cfm(cfm: &str) -> Result<Self> {
        match cfm {
            "V2" => Ok(Self::Rc4),
            "AESV2" => Ok(Self::Aes128Cbc),
            "AESV3" => Ok(Self::Aes256Cbc),
            other => Err(PdfError::config(format!("unsupported crypt filter method {other}"))),
        }
    }

    pub fn block_size(self) -> usize {
        match self {
            Self::Rc4 => 1,
            Self::Aes128Cbc | Self::Aes256Cbc => 16,
        }
    }

    pub fn iv_len(self) -> usize {
        match self {
            Self::Rc4 => 0,
            Self::Aes128Cbc | Self::Aes256Cbc => 16,
        }
    }

    /// Check a key length in bytes.
    pub fn check_key_len(self, len: usize) -> Result<()> {
        let ok = match self {
            Self::Rc4 => (1..=256).contains(&len),
            Self::Aes128Cbc => len == 16,
            Self::Aes256Cbc => len == 32,
        };
        if ok {
            Ok(())
        } else {
            Err(PdfError::config(format!(
                "{} does not accept a {len}-byte key",
                self.name()
            )))
        }
    }
}

/// A cipher resolved from a loaded provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherHandle {
    kind: CipherKind,
    provider: Provider,
}

impl CipherHandle {
    pub(crate) fn new(kind: CipherKind, provider: Provider) -> Self {
        Self { kind, provider }
    }

    pub fn kind(&self) -> CipherKind {
        self.kind
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn check(&self, wanted: &[CipherKind], key: &[u8]) -> Result<()> {
        if !wanted.contains(&self.kind) {
            return Err(PdfError::usage(format!(
                "{} handle cannot build a {} cipher",
                self.kind.name(),
                wanted[0].name()
            )));
        }
        if !self.provider.provides(self.kind) {
            return Err(PdfError::engine(format!(
                "provider={} does not implement {}",
                self.provider.name(),
                self.kind.name()
            )));
        }
        self.kind.check_key_len(key.len())
    }

    /// RC4 keystream keyed with `key`.
    pub fn rc4(&self, key: &[u8]) -> Result<Arcfour> {
        self.check(&[CipherKind::Rc4], key)?;
        Arcfour::new(key)
    }

    /// CBC encryptor; the key length must match the handle's AES variant.
    pub fn cbc_encryptor(&self, key: &[u8], iv: &[u8]) -> Result<AesCbcEncryptor> {
        self.check(&[CipherKind::Aes128Cbc, CipherKind::Aes256Cbc], key)?;
        AesCbcEncryptor::new(key, iv)
    }

    pub fn cbc_decryptor(&self, key: &[u8], iv: &[u8]) -> Result<AesCbcDecryptor> {
        self.check(&[CipherKind::Aes128Cbc, CipherKind::Aes256Cbc], key)?;
        AesCbcDecryptor::new(key, iv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cfm_names() {
        assert_eq!(CipherKind::from_cfm("V2").unwrap(), CipherKind::Rc4);
        assert_eq!(CipherKind::from_cfm("AESV3").unwrap(), CipherKind::Aes256Cbc);
        assert!(CipherKind::from_cfm("None").unwrap_err().is_configuration());
    }

    #[test]
    fn key_lengths() {
        assert!(CipherKind::Rc4.check_key_len(5).is_ok());
        assert!(CipherKind::Rc4.check_key_len(0).is_err());
        assert!(CipherKind::Aes128Cbc.check_key_len(16).is_ok());
        assert!(CipherKind::Aes256Cbc.check_key_len(16).is_err());
    }

    #[test]
    fn handle_builds_matching_cipher() {
        let rc4 = CipherHandle::new(CipherKind::Rc4, Provider::Legacy);
        let mut data = *b"Plaintext";
        rc4.rc4(b"Key").unwrap().apply(&mut data);
        assert_eq!(data, [0xbb, 0xf3, 0x16, 0xe8, 0xd9, 0x40, 0xaf, 0x0a, 0xd3]);
        assert!(rc4.cbc_encryptor(&[0; 16], &[0; 16]).unwrap_err().is_usage());

        let aes128 = CipherHandle::new(CipherKind::Aes128Cbc, Provider::Default);
        assert!(aes128.cbc_encryptor(&[0; 16], &[0; 16]).is_ok());
        // The primitive takes 32-byte keys too, the AES-128 handle must not.
        assert!(aes128.cbc_decryptor(&[0; 32], &[0; 16]).unwrap_err().is_configuration());
        assert!(aes128.rc4(b"Key").unwrap_err().is_usage());
    }

    #[test]
    fn handle_from_wrong_provider_is_engine_error() {
        let handle = CipherHandle::new(CipherKind::Rc4, Provider::Default);
        assert!(matches!(handle.rc4(b"Key"), Err(PdfError::CryptoEngine(_))));
        let handle = CipherHandle::new(CipherKind::Aes256Cbc, Provider::Legacy);
        assert!(matches!(
            handle.cbc_encryptor(&[0; 32], &[0; 16]),
            Err(PdfError::CryptoEngine(_))
        ));
    }
}

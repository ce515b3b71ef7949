//! Crypt filter: RC4 or AES-CBC over a stream, keyed by the caller.
//!
//! AES output is `IV || ciphertext` with PKCS#7 padding. When decoding, the
//! IV is taken from the first 16 input bytes, wherever the block boundaries
//! fall.

use super::StreamCodec;
use super::aes::{AesCbcDecryptor, AesCbcEncryptor, BLOCK_LEN};
use super::arcfour::Arcfour;
use crate::crypto::{CipherHandle, CipherKind, CryptoContext};
use crate::error::{PdfError, Result};
use crate::filter::sink::put;
use crate::filter::{DecodeParms, OutputSink};
use std::sync::Arc;
use zeroize::Zeroizing;

enum Session {
    Idle,
    Rc4(Arcfour),
    AesEncrypt(AesCbcEncryptor),
    /// Collecting the IV.
    AesIv(Vec<u8>),
    AesDecrypt(AesCbcDecryptor),
}

/// Crypt filter codec.
pub struct CryptCodec {
    ctx: Arc<CryptoContext>,
    cipher: CipherKind,
    key: Zeroizing<Vec<u8>>,
    iv: Option<[u8; BLOCK_LEN]>,
    handle: Option<CipherHandle>,
    session: Session,
}

impl CryptCodec {
    pub fn new(ctx: Arc<CryptoContext>, cipher: CipherKind, key: impl Into<Vec<u8>>) -> Self {
        Self {
            ctx,
            cipher,
            key: Zeroizing::new(key.into()),
            iv: None,
            handle: None,
            session: Session::Idle,
        }
    }

    /// Fixed IV for AES encoding instead of a random one.
    pub fn with_iv(mut self, iv: [u8; BLOCK_LEN]) -> Self {
        self.iv = Some(iv);
        self
    }

    pub fn cipher(&self) -> CipherKind {
        self.cipher
    }

    /// Handle resolved by the most recent begin.
    pub fn handle(&self) -> Option<CipherHandle> {
        self.handle
    }

    fn resolve(&mut self, cipher: CipherKind) -> Result<CipherHandle> {
        cipher.check_key_len(self.key.len())?;
        let handle = self.ctx.select_cipher(cipher)?;
        tracing::debug!(
            cipher = handle.name(),
            provider = handle.provider().name(),
            "crypt filter bound"
        );
        self.handle = Some(handle);
        Ok(handle)
    }

    /// Cipher for a decode session after applying `/CFM` and `/Length`.
    fn decode_cipher(&self, parms: Option<&DecodeParms>) -> Result<CipherKind> {
        let Some(parms) = parms else {
            return Ok(self.cipher);
        };
        let cipher = match parms.name("CFM")? {
            Some(cfm) => CipherKind::from_cfm(cfm)?,
            None => self.cipher,
        };
        if parms.get("Length").is_some() {
            let bits = parms.int_or("Length", 0)?;
            // /Length is in bits; a few writers put bytes.
            let bytes = if bits > 0 && bits % 8 == 0 && bits >= 40 { bits / 8 } else { bits };
            if usize::try_from(bytes).ok() != Some(self.key.len()) {
                return Err(PdfError::config(format!(
                    "crypt filter /Length {bits} does not match a {}-byte key",
                    self.key.len()
                )));
            }
        }
        Ok(cipher)
    }
}

impl StreamCodec for CryptCodec {
    fn begin_encode(&mut self, sink: &mut dyn OutputSink) -> Result<()> {
        self.session = Session::Idle;
        let handle = self.resolve(self.cipher)?;
        self.session = match handle.kind() {
            CipherKind::Rc4 => Session::Rc4(handle.rc4(&self.key)?),
            CipherKind::Aes128Cbc | CipherKind::Aes256Cbc => {
                let iv = self.iv.unwrap_or_else(rand::random::<[u8; BLOCK_LEN]>);
                let encryptor = handle.cbc_encryptor(&self.key, &iv)?;
                put(sink, &iv)?;
                Session::AesEncrypt(encryptor)
            }
        };
        Ok(())
    }

    fn encode_block(&mut self, sink: &mut dyn OutputSink, data: &[u8]) -> Result<()> {
        match &mut self.session {
            Session::Rc4(rc4) => put(sink, &rc4.process(data)),
            Session::AesEncrypt(aes) => {
                let mut out = Vec::with_capacity(data.len() + BLOCK_LEN);
                aes.update(data, &mut out);
                put(sink, &out)
            }
            _ => Err(PdfError::usage("crypt encoder not started")),
        }
    }

    fn end_encode(&mut self, sink: &mut dyn OutputSink) -> Result<()> {
        let session = std::mem::replace(&mut self.session, Session::Idle);
        match session {
            Session::Rc4(_) => Ok(()),
            Session::AesEncrypt(mut aes) => {
                let mut out = Vec::with_capacity(BLOCK_LEN);
                aes.finish(&mut out);
                put(sink, &out)
            }
            _ => Err(PdfError::usage("crypt encoder not started")),
        }
    }

    fn begin_decode(&mut self, _sink: &mut dyn OutputSink, parms: Option<&DecodeParms>) -> Result<()> {
        self.session = Session::Idle;
        let cipher = self.decode_cipher(parms)?;
        let handle = self.resolve(cipher)?;
        self.session = match handle.kind() {
            CipherKind::Rc4 => Session::Rc4(handle.rc4(&self.key)?),
            CipherKind::Aes128Cbc | CipherKind::Aes256Cbc => {
                Session::AesIv(Vec::with_capacity(BLOCK_LEN))
            }
        };
        Ok(())
    }

    fn decode_block(&mut self, sink: &mut dyn OutputSink, mut data: &[u8]) -> Result<()> {
        if let Session::AesIv(iv) = &mut self.session {
            let take = (BLOCK_LEN - iv.len()).min(data.len());
            iv.extend_from_slice(&data[..take]);
            data = &data[take..];
            if iv.len() < BLOCK_LEN {
                return Ok(());
            }
            let handle = self
                .handle
                .ok_or_else(|| PdfError::usage("crypt decoder has no cipher handle"))?;
            let decryptor = handle.cbc_decryptor(&self.key, iv)?;
            self.session = Session::AesDecrypt(decryptor);
        }
        match &mut self.session {
            Session::Rc4(rc4) => put(sink, &rc4.process(data)),
            Session::AesDecrypt(aes) => {
                let mut out = Vec::with_capacity(data.len());
                aes.update(data, &mut out);
                put(sink, &out)
            }
            _ => Err(PdfError::usage("crypt decoder not started")),
        }
    }

    fn end_decode(&mut self, sink: &mut dyn OutputSink) -> Result<()> {
        let session = std::mem::replace(&mut self.session, Session::Idle);
        match session {
            Session::Rc4(_) => Ok(()),
            Session::AesIv(iv) => Err(PdfError::decode(format!(
                "AES stream shorter than its IV ({} bytes)",
                iv.len()
            ))),
            Session::AesDecrypt(mut aes) => {
                let mut out = Vec::with_capacity(BLOCK_LEN);
                aes.finish(&mut out)?;
                put(sink, &out)
            }
            _ => Err(PdfError::usage("crypt decoder not started")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Arc<CryptoContext> {
        Arc::new(CryptoContext::default())
    }

    fn encode(codec: &mut CryptCodec, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        codec.begin_encode(&mut out)?;
        codec.encode_block(&mut out, data)?;
        codec.end_encode(&mut out)?;
        Ok(out)
    }

    fn decode(codec: &mut CryptCodec, data: &[u8], parms: Option<&DecodeParms>, chunk: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        codec.begin_decode(&mut out, parms)?;
        for piece in data.chunks(chunk) {
            codec.decode_block(&mut out, piece)?;
        }
        codec.end_decode(&mut out)?;
        Ok(out)
    }

    #[test]
    fn rc4_matches_keystream() {
        let mut codec = CryptCodec::new(ctx(), CipherKind::Rc4, b"Key".to_vec());
        let out = encode(&mut codec, b"Plaintext").unwrap();
        assert_eq!(hex::encode(&out), "bbf316e8d940af0ad3");
        assert_eq!(decode(&mut codec, &out, None, 2).unwrap(), b"Plaintext");
    }

    #[test]
    fn aes_output_starts_with_iv() {
        let iv = [0x42u8; 16];
        let mut codec = CryptCodec::new(ctx(), CipherKind::Aes128Cbc, vec![1u8; 16]).with_iv(iv);
        let out = encode(&mut codec, b"seventeen bytes!!").unwrap();
        assert_eq!(&out[..16], &iv);
        assert_eq!(out.len(), 16 + 32);
        for chunk in [1, 5, 16, 17, out.len()] {
            assert_eq!(decode(&mut codec, &out, None, chunk).unwrap(), b"seventeen bytes!!");
        }
    }

    #[test]
    fn random_iv_differs_between_sessions() {
        let mut codec = CryptCodec::new(ctx(), CipherKind::Aes256Cbc, vec![7u8; 32]);
        let a = encode(&mut codec, b"same").unwrap();
        let b = encode(&mut codec, b"same").unwrap();
        assert_ne!(a, b);
        assert_eq!(decode(&mut codec, &a, None, 64).unwrap(), b"same");
    }

    #[test]
    fn wrong_key_is_padding_error() {
        let mut enc = CryptCodec::new(ctx(), CipherKind::Aes128Cbc, vec![1u8; 16]).with_iv([0; 16]);
        let out = encode(&mut enc, b"attack at dawn").unwrap();
        let mut dec = CryptCodec::new(ctx(), CipherKind::Aes128Cbc, vec![2u8; 16]);
        // A wrong key almost always yields invalid padding.
        let result = decode(&mut dec, &out, None, 64);
        assert!(result.map(|plain| plain != b"attack at dawn").unwrap_or(true));
    }

    #[test]
    fn truncated_ciphertext_is_decode_error() {
        let mut codec = CryptCodec::new(ctx(), CipherKind::Aes128Cbc, vec![1u8; 16]);
        let out = encode(&mut codec, b"data").unwrap();
        assert!(decode(&mut codec, &out[..out.len() - 3], None, 64).unwrap_err().is_decode());
        assert!(decode(&mut codec, &out[..10], None, 64).unwrap_err().is_decode());
    }

    #[test]
    fn cfm_overrides_cipher_on_decode() {
        let mut enc = CryptCodec::new(ctx(), CipherKind::Rc4, vec![5u8; 16]);
        let out = encode(&mut enc, b"hello").unwrap();

        let mut dec = CryptCodec::new(ctx(), CipherKind::Aes128Cbc, vec![5u8; 16]);
        let parms = DecodeParms::new().with_name("CFM", "V2").with_int("Length", 128);
        assert_eq!(decode(&mut dec, &out, Some(&parms), 3).unwrap(), b"hello");
        assert_eq!(dec.handle().unwrap().kind(), CipherKind::Rc4);
    }

    #[test]
    fn length_mismatch_is_configuration_error() {
        let mut codec = CryptCodec::new(ctx(), CipherKind::Rc4, vec![5u8; 16]);
        let parms = DecodeParms::new().with_int("Length", 40);
        let mut out = Vec::new();
        assert!(codec.begin_decode(&mut out, Some(&parms)).unwrap_err().is_configuration());
    }

    #[test]
    fn rc4_needs_legacy_provider() {
        let ctx = Arc::new(CryptoContext::new(crate::crypto::CryptoOptions {
            legacy_provider: false,
        }));
        let mut codec = CryptCodec::new(ctx, CipherKind::Rc4, b"Key".to_vec());
        assert!(matches!(encode(&mut codec, b"x"), Err(PdfError::CryptoEngine(_))));
    }

    #[test]
    fn session_cipher_comes_from_resolved_handle() {
        use crate::crypto::Provider;

        let mut codec = CryptCodec::new(ctx(), CipherKind::Rc4, b"Key".to_vec());
        encode(&mut codec, b"x").unwrap();
        assert_eq!(codec.handle().unwrap().provider(), Provider::Legacy);

        let mut codec = CryptCodec::new(ctx(), CipherKind::Aes256Cbc, vec![1u8; 32]);
        let out = encode(&mut codec, b"x").unwrap();
        assert_eq!(codec.handle().unwrap().provider(), Provider::Default);
        assert_eq!(decode(&mut codec, &out, None, 7).unwrap(), b"x");
    }

    #[test]
    fn torn_down_context_rejects_new_sessions() {
        let shared = ctx();
        let mut codec = CryptCodec::new(Arc::clone(&shared), CipherKind::Aes128Cbc, vec![1u8; 16]);
        encode(&mut codec, b"before").unwrap();
        shared.teardown().unwrap();
        assert!(encode(&mut codec, b"after").unwrap_err().is_usage());
    }
}

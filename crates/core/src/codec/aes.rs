//! Incremental AES-CBC with PKCS#7 padding, as PDF crypt filters use it.
//!
//! Both directions accept arbitrary-sized input and buffer at most one block.
//! The decryptor always holds back the last complete block because it may
//! carry the padding.

use crate::error::{PdfError, Result};
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Aes256};
use cbc::{Decryptor, Encryptor};
use std::fmt;

pub const BLOCK_LEN: usize = 16;

enum EncryptMode {
    Aes128(Encryptor<Aes128>),
    Aes256(Encryptor<Aes256>),
}

enum DecryptMode {
    Aes128(Decryptor<Aes128>),
    Aes256(Decryptor<Aes256>),
}

impl EncryptMode {
    fn key_bits(&self) -> usize {
        match self {
            Self::Aes128(_) => 128,
            Self::Aes256(_) => 256,
        }
    }
}

impl DecryptMode {
    fn key_bits(&self) -> usize {
        match self {
            Self::Aes128(_) => 128,
            Self::Aes256(_) => 256,
        }
    }
}

fn bad_key(len: usize) -> PdfError {
    PdfError::config(format!("AES key must be 16 or 32 bytes, got {len}"))
}

fn bad_iv(len: usize) -> PdfError {
    PdfError::config(format!("AES IV must be 16 bytes, got {len}"))
}

/// AES-CBC encryptor producing padded ciphertext.
pub struct AesCbcEncryptor {
    mode: EncryptMode,
    pending: Vec<u8>,
}

// Cipher state is key material; only the variant and buffer size are shown.
impl fmt::Debug for AesCbcEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesCbcEncryptor")
            .field("key_bits", &self.mode.key_bits())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl AesCbcEncryptor {
    pub fn new(key: &[u8], iv: &[u8]) -> Result<Self> {
        if iv.len() != BLOCK_LEN {
            return Err(bad_iv(iv.len()));
        }
        let mode = match key.len() {
            16 => EncryptMode::Aes128(Encryptor::new(key.into(), iv.into())),
            32 => EncryptMode::Aes256(Encryptor::new(key.into(), iv.into())),
            n => return Err(bad_key(n)),
        };
        Ok(Self {
            mode,
            pending: Vec::with_capacity(BLOCK_LEN),
        })
    }

    fn encrypt_blocks(&mut self, blocks: &mut [u8]) {
        for block in blocks.chunks_exact_mut(BLOCK_LEN) {
            let block = GenericArray::from_mut_slice(block);
            match &mut self.mode {
                EncryptMode::Aes128(cipher) => cipher.encrypt_block_mut(block),
                EncryptMode::Aes256(cipher) => cipher.encrypt_block_mut(block),
            }
        }
    }

    /// Encrypt every complete block available, appending to `out`.
    pub fn update(&mut self, data: &[u8], out: &mut Vec<u8>) {
        self.pending.extend_from_slice(data);
        let full = self.pending.len() / BLOCK_LEN * BLOCK_LEN;
        if full == 0 {
            return;
        }
        let mut blocks: Vec<u8> = self.pending.drain(..full).collect();
        self.encrypt_blocks(&mut blocks);
        out.extend_from_slice(&blocks);
    }

    /// Pad the remainder and encrypt it. Always emits one block.
    pub fn finish(&mut self, out: &mut Vec<u8>) {
        let mut last = std::mem::take(&mut self.pending);
        pkcs7_pad(&mut last);
        self.encrypt_blocks(&mut last);
        out.extend_from_slice(&last);
    }
}

/// AES-CBC decryptor that strips PKCS#7 padding at the end.
pub struct AesCbcDecryptor {
    mode: DecryptMode,
    pending: Vec<u8>,
}

impl fmt::Debug for AesCbcDecryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesCbcDecryptor")
            .field("key_bits", &self.mode.key_bits())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl AesCbcDecryptor {
    pub fn new(key: &[u8], iv: &[u8]) -> Result<Self> {
        if iv.len() != BLOCK_LEN {
            return Err(bad_iv(iv.len()));
        }
        let mode = match key.len() {
            16 => DecryptMode::Aes128(Decryptor::new(key.into(), iv.into())),
            32 => DecryptMode::Aes256(Decryptor::new(key.into(), iv.into())),
            n => return Err(bad_key(n)),
        };
        Ok(Self {
            mode,
            pending: Vec::with_capacity(2 * BLOCK_LEN),
        })
    }

    fn decrypt_blocks(&mut self, blocks: &mut [u8]) {
        for block in blocks.chunks_exact_mut(BLOCK_LEN) {
            let block = GenericArray::from_mut_slice(block);
            match &mut self.mode {
                DecryptMode::Aes128(cipher) => cipher.decrypt_block_mut(block),
                DecryptMode::Aes256(cipher) => cipher.decrypt_block_mut(block),
            }
        }
    }

    /// Decrypt complete blocks except the last one, appending to `out`.
    pub fn update(&mut self, data: &[u8], out: &mut Vec<u8>) {
        self.pending.extend_from_slice(data);
        if self.pending.is_empty() {
            return;
        }
        let ready = (self.pending.len() - 1) / BLOCK_LEN * BLOCK_LEN;
        if ready == 0 {
            return;
        }
        let mut blocks: Vec<u8> = self.pending.drain(..ready).collect();
        self.decrypt_blocks(&mut blocks);
        out.extend_from_slice(&blocks);
    }

    /// Decrypt the held-back block and remove its padding.
    pub fn finish(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let mut last = std::mem::take(&mut self.pending);
        if last.len() != BLOCK_LEN {
            return Err(PdfError::decode(format!(
                "AES ciphertext is not a whole number of blocks ({} trailing bytes)",
                last.len() % BLOCK_LEN
            )));
        }
        self.decrypt_blocks(&mut last);
        out.extend_from_slice(pkcs7_unpad(&last)?);
        Ok(())
    }
}

/// Append PKCS#7 padding up to the next block boundary (1-16 bytes).
pub fn pkcs7_pad(data: &mut Vec<u8>) {
    let pad = BLOCK_LEN - data.len() % BLOCK_LEN;
    data.resize(data.len() + pad, pad as u8);
}

/// Strip PKCS#7 padding.
///
/// The padding byte must be 1-16, no longer than the data, and repeated
/// across the whole pad.
pub fn pkcs7_unpad(data: &[u8]) -> Result<&[u8]> {
    let Some(&last) = data.last() else {
        return Err(PdfError::decode("AES plaintext is empty"));
    };
    let pad_len = last as usize;
    if pad_len == 0 || pad_len > BLOCK_LEN || pad_len > data.len() {
        return Err(PdfError::decode(format!("invalid AES padding length {pad_len}")));
    }
    let start = data.len() - pad_len;
    if data[start..].iter().any(|&byte| byte != last) {
        return Err(PdfError::decode("inconsistent AES padding bytes"));
    }
    Ok(&data[..start])
}

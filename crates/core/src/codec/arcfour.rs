//! Arcfour (RC4) keystream for the `/V2` crypt filter method.
//!
//! Keys are 1-256 bytes. The permutation is wiped when the cipher is dropped.

use crate::error::{PdfError, Result};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// RC4 stream cipher.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Arcfour {
    state: [u8; 256],
    i: u8,
    j: u8,
}

impl std::fmt::Debug for Arcfour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Arcfour(REDACTED)")
    }
}

impl Arcfour {
    /// Run the key schedule over `key`.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.is_empty() || key.len() > 256 {
            return Err(PdfError::config(format!(
                "RC4 key must be 1-256 bytes, got {}",
                key.len()
            )));
        }

        let mut state: [u8; 256] = std::array::from_fn(|i| i as u8);
        let mut j: u8 = 0;
        for i in 0..256 {
            j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
            state.swap(i, j as usize);
        }

        Ok(Self { state, i: 0, j: 0 })
    }

    /// XOR the keystream into `data`. Encryption and decryption are the same.
    pub fn apply(&mut self, data: &mut [u8]) {
        for byte in data {
            *byte ^= self.next_byte();
        }
    }

    /// Keystream applied to a copy of `data`.
    pub fn process(&mut self, data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        self.apply(&mut out);
        out
    }

    fn next_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.state[self.i as usize]);
        self.state.swap(self.i as usize, self.j as usize);

        let idx = self.state[self.i as usize].wrapping_add(self.state[self.j as usize]);
        self.state[idx as usize]
    }
}

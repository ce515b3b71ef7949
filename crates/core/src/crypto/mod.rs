//! Crypto services: provider-backed cipher and digest handles behind a lazily
//! initialized context, plus the signed-attribute and key helpers used when
//! producing a document signature.

pub mod cipher;
pub mod context;
pub mod digest;
pub mod provider;
pub mod signing;

pub use cipher::{CipherHandle, CipherKind};
pub use context::{CryptoContext, CryptoOptions};
pub use digest::{DigestHandle, DigestKind, HashingAlgorithm};
pub use provider::Provider;

//! Algorithm providers the crypto context loads at initialization.
//!
//! The primitives themselves come from RustCrypto crates. A provider is the
//! registry of which algorithms may be fetched from it; RC4 is confined to
//! the legacy provider so it can be switched off independently.

use super::cipher::{CipherHandle, CipherKind};
use super::digest::{DigestHandle, DigestKind};
use crate::error::{PdfError, Result};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Default,
    Legacy,
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Legacy => "legacy",
        }
    }

    /// Whether this provider supplies `kind`.
    pub fn provides(self, kind: CipherKind) -> bool {
        self.ciphers().contains(&kind)
    }

    fn ciphers(self) -> &'static [CipherKind] {
        match self {
            Self::Default => &[CipherKind::Aes128Cbc, CipherKind::Aes256Cbc],
            Self::Legacy => &[CipherKind::Rc4],
        }
    }

    fn digests(self) -> &'static [DigestKind] {
        match self {
            Self::Default => &[
                DigestKind::Md5,
                DigestKind::Sha1,
                DigestKind::Sha256,
                DigestKind::Sha384,
                DigestKind::Sha512,
            ],
            Self::Legacy => &[],
        }
    }
}

/// Providers currently loaded into an engine.
#[derive(Debug, Default)]
pub(crate) struct Providers {
    loaded: Vec<Provider>,
    unloaded: AtomicBool,
}

impl Providers {
    pub(crate) fn load(&mut self, provider: Provider, enabled: bool) -> Result<()> {
        if !enabled {
            return Err(PdfError::engine(format!(
                "unable to load the {} provider",
                provider.name()
            )));
        }
        tracing::debug!(provider = provider.name(), "loaded crypto provider");
        self.loaded.push(provider);
        Ok(())
    }

    pub(crate) fn is_loaded(&self, provider: Provider) -> bool {
        !self.unloaded.load(Ordering::Acquire) && self.loaded.contains(&provider)
    }

    pub(crate) fn fetch_cipher(&self, kind: CipherKind, from: Provider) -> Result<CipherHandle> {
        if self.is_loaded(from) && from.provides(kind) {
            Ok(CipherHandle::new(kind, from))
        } else {
            Err(PdfError::engine(format!(
                "cipher {} is not available from provider={}",
                kind.name(),
                from.name()
            )))
        }
    }

    pub(crate) fn fetch_digest(&self, kind: DigestKind, from: Provider) -> Result<DigestHandle> {
        if self.is_loaded(from) && from.digests().contains(&kind) {
            Ok(DigestHandle::new(kind, from))
        } else {
            Err(PdfError::engine(format!(
                "digest {} is not available from provider={}",
                kind.name(),
                from.name()
            )))
        }
    }

    /// Unload in reverse load order. Nothing can be fetched afterwards.
    /// Returns how many providers were unloaded; 0 on a repeated call.
    pub(crate) fn unload_all(&self) -> usize {
        if self.unloaded.swap(true, Ordering::AcqRel) {
            return 0;
        }
        for provider in self.loaded.iter().rev() {
            tracing::debug!(provider = provider.name(), "unloaded crypto provider");
        }
        self.loaded.len()
    }
}

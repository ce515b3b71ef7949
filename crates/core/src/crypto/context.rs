//! Lazily initialized crypto context.
//!
//! A `CryptoContext` loads its providers and resolves every cipher and digest
//! handle the filters and signing helpers need on first use. Share it with
//! `Arc`; the one-time init guard is the only synchronization.

use super::cipher::{CipherHandle, CipherKind};
use super::digest::{DigestHandle, DigestKind, HashingAlgorithm, MAX_DIGEST_LEN};
use super::provider::{Provider, Providers};
use crate::error::{PdfError, Result};
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering, fence};

/// Options applied when the engine is first initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CryptoOptions {
    /// Load the legacy provider, which is the only source of RC4.
    pub legacy_provider: bool,
}

impl Default for CryptoOptions {
    fn default() -> Self {
        Self {
            legacy_provider: true,
        }
    }
}

/// Handles resolved during a successful init.
#[derive(Debug)]
struct Engine {
    providers: Providers,
    rc4: CipherHandle,
    aes128: CipherHandle,
    aes256: CipherHandle,
    md5: DigestHandle,
    sha1: DigestHandle,
    sha256: DigestHandle,
    sha384: DigestHandle,
    sha512: DigestHandle,
}

impl Engine {
    fn load(options: &CryptoOptions) -> Result<Self> {
        let mut providers = Providers::default();
        providers.load(Provider::Legacy, options.legacy_provider)?;
        providers.load(Provider::Default, true)?;

        Ok(Self {
            rc4: providers.fetch_cipher(CipherKind::Rc4, Provider::Legacy)?,
            aes128: providers.fetch_cipher(CipherKind::Aes128Cbc, Provider::Default)?,
            aes256: providers.fetch_cipher(CipherKind::Aes256Cbc, Provider::Default)?,
            md5: providers.fetch_digest(DigestKind::Md5, Provider::Default)?,
            sha1: providers.fetch_digest(DigestKind::Sha1, Provider::Default)?,
            sha256: providers.fetch_digest(DigestKind::Sha256, Provider::Default)?,
            sha384: providers.fetch_digest(DigestKind::Sha384, Provider::Default)?,
            sha512: providers.fetch_digest(DigestKind::Sha512, Provider::Default)?,
            providers,
        })
    }

    fn cipher(&self, kind: CipherKind) -> CipherHandle {
        match kind {
            CipherKind::Rc4 => self.rc4,
            CipherKind::Aes128Cbc => self.aes128,
            CipherKind::Aes256Cbc => self.aes256,
        }
    }

    fn digest(&self, kind: DigestKind) -> DigestHandle {
        match kind {
            DigestKind::Md5 => self.md5,
            DigestKind::Sha1 => self.sha1,
            DigestKind::Sha256 => self.sha256,
            DigestKind::Sha384 => self.sha384,
            DigestKind::Sha512 => self.sha512,
        }
    }
}

/// Shared cipher/digest access with lazy, once-only initialization.
#[derive(Debug, Default)]
pub struct CryptoContext {
    options: CryptoOptions,
    engine: OnceCell<Engine>,
    torn_down: AtomicBool,
    inits: AtomicUsize,
}

impl CryptoContext {
    pub fn new(options: CryptoOptions) -> Self {
        Self {
            options,
            engine: OnceCell::new(),
            torn_down: AtomicBool::new(false),
            inits: AtomicUsize::new(0),
        }
    }

    pub fn options(&self) -> &CryptoOptions {
        &self.options
    }

    fn check_live(&self) -> Result<()> {
        if self.torn_down.load(Ordering::Acquire) {
            return Err(PdfError::usage("crypto context has been torn down"));
        }
        Ok(())
    }

    fn engine(&self) -> Result<&Engine> {
        self.check_live()?;
        let engine = self.engine.get_or_try_init(|| {
            // teardown may have run since the check above
            self.check_live()?;
            let engine = Engine::load(&self.options)?;
            self.inits.fetch_add(1, Ordering::AcqRel);
            tracing::debug!("crypto engine initialized");
            Ok::<_, PdfError>(engine)
        })?;
        // Pairs with the fence in teardown: one of the two sides sees the
        // other's write, so a racing teardown never leaves providers loaded.
        fence(Ordering::SeqCst);
        if self.torn_down.load(Ordering::Acquire) {
            engine.providers.unload_all();
            return Err(PdfError::usage("crypto context has been torn down"));
        }
        Ok(engine)
    }

    /// Load providers and resolve all handles. Idempotent; a failed attempt
    /// leaves the context uninitialized.
    pub fn init(&self) -> Result<()> {
        self.engine().map(|_| ())
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.get().is_some() && !self.torn_down.load(Ordering::Acquire)
    }

    /// Number of successful engine initializations (0 or 1).
    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::Acquire)
    }

    /// Unload providers. The context is unusable afterwards.
    pub fn teardown(&self) -> Result<()> {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return Err(PdfError::usage("crypto context already torn down"));
        }
        fence(Ordering::SeqCst);
        if let Some(engine) = self.engine.get() {
            let unloaded = engine.providers.unload_all();
            tracing::debug!(unloaded, "crypto providers released");
        }
        tracing::debug!("crypto context torn down");
        Ok(())
    }

    pub fn select_cipher(&self, kind: CipherKind) -> Result<CipherHandle> {
        self.engine().map(|engine| engine.cipher(kind))
    }

    pub fn select_digest(&self, kind: DigestKind) -> Result<DigestHandle> {
        self.engine().map(|engine| engine.digest(kind))
    }

    fn digest_with(&self, kind: DigestKind, data: &[u8]) -> Result<Vec<u8>> {
        let handle = self.select_digest(kind)?;
        let mut out = [0u8; MAX_DIGEST_LEN];
        let produced = handle.digest_into(data, &mut out);
        if produced != kind.output_len() {
            return Err(PdfError::engine(format!(
                "{} produced {produced} bytes, expected {}",
                kind.name(),
                kind.output_len()
            )));
        }
        Ok(out[..produced].to_vec())
    }

    /// Hash `data` with a signature hashing algorithm.
    pub fn compute_digest(&self, data: &[u8], algorithm: HashingAlgorithm) -> Result<Vec<u8>> {
        let kind = algorithm.digest_kind()?;
        self.digest_with(kind, data)
    }

    pub fn compute_digest_hex(&self, data: &[u8], algorithm: HashingAlgorithm) -> Result<String> {
        self.compute_digest(data, algorithm).map(hex::encode)
    }

    pub fn compute_md5(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.digest_with(DigestKind::Md5, data)
    }

    pub fn compute_md5_hex(&self, data: &[u8]) -> Result<String> {
        self.compute_md5(data).map(hex::encode)
    }

    pub fn compute_sha1(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.digest_with(DigestKind::Sha1, data)
    }

    pub fn compute_sha1_hex(&self, data: &[u8]) -> Result<String> {
        self.compute_sha1(data).map(hex::encode)
    }
}

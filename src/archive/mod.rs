//! Archive-and-encrypt orchestration
//!
//! Builds a transient zip archive of a directory, encrypts it with the
//! configured [`Cipher`](crate::crypto::Cipher) and writes the packet out.
//! The transient archive lives in a per-call temporary directory and is
//! removed on every exit path; cleanup problems are logged, never escalated,
//! because the encrypted output matters more than a leftover temp file.

mod zip;

pub use self::zip::ZipArchiver;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::crypto::Cipher;
use crate::error::{Error, Result};

/// Directory-archiving primitive.
///
/// Synchronous by contract; the caller decides whether to move it off the
/// async runtime.
pub trait Archiver {
    /// Archive `source_dir` into the file at `dest`.
    fn make_archive(&self, source_dir: &Path, dest: &Path) -> Result<()>;
}

/// Orchestrates archive → encrypt → write for one cipher.
pub struct ArchiveEncryptor<A: Archiver = ZipArchiver> {
    cipher: Cipher,
    archiver: A,
}

impl ArchiveEncryptor<ZipArchiver> {
    /// Create an encryptor using the built-in zip archiver.
    pub fn new(cipher: Cipher) -> Self {
        ArchiveEncryptor {
            cipher,
            archiver: ZipArchiver,
        }
    }
}

impl<A: Archiver> ArchiveEncryptor<A> {
    /// Create an encryptor with a custom archiving primitive.
    pub fn with_archiver(cipher: Cipher, archiver: A) -> Self {
        ArchiveEncryptor { cipher, archiver }
    }

    /// Access the underlying cipher (for direct decrypt calls).
    pub fn cipher(&self) -> &Cipher {
        &self.cipher
    }

    /// Archive `source_dir`, encrypt the archive bytes and write the packet
    /// to `dest`. Returns `dest` and the iteration count used.
    ///
    /// The iteration count comes from the cipher's own selection (no
    /// explicit request): deterministic when a secondary password is
    /// configured, random otherwise — in which case the caller must keep
    /// the returned count or the output is undecryptable.
    pub fn archive_and_encrypt(&self, source_dir: &Path, dest: &Path) -> Result<(PathBuf, u32)> {
        self.archive_and_encrypt_with(source_dir, dest, None)
    }

    /// Like [`archive_and_encrypt`](Self::archive_and_encrypt) with an
    /// explicit iteration count, subject to the cipher's floor check and
    /// overridden entirely in deterministic mode.
    pub fn archive_and_encrypt_with(
        &self,
        source_dir: &Path,
        dest: &Path,
        iterations: Option<u32>,
    ) -> Result<(PathBuf, u32)> {
        let archive_data = self.build_transient_archive(source_dir)?;

        let (packet, iterations) = self.cipher.encrypt(&archive_data, iterations)?;
        drop(archive_data);

        fs::write(dest, &packet)?;
        info!(
            dest = %dest.display(),
            size = packet.len(),
            iterations,
            "Encrypted archive written"
        );

        Ok((dest.to_path_buf(), iterations))
    }

    /// Build the zip archive in a unique temporary directory and read it
    /// into memory. The directory (and the archive in it) is removed before
    /// this returns, whether or not reading succeeded.
    fn build_transient_archive(&self, source_dir: &Path) -> Result<Vec<u8>> {
        let tmp = tempfile::Builder::new()
            .prefix("cryptpack-")
            .tempdir()
            .map_err(Error::Io)?;
        let archive_path = tmp.path().join("archive.zip");

        let data = self
            .archiver
            .make_archive(source_dir, &archive_path)
            .and_then(|()| fs::read(&archive_path).map_err(Error::Io));

        // Explicit close to surface cleanup problems; Drop would hide them.
        // Either way the result of the archive step wins.
        if let Err(e) = tmp.close() {
            warn!("Failed to remove transient archive: {}", e);
        }

        data
    }
}

/// Run `archive_and_encrypt` on the blocking thread pool.
///
/// A single call is a fixed, non-interruptible block of CPU work (the KDF
/// dominates); running it inline on the async runtime would stall every
/// other task for seconds.
pub async fn archive_and_encrypt_blocking<A>(
    encryptor: Arc<ArchiveEncryptor<A>>,
    source_dir: PathBuf,
    dest: PathBuf,
    iterations: Option<u32>,
) -> Result<(PathBuf, u32)>
where
    A: Archiver + Send + Sync + 'static,
{
    tokio::task::spawn_blocking(move || {
        encryptor.archive_and_encrypt_with(&source_dir, &dest, iterations)
    })
    .await
    .map_err(|e| Error::Internal(format!("Archive task panicked: {}", e)))?
}

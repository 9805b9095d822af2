//! Key Vault Module
//!
//! Manages the single data-encryption key (DEK) that protects every cache
//! payload. The DEK is envelope-encrypted: it lives on disk wrapped under a
//! key derived from the caller's master key, and is unwrapped at most once
//! per vault lifetime.

use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto::provider::{self, KEY_LEN};
use crate::error::{Result, StorageError};

/// HMAC tag keying the digest that names the wrapped-key blob.
const BLOB_NAME_TAG: &[u8] = b"vault_cache.dek.v1";

// == Key Vault ==
/// Loads or bootstraps the data-encryption key for one cache instance.
///
/// The wrapped blob lives at a fixed, namespace-derived path inside the key
/// directory, separate from all ordinary cache entries. An existing blob that
/// cannot be unwrapped (wrong master key, corrupt file) is replaced with a
/// freshly generated key rather than failing every operation; entries written
/// under the old key become permanently unreadable and self-heal as misses.
/// That data loss is an accepted tradeoff of the recovery behavior.
pub struct KeyVault {
    /// Location of the wrapped-key blob
    blob_path: PathBuf,
    /// sha256(master key), the unwrap key for the blob
    wrap_key: Zeroizing<[u8; KEY_LEN]>,
    /// Unwrapped DEK, populated on first use and scrubbed on drop
    dek: OnceCell<Zeroizing<Vec<u8>>>,
}

impl KeyVault {
    // == Constructor ==
    /// Creates a vault rooted at `key_dir`.
    ///
    /// No I/O happens here; the wrapped blob is read or created lazily on the
    /// first `data_key` call.
    pub fn new(key_dir: impl Into<PathBuf>, master_key: &str, namespace: &str) -> Self {
        let blob_name = format!(
            "{}.dek",
            provider::keyed_digest(BLOB_NAME_TAG, namespace.as_bytes())
        );
        Self {
            blob_path: key_dir.into().join(blob_name),
            wrap_key: Zeroizing::new(provider::derive_key(master_key.as_bytes())),
            dek: OnceCell::new(),
        }
    }

    // == Data Key ==
    /// Returns the plaintext data-encryption key, bootstrapping it on first use.
    ///
    /// The load-or-generate sequence runs at most once per vault, even under
    /// concurrent first use; later calls return the cached key. The key never
    /// leaves the crate.
    pub(crate) async fn data_key(&self) -> Result<&[u8]> {
        let dek = self.dek.get_or_try_init(|| self.load_or_generate()).await?;
        Ok(dek.as_slice())
    }

    /// Explicit two-branch bootstrap: unwrap the persisted blob if present,
    /// otherwise (or on unwrap failure) generate and persist a fresh key.
    async fn load_or_generate(&self) -> Result<Zeroizing<Vec<u8>>> {
        match tokio::fs::read(&self.blob_path).await {
            Ok(wrapped) => match provider::decrypt(&wrapped, self.wrap_key.as_slice()) {
                Ok(dek) => {
                    debug!(
                        "Unwrapped existing data key from {}",
                        self.blob_path.display()
                    );
                    Ok(Zeroizing::new(dek))
                }
                Err(err) => {
                    warn!(
                        "Wrapped data key at {} could not be unwrapped ({}); generating a replacement, previously written entries are now unreadable",
                        self.blob_path.display(),
                        err
                    );
                    self.generate_and_persist().await
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => self.generate_and_persist().await,
            Err(err) => Err(StorageError::Io(err).into()),
        }
    }

    async fn generate_and_persist(&self) -> Result<Zeroizing<Vec<u8>>> {
        let dek = Zeroizing::new(provider::random_bytes(KEY_LEN)?);
        let wrapped = provider::encrypt(&dek, self.wrap_key.as_slice())?;

        if let Some(parent) = self.blob_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StorageError::Io)?;
        }
        tokio::fs::write(&self.blob_path, &wrapped)
            .await
            .map_err(StorageError::Io)?;

        info!(
            "Generated new data key, wrapped blob stored at {}",
            self.blob_path.display()
        );
        Ok(dek)
    }
}

// Key material stays out of debug output
impl fmt::Debug for KeyVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyVault")
            .field("blob_path", &self.blob_path)
            .field("initialized", &self.dek.initialized())
            .finish()
    }
}

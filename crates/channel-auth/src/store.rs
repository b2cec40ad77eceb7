//! Encrypted per-channel credential persistence
//!
//! One store instance owns the credential record for one channel id. The
//! record is serialized to a single JSON string, encrypted through the
//! shared cipher, and upserted under a key scoped by the channel id, so
//! records for different channels never observe each other.
//!
//! A blob that fails to decrypt or parse is treated exactly like an absent
//! record: the SDK never hands back a partially-trusted credential. All
//! operations are synchronous and storage-only (no network I/O), but the
//! first encrypt/decrypt triggers the cipher's lazy key derivation, so
//! callers keep this off latency-sensitive paths.

use std::sync::Arc;

use tracing::{debug, warn};

use channel_crypto::StringCipher;
use common::{KeyValueStore, StorageError};

use crate::token::AccessCredential;

const CREDENTIAL_KEY_PREFIX: &str = "credential.";

/// Encrypted credential store for a single channel id.
pub struct TokenStore {
    storage: Arc<dyn KeyValueStore>,
    cipher: Arc<StringCipher>,
    namespace: String,
    key: String,
}

impl TokenStore {
    /// `namespace` scopes this SDK's entries in the host's key-value
    /// storage; the cipher is shared between all stores of that namespace.
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        namespace: impl Into<String>,
        channel_id: &str,
        cipher: Arc<StringCipher>,
    ) -> Self {
        Self {
            storage,
            cipher,
            namespace: namespace.into(),
            key: format!("{CREDENTIAL_KEY_PREFIX}{channel_id}"),
        }
    }

    /// Read the cached credential.
    ///
    /// Returns `None` when nothing is stored, and also when the stored
    /// blob is tampered, corrupt, or unparseable: all of those mean "no
    /// valid cached credential". Only a broken storage substrate is an
    /// error.
    pub fn get(&self) -> Result<Option<AccessCredential>, StorageError> {
        let Some(blob) = self.storage.get_string(&self.namespace, &self.key)? else {
            return Ok(None);
        };

        let json = match self.cipher.decrypt(self.storage.as_ref(), &blob) {
            Ok(json) => json,
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "cached credential failed to decrypt, treating as absent");
                return Ok(None);
            }
            Err(e) => return Err(StorageError::Codec(e.to_string())),
        };

        match serde_json::from_str(&json) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                warn!(error = %e, "cached credential failed to parse, treating as absent");
                Ok(None)
            }
        }
    }

    /// Encrypt and upsert the credential record.
    pub fn save(&self, credential: &AccessCredential) -> Result<(), StorageError> {
        let json = serde_json::to_string(credential)
            .map_err(|e| StorageError::Codec(format!("serializing credential: {e}")))?;
        let blob = self
            .cipher
            .encrypt(self.storage.as_ref(), &json)
            .map_err(|e| StorageError::Codec(format!("encrypting credential: {e}")))?;
        self.storage.put_string(&self.namespace, &self.key, &blob)?;
        debug!(key = %self.key, "saved credential");
        Ok(())
    }

    /// Remove this channel's record. Other channels are unaffected.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(&self.namespace, &self.key)?;
        debug!(key = %self.key, "cleared credential");
        Ok(())
    }
}

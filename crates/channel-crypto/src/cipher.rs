//! Authenticated string cipher (encrypt-then-MAC)
//!
//! Blob layout, base64-encoded: `IV (16) || ciphertext || MAC (32)`.
//! The MAC covers IV and ciphertext and is verified in constant time
//! before the AES layer is touched; on mismatch the decrypt step is never
//! reached.
//!
//! Keys are derived once per instance with PBKDF2 over the device
//! fingerprint and a persisted per-namespace salt, guarded by a mutex.
//! The cipher and MAC objects themselves are constructed fresh per call,
//! so encrypt/decrypt are safe to run concurrently once keys exist.

use std::sync::Mutex;

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngExt;
use sha2::Sha256;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use common::KeyValueStore;

use crate::error::CryptoError;
use crate::fingerprint::FingerprintProvider;

/// PBKDF2 iteration count used when none is configured.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 10_000;

const SALT_SIZE: usize = 16;
const IV_SIZE: usize = 16;
const AES_BLOCK_SIZE: usize = 16;
const MAC_SIZE: usize = 32;
const AES_KEY_SIZE: usize = 32;
const HMAC_KEY_SIZE: usize = 32;

const SALT_STORAGE_KEY: &str = "salt";

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Derived key pair. Lives in memory for the lifetime of the owning cipher
/// instance, never persisted, zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct SecretKeys {
    encryption_key: [u8; AES_KEY_SIZE],
    integrity_key: [u8; HMAC_KEY_SIZE],
}

/// Device-bound authenticated string cipher.
///
/// Constructed with the storage namespace its salt lives under. The first
/// call that needs keys (`initialize`, `encrypt`, or `decrypt`) runs
/// PBKDF2 and is slow; subsequent calls reuse the cached keys.
pub struct StringCipher {
    namespace: String,
    iterations: u32,
    provider: Box<dyn FingerprintProvider>,
    keys: Mutex<Option<SecretKeys>>,
}

impl StringCipher {
    pub fn new(namespace: impl Into<String>, provider: Box<dyn FingerprintProvider>) -> Self {
        Self::with_iterations(namespace, provider, DEFAULT_PBKDF2_ITERATIONS)
    }

    pub fn with_iterations(
        namespace: impl Into<String>,
        provider: Box<dyn FingerprintProvider>,
        iterations: u32,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            iterations,
            provider,
            keys: Mutex::new(None),
        }
    }

    /// Derive the key pair now instead of on the first encrypt/decrypt.
    ///
    /// Idempotent. Hosts call this from a background thread at startup so
    /// the PBKDF2 cost is paid before any user-visible operation.
    pub fn initialize(&self, store: &dyn KeyValueStore) -> Result<(), CryptoError> {
        self.with_keys(store, |_| Ok(()))
    }

    /// Encrypt a string, returning the base64 blob.
    ///
    /// A fresh random IV is drawn per call, so encrypting the same
    /// plaintext twice yields different blobs.
    pub fn encrypt(
        &self,
        store: &dyn KeyValueStore,
        plaintext: &str,
    ) -> Result<String, CryptoError> {
        self.with_keys(store, |keys| {
            let mut iv = [0u8; IV_SIZE];
            rand::rng().fill(&mut iv);

            let ciphertext = Aes256CbcEnc::new_from_slices(&keys.encryption_key, &iv)
                .map_err(|e| CryptoError::Encryption(format!("cipher setup failed: {e}")))?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

            let mut mac = HmacSha256::new_from_slice(&keys.integrity_key)
                .map_err(|e| CryptoError::Encryption(format!("MAC setup failed: {e}")))?;
            mac.update(&iv);
            mac.update(&ciphertext);
            let tag = mac.finalize().into_bytes();

            let mut blob = Vec::with_capacity(IV_SIZE + ciphertext.len() + MAC_SIZE);
            blob.extend_from_slice(&iv);
            blob.extend_from_slice(&ciphertext);
            blob.extend_from_slice(&tag);
            Ok(STANDARD.encode(blob))
        })
    }

    /// Decrypt a base64 blob produced by [`encrypt`](Self::encrypt).
    ///
    /// Fails closed: the MAC is recomputed over IV and ciphertext and
    /// compared in constant time, and AES runs only after it checks out.
    pub fn decrypt(
        &self,
        store: &dyn KeyValueStore,
        ciphertext_b64: &str,
    ) -> Result<String, CryptoError> {
        self.with_keys(store, |keys| {
            let blob = STANDARD
                .decode(ciphertext_b64)
                .map_err(|e| CryptoError::Malformed(format!("not valid base64: {e}")))?;

            if blob.len() < IV_SIZE + AES_BLOCK_SIZE + MAC_SIZE {
                return Err(CryptoError::Malformed(format!(
                    "blob too short: {} bytes",
                    blob.len()
                )));
            }

            let (body, tag) = blob.split_at(blob.len() - MAC_SIZE);

            let mut mac = HmacSha256::new_from_slice(&keys.integrity_key)
                .map_err(|e| CryptoError::Decryption(format!("MAC setup failed: {e}")))?;
            mac.update(body);
            mac.verify_slice(tag).map_err(|_| CryptoError::Tampered)?;

            let (iv, ciphertext) = body.split_at(IV_SIZE);
            let plaintext = Aes256CbcDec::new_from_slices(&keys.encryption_key, iv)
                .map_err(|e| CryptoError::Decryption(format!("cipher setup failed: {e}")))?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(|_| CryptoError::Decryption("padding check failed".into()))?;

            String::from_utf8(plaintext).map_err(|_| CryptoError::Utf8)
        })
    }

    /// Run `f` with the derived keys, deriving them first if this is the
    /// first use of the instance.
    fn with_keys<T>(
        &self,
        store: &dyn KeyValueStore,
        f: impl FnOnce(&SecretKeys) -> Result<T, CryptoError>,
    ) -> Result<T, CryptoError> {
        let mut guard = self.keys.lock().expect("cipher key lock poisoned");
        if guard.is_none() {
            *guard = Some(self.derive_keys(store)?);
        }
        let keys = guard.as_ref().expect("keys present after derivation");
        f(keys)
    }

    /// One PBKDF2 pass over (fingerprint, salt, iterations) producing 512
    /// bits: the first 256 become the AES key, the last 256 the HMAC key.
    fn derive_keys(&self, store: &dyn KeyValueStore) -> Result<SecretKeys, CryptoError> {
        let fingerprint = self.provider.fingerprint();
        let salt = self.load_or_create_salt(store)?;

        let mut key_material = [0u8; AES_KEY_SIZE + HMAC_KEY_SIZE];
        pbkdf2::pbkdf2_hmac::<Sha256>(
            fingerprint.expose().as_bytes(),
            &salt,
            self.iterations,
            &mut key_material,
        );

        let mut keys = SecretKeys {
            encryption_key: [0u8; AES_KEY_SIZE],
            integrity_key: [0u8; HMAC_KEY_SIZE],
        };
        keys.encryption_key
            .copy_from_slice(&key_material[..AES_KEY_SIZE]);
        keys.integrity_key
            .copy_from_slice(&key_material[AES_KEY_SIZE..]);
        key_material.zeroize();

        debug!(
            namespace = %self.namespace,
            iterations = self.iterations,
            "derived cipher key pair"
        );
        Ok(keys)
    }

    /// Read the namespace salt, or generate and persist it on first use.
    ///
    /// The generate-and-save branch runs at most once per namespace for
    /// the lifetime of the stored data; losing the salt orphans every
    /// blob encrypted under it.
    fn load_or_create_salt(&self, store: &dyn KeyValueStore) -> Result<Vec<u8>, CryptoError> {
        let saved = store
            .get_string(&self.namespace, SALT_STORAGE_KEY)
            .map_err(|e| CryptoError::Storage(e.to_string()))?;

        if let Some(encoded) = saved {
            if !encoded.is_empty() {
                return STANDARD
                    .decode(&encoded)
                    .map_err(|e| CryptoError::Storage(format!("saved salt is corrupt: {e}")));
            }
        }

        let mut salt = [0u8; SALT_SIZE];
        rand::rng().fill(&mut salt);
        store
            .put_string(&self.namespace, SALT_STORAGE_KEY, &STANDARD.encode(salt))
            .map_err(|e| CryptoError::Storage(e.to_string()))?;
        debug!(namespace = %self.namespace, "generated new salt");
        Ok(salt.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::DeviceProfile;
    use common::MemoryStore;

    // Enough rounds to exercise the KDF without slowing the suite down.
    const TEST_ITERATIONS: u32 = 1000;

    fn profile() -> DeviceProfile {
        DeviceProfile {
            model: "Pixel 9".into(),
            manufacturer: "Google".into(),
            package_name: "com.example.messenger".into(),
            device_id: "3f2a9c".into(),
            serial: None,
        }
    }

    fn cipher() -> StringCipher {
        StringCipher::with_iterations("tokens", Box::new(profile()), TEST_ITERATIONS)
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let store = MemoryStore::new();
        let c = cipher();
        let blob = c.encrypt(&store, "a secret credential").unwrap();
        assert_eq!(c.decrypt(&store, &blob).unwrap(), "a secret credential");
    }

    #[test]
    fn round_trip_handles_empty_and_unicode() {
        let store = MemoryStore::new();
        let c = cipher();
        for plaintext in ["", "короткий", "トークン", "a".repeat(4096).as_str()] {
            let blob = c.encrypt(&store, plaintext).unwrap();
            assert_eq!(c.decrypt(&store, &blob).unwrap(), plaintext);
        }
    }

    #[test]
    fn same_plaintext_encrypts_differently() {
        let store = MemoryStore::new();
        let c = cipher();
        let a = c.encrypt(&store, "same input").unwrap();
        let b = c.encrypt(&store, "same input").unwrap();
        assert_ne!(a, b, "IV randomization must vary the blob");
        assert_eq!(c.decrypt(&store, &a).unwrap(), "same input");
        assert_eq!(c.decrypt(&store, &b).unwrap(), "same input");
    }

    #[test]
    fn flipping_any_byte_is_detected() {
        let store = MemoryStore::new();
        let c = cipher();
        let blob_b64 = c.encrypt(&store, "integrity matters").unwrap();
        let blob = STANDARD.decode(&blob_b64).unwrap();

        for i in 0..blob.len() {
            let mut tampered = blob.clone();
            tampered[i] ^= 0x01;
            let result = c.decrypt(&store, &STANDARD.encode(&tampered));
            assert!(
                matches!(result, Err(CryptoError::Tampered)),
                "byte {i} flip must fail the MAC check, got {result:?}"
            );
        }
    }

    #[test]
    fn truncated_blob_is_malformed() {
        let store = MemoryStore::new();
        let c = cipher();
        let short = STANDARD.encode([0u8; 40]);
        assert!(matches!(
            c.decrypt(&store, &short),
            Err(CryptoError::Malformed(_))
        ));
    }

    #[test]
    fn invalid_base64_is_malformed() {
        let store = MemoryStore::new();
        let c = cipher();
        assert!(matches!(
            c.decrypt(&store, "not base64 at all!!"),
            Err(CryptoError::Malformed(_))
        ));
    }

    #[test]
    fn different_fingerprint_cannot_decrypt() {
        let store = MemoryStore::new();
        let c = cipher();
        let blob = c.encrypt(&store, "bound to this device").unwrap();

        let mut other_device = profile();
        other_device.device_id = "different".into();
        let other =
            StringCipher::with_iterations("tokens", Box::new(other_device), TEST_ITERATIONS);
        // Same salt (same namespace), different fingerprint: MAC key differs,
        // so this reads as tampering.
        assert!(matches!(
            other.decrypt(&store, &blob),
            Err(CryptoError::Tampered)
        ));
    }

    #[test]
    fn separate_namespaces_get_separate_salts() {
        let store = MemoryStore::new();
        let a = StringCipher::with_iterations("ns-a", Box::new(profile()), TEST_ITERATIONS);
        let b = StringCipher::with_iterations("ns-b", Box::new(profile()), TEST_ITERATIONS);
        a.initialize(&store).unwrap();
        b.initialize(&store).unwrap();

        let salt_a = store.get_string("ns-a", "salt").unwrap().unwrap();
        let salt_b = store.get_string("ns-b", "salt").unwrap().unwrap();
        assert_ne!(salt_a, salt_b);
    }

    #[test]
    fn salt_survives_instance_lifetime() {
        let store = MemoryStore::new();
        let first = cipher();
        let blob = first.encrypt(&store, "written by first instance").unwrap();
        drop(first);

        // A fresh instance over the same store derives the same keys from
        // the persisted salt.
        let second = cipher();
        assert_eq!(
            second.decrypt(&store, &blob).unwrap(),
            "written by first instance"
        );
    }

    #[test]
    fn initialize_is_idempotent() {
        let store = MemoryStore::new();
        let c = cipher();
        c.initialize(&store).unwrap();
        c.initialize(&store).unwrap();
        let salt = store.get_string("tokens", "salt").unwrap().unwrap();
        c.initialize(&store).unwrap();
        assert_eq!(store.get_string("tokens", "salt").unwrap().unwrap(), salt);
    }

    #[test]
    fn default_iteration_count() {
        assert_eq!(DEFAULT_PBKDF2_ITERATIONS, 10_000);
    }
}

//! Content cipher: AES-256-CBC with PKCS#7 padding.
//!
//! Both directions are incremental. [`StreamEncryptor`] and
//! [`StreamDecryptor`] accept input in arbitrary pieces and emit whole
//! blocks as soon as they are determined, so memory stays bounded by one
//! block regardless of file size. Output is independent of how the input
//! was split.
//!
//! The same cipher wraps content keys for recipients, keyed by a BLAKE3
//! derivation of the ECDH shared secret.

use std::fmt;

use aes::Aes256;
use cbc::cipher::{
    block_padding::Pkcs7, generic_array::GenericArray, BlockDecryptMut, BlockEncryptMut,
    KeyIvInit,
};
use rand::RngCore;
use sealbox_core::{PublicKey, SharedSecret, WrappedKey};

use crate::error::CipherError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Symmetric key size in bytes.
pub const KEY_SIZE: usize = 32;

/// Cipher block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// BLAKE3 derive-key context for the key-wrapping key.
pub const WRAP_CONTEXT: &str = "sealbox-v1 content-key wrap";

/// A 256-bit content key. Fresh for every reseal.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentKey([u8; KEY_SIZE]);

impl ContentKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(..)")
    }
}

/// The 16-byte initialization vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Iv([u8; BLOCK_SIZE]);

impl Iv {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; BLOCK_SIZE]) -> Self {
        Self(bytes)
    }

    /// The IV used by an envelope: the first 16 bytes of its ephemeral key.
    ///
    /// The ephemeral key is unique per reseal, so the (key, IV) pair never
    /// repeats.
    pub fn derive(ephemeral_public: &PublicKey) -> Self {
        let mut iv = [0u8; BLOCK_SIZE];
        iv.copy_from_slice(&ephemeral_public.as_bytes()[..BLOCK_SIZE]);
        Self(iv)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.0
    }
}

/// Incremental encryptor.
pub struct StreamEncryptor {
    cipher: Aes256CbcEnc,
    /// Plaintext not yet forming a whole block. Always shorter than a block.
    pending: Vec<u8>,
}

impl StreamEncryptor {
    /// Start encrypting under `key` and `iv`.
    pub fn new(key: &ContentKey, iv: &Iv) -> Self {
        Self {
            cipher: Aes256CbcEnc::new(&key.0.into(), &iv.0.into()),
            pending: Vec::with_capacity(BLOCK_SIZE),
        }
    }

    /// Feed plaintext; returns the ciphertext blocks now complete.
    pub fn update(&mut self, input: &[u8]) -> Vec<u8> {
        self.pending.extend_from_slice(input);
        let ready = self.pending.len() - self.pending.len() % BLOCK_SIZE;
        let mut out: Vec<u8> = self.pending.drain(..ready).collect();
        for block in out.chunks_exact_mut(BLOCK_SIZE) {
            self.cipher
                .encrypt_block_mut(GenericArray::from_mut_slice(block));
        }
        out
    }

    /// Pad and encrypt the remainder. Always yields exactly one block.
    pub fn finalize(self) -> Vec<u8> {
        self.cipher.encrypt_padded_vec_mut::<Pkcs7>(&self.pending)
    }
}

/// Incremental decryptor.
///
/// The last whole block is held back until [`StreamDecryptor::finalize`],
/// since only the final block carries padding.
pub struct StreamDecryptor {
    cipher: Aes256CbcDec,
    pending: Vec<u8>,
}

impl StreamDecryptor {
    /// Start decrypting under `key` and `iv`.
    pub fn new(key: &ContentKey, iv: &Iv) -> Self {
        Self {
            cipher: Aes256CbcDec::new(&key.0.into(), &iv.0.into()),
            pending: Vec::with_capacity(2 * BLOCK_SIZE),
        }
    }

    /// Feed ciphertext; returns the plaintext now determined.
    pub fn update(&mut self, input: &[u8]) -> Vec<u8> {
        self.pending.extend_from_slice(input);
        if self.pending.len() <= BLOCK_SIZE {
            return Vec::new();
        }
        // Leave between 1 and BLOCK_SIZE bytes behind.
        let ready = (self.pending.len() - 1) / BLOCK_SIZE * BLOCK_SIZE;
        let mut out: Vec<u8> = self.pending.drain(..ready).collect();
        for block in out.chunks_exact_mut(BLOCK_SIZE) {
            self.cipher
                .decrypt_block_mut(GenericArray::from_mut_slice(block));
        }
        out
    }

    /// Decrypt the held-back block and strip padding.
    pub fn finalize(self) -> Result<Vec<u8>, CipherError> {
        if self.pending.len() != BLOCK_SIZE {
            return Err(CipherError::Truncated);
        }
        self.cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&self.pending)
            .map_err(|_| CipherError::BadPadding)
    }
}

/// One-shot encryption.
pub fn encrypt(key: &ContentKey, iv: &Iv, plaintext: &[u8]) -> Vec<u8> {
    let mut encryptor = StreamEncryptor::new(key, iv);
    let mut out = encryptor.update(plaintext);
    out.extend(encryptor.finalize());
    out
}

/// One-shot decryption.
pub fn decrypt(key: &ContentKey, iv: &Iv, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
    let mut decryptor = StreamDecryptor::new(key, iv);
    let mut out = decryptor.update(ciphertext);
    out.extend(decryptor.finalize()?);
    Ok(out)
}

/// Wrap `content_key` for the holder of `shared`.
pub fn wrap_key(shared: &SharedSecret, iv: &Iv, content_key: &ContentKey) -> WrappedKey {
    let kek = ContentKey(shared.derive_key(WRAP_CONTEXT));
    WrappedKey::from_bytes(encrypt(&kek, iv, content_key.as_bytes()))
}

/// Recover a content key wrapped by [`wrap_key`].
pub fn unwrap_key(
    shared: &SharedSecret,
    iv: &Iv,
    wrapped: &WrappedKey,
) -> Result<ContentKey, CipherError> {
    let kek = ContentKey(shared.derive_key(WRAP_CONTEXT));
    let bytes = decrypt(&kek, iv, wrapped.as_bytes())?;
    let key: [u8; KEY_SIZE] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| CipherError::KeyLength(bytes.len()))?;
    Ok(ContentKey(key))
}

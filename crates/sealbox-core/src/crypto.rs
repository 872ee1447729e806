//! Cryptographic primitives for Sealbox.
//!
//! Wraps Ed25519 signing and X25519 key agreement with strong types. A single
//! Ed25519 keypair serves both purposes: for agreement the secret is mapped to
//! its X25519 scalar and the public point from Edwards to Montgomery form.

use curve25519_dalek::edwards::CompressedEdwardsY;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use std::fmt;
use x25519_dalek::StaticSecret;

use crate::encoding::{array_from_base64, base64_serde, to_base64};
use crate::error::CoreError;

/// Size of an encoded public key.
pub const PUBLIC_KEY_SIZE: usize = 32;
/// Size of a secret seed.
pub const SECRET_KEY_SIZE: usize = 32;
/// Size of a signature.
pub const SIGNATURE_SIZE: usize = 64;

/// A 32-byte Ed25519 public key (compressed Edwards point).
///
/// This is the `publicPoint` of an identity or of an envelope's ephemeral key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey(pub [u8; PUBLIC_KEY_SIZE]);

impl PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex fingerprint, safe for logs.
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.0[..8])
    }

    /// Encode as base64.
    pub fn to_base64(&self) -> String {
        to_base64(&self.0)
    }

    /// Parse from base64.
    pub fn from_base64(s: &str) -> Result<Self, CoreError> {
        array_from_base64(s).map(Self)
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CoreError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;

        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);

        verifying_key
            .verify_strict(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }

    /// Map this Edwards point to its X25519 (Montgomery) form for key agreement.
    pub fn to_x25519(&self) -> Result<x25519_dalek::PublicKey, CoreError> {
        let edwards = CompressedEdwardsY(self.0)
            .decompress()
            .ok_or(CoreError::InvalidPublicKey)?;
        Ok(x25519_dalek::PublicKey::from(edwards.to_montgomery().to_bytes()))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.fingerprint())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; PUBLIC_KEY_SIZE]> for PublicKey {
    fn from(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

base64_serde!(PublicKey);

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; SIGNATURE_SIZE]);

impl Signature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Encode as base64.
    pub fn to_base64(&self) -> String {
        to_base64(&self.0)
    }

    /// Parse from base64.
    pub fn from_base64(s: &str) -> Result<Self, CoreError> {
        array_from_base64(s).map(Self)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; SIGNATURE_SIZE]> for Signature {
    fn from(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }
}

base64_serde!(Signature);

/// A signing and key-agreement keypair.
///
/// This wraps ed25519-dalek's SigningKey. The secret half is the 32-byte seed.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let signing_key = SigningKey::generate(&mut rng);
        Self { signing_key }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; SECRET_KEY_SIZE]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let sig = self.signing_key.sign(message);
        Signature(sig.to_bytes())
    }

    /// Get the raw seed bytes (secret key material).
    pub fn seed(&self) -> [u8; SECRET_KEY_SIZE] {
        self.signing_key.to_bytes()
    }

    /// X25519 key agreement with a peer's public key.
    ///
    /// Rejects peers whose point yields an all-zero secret.
    pub fn diffie_hellman(&self, peer: &PublicKey) -> Result<SharedSecret, CoreError> {
        let secret = StaticSecret::from(self.signing_key.to_scalar_bytes());
        let shared = secret.diffie_hellman(&peer.to_x25519()?);
        if !shared.was_contributory() {
            return Err(CoreError::WeakSharedSecret);
        }
        Ok(SharedSecret(*shared.as_bytes()))
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}

/// A 32-byte secret produced by X25519 key agreement.
#[derive(Clone)]
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive a 256-bit symmetric key bound to `context`.
    pub fn derive_key(&self, context: &str) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new_derive_key(context);
        hasher.update(&self.0);
        *hasher.finalize().as_bytes()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_sign_verify() {
        let keypair = Keypair::generate();
        let message = b"hello world";
        let signature = keypair.sign(message);

        keypair
            .public_key()
            .verify(message, &signature)
            .expect("valid signature should verify");

        let tampered = b"hello worlD";
        assert!(keypair.public_key().verify(tampered, &signature).is_err());
    }

    #[test]
    fn test_keypair_deterministic_from_seed() {
        let seed = [0x42u8; 32];
        let kp1 = Keypair::from_seed(&seed);
        let kp2 = Keypair::from_seed(&seed);
        assert_eq!(kp1.public_key(), kp2.public_key());
        assert_eq!(kp1.seed(), seed);
    }

    #[test]
    fn test_key_agreement_is_symmetric() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();

        let ab = alice.diffie_hellman(&bob.public_key()).unwrap();
        let ba = bob.diffie_hellman(&alice.public_key()).unwrap();

        assert_eq!(ab.as_bytes(), ba.as_bytes());
    }

    #[test]
    fn test_key_agreement_differs_per_peer() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();
        let carol = Keypair::generate();

        let ab = alice.diffie_hellman(&bob.public_key()).unwrap();
        let ac = alice.diffie_hellman(&carol.public_key()).unwrap();

        assert_ne!(ab.as_bytes(), ac.as_bytes());
    }

    #[test]
    fn test_identity_point_rejected() {
        // Compressed encoding of the Edwards identity maps to a low-order point.
        let mut identity = [0u8; 32];
        identity[0] = 1;
        let alice = Keypair::generate();
        assert!(matches!(
            alice.diffie_hellman(&PublicKey(identity)),
            Err(CoreError::WeakSharedSecret)
        ));
    }

    #[test]
    fn test_derive_key_context_separation() {
        let shared = SharedSecret([0x42; 32]);
        let k1 = shared.derive_key("context-a");
        let k2 = shared.derive_key("context-b");
        assert_ne!(k1, k2);
        assert_eq!(k1, shared.derive_key("context-a"));
    }

    #[test]
    fn test_public_key_base64_roundtrip() {
        let pk = Keypair::generate().public_key();
        let recovered = PublicKey::from_base64(&pk.to_base64()).unwrap();
        assert_eq!(pk, recovered);
    }

    proptest::proptest! {
        #[test]
        fn prop_agreement_symmetric_for_any_seeds(a: [u8; 32], b: [u8; 32]) {
            let ka = Keypair::from_seed(&a);
            let kb = Keypair::from_seed(&b);
            let ab = ka.diffie_hellman(&kb.public_key()).unwrap();
            let ba = kb.diffie_hellman(&ka.public_key()).unwrap();
            proptest::prop_assert_eq!(ab.as_bytes(), ba.as_bytes());
        }

        #[test]
        fn prop_signature_bound_to_message(seed: [u8; 32], msg: Vec<u8>, flip: usize) {
            let kp = Keypair::from_seed(&seed);
            let sig = kp.sign(&msg);
            proptest::prop_assert!(kp.public_key().verify(&msg, &sig).is_ok());

            let mut tampered = msg.clone();
            tampered.push(0);
            if !msg.is_empty() {
                let i = flip % msg.len();
                tampered = msg.clone();
                tampered[i] ^= 0x01;
            }
            proptest::prop_assert!(kp.public_key().verify(&tampered, &sig).is_err());
        }
    }
}

//! # Sealbox Permissions
//!
//! Who may open an envelope, and the cipher that protects its body.
//!
//! ## Encryption Model
//!
//! Content uses a two-layer key model:
//!
//! 1. **Content Key**: A fresh AES-256 key that encrypts the body (CBC, PKCS#7)
//! 2. **Wrapped Keys**: The content key is wrapped for each recipient under
//!    ECDH between a per-seal ephemeral key and the recipient's key
//!
//! The ephemeral key signs the recipient list and is then discarded. Changing
//! the recipient set always means a new content key and a new ephemeral key;
//! a removed recipient keeps nothing that opens the new body.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sealbox_core::{Identity, Profile};
//! use sealbox_perms::{cipher, registry};
//!
//! let alice = Identity::generate(Profile::new("alice", "alice@example.com"));
//! let sealed = registry::seal_for(&[alice.invite()]).unwrap();
//!
//! registry::verify_all(&sealed.metadata).unwrap();
//! let key = registry::unwrap_content_key(&sealed.metadata, &alice).unwrap();
//! let iv = cipher::Iv::derive(&sealed.metadata.ephemeral_public);
//! let body = cipher::encrypt(&key, &iv, b"hello");
//! ```

pub mod cipher;
pub mod error;
pub mod registry;

pub use cipher::{ContentKey, Iv, StreamDecryptor, StreamEncryptor, BLOCK_SIZE, KEY_SIZE};
pub use error::{CipherError, PermsError, Result, SignatureFailure};
pub use registry::{
    candidates, find_recipient, rewrap_for, seal_for, unwrap_content_key, verify_all, Sealed,
};

//! # Sealbox Store
//!
//! Persistence for the local identity and the contact book.
//!
//! ## Key Types
//!
//! - [`IdentityStore`] - Load and save the local identity
//! - [`ContactBook`] - Aliases for known recipient candidates
//! - [`FileIdentityStore`] / [`FileContactBook`] - JSON files on disk
//! - [`MemoryIdentityStore`] / [`MemoryContactBook`] - In-memory, for tests
//! - [`StoreConfig`] - File locations
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sealbox_core::{Identity, Profile};
//! use sealbox_store::{
//!     ContactBook, FileContactBook, FileIdentityStore, IdentityStore, StoreConfig,
//! };
//!
//! async fn example() {
//!     let config = StoreConfig::default();
//!     let identities = FileIdentityStore::new(&config.identity_path);
//!
//!     // Fails with `InvalidProfile` for an empty handle or malformed email.
//!     let profile = Profile::new("alice", "alice@example.com");
//!     identities.save(&Identity::generate(profile), false).await.unwrap();
//!
//!     let contacts = FileContactBook::new(&config.contacts_path);
//!     // let bob = RecipientCandidate::from_json(&invite_text).unwrap();
//!     // contacts.add("bob", bob, false).await.unwrap();
//!     let _ = contacts.list().await.unwrap();
//! }
//! ```

mod atomic;
pub mod config;
pub mod contacts;
pub mod error;
pub mod identity;

pub use config::StoreConfig;
pub use contacts::{ContactBook, Contacts, FileContactBook, MemoryContactBook};
pub use error::{Result, StoreError};
pub use identity::{FileIdentityStore, IdentityStore, MemoryIdentityStore};

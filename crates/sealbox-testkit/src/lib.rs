//! # Sealbox Testkit
//!
//! Testing utilities for Sealbox.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: An identity plus a scratch directory for envelope tests
//! - **Generators**: Proptest strategies for identities, profiles and plaintext
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use sealbox_testkit::generators::SealParams;
//!
//! proptest! {
//!     #[test]
//!     fn every_recipient_can_open(params: SealParams) {
//!         // seal for params.invites(), open as each of params.identities
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use sealbox_testkit::fixtures::TestFixture;
//!
//! async fn example() {
//!     let fixture = TestFixture::new();
//!     fixture.seal("notes.txt", b"initial data").await.unwrap();
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{multi_party_identities, seeded_identity, TestFixture};
pub use generators::SealParams;

//! Proptest generators for property-based testing.

use proptest::prelude::*;

use sealbox::{Identity, Profile, RecipientCandidate};
use sealbox_core::{Keypair, PublicKey};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random PublicKey.
pub fn public_key() -> impl Strategy<Value = PublicKey> {
    keypair().prop_map(|kp| kp.public_key())
}

/// Generate a valid profile.
pub fn profile() -> impl Strategy<Value = Profile> {
    ("[a-z][a-z0-9_]{0,15}", "[a-z]{1,8}", "[a-z]{2,6}")
        .prop_map(|(handle, domain, tld)| {
            let email = format!("{handle}@{domain}.{tld}");
            Profile::new(handle, email)
        })
}

/// Generate an identity.
pub fn identity() -> impl Strategy<Value = Identity> {
    (keypair(), profile()).prop_map(|(kp, profile)| Identity::from_keypair(kp, profile))
}

/// Generate a verified recipient candidate.
pub fn candidate() -> impl Strategy<Value = RecipientCandidate> {
    identity().prop_map(|id| id.invite())
}

/// Generate plaintext bytes of specified max length.
pub fn plaintext(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Plaintext lengths around the cipher block and body chunk boundaries.
pub fn boundary_length() -> impl Strategy<Value = usize> {
    prop_oneof![
        Just(0usize),
        Just(1),
        Just(15),
        Just(16),
        Just(17),
        Just(1023),
        Just(1024),
        Just(1025),
        Just(4096),
        0usize..5000,
    ]
}

/// Parameters for a multi-recipient seal.
#[derive(Debug, Clone)]
pub struct SealParams {
    pub identities: Vec<Identity>,
    pub plaintext: Vec<u8>,
}

impl SealParams {
    /// Invites for every identity, in order.
    pub fn invites(&self) -> Vec<RecipientCandidate> {
        self.identities.iter().map(Identity::invite).collect()
    }
}

impl Arbitrary for SealParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop::collection::vec(any::<[u8; 32]>(), 1..5), // seeds
            plaintext(2048),
        )
            .prop_filter("distinct seeds", |(seeds, _)| {
                let mut sorted = seeds.clone();
                sorted.sort_unstable();
                sorted.dedup();
                sorted.len() == seeds.len()
            })
            .prop_map(|(seeds, plaintext)| SealParams {
                identities: seeds
                    .iter()
                    .enumerate()
                    .map(|(i, seed)| {
                        Identity::from_keypair(
                            Keypair::from_seed(seed),
                            Profile::new(format!("user{i}"), format!("user{i}@example.com")),
                        )
                    })
                    .collect(),
                plaintext,
            })
            .boxed()
    }
}

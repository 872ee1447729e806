//! The recipient registry.
//!
//! Operations over an envelope's recipient list: locating a recipient,
//! verifying the whole list, recovering the content key, and minting fresh
//! metadata for a new recipient set.
//!
//! ## Verification order
//!
//! [`verify_all`] checks the ephemeral key's signature over the list first,
//! then each entry's profile signature in list order. The first failure is
//! reported. Any file read or mutated must pass `verify_all` before its
//! contents are trusted.

use std::collections::HashSet;

use sealbox_core::{
    recipients_message, EnvelopeMetadata, Identity, Keypair, PublicKey, RecipientCandidate,
    RecipientEntry,
};

use crate::cipher::{unwrap_key, wrap_key, ContentKey, Iv};
use crate::error::{PermsError, Result, SignatureFailure};

/// Find the entry whose public key equals the identity's.
pub fn find_recipient<'a>(
    metadata: &'a EnvelopeMetadata,
    identity: &Identity,
) -> Option<&'a RecipientEntry> {
    metadata
        .recipient(&identity.public_key())
        .map(|(_, entry)| entry)
}

/// Verify the metadata signature, then every recipient's profile signature.
pub fn verify_all(metadata: &EnvelopeMetadata) -> Result<()> {
    metadata
        .verify_signature()
        .map_err(|_| PermsError::InvalidSignature(SignatureFailure::Metadata))?;

    for (index, entry) in metadata.recipients.iter().enumerate() {
        entry.verify_profile().map_err(|_| {
            PermsError::InvalidSignature(SignatureFailure::Recipient {
                index,
                email: entry.email.clone(),
            })
        })?;
    }

    check_unique(metadata.recipients.iter().map(|e| &e.public_key))
}

/// Recover the content key for `identity`.
///
/// Callers verify the metadata first; this only performs the unwrap.
pub fn unwrap_content_key(metadata: &EnvelopeMetadata, identity: &Identity) -> Result<ContentKey> {
    let entry = find_recipient(metadata, identity).ok_or(PermsError::AccessDenied)?;
    let shared = identity.derive_shared_secret(&metadata.ephemeral_public)?;
    let iv = Iv::derive(&metadata.ephemeral_public);
    Ok(unwrap_key(&shared, &iv, &entry.wrapped_key)?)
}

/// Build fresh metadata granting `content_key` to each candidate.
///
/// Every candidate's signature is verified before anything is wrapped. A new
/// ephemeral keypair wraps the key for each recipient and signs the list;
/// its secret half is dropped on return.
pub fn rewrap_for(
    recipients: &[RecipientCandidate],
    content_key: &ContentKey,
) -> Result<EnvelopeMetadata> {
    if recipients.is_empty() {
        return Err(PermsError::NoRecipients);
    }
    for (index, candidate) in recipients.iter().enumerate() {
        candidate.verify().map_err(|_| {
            PermsError::InvalidSignature(SignatureFailure::Recipient {
                index,
                email: candidate.email.clone(),
            })
        })?;
    }
    check_unique(recipients.iter().map(|c| &c.public_key))?;

    let ephemeral = Keypair::generate();
    let ephemeral_public = ephemeral.public_key();
    let iv = Iv::derive(&ephemeral_public);

    let entries = recipients
        .iter()
        .map(|candidate| -> Result<RecipientEntry> {
            let shared = ephemeral.diffie_hellman(&candidate.public_key)?;
            let wrapped = wrap_key(&shared, &iv, content_key);
            Ok(RecipientEntry::new(candidate.clone(), wrapped))
        })
        .collect::<Result<Vec<_>>>()?;

    let signature = ephemeral.sign(&recipients_message(&entries));

    Ok(EnvelopeMetadata {
        ephemeral_public,
        recipients: entries,
        signature,
    })
}

/// Metadata and content key for a new seal.
#[derive(Debug)]
pub struct Sealed {
    pub metadata: EnvelopeMetadata,
    pub content_key: ContentKey,
}

/// Generate a fresh content key and metadata for `recipients`.
pub fn seal_for(recipients: &[RecipientCandidate]) -> Result<Sealed> {
    let content_key = ContentKey::generate();
    let metadata = rewrap_for(recipients, &content_key)?;
    Ok(Sealed {
        metadata,
        content_key,
    })
}

/// The recipients of `metadata` as candidates, in list order.
pub fn candidates(metadata: &EnvelopeMetadata) -> Vec<RecipientCandidate> {
    metadata.recipients.iter().map(Into::into).collect()
}

fn check_unique<'a>(keys: impl Iterator<Item = &'a PublicKey>) -> Result<()> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(*key) {
            return Err(PermsError::DuplicateRecipient(*key));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sealbox_core::{Profile, Signature, WrappedKey};

    fn identity(name: &str) -> Identity {
        Identity::generate(Profile::new(name, format!("{name}@example.com")))
    }

    #[test]
    fn test_every_recipient_recovers_the_key() {
        let ids: Vec<_> = ["alice", "bob", "carol"].iter().map(|n| identity(n)).collect();
        let invites: Vec<_> = ids.iter().map(Identity::invite).collect();
        let sealed = seal_for(&invites).unwrap();

        verify_all(&sealed.metadata).unwrap();
        for id in &ids {
            let key = unwrap_content_key(&sealed.metadata, id).unwrap();
            assert_eq!(key, sealed.content_key);
        }
    }

    #[test]
    fn test_order_preserved() {
        let ids = [identity("a"), identity("b")];
        let invites: Vec<_> = ids.iter().map(Identity::invite).collect();
        let meta = seal_for(&invites).unwrap().metadata;
        assert_eq!(candidates(&meta), invites);
    }

    #[test]
    fn test_non_recipient_denied() {
        let alice = identity("alice");
        let mallory = identity("mallory");
        let meta = seal_for(&[alice.invite()]).unwrap().metadata;

        assert!(find_recipient(&meta, &mallory).is_none());
        assert!(matches!(
            unwrap_content_key(&meta, &mallory),
            Err(PermsError::AccessDenied)
        ));
    }

    #[test]
    fn test_empty_set_rejected() {
        assert!(matches!(seal_for(&[]), Err(PermsError::NoRecipients)));
    }

    #[test]
    fn test_duplicate_rejected() {
        let alice = identity("alice");
        let result = seal_for(&[alice.invite(), alice.invite()]);
        assert!(matches!(result, Err(PermsError::DuplicateRecipient(pk)) if pk == alice.public_key()));
    }

    #[test]
    fn test_bad_candidate_rejected_before_wrapping() {
        let alice = identity("alice");
        let mut forged = identity("bob").invite();
        forged.email = "admin@example.com".into();

        let err = seal_for(&[alice.invite(), forged]).unwrap_err();
        match err {
            PermsError::InvalidSignature(SignatureFailure::Recipient { index, email }) => {
                assert_eq!(index, 1);
                assert_eq!(email, "admin@example.com");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_tampered_entry_breaks_metadata_signature() {
        let meta = seal_for(&[identity("alice").invite()]).unwrap().metadata;

        let mut tampered = meta.clone();
        tampered.recipients[0].handle = "eve".into();
        assert!(matches!(
            verify_all(&tampered),
            Err(PermsError::InvalidSignature(SignatureFailure::Metadata))
        ));

        let mut tampered = meta.clone();
        tampered.recipients[0].wrapped_key = WrappedKey::from_bytes(vec![0; 48]);
        assert!(matches!(
            verify_all(&tampered),
            Err(PermsError::InvalidSignature(SignatureFailure::Metadata))
        ));
    }

    #[test]
    fn test_resigned_forgery_fails_recipient_check() {
        // An attacker who re-signs the list with their own ephemeral key
        // still cannot forge a recipient's profile signature.
        let alice = identity("alice");
        let mut meta = seal_for(&[alice.invite()]).unwrap().metadata;
        meta.recipients[0].email = "eve@example.com".into();

        let attacker = Keypair::generate();
        meta.ephemeral_public = attacker.public_key();
        meta.signature = attacker.sign(&meta.signed_message());

        assert!(matches!(
            verify_all(&meta),
            Err(PermsError::InvalidSignature(SignatureFailure::Recipient { index: 0, .. }))
        ));
    }

    #[test]
    fn test_duplicate_in_signed_metadata_rejected() {
        let alice = identity("alice");
        let mut meta = seal_for(&[alice.invite()]).unwrap().metadata;
        let entry = meta.recipients[0].clone();
        meta.recipients.push(entry);

        let attacker = Keypair::generate();
        meta.ephemeral_public = attacker.public_key();
        meta.signature = attacker.sign(&meta.signed_message());

        assert!(matches!(
            verify_all(&meta),
            Err(PermsError::DuplicateRecipient(_))
        ));
    }

    #[test]
    fn test_rewrap_uses_fresh_ephemeral_key() {
        let invites = vec![identity("alice").invite()];
        let key = ContentKey::generate();
        let a = rewrap_for(&invites, &key).unwrap();
        let b = rewrap_for(&invites, &key).unwrap();
        assert_ne!(a.ephemeral_public, b.ephemeral_public);
        assert_ne!(a.recipients[0].wrapped_key, b.recipients[0].wrapped_key);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_any_signature_byte_flip_detected(byte in 0usize..64, bit in 0u8..8) {
            let meta = seal_for(&[identity("alice").invite()]).unwrap().metadata;
            let mut sig = *meta.signature.as_bytes();
            sig[byte] ^= 1 << bit;
            let tampered = EnvelopeMetadata { signature: Signature::from_bytes(sig), ..meta };
            prop_assert!(matches!(
                verify_all(&tampered),
                Err(PermsError::InvalidSignature(SignatureFailure::Metadata))
            ));
        }
    }
}

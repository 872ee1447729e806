//! Identities and recipient candidates.
//!
//! An [`Identity`] is one participant: a keypair plus a self-attested
//! profile (handle and email) signed by that keypair. Identities are created
//! once at enrollment and never mutated; a changed profile means a new
//! identity.
//!
//! A [`RecipientCandidate`] is the shareable half of an identity (public key,
//! profile, signature). It is what an "invite" carries and what a contact
//! book stores.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::profile_message;
use crate::crypto::{Keypair, PublicKey, SharedSecret, Signature, SECRET_KEY_SIZE};
use crate::error::CoreError;

/// Self-attested profile fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub handle: String,
    pub email: String,
}

impl Profile {
    /// Create a profile.
    pub fn new(handle: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            email: email.into(),
        }
    }

    /// Check the fields are usable at enrollment time.
    ///
    /// The handle must be non-empty and free of control characters. The
    /// email must look like `local@domain.tld`.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.handle.trim().is_empty() {
            return Err(CoreError::InvalidProfile("handle is empty".into()));
        }
        if self.handle.chars().any(char::is_control) {
            return Err(CoreError::InvalidProfile(
                "handle contains control characters".into(),
            ));
        }
        if !is_plausible_email(&self.email) {
            return Err(CoreError::InvalidProfile(format!(
                "invalid email: {}",
                self.email
            )));
        }
        Ok(())
    }
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|l| {
            !l.is_empty() && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
        && labels.last().map_or(false, |tld| {
            tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
        })
}

/// Verify that `signature` is `public_key`'s signature over `profile`.
pub fn verify_profile_signature(
    public_key: &PublicKey,
    profile: &Profile,
    signature: &Signature,
) -> Result<(), CoreError> {
    let message = profile_message(public_key, &profile.handle, &profile.email);
    public_key.verify(&message, signature)
}

/// One participant's keypair and signed profile.
#[derive(Clone)]
pub struct Identity {
    keypair: Keypair,
    profile: Profile,
    signature: Signature,
}

impl Identity {
    /// Create a new identity with a fresh keypair and self-sign its profile.
    pub fn generate(profile: Profile) -> Self {
        Self::from_keypair(Keypair::generate(), profile)
    }

    /// Create an identity from an existing keypair, signing the profile anew.
    pub fn from_keypair(keypair: Keypair, profile: Profile) -> Self {
        let message = profile_message(&keypair.public_key(), &profile.handle, &profile.email);
        let signature = keypair.sign(&message);
        Self {
            keypair,
            profile,
            signature,
        }
    }

    /// Rebuild a persisted identity.
    ///
    /// Fails with `InvalidSignature` if the stored signature does not verify
    /// against the public key derived from `seed`.
    pub fn from_parts(
        seed: &[u8; SECRET_KEY_SIZE],
        profile: Profile,
        signature: Signature,
    ) -> Result<Self, CoreError> {
        let keypair = Keypair::from_seed(seed);
        verify_profile_signature(&keypair.public_key(), &profile, &signature)?;
        Ok(Self {
            keypair,
            profile,
            signature,
        })
    }

    /// The identity's public key.
    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// The self-attested profile.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// The profile signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The secret seed, for persistence only.
    pub fn seed(&self) -> [u8; SECRET_KEY_SIZE] {
        self.keypair.seed()
    }

    /// Re-check the profile signature against the public key.
    pub fn verify_profile(&self) -> bool {
        verify_profile_signature(&self.public_key(), &self.profile, &self.signature).is_ok()
    }

    /// X25519 agreement between this identity's secret and `other`.
    pub fn derive_shared_secret(&self, other: &PublicKey) -> Result<SharedSecret, CoreError> {
        self.keypair.diffie_hellman(other)
    }

    /// The shareable half of this identity.
    pub fn invite(&self) -> RecipientCandidate {
        RecipientCandidate {
            public_key: self.public_key(),
            handle: self.profile.handle.clone(),
            email: self.profile.email.clone(),
            signature: self.signature,
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("public_key", &self.public_key())
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

/// A prospective recipient: public key, profile and profile signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipientCandidate {
    #[serde(rename = "pub")]
    pub public_key: PublicKey,
    pub handle: String,
    pub email: String,
    #[serde(rename = "sig")]
    pub signature: Signature,
}

impl RecipientCandidate {
    /// The candidate's profile fields.
    pub fn profile(&self) -> Profile {
        Profile::new(self.handle.clone(), self.email.clone())
    }

    /// Verify the candidate's profile signature.
    pub fn verify(&self) -> Result<(), CoreError> {
        verify_profile_signature(&self.public_key, &self.profile(), &self.signature)
    }

    /// Render as pretty JSON, the invite exchange format.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("candidate serialization is infallible")
    }

    /// Parse an invite and verify its signature.
    pub fn from_json(s: &str) -> Result<Self, CoreError> {
        let candidate: Self =
            serde_json::from_str(s).map_err(|e| CoreError::DecodingError(e.to_string()))?;
        candidate.verify()?;
        Ok(candidate)
    }
}

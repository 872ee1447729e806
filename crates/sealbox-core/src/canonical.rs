//! Canonical CBOR encoding of signed messages.
//!
//! Signatures never cover the metadata text as written to disk (whitespace,
//! key order and base64 layout may differ between writers). They cover a
//! deterministic CBOR rendering instead:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//!
//! Each message is prefixed with a domain tag so a profile signature can
//! never be replayed as a recipients-list signature or vice versa.

use ciborium::value::Value;

use crate::crypto::PublicKey;
use crate::types::RecipientEntry;

/// Domain tag for profile self-signatures.
pub const PROFILE_DOMAIN: &[u8] = b"sealbox-v1 profile\0";

/// Domain tag for the envelope's recipients-list signature.
pub const RECIPIENTS_DOMAIN: &[u8] = b"sealbox-v1 recipients\0";

/// Field names shared by profile and recipient maps.
mod keys {
    pub const PUB: &str = "pub";
    pub const HANDLE: &str = "handle";
    pub const EMAIL: &str = "email";
    pub const SIG: &str = "sig";
    pub const ENC: &str = "enc";
}

/// The message an identity signs to attest its profile.
pub fn profile_message(public_key: &PublicKey, handle: &str, email: &str) -> Vec<u8> {
    let value = profile_to_cbor_value(public_key, handle, email);
    let mut buf = PROFILE_DOMAIN.to_vec();
    encode_value_to(&mut buf, &value);
    buf
}

/// The message an envelope's ephemeral key signs over its recipients.
pub fn recipients_message(recipients: &[RecipientEntry]) -> Vec<u8> {
    let entries: Vec<Value> = recipients.iter().map(recipient_to_cbor_value).collect();
    let mut buf = RECIPIENTS_DOMAIN.to_vec();
    encode_value_to(&mut buf, &Value::Array(entries));
    buf
}

fn text(key: &str) -> Value {
    Value::Text(key.to_string())
}

fn profile_to_cbor_value(public_key: &PublicKey, handle: &str, email: &str) -> Value {
    Value::Map(vec![
        (text(keys::PUB), Value::Bytes(public_key.0.to_vec())),
        (text(keys::HANDLE), Value::Text(handle.to_string())),
        (text(keys::EMAIL), Value::Text(email.to_string())),
    ])
}

fn recipient_to_cbor_value(entry: &RecipientEntry) -> Value {
    Value::Map(vec![
        (text(keys::PUB), Value::Bytes(entry.public_key.0.to_vec())),
        (text(keys::HANDLE), Value::Text(entry.handle.clone())),
        (text(keys::EMAIL), Value::Text(entry.email.clone())),
        (text(keys::SIG), Value::Bytes(entry.signature.0.to_vec())),
        (text(keys::ENC), Value::Bytes(entry.wrapped_key.as_bytes().to_vec())),
    ])
}

/// Recursively encode a CBOR value.
///
/// Only the value kinds produced above are supported.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value_to(buf, item);
            }
        }
        Value::Map(entries) => {
            encode_map_canonical(buf, entries);
        }
        _ => unreachable!("signed messages only contain bytes, text, arrays and maps"),
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut key_value_pairs: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value_to(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, key_value_pairs.len() as u64);

    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}

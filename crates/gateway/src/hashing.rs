// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Token secret hashing: `sha256(salt || secret)`, constant-time verify
//! (spec §4.4). The plaintext secret is minted here and returned once; only
//! its hash and salt are ever persisted.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const SALT_BYTES: usize = 16;
const SECRET_BYTES: usize = 32;

/// A freshly minted secret and the salt/hash pair that gets persisted.
pub struct MintedSecret {
    pub plaintext: String,
    pub salt: String,
    pub secret_hash: String,
}

pub fn mint_secret() -> MintedSecret {
    let mut salt_bytes = [0u8; SALT_BYTES];
    let mut secret_bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    rand::thread_rng().fill_bytes(&mut secret_bytes);

    let salt = BASE64.encode(salt_bytes);
    let plaintext = BASE64.encode(secret_bytes);
    let secret_hash = hash_secret(&salt, &plaintext);

    MintedSecret { plaintext, salt, secret_hash }
}

pub fn hash_secret(salt: &str, plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(plaintext.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Constant-time comparison of a candidate secret against the stored hash.
pub fn verify_secret(salt: &str, candidate: &str, expected_hash: &str) -> bool {
    let candidate_hash = hash_secret(salt, candidate);
    let a = candidate_hash.as_bytes();
    let b = expected_hash.as_bytes();
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_secret_verifies_against_its_own_hash() {
        let minted = mint_secret();
        assert!(verify_secret(&minted.salt, &minted.plaintext, &minted.secret_hash));
    }

    #[test]
    fn wrong_secret_does_not_verify() {
        let minted = mint_secret();
        assert!(!verify_secret(&minted.salt, "not-the-secret", &minted.secret_hash));
    }

    #[test]
    fn two_mints_never_collide() {
        let a = mint_secret();
        let b = mint_secret();
        assert_ne!(a.plaintext, b.plaintext);
        assert_ne!(a.salt, b.salt);
    }
}

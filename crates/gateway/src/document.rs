// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! In-memory token document: pure mutations over a small `Vec<Token>`, the
//! same shape as `hack_registry::RegistryDocument`.

use serde::{Deserialize, Serialize};

use hack_core::{Clock, Scope, Token, TokenId};

use crate::error::GatewayError;
use crate::hashing::{mint_secret, verify_secret, MintedSecret};

fn default_version() -> u32 {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub tokens: Vec<Token>,
}

impl TokenDocument {
    pub fn new() -> Self {
        Self { version: default_version(), tokens: Vec::new() }
    }

    pub fn find(&self, id: &TokenId) -> Option<&Token> {
        self.tokens.iter().find(|t| &t.id == id)
    }

    /// Mint a fresh token, returning the stored record and the plaintext
    /// secret — the only time the secret is ever visible.
    pub fn mint(
        &mut self,
        scope: Scope,
        description: Option<String>,
        clock: &dyn Clock,
    ) -> (Token, String) {
        let MintedSecret { plaintext, salt, secret_hash } = mint_secret();
        let token = Token {
            id: TokenId::new(),
            salt,
            secret_hash,
            scope,
            created_at_ms: clock.now_ms(),
            description,
        };
        self.tokens.push(token.clone());
        (token, plaintext)
    }

    pub fn revoke(&mut self, id: &TokenId) -> Result<Token, GatewayError> {
        let idx = self.tokens.iter().position(|t| &t.id == id).ok_or_else(|| GatewayError::TokenNotFound(id.to_string()))?;
        Ok(self.tokens.remove(idx))
    }

    /// Verify `id`/`secret` against the stored hash in constant time.
    pub fn verify(&self, id: &TokenId, secret: &str) -> Result<&Token, GatewayError> {
        let token = self.find(id).ok_or(GatewayError::InvalidToken)?;
        if verify_secret(&token.salt, secret, &token.secret_hash) {
            Ok(token)
        } else {
            Err(GatewayError::InvalidToken)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hack_core::FakeClock;

    #[test]
    fn mint_then_verify_round_trips() {
        let mut doc = TokenDocument::new();
        let clock = FakeClock::new(1_000);
        let (token, plaintext) = doc.mint(Scope::Write, Some("ci".into()), &clock);
        let verified = doc.verify(&token.id, &plaintext).expect("should verify");
        assert_eq!(verified.id, token.id);
        assert_eq!(verified.scope, Scope::Write);
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let mut doc = TokenDocument::new();
        let clock = FakeClock::new(0);
        let (token, _plaintext) = doc.mint(Scope::Read, None, &clock);
        assert!(doc.verify(&token.id, "wrong").is_err());
    }

    #[test]
    fn verify_rejects_unknown_token_id() {
        let doc = TokenDocument::new();
        assert!(doc.verify(&TokenId::new(), "anything").is_err());
    }

    #[test]
    fn revoke_removes_the_token_so_it_no_longer_verifies() {
        let mut doc = TokenDocument::new();
        let clock = FakeClock::new(0);
        let (token, plaintext) = doc.mint(Scope::Write, None, &clock);
        doc.revoke(&token.id).expect("revoke should succeed");
        assert!(doc.verify(&token.id, &plaintext).is_err());
    }

    #[test]
    fn revoke_unknown_token_is_not_found() {
        let mut doc = TokenDocument::new();
        assert!(matches!(doc.revoke(&TokenId::new()), Err(GatewayError::TokenNotFound(_))));
    }
}

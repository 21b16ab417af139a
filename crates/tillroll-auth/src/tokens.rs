// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Access and refresh token storage.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tillroll_core::error::Result;

/// Tokens of the signed-in account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Shared token store. Optionally mirrored to a JSON file so a CLI session
/// survives restarts.
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: RwLock<AuthTokens>,
    path: Option<PathBuf>,
}

impl TokenStore {
    /// In-memory store, starting signed out.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: AuthTokens) -> Self {
        Self {
            tokens: RwLock::new(tokens),
            path: None,
        }
    }

    /// Store backed by `path`. A missing or unreadable file means signed out.
    pub fn persistent(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let tokens = match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring unreadable session file");
                AuthTokens::default()
            }),
            Err(_) => AuthTokens::default(),
        };
        Self {
            tokens: RwLock::new(tokens),
            path: Some(path),
        }
    }

    pub fn tokens(&self) -> AuthTokens {
        self.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.read().access_token.is_some()
    }

    /// Replace both tokens (after sign-in).
    pub fn set(&self, access_token: String, refresh_token: Option<String>) -> Result<()> {
        {
            let mut tokens = self.write();
            tokens.access_token = Some(access_token);
            tokens.refresh_token = refresh_token;
        }
        self.persist()
    }

    /// Replace the access token after a refresh. A rotated refresh token
    /// replaces the old one; otherwise the old one is kept.
    pub fn renew(&self, access_token: String, refresh_token: Option<String>) -> Result<()> {
        {
            let mut tokens = self.write();
            tokens.access_token = Some(access_token);
            if refresh_token.is_some() {
                tokens.refresh_token = refresh_token;
            }
        }
        debug!("access token renewed");
        self.persist()
    }

    /// Forget both tokens.
    pub fn sign_out(&self) {
        *self.write() = AuthTokens::default();
        info!("signed out");
        if let Err(e) = self.persist() {
            warn!(error = %e, "failed to clear session file");
        }
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&*self.read())?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, AuthTokens> {
        self.tokens.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AuthTokens> {
        self.tokens.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renew_keeps_refresh_token_unless_rotated() {
        let store = TokenStore::new();
        store.set("a1".into(), Some("r1".into())).unwrap();
        store.renew("a2".into(), None).unwrap();
        assert_eq!(store.access_token().as_deref(), Some("a2"));
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));
        store.renew("a3".into(), Some("r2".into())).unwrap();
        assert_eq!(store.refresh_token().as_deref(), Some("r2"));
    }

    #[test]
    fn sign_out_clears_everything() {
        let store = TokenStore::with_tokens(AuthTokens {
            access_token: Some("a".into()),
            refresh_token: Some("r".into()),
        });
        assert!(store.is_signed_in());
        store.sign_out();
        assert!(!store.is_signed_in());
        assert_eq!(store.tokens(), AuthTokens::default());
    }

    #[test]
    fn persistent_store_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = TokenStore::persistent(&path);
        assert!(!store.is_signed_in());
        store.set("a".into(), Some("r".into())).unwrap();

        let reloaded = TokenStore::persistent(&path);
        assert_eq!(reloaded.access_token().as_deref(), Some("a"));

        reloaded.sign_out();
        assert!(!TokenStore::persistent(&path).is_signed_in());
    }

    #[test]
    fn corrupt_session_file_means_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(!TokenStore::persistent(&path).is_signed_in());
    }
}

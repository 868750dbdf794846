use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{AppError, AppResult};

use super::claims::{decode_claims, Claims};
use super::clock::Clock;
use super::storage::{TokenStorage, ACCESS_TOKEN_KEY};

/// Immutable snapshot of the signed-in identity. Token and claims always travel together;
/// a new sign-in replaces the whole snapshot.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    claims: Claims,
}

impl Session {
    fn decode(token: &str) -> AppResult<Self> {
        let claims = decode_claims(token)?;
        Ok(Self { token: token.to_string(), claims })
    }

    pub fn token(&self) -> &str { &self.token }
    pub fn claims(&self) -> &Claims { &self.claims }
    pub fn subject(&self) -> &str { &self.claims.sub }
    pub fn is_admin(&self) -> bool { self.claims.admin }
    pub fn expires_at(&self) -> i64 { self.claims.exp }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("sub", &self.claims.sub)
            .field("exp", &self.claims.exp)
            .field("admin", &self.claims.admin)
            .finish()
    }
}

/// Fail-closed expiry check: undecodable tokens count as expired.
pub fn is_token_expired(token: &str, now_secs: i64) -> bool {
    match decode_claims(token) {
        Ok(c) => c.exp < now_secs,
        Err(_) => true,
    }
}

/// Single authority for the authenticated identity of one client instance.
pub struct SessionManager {
    storage: Arc<dyn TokenStorage>,
    clock: Arc<dyn Clock>,
    current: RwLock<Option<Arc<Session>>>,
}

impl SessionManager {
    pub fn new(storage: Arc<dyn TokenStorage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock, current: RwLock::new(None) }
    }

    /// Restore the session from storage. A stored token that does not decode is purged.
    /// No network access; calling it again just re-reads storage.
    pub fn initialize(&self) -> AppResult<()> {
        let Some(token) = self.storage.get(ACCESS_TOKEN_KEY)? else {
            *self.current.write() = None;
            return Ok(());
        };
        match Session::decode(&token) {
            Ok(sess) => {
                tracing::debug!(target: "postboard::session", "session.restore sub={} exp={}", sess.subject(), sess.expires_at());
                *self.current.write() = Some(Arc::new(sess));
            }
            Err(e) => {
                tracing::warn!(target: "postboard::session", "stored token discarded: {}", e.message());
                self.storage.remove(ACCESS_TOKEN_KEY)?;
                *self.current.write() = None;
            }
        }
        Ok(())
    }

    /// Adopt a freshly issued token. An undecodable token is refused and nothing is stored.
    pub fn sign_in(&self, token: &str) -> AppResult<Arc<Session>> {
        let sess = Arc::new(Session::decode(token)?);
        self.storage.set(ACCESS_TOKEN_KEY, token)?;
        *self.current.write() = Some(sess.clone());
        tracing::info!(target: "postboard::session", "session.sign_in sub={} exp={}", sess.subject(), sess.expires_at());
        Ok(sess)
    }

    /// Clear the session and its persisted copy. No-op when signed out.
    pub fn sign_out(&self) -> AppResult<()> {
        let prev = self.current.write().take();
        // storage may hold a token even when memory does not (e.g. before initialize)
        self.storage.remove(ACCESS_TOKEN_KEY)?;
        if let Some(p) = prev {
            tracing::info!(target: "postboard::session", "session.sign_out sub={}", p.subject());
        }
        Ok(())
    }

    /// Forced sign-out after the session was found unusable. Memory is always cleared; a storage
    /// failure is logged and does not replace the caller's auth error.
    pub fn invalidate(&self, reason: &str) {
        let prev = self.current.write().take();
        let sub = prev.as_ref().map(|p| p.subject().to_string()).unwrap_or_default();
        tracing::info!(target: "postboard::session", "session.invalidate sub={} reason={}", sub, reason);
        if let Err(e) = self.storage.remove(ACCESS_TOKEN_KEY) {
            tracing::warn!(target: "postboard::session", "could not remove stored token after {}: {}", reason, e);
        }
    }

    pub fn is_expired(&self, token: &str) -> bool { is_token_expired(token, self.clock.now_secs()) }

    pub fn current(&self) -> Option<Arc<Session>> { self.current.read().clone() }
    pub fn token(&self) -> Option<String> { self.current.read().as_ref().map(|s| s.token.clone()) }
    pub fn claims(&self) -> Option<Claims> { self.current.read().as_ref().map(|s| s.claims.clone()) }
    pub fn is_signed_in(&self) -> bool { self.current.read().is_some() }

    /// Gate for privileged actions: a missing or expired session is signed out before any
    /// request is attempted.
    pub fn require_active(&self) -> AppResult<Arc<Session>> {
        let Some(sess) = self.current() else {
            self.invalidate("not_signed_in");
            return Err(AppError::auth("not_signed_in", "sign in to continue"));
        };
        if self.is_expired(sess.token()) {
            tracing::debug!(target: "postboard::session", "session expired exp={}", sess.expires_at());
            self.invalidate("session_expired");
            return Err(AppError::auth("session_expired", "session has expired"));
        }
        Ok(sess)
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sub = self.current.read().as_ref().map(|s| s.subject().to_string());
        f.debug_struct("SessionManager").field("subject", &sub).finish()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;

//! Authentication boundary.
//!
//! The sign-in protocol itself lives outside this crate. What the core needs
//! is the current principal and a stream of principal changes, which the
//! sync controller treats as the trigger for session start and teardown.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

use crate::remote::RemoteError;

/// The authenticated user all collections are scoped to.
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
    pub uid: String,
    /// Bearer credential used by network-backed remote stores.
    pub token: Option<String>,
}

impl Principal {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("uid", &self.uid)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Shared handle on the signed-in principal.
#[derive(Clone)]
pub struct AuthSession {
    state: Arc<watch::Sender<Option<Principal>>>,
}

impl AuthSession {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            state: Arc::new(tx),
        }
    }

    pub fn sign_in(&self, principal: Principal) {
        tracing::debug!("Signed in as {}", principal.uid);
        self.state.send_replace(Some(principal));
    }

    pub fn sign_out(&self) {
        tracing::debug!("Signed out");
        self.state.send_replace(None);
    }

    pub fn current(&self) -> Option<Principal> {
        self.state.borrow().clone()
    }

    /// Returns the current principal or `Unauthenticated`.
    pub fn require(&self) -> Result<Principal, RemoteError> {
        self.current().ok_or(RemoteError::Unauthenticated)
    }

    /// Stream of principal changes. The current value counts as already seen.
    pub fn on_auth_state_change(&self) -> watch::Receiver<Option<Principal>> {
        self.state.subscribe()
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_without_principal() {
        let auth = AuthSession::new();
        assert!(matches!(auth.require(), Err(RemoteError::Unauthenticated)));
    }

    #[test]
    fn test_sign_in_and_out() {
        let auth = AuthSession::new();
        let mut changes = auth.on_auth_state_change();

        auth.sign_in(Principal::new("u1"));
        assert!(changes.has_changed().unwrap());
        assert_eq!(
            changes.borrow_and_update().as_ref().map(|p| p.uid.as_str()),
            Some("u1")
        );

        auth.sign_out();
        assert!(auth.current().is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let principal = Principal::new("u1").with_token("secret");
        let output = format!("{:?}", principal);
        assert!(!output.contains("secret"));
        assert!(output.contains("u1"));
    }
}

//! Per-UI-session credential state.
//!
//! Each browser tab (or CLI invocation) owns one [`SessionContext`] and passes
//! it into every orchestrator call; nothing reads an ambient "current user".

use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::guard::Status;
use crate::model::{AuthSession, Identity};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CredentialState {
    Anonymous,
    /// A credential operation is in flight; further submits are refused.
    Authenticating,
    PendingConfirmation { email: String },
    ResetRequested { email: String },
    Authenticated { identity: Identity },
}

#[derive(Debug)]
struct Inner {
    state: CredentialState,
    session: Option<AuthSession>,
}

#[derive(Debug)]
pub struct SessionContext {
    inner: Mutex<Inner>,
}

impl SessionContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: CredentialState::Anonymous,
                session: None,
            }),
        }
    }

    /// A context that is already signed in.
    #[must_use]
    pub fn with_session(session: AuthSession) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: CredentialState::Authenticated {
                    identity: session.identity.clone(),
                },
                session: Some(session),
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn state(&self) -> CredentialState {
        self.inner().state.clone()
    }

    #[must_use]
    pub fn status(&self) -> Status {
        if self.inner().state == CredentialState::Authenticating {
            Status::Pending
        } else {
            Status::Idle
        }
    }

    #[must_use]
    pub fn session(&self) -> Option<AuthSession> {
        self.inner().session.clone()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner()
            .session
            .as_ref()
            .map(|session| session.identity.clone())
    }

    /// Forget the local session, e.g. after the provider reports it expired.
    pub(crate) fn clear(&self) {
        let mut inner = self.inner();
        inner.state = CredentialState::Anonymous;
        inner.session = None;
    }

    /// Enter `Authenticating`. `None` if a credential operation is already in
    /// flight for this context.
    pub(crate) fn begin(&self) -> Option<CredentialAttempt<'_>> {
        let mut inner = self.inner();
        if inner.state == CredentialState::Authenticating {
            return None;
        }
        let previous = std::mem::replace(&mut inner.state, CredentialState::Authenticating);
        Some(CredentialAttempt {
            context: self,
            previous: Some(previous),
        })
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// An in-flight credential operation. Dropping it without calling
/// [`CredentialAttempt::finish`] restores the previous state.
pub(crate) struct CredentialAttempt<'a> {
    context: &'a SessionContext,
    previous: Option<CredentialState>,
}

impl CredentialAttempt<'_> {
    pub(crate) fn finish(mut self, state: CredentialState, session: Option<AuthSession>) {
        self.previous = None;
        let mut inner = self.context.inner();
        inner.state = state;
        inner.session = session;
    }
}

impl Drop for CredentialAttempt<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.context.inner().state = previous;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn session() -> AuthSession {
        AuthSession {
            identity: Identity {
                id: "user-1".to_string(),
                email: "a@b.com".to_string(),
                verified: true,
            },
            access_token: SecretString::from("token".to_string()),
        }
    }

    #[test]
    fn begin_refuses_while_authenticating() {
        let context = SessionContext::new();
        let attempt = context.begin();
        assert!(attempt.is_some());
        assert_eq!(context.status(), Status::Pending);
        assert!(context.begin().is_none());
    }

    #[test]
    fn dropped_attempt_restores_previous_state() {
        let context = SessionContext::new();
        drop(context.begin());
        assert_eq!(context.state(), CredentialState::Anonymous);
        assert_eq!(context.status(), Status::Idle);
    }

    #[test]
    fn finish_sets_state_and_session() {
        let context = SessionContext::new();
        if let Some(attempt) = context.begin() {
            let session = session();
            attempt.finish(
                CredentialState::Authenticated {
                    identity: session.identity.clone(),
                },
                Some(session),
            );
        }
        assert_eq!(
            context.identity().map(|identity| identity.id),
            Some("user-1".to_string())
        );
        assert!(matches!(
            context.state(),
            CredentialState::Authenticated { .. }
        ));

        context.clear();
        assert_eq!(context.state(), CredentialState::Anonymous);
        assert!(context.session().is_none());
    }

    #[test]
    fn with_session_starts_authenticated() {
        let context = SessionContext::with_session(session());
        assert_eq!(context.status(), Status::Idle);
        assert!(context.identity().is_some());
    }
}

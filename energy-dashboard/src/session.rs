//! Session state holder: who is logged in, and with which credential.
//!
//! A [`Session`] is constructed once at startup and passed to whatever needs
//! it. `login` and `logout` are the only mutators; both write the durable
//! store and swap the in-memory state in one step, so nothing ever observes a
//! token without an identity or the other way round.

use std::sync::Arc;

use energy_client::{AuthInvalidHandler, CredentialSource};
use tokio::sync::watch;

use crate::storage::KeyValueStore;

pub const TOKEN_KEY: &str = "token";
pub const IDENTITY_KEY: &str = "email";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    pub token: String,
    pub identity: String,
}

/// Snapshot of the session. Either fully authenticated or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState(Option<Authenticated>);

impl SessionState {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn authenticated(token: impl Into<String>, identity: impl Into<String>) -> Self {
        Self(Some(Authenticated {
            token: token.into(),
            identity: identity.into(),
        }))
    }

    pub fn token(&self) -> Option<&str> {
        self.0.as_ref().map(|a| a.token.as_str())
    }

    pub fn identity(&self) -> Option<&str> {
        self.0.as_ref().map(|a| a.identity.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }
}

pub struct Session {
    store: Arc<dyn KeyValueStore>,
    state: watch::Sender<SessionState>,
}

impl Session {
    /// An empty session backed by `store`. The store is not read.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(SessionState::empty());
        Self { store, state }
    }

    /// Rehydrate from durable storage. Both keys must be present; a lone key
    /// is discarded.
    pub fn restore(store: Arc<dyn KeyValueStore>) -> Self {
        let token = store.get(TOKEN_KEY);
        let identity = store.get(IDENTITY_KEY);

        let initial = match (token, identity) {
            (Some(token), Some(identity)) => {
                tracing::debug!(identity = %identity, "session restored");
                SessionState::authenticated(token, identity)
            }
            (None, None) => SessionState::empty(),
            _ => {
                tracing::warn!("session store held only one of token/email, clearing it");
                store.remove_many(&[TOKEN_KEY, IDENTITY_KEY]);
                SessionState::empty()
            }
        };

        let (state, _) = watch::channel(initial);
        Self { store, state }
    }

    pub fn login(&self, token: &str, identity: &str) {
        self.store.set_many(&[(TOKEN_KEY, token), (IDENTITY_KEY, identity)]);
        self.state.send_replace(SessionState::authenticated(token, identity));
        tracing::info!(identity, "logged in");
    }

    pub fn logout(&self) {
        self.store.remove_many(&[TOKEN_KEY, IDENTITY_KEY]);
        let previous = self.state.send_replace(SessionState::empty());
        tracing::info!(was_authenticated = previous.is_authenticated(), "logged out");
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Observe every transition. A change to the empty state is the cue to
    /// send the user back to the login entry point.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Handler to hand to the API client: a rejected credential logs out.
    pub fn auth_invalid_handler(self: &Arc<Self>) -> AuthInvalidHandler {
        let session = Arc::clone(self);
        Arc::new(move || session.logout())
    }
}

impl CredentialSource for Session {
    fn bearer_token(&self) -> Option<String> {
        self.state.borrow().token().map(str::to_string)
    }
}

//! Session lifecycle: credential ownership and identity resolution.
//!
//! ```text
//! ANONYMOUS --login--> AUTHENTICATED --identity failure--> REJECTED --purge--> ANONYMOUS
//!     ^                      |
//!     +-------logout---------+
//! ```
//!
//! The credential and the resolved identity live only here; every other
//! component reads them through [`SessionManager`].

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::api::DashboardApi;
use crate::credential::{Credential, CredentialStore, CredentialStoreError};
use crate::error::{ActionError, ApiError, InputError};
use crate::models::{Identity, LoginRequest, RegisterRequest, Role};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_NAME_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Anonymous,
    Authenticating,
    Authenticated,
    Rejected,
}

impl SessionPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated(Identity),
    Rejected,
}

impl SessionState {
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        match self {
            Self::Anonymous => SessionPhase::Anonymous,
            Self::Authenticating => SessionPhase::Authenticating,
            Self::Authenticated(_) => SessionPhase::Authenticated,
            Self::Rejected => SessionPhase::Rejected,
        }
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }
}

/// Outcome of one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResolution {
    pub identity: Option<Identity>,
    /// Set when a stored credential was rejected and purged during this pass.
    pub rejected: Option<ApiError>,
}

impl SessionResolution {
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.identity.as_ref().map(|identity| identity.role)
    }
}

/// A successful login.
#[derive(Debug)]
pub struct LoginOutcome {
    pub identity: Identity,
    /// Set when the credential could not be written to the store. The
    /// session then ends with this process.
    pub persist_error: Option<CredentialStoreError>,
}

#[derive(Debug)]
struct SessionInner {
    credential: Option<Credential>,
    state: SessionState,
    /// Bumped on every credential change so late identity responses for a
    /// replaced credential are ignored.
    generation: u64,
}

pub struct SessionManager {
    api: DashboardApi,
    store: Arc<dyn CredentialStore>,
    inner: RwLock<SessionInner>,
}

impl SessionManager {
    /// Restores any persisted credential. No identity is resolved yet.
    pub fn new(
        api: DashboardApi,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, CredentialStoreError> {
        let credential = store.load_credential()?;
        debug!(restored = credential.is_some(), "session created");
        Ok(Self {
            api,
            store,
            inner: RwLock::new(SessionInner {
                credential,
                state: SessionState::Anonymous,
                generation: 0,
            }),
        })
    }

    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        self.read().credential.clone()
    }

    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.read().credential.is_some()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.read().state.clone()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.read().state.phase()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.read().state.identity().cloned()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.phase() == SessionPhase::Authenticated
    }

    /// Derives the identity from the current credential.
    ///
    /// Any failure of the identity call purges the credential in this same
    /// pass, so a rejected credential never outlives one resolution cycle.
    pub async fn resolve(&self) -> SessionResolution {
        let mut rejected = None;
        loop {
            let (credential, generation) = {
                let mut inner = self.write();
                let Some(credential) = inner.credential.clone() else {
                    inner.state = SessionState::Anonymous;
                    return SessionResolution {
                        identity: None,
                        rejected,
                    };
                };
                inner.state = SessionState::Authenticating;
                (credential, inner.generation)
            };

            let outcome = self.api.me(Some(&credential)).await;

            let mut inner = self.write();
            if inner.generation != generation {
                debug!("credential changed during identity resolution; resolving again");
                continue;
            }
            match outcome {
                Ok(identity) => {
                    info!(role = identity.role.as_str(), "session authenticated");
                    inner.state = SessionState::Authenticated(identity.clone());
                    return SessionResolution {
                        identity: Some(identity),
                        rejected,
                    };
                }
                Err(error) => {
                    warn!(
                        status = error.status_code,
                        kind = error.kind.as_str(),
                        message = %error.message,
                        "identity resolution failed; purging credential"
                    );
                    inner.state = SessionState::Rejected;
                    self.purge_locked(&mut inner);
                    rejected = Some(error);
                }
            }
        }
    }

    /// Exchanges credentials for a token, persists it, and resolves identity.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, ActionError> {
        let request = LoginRequest {
            email: normalize_email(email)?,
            password: require_password(password)?,
        };
        let token = self.api.login(&request).await?;
        let credential = Credential::new(token.access_token)
            .ok_or_else(|| ApiError::decode(0, "login response carried an empty access token"))?;

        let persist_error = {
            let mut inner = self.write();
            let persisted = self.store.persist_credential(&credential);
            inner.credential = Some(credential);
            inner.generation += 1;
            persisted.err()
        };
        if let Some(error) = &persist_error {
            warn!(%error, "failed to persist credential; session will not survive reload");
        }

        let resolution = self.resolve().await;
        match (resolution.identity, resolution.rejected) {
            (Some(identity), _) => Ok(LoginOutcome {
                identity,
                persist_error,
            }),
            (None, Some(error)) => Err(error.into()),
            (None, None) => Err(ApiError::transport("session was cleared during login").into()),
        }
    }

    /// Creates an account. The session itself is left untouched.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, ActionError> {
        let name = name.trim();
        if name.chars().count() < MIN_NAME_LEN {
            return Err(InputError::NameTooShort { min: MIN_NAME_LEN }.into());
        }
        let password = require_password(password)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(InputError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            }
            .into());
        }
        let request = RegisterRequest {
            name: name.to_string(),
            email: normalize_email(email)?,
            password,
        };
        Ok(self.api.register(&request).await?)
    }

    /// Drops the credential. The caller re-runs resolution and dispatch.
    pub fn logout(&self) {
        let mut inner = self.write();
        self.purge_locked(&mut inner);
        inner.state = SessionState::Anonymous;
        info!("session logged out");
    }

    fn purge_locked(&self, inner: &mut SessionInner) {
        inner.credential = None;
        inner.generation += 1;
        if let Err(error) = self.store.clear_credential() {
            warn!(%error, "failed to clear persisted credential");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn normalize_email(raw: &str) -> Result<String, InputError> {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(InputError::EmptyEmail);
    }
    Ok(normalized)
}

fn require_password(raw: &str) -> Result<String, InputError> {
    if raw.is_empty() {
        return Err(InputError::EmptyPassword);
    }
    Ok(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_lowercases_and_trims() {
        assert_eq!(
            normalize_email("  Asha@Example.COM ").expect("valid email"),
            "asha@example.com"
        );
        assert_eq!(normalize_email("   "), Err(InputError::EmptyEmail));
    }

    #[test]
    fn phases_have_stable_names() {
        assert_eq!(SessionState::Anonymous.phase().as_str(), "anonymous");
        assert_eq!(SessionState::Rejected.phase().as_str(), "rejected");
        assert_eq!(SessionState::Authenticating.identity(), None);
    }
}

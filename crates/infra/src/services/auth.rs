use std::sync::{Arc, OnceLock};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use bizadmin_auth::{
    JwtSigner, JwtValidator, Principal, Role, SessionClaims, TokenError, hash_password,
    verify_password,
};
use bizadmin_core::{DomainError, DomainResult, UserId};

use crate::store::{StoreError, UserAccount, UserStore};

pub const INVALID_CREDENTIALS: &str = "invalid credentials";
const INVALID_SESSION: &str = "invalid or expired session";

/// Hash checked when the email is unknown, so both paths cost one Argon2 run.
fn placeholder_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| {
        hash_password("placeholder-password").unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to build placeholder password hash");
            String::new()
        })
    })
}

/// Public view of the signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&UserAccount> for SessionUser {
    fn from(account: &UserAccount) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: SessionUser,
    pub token: String,
}

/// Why a login or session check failed. Logged, never returned to callers.
#[derive(Debug, Error)]
enum AuthFailure {
    #[error("no account for the supplied email")]
    UnknownEmail,

    #[error("password does not match")]
    WrongPassword,

    #[error("account {0} no longer exists")]
    UnknownAccount(UserId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("password check did not complete: {0}")]
    Verifier(#[from] tokio::task::JoinError),
}

/// Credential checks and session token issuance/verification.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    signer: Arc<dyn JwtSigner>,
    validator: Arc<dyn JwtValidator>,
    token_ttl: chrono::Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        signer: Arc<dyn JwtSigner>,
        validator: Arc<dyn JwtValidator>,
        token_ttl: chrono::Duration,
    ) -> Self {
        Self {
            users,
            signer,
            validator,
            token_ttl,
        }
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        self.token_ttl
    }

    /// Verify credentials and mint a session token.
    ///
    /// Every failure surfaces as the same `Unauthorized` error.
    pub async fn login(&self, email: &str, password: &str) -> DomainResult<LoginOutcome> {
        match self.try_login(email, password).await {
            Ok(outcome) => {
                tracing::info!(user_id = %outcome.user.id, "login succeeded");
                Ok(outcome)
            }
            Err(failure) => {
                match &failure {
                    AuthFailure::Store(_) | AuthFailure::Token(_) | AuthFailure::Verifier(_) => {
                        tracing::error!(error = %failure, "login failed")
                    }
                    _ => tracing::warn!(reason = %failure, "login rejected"),
                }
                Err(DomainError::unauthorized(INVALID_CREDENTIALS))
            }
        }
    }

    async fn try_login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthFailure> {
        let account = self.users.find_by_email(email).await?;

        let stored_hash = match &account {
            Some(account) => account.password_hash.clone(),
            None => placeholder_hash().to_string(),
        };
        let candidate = password.to_string();
        let matches =
            tokio::task::spawn_blocking(move || verify_password(&candidate, &stored_hash)).await?;

        let account = account.ok_or(AuthFailure::UnknownEmail)?;
        if !matches {
            return Err(AuthFailure::WrongPassword);
        }

        let claims = SessionClaims::for_principal(&account.principal(), Utc::now(), self.token_ttl);
        let token = self.signer.sign(&claims)?;

        Ok(LoginOutcome {
            user: SessionUser::from(&account),
            token,
        })
    }

    /// Resolve a session token to the account it belongs to.
    ///
    /// The account is re-loaded so a deleted user loses access immediately.
    pub async fn authenticate(&self, token: &str) -> DomainResult<Principal> {
        match self.try_authenticate(token).await {
            Ok(principal) => Ok(principal),
            Err(failure) => {
                match &failure {
                    AuthFailure::Store(_) => tracing::error!(error = %failure, "session check failed"),
                    _ => tracing::debug!(reason = %failure, "session rejected"),
                }
                Err(DomainError::unauthorized(INVALID_SESSION))
            }
        }
    }

    async fn try_authenticate(&self, token: &str) -> Result<Principal, AuthFailure> {
        let claims = self.validator.validate(token, Utc::now())?;
        let account = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthFailure::UnknownAccount(claims.sub))?;
        Ok(account.principal())
    }
}

//! Persistence for merchants, their establishments and user accounts.
//!
//! Two backends implement the same traits: [`InMemoryStore`] for tests and
//! local runs, and [`PostgresStore`] for deployments.

use async_trait::async_trait;
use thiserror::Error;

use bizadmin_auth::{Principal, Role};
use bizadmin_core::{MerchantId, UserId};
use bizadmin_merchants::{EstablishmentFigures, Merchant, MerchantChanges, NewMerchant};

mod in_memory;
mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A stored user account, including its password hash.
#[derive(Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

impl UserAccount {
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

impl core::fmt::Debug for UserAccount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserAccount")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Fields for a user account about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[async_trait]
pub trait MerchantStore: Send + Sync {
    /// One page of merchants, newest registration first, relations loaded.
    async fn list_page(&self, offset: u64, limit: u32) -> Result<Vec<Merchant>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    async fn find_by_id(&self, id: MerchantId) -> Result<Option<Merchant>, StoreError>;

    /// Merchant holding `email`, ignoring the record `excluding` if given.
    async fn find_by_email(
        &self,
        email: &str,
        excluding: Option<MerchantId>,
    ) -> Result<Option<Merchant>, StoreError>;

    async fn insert(&self, merchant: NewMerchant) -> Result<Merchant, StoreError>;

    /// Fails with [`StoreError::NotFound`] when the merchant does not exist.
    async fn update(&self, id: MerchantId, changes: MerchantChanges) -> Result<Merchant, StoreError>;

    /// Returns the record as it was before deletion.
    ///
    /// Fails with [`StoreError::ForeignKeyViolation`] while establishments
    /// still reference the merchant.
    async fn delete(&self, id: MerchantId) -> Result<Merchant, StoreError>;

    /// Revenue and headcount of every establishment; `None` when the merchant
    /// does not exist.
    async fn establishment_figures(
        &self,
        id: MerchantId,
    ) -> Result<Option<Vec<EstablishmentFigures>>, StoreError>;

    /// Every merchant with status ACTIVE, newest registration first.
    async fn list_active(&self) -> Result<Vec<Merchant>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact-match lookup; emails are not normalised here.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, StoreError>;

    /// Create the account (email stored lower-cased) unless one with that
    /// email exists; returns the stored account either way.
    async fn ensure_user(&self, user: NewUser) -> Result<UserAccount, StoreError>;
}

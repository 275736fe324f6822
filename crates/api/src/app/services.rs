//! Service wiring: pick storage and cache backends from configuration and
//! build the application services on top of them.

use std::sync::Arc;

use thiserror::Error;

use bizadmin_auth::{Hs256Jwt, PasswordError, Role, hash_password};
use bizadmin_infra::cache::{Cache, CacheError, InMemoryCache, MerchantCache, RedisCache};
use bizadmin_infra::services::{AuthService, MerchantService};
use bizadmin_infra::store::{
    InMemoryStore, MerchantStore, NewUser, PostgresStore, StoreError, UserAccount, UserStore,
};
use bizadmin_infra::{AppConfig, SeedAdmin};

use crate::session::SessionCookie;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("storage: {0}")]
    Store(#[from] StoreError),

    #[error("cache: {0}")]
    Cache(#[from] CacheError),

    #[error("seed admin: {0}")]
    Password(#[from] PasswordError),
}

/// Storage and cache handles the services run on.
#[derive(Clone)]
pub struct Backends {
    pub merchants: Arc<dyn MerchantStore>,
    pub users: Arc<dyn UserStore>,
    pub cache: Arc<dyn Cache>,
}

impl Backends {
    /// Everything in process memory.
    pub fn in_memory() -> (Self, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let backends = Self {
            merchants: store.clone(),
            users: store.clone(),
            cache: Arc::new(InMemoryCache::new()),
        };
        (backends, store)
    }

    /// Postgres when `DATABASE_URL` is set, Redis when `REDIS_URL` is set;
    /// in-memory fallbacks otherwise.
    pub async fn connect(config: &AppConfig) -> Result<Self, BootstrapError> {
        let (mut backends, _) = Self::in_memory();

        match config.database_url.as_deref() {
            Some(url) => {
                let store = Arc::new(PostgresStore::connect(url).await?);
                store.migrate().await?;
                tracing::info!("using postgres store");
                backends.merchants = store.clone();
                backends.users = store;
            }
            None => tracing::warn!("DATABASE_URL not set; data is kept in memory only"),
        }

        match config.redis_url.as_deref() {
            Some(url) => {
                backends.cache = Arc::new(RedisCache::connect(url).await?);
                tracing::info!("using redis cache");
            }
            None => tracing::info!("REDIS_URL not set; using in-process cache"),
        }

        Ok(backends)
    }
}

/// Create the configured administrator account if it does not exist yet.
pub async fn seed_admin(users: &dyn UserStore, seed: &SeedAdmin) -> Result<UserAccount, BootstrapError> {
    let account = users
        .ensure_user(NewUser {
            name: seed.name.clone(),
            email: seed.email.clone(),
            password_hash: hash_password(&seed.password)?,
            role: Role::ADMIN,
        })
        .await?;
    tracing::info!(user_id = %account.id, "administrator account ready");
    Ok(account)
}

pub struct AppServices {
    pub merchants: MerchantService,
    pub auth: AuthService,
    pub session_cookie: SessionCookie,
}

impl AppServices {
    pub fn new(config: &AppConfig, backends: Backends) -> Self {
        let jwt = Arc::new(Hs256Jwt::new(config.jwt_secret.as_bytes()));
        let merchants = MerchantService::new(
            backends.merchants,
            MerchantCache::new(backends.cache, config.cache_ttl),
        );
        let auth = AuthService::new(backends.users, jwt.clone(), jwt, config.token_ttl);

        Self {
            merchants,
            auth,
            session_cookie: SessionCookie::new(config.token_ttl, config.cookie_secure),
        }
    }
}

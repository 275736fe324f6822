//! Postgres-backed store.
//!
//! Queries are checked at runtime (no compile-time database). Constraint
//! violations are mapped onto [`StoreError`]:
//!
//! | Postgres code | StoreError |
//! |---------------|------------|
//! | `23505` unique violation | `UniqueViolation` |
//! | `23503` foreign key violation | `ForeignKeyViolation` |
//! | anything else | `Backend` |

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;

use bizadmin_auth::Role;
use bizadmin_core::{EstablishmentId, MerchantId, UserId};
use bizadmin_merchants::{
    Establishment, EstablishmentFigures, Merchant, MerchantChanges, MerchantStatus, NewMerchant,
    UserSummary,
};

use super::{MerchantStore, NewUser, StoreError, UserAccount, UserStore};

const SCHEMA: &str = include_str!("schema.sql");

const MERCHANT_SELECT: &str = r#"
    SELECT
        m.id,
        m.legal_name,
        m.municipality,
        m.phone,
        m.email,
        m.status,
        m.registered_at,
        m.updated_at,
        m.updated_by,
        u.name AS updated_by_name,
        u.email AS updated_by_email
    FROM merchants m
    LEFT JOIN users u ON u.id = m.updated_by
"#;

const USER_SELECT: &str = "SELECT id, name, email, password_hash, role FROM users";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes that do not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn fetch_merchants(
        &self,
        operation: &str,
        rows: Vec<PgRow>,
    ) -> Result<Vec<Merchant>, StoreError> {
        let mut merchants = rows
            .iter()
            .map(merchant_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        self.attach_establishments(operation, &mut merchants).await?;
        Ok(merchants)
    }

    async fn attach_establishments(
        &self,
        operation: &str,
        merchants: &mut [Merchant],
    ) -> Result<(), StoreError> {
        if merchants.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = merchants.iter().map(|m| m.id.get()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, merchant_id, name, revenue, employee_count
            FROM establishments
            WHERE merchant_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;

        let mut by_merchant: HashMap<MerchantId, Vec<Establishment>> = HashMap::new();
        for row in &rows {
            let establishment = establishment_from_row(row)?;
            by_merchant
                .entry(establishment.merchant_id)
                .or_default()
                .push(establishment);
        }
        for merchant in merchants.iter_mut() {
            merchant.establishments = by_merchant.remove(&merchant.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn load(&self, operation: &str, id: MerchantId) -> Result<Option<Merchant>, StoreError> {
        let sql = format!("{MERCHANT_SELECT} WHERE m.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        match row {
            Some(row) => Ok(self.fetch_merchants(operation, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl MerchantStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn list_page(&self, offset: u64, limit: u32) -> Result<Vec<Merchant>, StoreError> {
        let sql = format!(
            "{MERCHANT_SELECT} ORDER BY m.registered_at DESC, m.id DESC OFFSET $1 LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_page", e))?;
        self.fetch_merchants("list_page", rows).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM merchants")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count", e))?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn find_by_id(&self, id: MerchantId) -> Result<Option<Merchant>, StoreError> {
        self.load("find_by_id", id).await
    }

    async fn find_by_email(
        &self,
        email: &str,
        excluding: Option<MerchantId>,
    ) -> Result<Option<Merchant>, StoreError> {
        let sql = format!(
            "{MERCHANT_SELECT} WHERE LOWER(m.email) = LOWER($1) AND ($2::BIGINT IS NULL OR m.id <> $2) LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(email)
            .bind(excluding.map(|id| id.get()))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_email", e))?;

        match row {
            Some(row) => Ok(self.fetch_merchants("find_by_email", vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, merchant), err)]
    async fn insert(&self, merchant: NewMerchant) -> Result<Merchant, StoreError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO merchants (legal_name, municipality, phone, email, status, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&merchant.legal_name)
        .bind(&merchant.municipality)
        .bind(merchant.phone.as_deref())
        .bind(merchant.email.as_deref())
        .bind(merchant.status.as_str())
        .bind(merchant.updated_by.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert", e))?;

        self.load("insert", MerchantId::from_raw(id))
            .await?
            .ok_or_else(|| StoreError::Backend(format!("merchant {id} missing after insert")))
    }

    #[instrument(skip(self, changes), err)]
    async fn update(&self, id: MerchantId, changes: MerchantChanges) -> Result<Merchant, StoreError> {
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE merchants SET
                legal_name   = COALESCE($2::TEXT, legal_name),
                municipality = COALESCE($3::TEXT, municipality),
                phone        = CASE WHEN $4::BOOLEAN THEN $5::TEXT ELSE phone END,
                email        = CASE WHEN $6::BOOLEAN THEN $7::TEXT ELSE email END,
                status       = COALESCE($8::TEXT, status),
                updated_by   = $9,
                updated_at   = $10
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id.get())
        .bind(changes.legal_name.as_deref())
        .bind(changes.municipality.as_deref())
        .bind(changes.phone.is_some())
        .bind(changes.phone.clone().flatten())
        .bind(changes.email.is_some())
        .bind(changes.email.clone().flatten())
        .bind(changes.status.map(|s| s.as_str()))
        .bind(changes.updated_by.get())
        .bind(changes.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update", e))?;

        if updated.is_none() {
            return Err(StoreError::NotFound);
        }
        self.load("update", id).await?.ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, id: MerchantId) -> Result<Merchant, StoreError> {
        let before = self.load("delete", id).await?.ok_or(StoreError::NotFound)?;

        let result = sqlx::query("DELETE FROM merchants WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(before)
    }

    async fn establishment_figures(
        &self,
        id: MerchantId,
    ) -> Result<Option<Vec<EstablishmentFigures>>, StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM merchants WHERE id = $1)")
            .bind(id.get())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("establishment_figures", e))?;
        if !exists {
            return Ok(None);
        }

        let rows = sqlx::query("SELECT revenue, employee_count FROM establishments WHERE merchant_id = $1")
            .bind(id.get())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("establishment_figures", e))?;

        rows.iter()
            .map(|row| {
                Ok(EstablishmentFigures {
                    revenue: row.try_get("revenue").map_err(decode_error)?,
                    employee_count: row.try_get("employee_count").map_err(decode_error)?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()
            .map(Some)
    }

    #[instrument(skip(self), err)]
    async fn list_active(&self) -> Result<Vec<Merchant>, StoreError> {
        let sql = format!(
            "{MERCHANT_SELECT} WHERE m.status = 'ACTIVE' ORDER BY m.registered_at DESC, m.id DESC"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_active", e))?;
        self.fetch_merchants("list_active", rows).await
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let sql = format!("{USER_SELECT} WHERE email = $1");
        sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        let sql = format!("{USER_SELECT} WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_id", e))?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn ensure_user(&self, user: NewUser) -> Result<UserAccount, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES ($1, LOWER($2), $3, $4)
            ON CONFLICT ((LOWER(email))) DO NOTHING
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_user", e))?;

        UserStore::find_by_email(self, &user.email.to_lowercase())
            .await?
            .ok_or_else(|| StoreError::Backend(format!("user {} missing after insert", user.email)))
    }
}

fn merchant_from_row(row: &PgRow) -> Result<Merchant, StoreError> {
    let status: String = row.try_get("status").map_err(decode_error)?;
    let status = status
        .parse::<MerchantStatus>()
        .map_err(|e| StoreError::Backend(e.to_string()))?;

    let updated_by: Option<i64> = row.try_get("updated_by").map_err(decode_error)?;
    let updated_by_name: Option<String> = row.try_get("updated_by_name").map_err(decode_error)?;
    let updated_by_email: Option<String> = row.try_get("updated_by_email").map_err(decode_error)?;
    let updated_by_user = match (updated_by_name, updated_by_email) {
        (Some(name), Some(email)) => Some(UserSummary { name, email }),
        _ => None,
    };

    Ok(Merchant {
        id: MerchantId::from_raw(row.try_get("id").map_err(decode_error)?),
        legal_name: row.try_get("legal_name").map_err(decode_error)?,
        municipality: row.try_get("municipality").map_err(decode_error)?,
        phone: row.try_get("phone").map_err(decode_error)?,
        email: row.try_get("email").map_err(decode_error)?,
        status,
        registered_at: row.try_get("registered_at").map_err(decode_error)?,
        updated_at: row.try_get("updated_at").map_err(decode_error)?,
        updated_by: updated_by.map(UserId::from_raw),
        updated_by_user,
        establishments: Vec::new(),
    })
}

fn establishment_from_row(row: &PgRow) -> Result<Establishment, StoreError> {
    Ok(Establishment {
        id: EstablishmentId::from_raw(row.try_get("id").map_err(decode_error)?),
        merchant_id: MerchantId::from_raw(row.try_get("merchant_id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        revenue: row.try_get("revenue").map_err(decode_error)?,
        employee_count: row.try_get("employee_count").map_err(decode_error)?,
    })
}

fn user_from_row(row: &PgRow) -> Result<UserAccount, StoreError> {
    let role: String = row.try_get("role").map_err(decode_error)?;
    Ok(UserAccount {
        id: UserId::from_raw(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        email: row.try_get("email").map_err(decode_error)?,
        password_hash: row.try_get("password_hash").map_err(decode_error)?,
        role: Role::new(role),
    })
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("failed to decode row: {err}"))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::UniqueViolation(msg),
                Some("23503") => StoreError::ForeignKeyViolation(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

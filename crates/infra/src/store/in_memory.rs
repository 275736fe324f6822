use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use bizadmin_core::{EstablishmentId, MerchantId, UserId};
use bizadmin_merchants::{
    Establishment, EstablishmentFigures, Merchant, MerchantChanges, MerchantStatus, NewMerchant,
    UserSummary,
};

use super::{MerchantStore, NewUser, StoreError, UserAccount, UserStore};

#[derive(Debug, Default)]
struct State {
    /// Rows without relations; `establishments` and `updated_by_user` are
    /// filled in on the way out.
    merchants: BTreeMap<MerchantId, Merchant>,
    establishments: BTreeMap<EstablishmentId, Establishment>,
    users: BTreeMap<UserId, UserAccount>,
    last_merchant_id: i64,
    last_establishment_id: i64,
    last_user_id: i64,
}

impl State {
    fn hydrate(&self, row: &Merchant) -> Merchant {
        let mut merchant = row.clone();
        merchant.establishments = self
            .establishments
            .values()
            .filter(|e| e.merchant_id == row.id)
            .cloned()
            .collect();
        merchant.updated_by_user = row
            .updated_by
            .and_then(|id| self.users.get(&id))
            .map(|u| UserSummary {
                name: u.name.clone(),
                email: u.email.clone(),
            });
        merchant
    }

    /// Newest registration first; ids break ties so the order is total.
    fn newest_first<'a>(&'a self, rows: impl Iterator<Item = &'a Merchant>) -> Vec<Merchant> {
        let mut rows: Vec<&Merchant> = rows.collect();
        rows.sort_by(|a, b| {
            b.registered_at
                .cmp(&a.registered_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        rows.into_iter().map(|row| self.hydrate(row)).collect()
    }

    fn email_taken(&self, email: &str, excluding: Option<MerchantId>) -> bool {
        self.merchants.values().any(|m| {
            Some(m.id) != excluding && m.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email))
        })
    }
}

/// Process-local store backing both merchants and users.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }

    /// Attach an establishment to an existing merchant.
    pub fn add_establishment(
        &self,
        merchant_id: MerchantId,
        name: impl Into<String>,
        revenue: Option<f64>,
        employee_count: Option<i64>,
    ) -> Result<Establishment, StoreError> {
        let mut state = self.write()?;
        if !state.merchants.contains_key(&merchant_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "merchant {merchant_id} does not exist"
            )));
        }
        state.last_establishment_id += 1;
        let establishment = Establishment {
            id: EstablishmentId::from_raw(state.last_establishment_id),
            merchant_id,
            name: name.into(),
            revenue,
            employee_count,
        };
        state
            .establishments
            .insert(establishment.id, establishment.clone());
        Ok(establishment)
    }

    /// Remove every establishment of a merchant.
    pub fn remove_establishments(&self, merchant_id: MerchantId) -> Result<usize, StoreError> {
        let mut state = self.write()?;
        let before = state.establishments.len();
        state.establishments.retain(|_, e| e.merchant_id != merchant_id);
        Ok(before - state.establishments.len())
    }
}

#[async_trait]
impl MerchantStore for InMemoryStore {
    async fn list_page(&self, offset: u64, limit: u32) -> Result<Vec<Merchant>, StoreError> {
        let state = self.read()?;
        Ok(state
            .newest_first(state.merchants.values())
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit as usize)
            .collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.merchants.len() as u64)
    }

    async fn find_by_id(&self, id: MerchantId) -> Result<Option<Merchant>, StoreError> {
        let state = self.read()?;
        Ok(state.merchants.get(&id).map(|row| state.hydrate(row)))
    }

    async fn find_by_email(
        &self,
        email: &str,
        excluding: Option<MerchantId>,
    ) -> Result<Option<Merchant>, StoreError> {
        let state = self.read()?;
        Ok(state
            .merchants
            .values()
            .find(|m| {
                Some(m.id) != excluding
                    && m.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .map(|row| state.hydrate(row)))
    }

    async fn insert(&self, merchant: NewMerchant) -> Result<Merchant, StoreError> {
        let mut state = self.write()?;
        if let Some(email) = merchant.email.as_deref() {
            if state.email_taken(email, None) {
                return Err(StoreError::UniqueViolation(format!("merchant email {email}")));
            }
        }

        state.last_merchant_id += 1;
        let row = Merchant {
            id: MerchantId::from_raw(state.last_merchant_id),
            legal_name: merchant.legal_name,
            municipality: merchant.municipality,
            phone: merchant.phone,
            email: merchant.email,
            status: merchant.status,
            registered_at: Utc::now(),
            updated_at: None,
            updated_by: Some(merchant.updated_by),
            updated_by_user: None,
            establishments: Vec::new(),
        };
        state.merchants.insert(row.id, row.clone());
        Ok(state.hydrate(&row))
    }

    async fn update(&self, id: MerchantId, changes: MerchantChanges) -> Result<Merchant, StoreError> {
        let mut state = self.write()?;
        if let Some(Some(email)) = changes.email.as_ref() {
            if state.email_taken(email, Some(id)) {
                return Err(StoreError::UniqueViolation(format!("merchant email {email}")));
            }
        }

        let row = state.merchants.get_mut(&id).ok_or(StoreError::NotFound)?;
        changes.apply_to(row);
        let row = row.clone();
        Ok(state.hydrate(&row))
    }

    async fn delete(&self, id: MerchantId) -> Result<Merchant, StoreError> {
        let mut state = self.write()?;
        let row = state.merchants.get(&id).ok_or(StoreError::NotFound)?;
        let before = state.hydrate(row);
        if before.has_establishments() {
            return Err(StoreError::ForeignKeyViolation(format!(
                "establishments reference merchant {id}"
            )));
        }
        state.merchants.remove(&id);
        Ok(before)
    }

    async fn establishment_figures(
        &self,
        id: MerchantId,
    ) -> Result<Option<Vec<EstablishmentFigures>>, StoreError> {
        let state = self.read()?;
        if !state.merchants.contains_key(&id) {
            return Ok(None);
        }
        Ok(Some(
            state
                .establishments
                .values()
                .filter(|e| e.merchant_id == id)
                .map(Establishment::figures)
                .collect(),
        ))
    }

    async fn list_active(&self) -> Result<Vec<Merchant>, StoreError> {
        let state = self.read()?;
        Ok(state.newest_first(
            state
                .merchants
                .values()
                .filter(|m| m.status == MerchantStatus::Active),
        ))
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let state = self.read()?;
        Ok(state
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn ensure_user(&self, user: NewUser) -> Result<UserAccount, StoreError> {
        let mut state = self.write()?;
        let email = user.email.to_lowercase();
        if let Some(existing) = state.users.values().find(|u| u.email == email) {
            return Ok(existing.clone());
        }

        state.last_user_id += 1;
        let account = UserAccount {
            id: UserId::from_raw(state.last_user_id),
            name: user.name,
            email,
            password_hash: user.password_hash,
            role: user.role,
        };
        state.users.insert(account.id, account.clone());
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizadmin_auth::Role;

    fn new_merchant(name: &str, email: Option<&str>, actor: UserId) -> NewMerchant {
        NewMerchant {
            legal_name: name.to_string(),
            municipality: "Cali".to_string(),
            phone: None,
            email: email.map(str::to_string),
            status: MerchantStatus::Active,
            updated_by: actor,
        }
    }

    async fn with_user() -> (InMemoryStore, UserAccount) {
        let store = InMemoryStore::new();
        let user = store
            .ensure_user(NewUser {
                name: "Ana Gómez".to_string(),
                email: "Ana@Example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::ADMIN,
            })
            .await
            .unwrap();
        (store, user)
    }

    #[tokio::test]
    async fn insert_loads_the_updating_user() {
        let (store, user) = with_user().await;
        let merchant = store
            .insert(new_merchant("Tienda Uno", Some("uno@example.com"), user.id))
            .await
            .unwrap();

        assert_eq!(merchant.id, MerchantId::from_raw(1));
        assert_eq!(merchant.updated_by_user.unwrap().name, "Ana Gómez");
        assert!(merchant.establishments.is_empty());
    }

    #[tokio::test]
    async fn pages_are_newest_first() {
        let (store, user) = with_user().await;
        for name in ["first", "second", "third"] {
            store.insert(new_merchant(name, None, user.id)).await.unwrap();
        }

        let page = store.list_page(0, 2).await.unwrap();
        let names: Vec<_> = page.iter().map(|m| m.legal_name.as_str()).collect();
        assert_eq!(names, vec!["third", "second"]);

        let rest = store.list_page(2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].legal_name, "first");
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_unique_violation() {
        let (store, user) = with_user().await;
        store
            .insert(new_merchant("a", Some("dup@example.com"), user.id))
            .await
            .unwrap();
        let err = store
            .insert(new_merchant("b", Some("DUP@example.com"), user.id))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));

        let found = MerchantStore::find_by_email(&store, "dup@example.com", None)
            .await
            .unwrap();
        assert!(found.is_some());
        let excluded = MerchantStore::find_by_email(&store, "dup@example.com", found.map(|m| m.id))
            .await
            .unwrap();
        assert!(excluded.is_none());
    }

    #[tokio::test]
    async fn delete_is_blocked_by_establishments() {
        let (store, user) = with_user().await;
        let merchant = store.insert(new_merchant("a", None, user.id)).await.unwrap();
        store
            .add_establishment(merchant.id, "Sede Centro", Some(1_000.0), Some(3))
            .unwrap();

        let err = store.delete(merchant.id).await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation(_)));

        store.remove_establishments(merchant.id).unwrap();
        let deleted = store.delete(merchant.id).await.unwrap();
        assert_eq!(deleted.id, merchant.id);
        assert!(MerchantStore::find_by_id(&store, merchant.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn figures_distinguish_missing_merchant_from_no_establishments() {
        let (store, user) = with_user().await;
        let merchant = store.insert(new_merchant("a", None, user.id)).await.unwrap();

        assert_eq!(store.establishment_figures(merchant.id).await.unwrap(), Some(vec![]));
        assert_eq!(
            store.establishment_figures(MerchantId::from_raw(99)).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn update_of_missing_merchant_is_not_found() {
        let (store, user) = with_user().await;
        let changes = MerchantChanges::status(MerchantStatus::Inactive, user.id, Utc::now());
        let err = store
            .update(MerchantId::from_raw(7), changes)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound);
    }

    #[tokio::test]
    async fn ensure_user_is_idempotent_by_email() {
        let (store, user) = with_user().await;
        let again = store
            .ensure_user(NewUser {
                name: "Other".to_string(),
                email: "ana@example.com".to_string(),
                password_hash: "other".to_string(),
                role: Role::ASSISTANT,
            })
            .await
            .unwrap();
        assert_eq!(again.id, user.id);
        assert_eq!(again.role, Role::ADMIN);
        assert_eq!(
            UserStore::find_by_email(&store, "ana@example.com").await.unwrap().map(|u| u.id),
            Some(user.id)
        );
        assert!(UserStore::find_by_email(&store, "ANA@EXAMPLE.COM").await.unwrap().is_none());
    }
}

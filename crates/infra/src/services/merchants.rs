use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use bizadmin_core::{DomainError, DomainResult, MerchantId, UserId};
use bizadmin_merchants::{
    CreateMerchant, DEPARTMENTS, Department, ExportFormat, ExportRow, Merchant, MerchantChanges,
    MerchantStatus, MerchantTotals, PageMeta, PageRequest, Paginated, UpdateMerchant,
    calculate_merchant_totals, render_export, validate_municipality,
};

use crate::cache::{MerchantCache, list_key, merchant_key, totals_key};
use crate::store::{MerchantStore, StoreError};

const MERCHANT_NOT_FOUND: &str = "merchant not found";
const UNKNOWN_MUNICIPALITY: &str = "municipality is not a recognised city";
const EMAIL_TAKEN: &str = "a merchant with this email already exists";
const HAS_ESTABLISHMENTS: &str =
    "merchant cannot be deleted because it has associated establishments; delete them first";

/// A mutation result: a human-readable message plus the affected record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub message: String,
    pub data: T,
}

impl<T> Outcome<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

/// A rendered export, ready to be sent as an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub records: usize,
    pub bytes: Vec<u8>,
}

/// Log an unexpected store failure and hide it behind a generic message.
fn persistence_failure(context: &'static str) -> impl FnOnce(StoreError) -> DomainError {
    move |err| {
        tracing::error!(error = %err, "{context}");
        DomainError::validation(context)
    }
}

/// Merchant lifecycle: listing, lookup, mutation, aggregates and export.
#[derive(Clone)]
pub struct MerchantService {
    store: Arc<dyn MerchantStore>,
    cache: MerchantCache,
}

impl MerchantService {
    pub fn new(store: Arc<dyn MerchantStore>, cache: MerchantCache) -> Self {
        Self { store, cache }
    }

    pub async fn list(&self, page: Option<i64>, limit: Option<i64>) -> DomainResult<Paginated<Merchant>> {
        let request = PageRequest::resolve(page, limit)?;
        let key = list_key(request.page(), request.limit());

        if let Some(cached) = self.cache.read::<Paginated<Merchant>>(&key).await {
            return Ok(cached);
        }

        let loaded = tokio::try_join!(
            self.store.list_page(request.offset(), request.limit()),
            self.store.count(),
        );
        let (data, total) = match loaded {
            Ok(loaded) => loaded,
            Err(err) => {
                self.cache.forget(&key).await;
                return Err(persistence_failure("error listing merchants")(err));
            }
        };

        let page = Paginated {
            data,
            meta: PageMeta::new(total, request),
        };
        self.cache.write(&key, &page).await;
        Ok(page)
    }

    pub async fn get(&self, id: MerchantId) -> DomainResult<Merchant> {
        let key = merchant_key(id);
        if let Some(cached) = self.cache.read::<Merchant>(&key).await {
            return Ok(cached);
        }

        let merchant = match self.store.find_by_id(id).await {
            Ok(Some(merchant)) => merchant,
            Ok(None) => return Err(DomainError::not_found(MERCHANT_NOT_FOUND)),
            Err(err) => {
                self.cache.forget(&key).await;
                return Err(persistence_failure("error loading merchant")(err));
            }
        };

        self.cache.write(&key, &merchant).await;
        Ok(merchant)
    }

    pub async fn create(&self, input: CreateMerchant, actor: UserId) -> DomainResult<Outcome<Merchant>> {
        input.validate()?;
        if !validate_municipality(&input.municipality) {
            return Err(DomainError::validation(UNKNOWN_MUNICIPALITY));
        }

        if let Some(email) = input.normalized_email() {
            let existing = self
                .store
                .find_by_email(&email, None)
                .await
                .map_err(persistence_failure("error creating merchant"))?;
            if existing.is_some() {
                return Err(DomainError::conflict(EMAIL_TAKEN));
            }
        }

        let merchant = self
            .store
            .insert(input.normalize(actor))
            .await
            .map_err(|err| match err {
                StoreError::UniqueViolation(_) => DomainError::conflict(EMAIL_TAKEN),
                other => persistence_failure("error creating merchant")(other),
            })?;

        self.cache.invalidate_lists().await;
        tracing::info!(merchant_id = %merchant.id, user_id = %actor, "merchant created");
        Ok(Outcome::new("merchant created successfully", merchant))
    }

    pub async fn update(
        &self,
        id: MerchantId,
        input: UpdateMerchant,
        actor: UserId,
    ) -> DomainResult<Outcome<Merchant>> {
        if input.is_empty() {
            return Err(DomainError::validation(
                "at least one field must be provided for update",
            ));
        }
        input.validate()?;

        let existing = self.require(id, "error updating merchant").await?;

        if let Some(municipality) = input.municipality.as_deref() {
            if !validate_municipality(municipality) {
                return Err(DomainError::validation(UNKNOWN_MUNICIPALITY));
            }
        }

        if let Some(email) = input.normalized_email() {
            if existing.email.as_deref() != Some(email.as_str()) {
                let taken = self
                    .store
                    .find_by_email(&email, Some(id))
                    .await
                    .map_err(persistence_failure("error updating merchant"))?;
                if taken.is_some() {
                    return Err(DomainError::conflict(EMAIL_TAKEN));
                }
            }
        }

        let changes = input.into_changes(actor, Utc::now());
        let merchant = self.persist_changes(id, changes, "error updating merchant").await?;

        tracing::info!(merchant_id = %id, user_id = %actor, "merchant updated");
        Ok(Outcome::new("merchant updated successfully", merchant))
    }

    pub async fn update_status(
        &self,
        id: MerchantId,
        raw_status: &str,
        actor: UserId,
    ) -> DomainResult<Outcome<Merchant>> {
        let status: MerchantStatus = raw_status.parse()?;
        let existing = self.require(id, "error updating merchant status").await?;

        if existing.status == status {
            return Ok(Outcome::new("merchant already has the requested status", existing));
        }

        let changes = MerchantChanges::status(status, actor, Utc::now());
        let merchant = self
            .persist_changes(id, changes, "error updating merchant status")
            .await?;

        tracing::info!(merchant_id = %id, user_id = %actor, status = %status, "merchant status changed");
        Ok(Outcome::new("merchant status updated successfully", merchant))
    }

    pub async fn delete(&self, id: MerchantId, actor: UserId) -> DomainResult<Outcome<Merchant>> {
        let existing = self.require(id, "error deleting merchant").await?;
        if existing.has_establishments() {
            return Err(DomainError::conflict(HAS_ESTABLISHMENTS));
        }

        let merchant = self.store.delete(id).await.map_err(|err| match err {
            StoreError::NotFound => DomainError::not_found(MERCHANT_NOT_FOUND),
            StoreError::ForeignKeyViolation(_) => DomainError::conflict(HAS_ESTABLISHMENTS),
            other => persistence_failure("error deleting merchant")(other),
        })?;

        self.cache.invalidate_lists().await;
        self.cache.invalidate_merchant(id).await;
        tracing::info!(merchant_id = %id, user_id = %actor, "merchant deleted");
        Ok(Outcome::new("merchant deleted successfully", merchant))
    }

    pub async fn totals(&self, id: MerchantId) -> DomainResult<MerchantTotals> {
        let key = totals_key(id);
        if let Some(cached) = self.cache.read::<MerchantTotals>(&key).await {
            return Ok(cached);
        }

        let figures = self
            .store
            .establishment_figures(id)
            .await
            .map_err(persistence_failure("error calculating merchant totals"))?
            .ok_or_else(|| DomainError::not_found(MERCHANT_NOT_FOUND))?;

        let totals = calculate_merchant_totals(&figures);
        self.cache.write(&key, &totals).await;
        Ok(totals)
    }

    /// Render every ACTIVE merchant with its aggregates.
    pub async fn export(&self, format: ExportFormat) -> DomainResult<ExportFile> {
        let merchants = self
            .store
            .list_active()
            .await
            .map_err(persistence_failure("error generating export"))?;

        let rows: Vec<ExportRow> = merchants.iter().map(ExportRow::from_merchant).collect();
        let bytes = render_export(&rows, format).map_err(|err| {
            tracing::error!(error = %err, "failed to render export");
            DomainError::validation("error generating export")
        })?;

        tracing::info!(records = rows.len(), format = format.extension(), "merchant export generated");
        Ok(ExportFile {
            file_name: format.file_name(Utc::now()),
            content_type: format.content_type(),
            records: rows.len(),
            bytes,
        })
    }

    pub fn departments(&self) -> &'static [Department] {
        DEPARTMENTS
    }

    async fn require(&self, id: MerchantId, context: &'static str) -> DomainResult<Merchant> {
        self.store
            .find_by_id(id)
            .await
            .map_err(persistence_failure(context))?
            .ok_or_else(|| DomainError::not_found(MERCHANT_NOT_FOUND))
    }

    async fn persist_changes(
        &self,
        id: MerchantId,
        changes: MerchantChanges,
        context: &'static str,
    ) -> DomainResult<Merchant> {
        let merchant = self.store.update(id, changes).await.map_err(|err| match err {
            StoreError::NotFound => DomainError::not_found(MERCHANT_NOT_FOUND),
            StoreError::UniqueViolation(_) => DomainError::conflict(EMAIL_TAKEN),
            other => persistence_failure(context)(other),
        })?;

        self.cache.invalidate_lists().await;
        self.cache.invalidate_merchant(id).await;
        Ok(merchant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::cache::{Cache, InMemoryCache};
    use crate::store::InMemoryStore;

    const ACTOR: UserId = UserId::from_raw(1);

    struct Harness {
        store: Arc<InMemoryStore>,
        cache: Arc<InMemoryCache>,
        service: MerchantService,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let service = MerchantService::new(
            store.clone(),
            MerchantCache::new(cache.clone(), Duration::from_secs(300)),
        );
        Harness { store, cache, service }
    }

    fn create_input(name: &str, municipality: &str, email: Option<&str>) -> CreateMerchant {
        CreateMerchant {
            legal_name: name.to_string(),
            municipality: municipality.to_string(),
            phone: None,
            email: email.map(str::to_string),
            status: None,
        }
    }

    async fn seeded(h: &Harness, name: &str, email: Option<&str>) -> Merchant {
        h.service
            .create(create_input(name, "Cali", email), ACTOR)
            .await
            .unwrap()
            .data
    }

    #[tokio::test]
    async fn create_normalises_and_defaults_status() {
        let h = harness();
        let input = CreateMerchant {
            legal_name: "  Panadería La Espiga  ".to_string(),
            municipality: "Cali".to_string(),
            phone: Some(" 3001234567 ".to_string()),
            email: Some("  Ventas@Espiga.COM ".to_string()),
            status: None,
        };
        let outcome = h.service.create(input, ACTOR).await.unwrap();

        assert_eq!(outcome.message, "merchant created successfully");
        let merchant = outcome.data;
        assert_eq!(merchant.legal_name, "Panadería La Espiga");
        assert_eq!(merchant.phone.as_deref(), Some("3001234567"));
        assert_eq!(merchant.email.as_deref(), Some("ventas@espiga.com"));
        assert_eq!(merchant.status, MerchantStatus::Active);
        assert_eq!(merchant.updated_by, Some(ACTOR));
    }

    #[tokio::test]
    async fn create_rejects_unknown_municipality_and_duplicate_email() {
        let h = harness();
        let err = h
            .service
            .create(create_input("Tienda", "Gotham", None), ACTOR)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        seeded(&h, "Primera", Some("dup@example.com")).await;
        let err = h
            .service
            .create(create_input("Segunda", "Medellín", Some("DUP@example.com")), ACTOR)
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::conflict(EMAIL_TAKEN));
    }

    #[tokio::test]
    async fn list_is_served_from_cache_until_a_mutation() {
        let h = harness();
        seeded(&h, "Uno", None).await;

        let first = h.service.list(None, None).await.unwrap();
        assert_eq!(first.meta.total, 1);
        assert_eq!(first.meta.limit, 5);
        assert!(h.cache.contains("merchants:page:1:limit:5"));

        seeded(&h, "Dos", None).await;
        assert!(!h.cache.contains("merchants:page:1:limit:5"));

        let second = h.service.list(Some(1), Some(5)).await.unwrap();
        assert_eq!(second.meta.total, 2);
        assert_eq!(second.data[0].legal_name, "Dos");
    }

    #[tokio::test]
    async fn list_rejects_out_of_range_paging() {
        let h = harness();
        assert!(matches!(
            h.service.list(Some(0), None).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            h.service.list(None, Some(101)).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn get_reads_through_the_cache() {
        let h = harness();
        let merchant = seeded(&h, "Uno", None).await;

        let loaded = h.service.get(merchant.id).await.unwrap();
        assert_eq!(loaded.id, merchant.id);
        assert!(h.cache.contains(&merchant_key(merchant.id)));

        let err = h.service.get(MerchantId::from_raw(404)).await.unwrap_err();
        assert_eq!(err, DomainError::not_found(MERCHANT_NOT_FOUND));
    }

    #[tokio::test]
    async fn corrupt_cache_entry_falls_back_to_the_store() {
        let h = harness();
        let merchant = seeded(&h, "Uno", None).await;
        h.cache
            .set(&merchant_key(merchant.id), "{oops".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        let loaded = h.service.get(merchant.id).await.unwrap();
        assert_eq!(loaded.legal_name, "Uno");
    }

    #[tokio::test]
    async fn update_requires_a_field_and_an_existing_merchant() {
        let h = harness();
        let err = h
            .service
            .update(MerchantId::from_raw(1), UpdateMerchant::default(), ACTOR)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let input = UpdateMerchant {
            legal_name: Some("Nuevo nombre".to_string()),
            ..UpdateMerchant::default()
        };
        let err = h
            .service
            .update(MerchantId::from_raw(9), input, ACTOR)
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::not_found(MERCHANT_NOT_FOUND));
    }

    #[tokio::test]
    async fn update_clears_fields_and_invalidates_cached_detail() {
        let h = harness();
        let merchant = seeded(&h, "Uno", Some("uno@example.com")).await;
        h.service.get(merchant.id).await.unwrap();

        let input = UpdateMerchant {
            email: Some(None),
            municipality: Some("Medellín".to_string()),
            ..UpdateMerchant::default()
        };
        let updated = h.service.update(merchant.id, input, ACTOR).await.unwrap().data;

        assert_eq!(updated.email, None);
        assert_eq!(updated.municipality, "Medellín");
        assert!(updated.updated_at.is_some());
        assert!(!h.cache.contains(&merchant_key(merchant.id)));
    }

    #[tokio::test]
    async fn update_email_conflicts_only_with_other_merchants() {
        let h = harness();
        let a = seeded(&h, "Uno", Some("uno@example.com")).await;
        seeded(&h, "Dos", Some("dos@example.com")).await;

        let same = UpdateMerchant {
            email: Some(Some("UNO@example.com".to_string())),
            ..UpdateMerchant::default()
        };
        assert!(h.service.update(a.id, same, ACTOR).await.is_ok());

        let clash = UpdateMerchant {
            email: Some(Some("dos@example.com".to_string())),
            ..UpdateMerchant::default()
        };
        let err = h.service.update(a.id, clash, ACTOR).await.unwrap_err();
        assert_eq!(err, DomainError::conflict(EMAIL_TAKEN));
    }

    #[tokio::test]
    async fn status_change_to_same_value_is_a_no_op() {
        let h = harness();
        let merchant = seeded(&h, "Uno", None).await;
        h.service.get(merchant.id).await.unwrap();

        let outcome = h
            .service
            .update_status(merchant.id, "ACTIVE", ACTOR)
            .await
            .unwrap();
        assert_eq!(outcome.message, "merchant already has the requested status");
        assert!(outcome.data.updated_at.is_none());
        assert!(h.cache.contains(&merchant_key(merchant.id)));

        let outcome = h
            .service
            .update_status(merchant.id, "INACTIVE", ACTOR)
            .await
            .unwrap();
        assert_eq!(outcome.data.status, MerchantStatus::Inactive);
        assert!(!h.cache.contains(&merchant_key(merchant.id)));

        let err = h
            .service
            .update_status(merchant.id, "PAUSED", ACTOR)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ACTIVE, INACTIVE"));
    }

    #[tokio::test]
    async fn delete_is_refused_while_establishments_exist() {
        let h = harness();
        let merchant = seeded(&h, "Uno", None).await;
        h.store
            .add_establishment(merchant.id, "Sede Norte", Some(500_000.0), Some(4))
            .unwrap();

        let err = h.service.delete(merchant.id, ACTOR).await.unwrap_err();
        assert_eq!(err, DomainError::conflict(HAS_ESTABLISHMENTS));
        assert!(h.service.get(merchant.id).await.is_ok());

        h.store.remove_establishments(merchant.id).unwrap();
        let outcome = h.service.delete(merchant.id, ACTOR).await.unwrap();
        assert_eq!(outcome.data.id, merchant.id);
        assert!(matches!(
            h.service.get(merchant.id).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn totals_sum_establishments_and_are_cached() {
        let h = harness();
        let merchant = seeded(&h, "Uno", None).await;
        for (revenue, employees) in [(1_000_000.0, 5), (2_500_000.0, 8), (800_000.0, 3)] {
            h.store
                .add_establishment(merchant.id, "Sede", Some(revenue), Some(employees))
                .unwrap();
        }

        let totals = h.service.totals(merchant.id).await.unwrap();
        assert_eq!(totals.total_revenue, 4_300_000.0);
        assert_eq!(totals.total_employees, 16);
        assert!(h.cache.contains(&totals_key(merchant.id)));

        let err = h.service.totals(MerchantId::from_raw(77)).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn export_includes_only_active_merchants() {
        let h = harness();
        seeded(&h, "Activo", None).await;
        let inactive = seeded(&h, "Inactivo", None).await;
        h.service
            .update_status(inactive.id, "INACTIVE", ACTOR)
            .await
            .unwrap();

        let file = h.service.export(ExportFormat::Pipe).await.unwrap();
        assert_eq!(file.records, 1);
        assert!(file.file_name.ends_with("_pipe.txt"));
        let text = String::from_utf8(file.bytes).unwrap();
        assert!(text.contains("\"Activo\""));
        assert!(!text.contains("Inactivo"));
    }
}

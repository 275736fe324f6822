//! Request payloads for creating and updating merchants, with their shape
//! checks and normalisation rules.
//!
//! Shape checks here are context-free (lengths, email syntax). Checks that need
//! reference data or storage (known municipality, email uniqueness) are done by
//! the service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use bizadmin_core::{DomainError, UserId};

use crate::merchant::{MerchantChanges, MerchantStatus, NewMerchant};

const LEGAL_NAME_LEN: (usize, usize) = (2, 200);
const MUNICIPALITY_LEN: (usize, usize) = (2, 100);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMerchant {
    pub legal_name: String,
    pub municipality: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub status: Option<MerchantStatus>,
}

impl CreateMerchant {
    pub fn validate(&self) -> Result<(), DomainError> {
        check_len("legal name", &self.legal_name, LEGAL_NAME_LEN)?;
        check_len("municipality", &self.municipality, MUNICIPALITY_LEN)?;
        if let Some(email) = self.email.as_deref() {
            check_email(email)?;
        }
        Ok(())
    }

    /// Email in the form it is stored and compared in.
    pub fn normalized_email(&self) -> Option<String> {
        self.email.as_deref().and_then(normalize_email)
    }

    pub fn normalize(self, updated_by: UserId) -> NewMerchant {
        let email = self.normalized_email();
        NewMerchant {
            legal_name: self.legal_name.trim().to_string(),
            municipality: self.municipality.trim().to_string(),
            phone: self.phone.as_deref().and_then(normalize_phone),
            email,
            status: self.status.unwrap_or_default(),
            updated_by,
        }
    }
}

/// Partial update. For `phone` and `email`, an explicit `null` (or blank
/// string) clears the stored value while an absent key leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMerchant {
    #[serde(default)]
    pub legal_name: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<MerchantStatus>,
}

impl UpdateMerchant {
    pub fn is_empty(&self) -> bool {
        self.legal_name.is_none()
            && self.municipality.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.status.is_none()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(name) = self.legal_name.as_deref() {
            check_len("legal name", name, LEGAL_NAME_LEN)?;
        }
        if let Some(municipality) = self.municipality.as_deref() {
            check_len("municipality", municipality, MUNICIPALITY_LEN)?;
        }
        if let Some(Some(email)) = &self.email {
            if !email.trim().is_empty() {
                check_email(email)?;
            }
        }
        Ok(())
    }

    /// The new, non-blank email when one is being set.
    pub fn normalized_email(&self) -> Option<String> {
        self.email.as_ref()?.as_deref().and_then(normalize_email)
    }

    pub fn into_changes(self, updated_by: UserId, updated_at: DateTime<Utc>) -> MerchantChanges {
        MerchantChanges {
            legal_name: self.legal_name.map(|n| n.trim().to_string()),
            municipality: self.municipality.map(|m| m.trim().to_string()),
            phone: self.phone.map(|p| p.as_deref().and_then(normalize_phone)),
            email: self.email.map(|e| e.as_deref().and_then(normalize_email)),
            status: self.status,
            updated_by,
            updated_at,
        }
    }
}

/// Distinguish `"field": null` (Some(None)) from a missing key (None).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    (!email.is_empty()).then_some(email)
}

fn normalize_phone(raw: &str) -> Option<String> {
    let phone = raw.trim();
    (!phone.is_empty()).then(|| phone.to_string())
}

fn check_len(field: &str, value: &str, (min, max): (usize, usize)) -> Result<(), DomainError> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(DomainError::validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

fn check_email(raw: &str) -> Result<(), DomainError> {
    let email = raw.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && domain.split('.').all(|label| !label.is_empty())
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(DomainError::validation("a valid email address is required"))
    }
}

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bizadmin_core::{DomainError, EstablishmentId, MerchantId, UserId};

/// Merchant lifecycle flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MerchantStatus {
    #[default]
    #[serde(alias = "ACTIVO")]
    Active,
    #[serde(alias = "INACTIVO")]
    Inactive,
}

impl MerchantStatus {
    pub const ALL: [MerchantStatus; 2] = [MerchantStatus::Active, MerchantStatus::Inactive];

    pub fn as_str(&self) -> &'static str {
        match self {
            MerchantStatus::Active => "ACTIVE",
            MerchantStatus::Inactive => "INACTIVE",
        }
    }
}

impl core::fmt::Display for MerchantStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MerchantStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" | "ACTIVO" => Ok(MerchantStatus::Active),
            "INACTIVE" | "INACTIVO" => Ok(MerchantStatus::Inactive),
            _ => {
                let allowed = MerchantStatus::ALL.map(|s| s.as_str()).join(", ");
                Err(DomainError::validation(format!(
                    "invalid status; allowed values are: {allowed}"
                )))
            }
        }
    }
}

/// Name and email of the user who last touched a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub name: String,
    pub email: String,
}

/// A physical location owned by a merchant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Establishment {
    pub id: EstablishmentId,
    pub merchant_id: MerchantId,
    pub name: String,
    pub revenue: Option<f64>,
    pub employee_count: Option<i64>,
}

impl Establishment {
    pub fn figures(&self) -> EstablishmentFigures {
        EstablishmentFigures {
            revenue: self.revenue,
            employee_count: self.employee_count,
        }
    }
}

/// The two numbers that feed merchant totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct EstablishmentFigures {
    pub revenue: Option<f64>,
    pub employee_count: Option<i64>,
}

/// A merchant record as read back from storage, with its relations loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Merchant {
    pub id: MerchantId,
    pub legal_name: String,
    pub municipality: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: MerchantStatus,
    pub registered_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<UserId>,
    pub updated_by_user: Option<UserSummary>,
    pub establishments: Vec<Establishment>,
}

impl Merchant {
    pub fn has_establishments(&self) -> bool {
        !self.establishments.is_empty()
    }

    pub fn establishment_figures(&self) -> Vec<EstablishmentFigures> {
        self.establishments.iter().map(Establishment::figures).collect()
    }
}

/// Normalised fields for a merchant about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMerchant {
    pub legal_name: String,
    pub municipality: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: MerchantStatus,
    pub updated_by: UserId,
}

/// Partial update. `None` leaves a column untouched; for the nullable columns
/// `Some(None)` clears the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerchantChanges {
    pub legal_name: Option<String>,
    pub municipality: Option<String>,
    pub phone: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub status: Option<MerchantStatus>,
    pub updated_by: UserId,
    pub updated_at: DateTime<Utc>,
}

impl MerchantChanges {
    /// Status-only change, as issued by the status endpoint.
    pub fn status(status: MerchantStatus, updated_by: UserId, updated_at: DateTime<Utc>) -> Self {
        Self {
            legal_name: None,
            municipality: None,
            phone: None,
            email: None,
            status: Some(status),
            updated_by,
            updated_at,
        }
    }

    /// Apply the changes to an in-memory copy of a record.
    pub fn apply_to(&self, merchant: &mut Merchant) {
        if let Some(name) = &self.legal_name {
            merchant.legal_name = name.clone();
        }
        if let Some(municipality) = &self.municipality {
            merchant.municipality = municipality.clone();
        }
        if let Some(phone) = &self.phone {
            merchant.phone = phone.clone();
        }
        if let Some(email) = &self.email {
            merchant.email = email.clone();
        }
        if let Some(status) = self.status {
            merchant.status = status;
        }
        merchant.updated_by = Some(self.updated_by);
        merchant.updated_at = Some(self.updated_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_accepts_english_and_legacy_spanish_values() {
        assert_eq!("ACTIVE".parse::<MerchantStatus>().unwrap(), MerchantStatus::Active);
        assert_eq!("INACTIVO".parse::<MerchantStatus>().unwrap(), MerchantStatus::Inactive);
        let from_json: MerchantStatus = serde_json::from_str("\"ACTIVO\"").unwrap();
        assert_eq!(from_json, MerchantStatus::Active);
    }

    #[test]
    fn unknown_status_lists_allowed_values() {
        let err = "active".parse::<MerchantStatus>().unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("invalid status; allowed values are: ACTIVE, INACTIVE")
        );
    }

    #[test]
    fn changes_only_touch_supplied_fields() {
        let now = Utc::now();
        let mut merchant = Merchant {
            id: MerchantId::from_raw(1),
            legal_name: "Café Andino".to_string(),
            municipality: "Cali".to_string(),
            phone: Some("3001234567".to_string()),
            email: Some("cafe@example.com".to_string()),
            status: MerchantStatus::Active,
            registered_at: now,
            updated_at: None,
            updated_by: None,
            updated_by_user: None,
            establishments: vec![],
        };

        let changes = MerchantChanges {
            legal_name: None,
            municipality: Some("Palmira".to_string()),
            phone: Some(None),
            email: None,
            status: None,
            updated_by: UserId::from_raw(9),
            updated_at: now,
        };
        changes.apply_to(&mut merchant);

        assert_eq!(merchant.legal_name, "Café Andino");
        assert_eq!(merchant.municipality, "Palmira");
        assert_eq!(merchant.phone, None);
        assert_eq!(merchant.email.as_deref(), Some("cafe@example.com"));
        assert_eq!(merchant.updated_by, Some(UserId::from_raw(9)));
    }
}

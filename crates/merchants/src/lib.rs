//! `bizadmin-merchants`: merchant domain.
//!
//! Pure logic only: reference data, validators, totals aggregation, record
//! types, input normalisation, pagination math and export formatting. Storage,
//! caching and HTTP live in `bizadmin-infra` / `bizadmin-api`.

pub mod export;
pub mod input;
pub mod merchant;
pub mod pagination;
pub mod reference;
pub mod totals;
pub mod validators;

pub use export::{ExportError, ExportFormat, ExportRow, render_export, write_export};
pub use input::{CreateMerchant, UpdateMerchant};
pub use merchant::{
    Establishment, EstablishmentFigures, Merchant, MerchantChanges, MerchantStatus, NewMerchant,
    UserSummary,
};
pub use pagination::{PageMeta, PageRequest, Paginated};
pub use reference::{DEPARTMENTS, Department};
pub use totals::{MerchantTotals, calculate_merchant_totals};
pub use validators::{validate_merchant_id, validate_municipality};

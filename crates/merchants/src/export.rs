//! Delimited-text export of active merchants.
//!
//! Two conventions are supported: pipe-separated with every field quoted, and
//! semicolon-separated (spreadsheet friendly) with minimal quoting. Both start
//! with a UTF-8 byte order mark and a header row.

use core::str::FromStr;
use std::io::Write;

use chrono::{DateTime, NaiveDate, Utc};
use csv::{QuoteStyle, WriterBuilder};
use thiserror::Error;

use bizadmin_core::DomainError;

use crate::merchant::{Merchant, MerchantStatus};
use crate::totals::calculate_merchant_totals;

const BOM: &[u8] = b"\xEF\xBB\xBF";

pub const HEADERS: [&str; 9] = [
    "Legal name",
    "Municipality",
    "Phone",
    "Email",
    "Registration date",
    "Status",
    "Establishments",
    "Total revenue",
    "Total employees",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    Pipe,
    #[default]
    Semicolon,
}

impl ExportFormat {
    pub fn delimiter(&self) -> u8 {
        match self {
            ExportFormat::Pipe => b'|',
            ExportFormat::Semicolon => b';',
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pipe => "txt",
            ExportFormat::Semicolon => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Pipe => "text/plain; charset=utf-8",
            ExportFormat::Semicolon => "text/csv; charset=utf-8",
        }
    }

    fn quote_style(&self) -> QuoteStyle {
        match self {
            ExportFormat::Pipe => QuoteStyle::Always,
            ExportFormat::Semicolon => QuoteStyle::Necessary,
        }
    }

    fn file_tag(&self) -> &'static str {
        match self {
            ExportFormat::Pipe => "pipe",
            ExportFormat::Semicolon => "excel",
        }
    }

    /// Download name, e.g. `merchants_2024-05-01T13-45-00_pipe.txt`.
    pub fn file_name(&self, generated_at: DateTime<Utc>) -> String {
        format!(
            "merchants_{}_{}.{}",
            generated_at.format("%Y-%m-%dT%H-%M-%S"),
            self.file_tag(),
            self.extension()
        )
    }
}

impl FromStr for ExportFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pipe" => Ok(ExportFormat::Pipe),
            "semicolon" | "excel" => Ok(ExportFormat::Semicolon),
            _ => Err(DomainError::validation(
                "export format must be one of: pipe, semicolon",
            )),
        }
    }
}

/// One exported line: a merchant with its establishment aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub legal_name: String,
    pub municipality: String,
    pub phone: String,
    pub email: String,
    pub registered_on: NaiveDate,
    pub status: MerchantStatus,
    pub establishments: usize,
    pub total_revenue: f64,
    pub total_employees: i64,
}

impl ExportRow {
    pub fn from_merchant(merchant: &Merchant) -> Self {
        let totals = calculate_merchant_totals(&merchant.establishment_figures());
        Self {
            legal_name: merchant.legal_name.clone(),
            municipality: merchant.municipality.clone(),
            phone: merchant.phone.clone().unwrap_or_default(),
            email: merchant.email.clone().unwrap_or_default(),
            registered_on: merchant.registered_at.date_naive(),
            status: merchant.status,
            establishments: merchant.establishments.len(),
            total_revenue: totals.total_revenue,
            total_employees: totals.total_employees,
        }
    }

    fn fields(&self) -> [String; 9] {
        [
            self.legal_name.clone(),
            self.municipality.clone(),
            self.phone.clone(),
            self.email.clone(),
            self.registered_on.format("%Y-%m-%d").to_string(),
            self.status.as_str().to_string(),
            self.establishments.to_string(),
            self.total_revenue.to_string(),
            self.total_employees.to_string(),
        ]
    }
}

/// Write the header row followed by one row per entry.
pub fn write_export<W: Write>(
    rows: &[ExportRow],
    format: ExportFormat,
    mut out: W,
) -> Result<(), ExportError> {
    out.write_all(BOM)?;

    let mut writer = WriterBuilder::new()
        .delimiter(format.delimiter())
        .quote_style(format.quote_style())
        .from_writer(out);

    writer.write_record(HEADERS)?;
    for row in rows {
        writer.write_record(row.fields())?;
    }
    writer.flush()?;
    Ok(())
}

/// Render into an in-memory buffer.
pub fn render_export(rows: &[ExportRow], format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    write_export(rows, format, &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizadmin_core::{EstablishmentId, MerchantId};
    use chrono::TimeZone;

    use crate::merchant::Establishment;

    fn merchant() -> Merchant {
        let id = MerchantId::from_raw(1);
        Merchant {
            id,
            legal_name: "Panadería; El Trigo".to_string(),
            municipality: "Tunja".to_string(),
            phone: None,
            email: Some("trigo@example.com".to_string()),
            status: MerchantStatus::Active,
            registered_at: Utc.with_ymd_and_hms(2024, 3, 9, 15, 30, 0).unwrap(),
            updated_at: None,
            updated_by: None,
            updated_by_user: None,
            establishments: vec![
                Establishment {
                    id: EstablishmentId::from_raw(1),
                    merchant_id: id,
                    name: "Centro".to_string(),
                    revenue: Some(1_000_000.0),
                    employee_count: Some(5),
                },
                Establishment {
                    id: EstablishmentId::from_raw(2),
                    merchant_id: id,
                    name: "Norte".to_string(),
                    revenue: Some(2_500_000.0),
                    employee_count: Some(8),
                },
            ],
        }
    }

    fn lines(bytes: &[u8]) -> Vec<String> {
        let text = std::str::from_utf8(bytes).unwrap();
        let text = text.strip_prefix('\u{feff}').expect("missing BOM");
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn row_carries_aggregates_and_date_only() {
        let row = ExportRow::from_merchant(&merchant());
        assert_eq!(row.establishments, 2);
        assert_eq!(row.total_revenue, 3_500_000.0);
        assert_eq!(row.total_employees, 13);
        assert_eq!(row.registered_on.to_string(), "2024-03-09");
        assert_eq!(row.phone, "");
    }

    #[test]
    fn semicolon_format_quotes_only_when_needed() {
        let rows = [ExportRow::from_merchant(&merchant())];
        let out = lines(&render_export(&rows, ExportFormat::Semicolon).unwrap());

        assert_eq!(out[0], HEADERS.join(";"));
        assert_eq!(
            out[1],
            "\"Panadería; El Trigo\";Tunja;;trigo@example.com;2024-03-09;ACTIVE;2;3500000;13"
        );
    }

    #[test]
    fn pipe_format_quotes_every_field() {
        let rows = [ExportRow::from_merchant(&merchant())];
        let out = lines(&render_export(&rows, ExportFormat::Pipe).unwrap());

        assert!(out[0].starts_with("\"Legal name\"|\"Municipality\""));
        assert!(out[1].ends_with("|\"ACTIVE\"|\"2\"|\"3500000\"|\"13\""));
    }

    #[test]
    fn header_only_when_nothing_to_export() {
        let out = lines(&render_export(&[], ExportFormat::Semicolon).unwrap());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn format_names_and_file_names() {
        assert_eq!("PIPE".parse::<ExportFormat>().unwrap(), ExportFormat::Pipe);
        assert_eq!("excel".parse::<ExportFormat>().unwrap(), ExportFormat::Semicolon);
        assert!("tsv".parse::<ExportFormat>().is_err());

        let at = Utc.with_ymd_and_hms(2024, 5, 1, 13, 45, 0).unwrap();
        assert_eq!(
            ExportFormat::Pipe.file_name(at),
            "merchants_2024-05-01T13-45-00_pipe.txt"
        );
    }
}

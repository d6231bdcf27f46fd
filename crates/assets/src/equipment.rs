use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use almox_core::{DomainError, DomainResult, Entity, EquipmentId, LocationId, SectorId};

use crate::text::{optional, required};

pub const MAX_EQUIPMENT_NAME_LEN: usize = 160;
pub const MAX_BRAND_LEN: usize = 120;
pub const MAX_INVOICE_NF_LEN: usize = 80;
pub const MAX_BARCODE_LEN: usize = 120;

/// A tracked piece of equipment, identified by its PAT/barcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: EquipmentId,
    pub name: String,
    pub brand: Option<String>,
    pub value: Option<Decimal>,
    pub invoice_nf: Option<String>,
    pub barcode_pat: String,
    pub invoice_file: Option<String>,
    pub invoice_mime: Option<String>,
    pub location_id: LocationId,
    pub sector_id: SectorId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Equipment {
    type Id = EquipmentId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Raw equipment fields from a create/update request.
#[derive(Debug, Clone, Copy, Default)]
pub struct EquipmentInput<'a> {
    pub name: &'a str,
    pub brand: Option<&'a str>,
    pub value: Option<MoneyInput<'a>>,
    pub invoice_nf: Option<&'a str>,
    pub barcode_pat: &'a str,
    pub location_id: Option<LocationId>,
    pub sector_id: Option<SectorId>,
}

/// A monetary value as received, tagged with how it must be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoneyInput<'a> {
    /// Typed by a person: Brazilian or plain notation, see [`parse_money`].
    Text(&'a str),
    /// Rendering of a JSON number: `.` is always the decimal point.
    Number(&'a str),
}

impl MoneyInput<'_> {
    /// `None` for blank text.
    pub fn parse(self) -> DomainResult<Option<Decimal>> {
        match self {
            MoneyInput::Text(raw) if raw.trim().is_empty() => Ok(None),
            MoneyInput::Text(raw) => parse_money(raw).map(Some),
            MoneyInput::Number(raw) => parse_plain_money(raw).map(Some),
        }
    }
}

/// Validated equipment fields, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipmentDraft {
    pub name: String,
    pub brand: Option<String>,
    pub value: Option<Decimal>,
    pub invoice_nf: Option<String>,
    pub barcode_pat: String,
    pub location_id: LocationId,
    pub sector_id: SectorId,
}

impl EquipmentDraft {
    pub fn validate(input: &EquipmentInput<'_>) -> DomainResult<Self> {
        let (Some(location_id), Some(sector_id)) = (input.location_id, input.sector_id) else {
            return Err(DomainError::validation(
                "name, PAT/barcode, location and sector are required",
            ));
        };

        let value = match input.value {
            None => None,
            Some(money) => money.parse()?,
        };

        Ok(Self {
            name: required(input.name, MAX_EQUIPMENT_NAME_LEN, "equipment name")?,
            brand: optional(input.brand, MAX_BRAND_LEN, "brand")?,
            value,
            invoice_nf: optional(input.invoice_nf, MAX_INVOICE_NF_LEN, "invoice number")?,
            barcode_pat: required(input.barcode_pat, MAX_BARCODE_LEN, "PAT/barcode")?,
            location_id,
            sector_id,
        })
    }
}

/// Parse a monetary value with at most two decimal places.
///
/// Accepts Brazilian notation (`1.500,00`, `.` for thousands and `,` for decimals)
/// as well as plain `1500.00`. A lone `.` followed by exactly three digits is read
/// as a thousands separator (`1.500` is 1500).
pub fn parse_money(raw: &str) -> DomainResult<Decimal> {
    let raw = raw.trim();
    let invalid = || DomainError::validation(format!("invalid value '{raw}' (e.g. 1500,00)"));

    let normalized = if raw.contains(',') {
        raw.replace('.', "").replace(',', ".")
    } else {
        match raw.matches('.').count() {
            0 => raw.to_string(),
            1 => {
                let decimals = raw.rsplit('.').next().map(str::len).unwrap_or(0);
                if decimals == 3 { raw.replace('.', "") } else { raw.to_string() }
            }
            _ => raw.replace('.', ""),
        }
    };

    if normalized.is_empty() || !normalized.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(invalid());
    }

    let value = Decimal::from_str(&normalized).map_err(|_| invalid())?;
    if value.scale() > 2 {
        return Err(invalid());
    }
    Ok(value)
}

/// Parse a plain decimal (`1234.5`, no thousands separators) with at most two
/// decimal places.
pub fn parse_plain_money(raw: &str) -> DomainResult<Decimal> {
    let raw = raw.trim();
    let invalid = || DomainError::validation(format!("invalid value '{raw}' (at most 2 decimal places)"));

    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(invalid());
    }
    let value = Decimal::from_str(raw).map_err(|_| invalid())?;
    if value.scale() > 2 {
        return Err(invalid());
    }
    Ok(value)
}

/// Search criteria for the equipment listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentFilter {
    /// Case-insensitive substring over name, brand, barcode and invoice number.
    pub q: Option<String>,
    pub location_id: Option<LocationId>,
    pub sector_id: Option<SectorId>,
}

impl EquipmentFilter {
    /// Search text with blanks collapsed to `None`.
    pub fn query(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn input<'a>(value: Option<MoneyInput<'a>>) -> EquipmentInput<'a> {
        EquipmentInput {
            name: "Mesa de som",
            brand: Some("Behringer"),
            value,
            invoice_nf: None,
            barcode_pat: " PAT-0001 ",
            location_id: Some(LocationId::from_i64(1)),
            sector_id: Some(SectorId::from_i64(2)),
        }
    }

    #[test]
    fn parses_brazilian_and_plain_values() {
        assert_eq!(parse_money("1.500,00").unwrap(), Decimal::new(150000, 2));
        assert_eq!(parse_money("1500,5").unwrap(), Decimal::new(15005, 1));
        assert_eq!(parse_money("1500.00").unwrap(), Decimal::new(150000, 2));
        assert_eq!(parse_money("1.500").unwrap(), Decimal::from(1500));
        assert_eq!(parse_money("2.300.000").unwrap(), Decimal::from(2_300_000));
        assert_eq!(parse_money("99").unwrap(), Decimal::from(99));
    }

    #[test]
    fn rejects_malformed_values() {
        for raw in ["abc", "-10", "1,234,5", "10,999", "R$ 10", ""] {
            assert!(parse_money(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn draft_trims_barcode_and_parses_value() {
        let draft = EquipmentDraft::validate(&input(Some(MoneyInput::Text("1.200,50")))).unwrap();
        assert_eq!(draft.barcode_pat, "PAT-0001");
        assert_eq!(draft.value, Some(Decimal::new(120050, 2)));
    }

    #[test]
    fn numeric_values_never_use_thousands_heuristic() {
        assert_eq!(parse_plain_money("1500.5").unwrap(), Decimal::new(15005, 1));
        assert_eq!(parse_plain_money("99").unwrap(), Decimal::from(99));
        for raw in ["1.234", "0.001", "-3", "1e3", "1,5", ""] {
            assert!(parse_plain_money(raw).is_err(), "accepted {raw:?}");
        }

        // The same digits typed by hand are Brazilian thousands.
        assert_eq!(MoneyInput::Text("1.234").parse().unwrap(), Some(Decimal::from(1234)));
        assert!(EquipmentDraft::validate(&input(Some(MoneyInput::Number("1.234")))).is_err());
    }

    #[test]
    fn blank_text_value_is_absent() {
        let draft = EquipmentDraft::validate(&input(Some(MoneyInput::Text("  ")))).unwrap();
        assert_eq!(draft.value, None);
    }

    #[test]
    fn draft_requires_placement() {
        let mut missing = input(None);
        missing.sector_id = None;
        assert!(matches!(
            EquipmentDraft::validate(&missing),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn blank_query_is_ignored() {
        let filter = EquipmentFilter {
            q: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.query(), None);
    }

    proptest! {
        #[test]
        fn brazilian_notation_round_trips_cents(reais in 0u64..10_000_000, cents in 0u64..100) {
            let mut grouped = String::new();
            let digits = reais.to_string();
            for (i, c) in digits.chars().enumerate() {
                if i > 0 && (digits.len() - i) % 3 == 0 {
                    grouped.push('.');
                }
                grouped.push(c);
            }
            let raw = format!("{grouped},{cents:02}");
            let expected = Decimal::new((reais * 100 + cents) as i64, 2);
            prop_assert_eq!(parse_money(&raw).unwrap(), expected);
        }
    }
}

use serde::{Deserialize, Deserializer};

use almox_assets::{EquipmentFilter, EquipmentInput, InvoiceAttachment, LocationInput, MoneyInput};
use almox_core::{DomainResult, LocationId, SectorId};
use almox_stock::MovementRequest;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub name: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct MovementBody {
    #[serde(alias = "type")]
    pub movement_type: String,
    pub quantity: i64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl MovementBody {
    pub fn as_request(&self) -> MovementRequest<'_> {
        MovementRequest {
            movement_type: &self.movement_type,
            quantity: self.quantity,
            location: self.location.as_deref(),
            reason: self.reason.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub name: String,
    #[serde(default)]
    pub add: i64,
    #[serde(default)]
    pub sub: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LocationRequest {
    pub fn as_input(&self) -> LocationInput<'_> {
        LocationInput {
            name: &self.name,
            address: self.address.as_deref(),
            notes: self.notes.as_deref(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LocationQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SectorRequest {
    pub name: String,
    /// Required on update; on create the path's location is used.
    #[serde(default)]
    pub location_id: Option<LocationId>,
}

/// Monetary value as sent by forms (`"1.500,00"`) or JSON clients (`1500.5`).
///
/// Numbers are kept as their JSON rendering so they are never read with the
/// thousands-separator rules meant for typed text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MoneyField {
    Text(String),
    #[serde(deserialize_with = "number_text")]
    Number(String),
}

impl MoneyField {
    fn as_input(&self) -> MoneyInput<'_> {
        match self {
            MoneyField::Text(raw) => MoneyInput::Text(raw),
            MoneyField::Number(raw) => MoneyInput::Number(raw),
        }
    }
}

fn number_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    serde_json::Number::deserialize(deserializer).map(|n| n.to_string())
}

#[derive(Debug, Deserialize)]
pub struct EquipmentRequest {
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub value: Option<MoneyField>,
    #[serde(default)]
    pub invoice_nf: Option<String>,
    pub barcode_pat: String,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub sector_id: Option<SectorId>,
    #[serde(default)]
    pub invoice: Option<InvoiceAttachment>,
}

impl EquipmentRequest {
    pub fn as_input(&self) -> EquipmentInput<'_> {
        EquipmentInput {
            name: &self.name,
            brand: self.brand.as_deref(),
            value: self.value.as_ref().map(MoneyField::as_input),
            invoice_nf: self.invoice_nf.as_deref(),
            barcode_pat: &self.barcode_pat,
            location_id: self.location_id,
            sector_id: self.sector_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EquipmentQuery {
    pub q: Option<String>,
    pub location_id: Option<String>,
    pub sector_id: Option<String>,
}

impl EquipmentQuery {
    /// Blank id parameters (as submitted by an unset `<select>`) are ignored.
    pub fn into_filter(self) -> DomainResult<EquipmentFilter> {
        Ok(EquipmentFilter {
            q: self.q,
            location_id: parse_optional_id(self.location_id.as_deref())?,
            sector_id: parse_optional_id(self.sector_id.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct BarcodeQuery {
    pub code: String,
}

fn parse_optional_id<T>(raw: Option<&str>) -> DomainResult<Option<T>>
where
    T: core::str::FromStr<Err = almox_core::DomainError>,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_body_accepts_type_alias() {
        let body: MovementBody =
            serde_json::from_str(r#"{"type": "SAIDA", "quantity": 2, "reason": "culto"}"#).unwrap();
        let req = body.as_request();
        assert_eq!(req.movement_type, "SAIDA");
        assert_eq!(req.reason, Some("culto"));
        assert_eq!(req.location, None);
    }

    #[test]
    fn equipment_value_accepts_text_or_number() {
        let text: EquipmentRequest = serde_json::from_str(
            r#"{"name": "Mesa", "barcode_pat": "P1", "value": "1.500,00", "location_id": 1, "sector_id": 2}"#,
        )
        .unwrap();
        assert_eq!(text.as_input().value, Some(MoneyInput::Text("1.500,00")));

        let number: EquipmentRequest =
            serde_json::from_str(r#"{"name": "Mesa", "barcode_pat": "P1", "value": 99.9}"#).unwrap();
        assert_eq!(number.as_input().value, Some(MoneyInput::Number("99.9")));
        assert_eq!(number.location_id, None);
    }

    #[test]
    fn numeric_value_with_three_decimals_is_not_read_as_thousands() {
        let body: EquipmentRequest = serde_json::from_str(
            r#"{"name": "Mesa", "barcode_pat": "P1", "value": 1.234, "location_id": 1, "sector_id": 2}"#,
        )
        .unwrap();
        assert!(matches!(
            almox_assets::EquipmentDraft::validate(&body.as_input()),
            Err(almox_core::DomainError::Validation(_))
        ));
    }

    #[test]
    fn blank_filter_ids_are_ignored() {
        let filter = EquipmentQuery {
            q: Some("mesa".to_string()),
            location_id: Some(" ".to_string()),
            sector_id: Some("3".to_string()),
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.location_id, None);
        assert_eq!(filter.sector_id, Some(SectorId::from_i64(3)));

        let bad = EquipmentQuery {
            location_id: Some("abc".to_string()),
            ..Default::default()
        };
        assert!(bad.into_filter().is_err());
    }
}

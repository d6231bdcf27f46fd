//! Movement validation.
//!
//! Pure functions: they never touch storage, so a rejected request leaves no
//! trace. Every ledger write goes through here first.

use almox_core::{DomainError, DomainResult};

use crate::movement::{MovementType, NewMovement};

pub const MAX_ITEM_NAME_LEN: usize = 160;
pub const MAX_LOCATION_LEN: usize = 180;
pub const MAX_REASON_LEN: usize = 220;

/// Raw movement input, as received from a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementRequest<'a> {
    pub movement_type: &'a str,
    pub quantity: i64,
    pub location: Option<&'a str>,
    pub reason: Option<&'a str>,
}

/// Map a wire string onto the canonical vocabulary.
///
/// Accepted (trimmed, case-insensitive): `ENTRADA`/`ENTRY`, `SAIDA`/`SAÍDA`/`USO`/`USE`,
/// `PERDA`/`LOSS`, `DANIFICADO`/`DANO`/`DAMAGE`.
pub fn normalize_movement_type(raw: &str) -> DomainResult<MovementType> {
    let upper = raw.trim().to_uppercase();
    match upper.as_str() {
        "ENTRADA" | "ENTRY" => Ok(MovementType::Entry),
        "SAIDA" | "SAÍDA" | "USO" | "USE" => Ok(MovementType::Use),
        "PERDA" | "LOSS" => Ok(MovementType::Loss),
        "DANIFICADO" | "DANO" | "DAMAGE" => Ok(MovementType::Damage),
        "" => Err(DomainError::validation("movement type is required")),
        _ => Err(DomainError::validation(format!(
            "unknown movement type '{}'",
            raw.trim()
        ))),
    }
}

pub fn validate_quantity(quantity: i64) -> DomainResult<i64> {
    if quantity <= 0 {
        return Err(DomainError::validation(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    Ok(quantity)
}

/// Trim and check an item name. Returns the name as it will be stored.
pub fn validate_item_name(raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation("item name cannot be empty"));
    }
    if name.chars().count() > MAX_ITEM_NAME_LEN {
        return Err(DomainError::validation(format!(
            "item name is longer than {MAX_ITEM_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Case-insensitive uniqueness key for an item name.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Reason is mandatory for every debit, optional for ENTRY.
pub fn validate_reason(
    movement_type: MovementType,
    reason: Option<&str>,
) -> DomainResult<Option<String>> {
    let reason = optional_text(reason, MAX_REASON_LEN, "reason")?;
    if movement_type.is_debit() && reason.is_none() {
        return Err(DomainError::validation(format!(
            "a reason is required for {movement_type} movements"
        )));
    }
    Ok(reason)
}

pub fn validate_location(location: Option<&str>) -> DomainResult<Option<String>> {
    optional_text(location, MAX_LOCATION_LEN, "location")
}

/// Full validation of a raw movement: type, quantity, then free-text fields.
pub fn validate_movement(request: &MovementRequest<'_>) -> DomainResult<NewMovement> {
    let movement_type = normalize_movement_type(request.movement_type)?;
    let quantity = validate_quantity(request.quantity)?;
    let reason = validate_reason(movement_type, request.reason)?;
    let location = validate_location(request.location)?;

    Ok(NewMovement {
        movement_type,
        quantity,
        location,
        reason,
    })
}

/// Blank strings collapse to `None`.
pub(crate) fn optional_text(
    value: Option<&str>,
    max_len: usize,
    field: &str,
) -> DomainResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.chars().count() > max_len => Err(DomainError::validation(format!(
            "{field} is longer than {max_len} characters"
        ))),
        Some(v) => Ok(Some(v.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(t: &'a str, qty: i64, reason: Option<&'a str>) -> MovementRequest<'a> {
        MovementRequest {
            movement_type: t,
            quantity: qty,
            location: None,
            reason,
        }
    }

    #[test]
    fn normalizes_wire_vocabulary_and_legacy_aliases() {
        let cases = [
            ("ENTRADA", MovementType::Entry),
            ("SAIDA", MovementType::Use),
            ("saída", MovementType::Use),
            ("USO", MovementType::Use),
            ("PERDA", MovementType::Loss),
            ("DANIFICADO", MovementType::Damage),
            ("DANO", MovementType::Damage),
            (" damage ", MovementType::Damage),
        ];
        for (raw, expected) in cases {
            assert_eq!(normalize_movement_type(raw), Ok(expected), "raw: {raw}");
        }
    }

    #[test]
    fn rejects_unknown_type() {
        let err = normalize_movement_type("TRANSFERENCIA").unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("TRANSFERENCIA")));
        assert!(matches!(normalize_movement_type("  "), Err(DomainError::Validation(_))));
    }

    #[test]
    fn rejects_non_positive_quantity() {
        assert!(matches!(
            validate_movement(&request("ENTRADA", 0, None)),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            validate_movement(&request("ENTRADA", -5, None)),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn debit_requires_reason() {
        for t in ["SAIDA", "PERDA", "DANIFICADO"] {
            assert!(matches!(
                validate_movement(&request(t, 1, None)),
                Err(DomainError::Validation(_))
            ));
            assert!(matches!(
                validate_movement(&request(t, 1, Some("   "))),
                Err(DomainError::Validation(_))
            ));
        }
    }

    #[test]
    fn entry_reason_is_optional() {
        let m = validate_movement(&request("ENTRADA", 3, None)).unwrap();
        assert_eq!(m.movement_type, MovementType::Entry);
        assert_eq!(m.reason, None);
    }

    #[test]
    fn trims_free_text_and_enforces_lengths() {
        let m = validate_movement(&MovementRequest {
            movement_type: "USO",
            quantity: 2,
            location: Some("  Sala 3 "),
            reason: Some(" culto de domingo "),
        })
        .unwrap();
        assert_eq!(m.location.as_deref(), Some("Sala 3"));
        assert_eq!(m.reason.as_deref(), Some("culto de domingo"));

        let long = "x".repeat(MAX_REASON_LEN + 1);
        assert!(matches!(
            validate_movement(&request("USO", 1, Some(&long))),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn item_names_are_trimmed_and_keyed_case_insensitively() {
        assert_eq!(validate_item_name("  Cabo HDMI ").unwrap(), "Cabo HDMI");
        assert!(validate_item_name("   ").is_err());
        assert!(validate_item_name(&"a".repeat(MAX_ITEM_NAME_LEN + 1)).is_err());
        assert_eq!(name_key(" Cabo HDMI"), name_key("cabo hdmi "));
        assert_eq!(name_key("ÁGUA"), "água");
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use almox_core::{DomainResult, Entity, LocationId};

use crate::text::{optional, required};

pub const MAX_LOCATION_NAME_LEN: usize = 120;
pub const MAX_ADDRESS_LEN: usize = 255;
pub const MAX_NOTES_LEN: usize = 255;

/// A physical site (e.g. a church building) that holds sectors and equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Location {
    type Id = LocationId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Raw location fields from a create/update request.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationInput<'a> {
    pub name: &'a str,
    pub address: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Validated location fields, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationDraft {
    pub name: String,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl LocationDraft {
    pub fn validate(input: &LocationInput<'_>) -> DomainResult<Self> {
        Ok(Self {
            name: required(input.name, MAX_LOCATION_NAME_LEN, "location name")?,
            address: optional(input.address, MAX_ADDRESS_LEN, "address")?,
            notes: optional(input.notes, MAX_NOTES_LEN, "notes")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use almox_core::DomainError;

    #[test]
    fn name_is_required_and_optional_fields_collapse() {
        let draft = LocationDraft::validate(&LocationInput {
            name: "  Igreja Central ",
            address: Some("   "),
            notes: Some(" fundos "),
        })
        .unwrap();
        assert_eq!(draft.name, "Igreja Central");
        assert_eq!(draft.address, None);
        assert_eq!(draft.notes.as_deref(), Some("fundos"));

        let err = LocationDraft::validate(&LocationInput::default()).unwrap_err();
        assert_eq!(err, DomainError::validation("location name is required"));
    }
}

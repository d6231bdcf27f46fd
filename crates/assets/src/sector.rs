use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use almox_core::{DomainError, DomainResult, Entity, LocationId, SectorId};

use crate::text::required;

pub const MAX_SECTOR_NAME_LEN: usize = 120;

/// A subdivision of a location. Names are unique per location, ignoring case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub id: SectorId,
    pub location_id: LocationId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for Sector {
    type Id = SectorId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorDraft {
    pub location_id: LocationId,
    pub name: String,
}

impl SectorDraft {
    pub fn validate(location_id: Option<LocationId>, name: &str) -> DomainResult<Self> {
        let location_id =
            location_id.ok_or_else(|| DomainError::validation("a valid location is required"))?;
        Ok(Self {
            location_id,
            name: required(name, MAX_SECTOR_NAME_LEN, "sector name")?,
        })
    }
}

/// Equipment may only be placed in a sector of its own location.
pub fn ensure_sector_in_location(sector: &Sector, location_id: LocationId) -> DomainResult<()> {
    if sector.location_id != location_id {
        return Err(DomainError::validation(format!(
            "sector '{}' does not belong to location {}",
            sector.name, location_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sector(location: i64) -> Sector {
        Sector {
            id: SectorId::from_i64(7),
            location_id: LocationId::from_i64(location),
            name: "Som".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn draft_requires_location_and_name() {
        assert!(SectorDraft::validate(None, "Som").is_err());
        assert!(SectorDraft::validate(Some(LocationId::from_i64(1)), " ").is_err());
        let draft = SectorDraft::validate(Some(LocationId::from_i64(1)), " Som ").unwrap();
        assert_eq!(draft.name, "Som");
    }

    #[test]
    fn sector_must_match_location() {
        assert!(ensure_sector_in_location(&sector(1), LocationId::from_i64(1)).is_ok());
        assert!(matches!(
            ensure_sector_in_location(&sector(1), LocationId::from_i64(2)),
            Err(DomainError::Validation(_))
        ));
    }
}

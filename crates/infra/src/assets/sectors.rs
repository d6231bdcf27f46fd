use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::{info, instrument};

use almox_assets::{Sector, SectorDraft, name_key};
use almox_core::{DomainError, LocationId, SectorId};

use super::AssetStore;
use super::locations::require_location;
use crate::error::{StoreError, StoreResult, map_sqlx_error, unique_as_conflict};
use crate::time;

const SECTOR_COLUMNS: &str = "id, location_id, name, created_at";

fn sector_from_row(row: &SqliteRow) -> StoreResult<Sector> {
    let decode = |e: sqlx::Error| StoreError::corrupt_row("sector", e);
    let created_at: String = row.try_get("created_at").map_err(decode)?;
    Ok(Sector {
        id: SectorId::from_i64(row.try_get("id").map_err(decode)?),
        location_id: LocationId::from_i64(row.try_get("location_id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        created_at: time::decode(&created_at)?,
    })
}

fn duplicate_sector(name: &str) -> String {
    format!("a sector named '{name}' already exists in this location")
}

pub(crate) async fn require_sector(conn: &mut SqliteConnection, id: SectorId) -> StoreResult<Sector> {
    let row = sqlx::query(&format!("SELECT {SECTOR_COLUMNS} FROM sectors WHERE id = ?1"))
        .bind(id.as_i64())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("get_sector", e))?;

    match row {
        Some(row) => sector_from_row(&row),
        None => Err(DomainError::NotFound.into()),
    }
}

async fn count_equipment_in_sector(conn: &mut SqliteConnection, id: SectorId) -> StoreResult<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM equipments WHERE sector_id = ?1")
        .bind(id.as_i64())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("count_sector_equipment", e))
}

impl AssetStore {
    /// Sector names are unique per location, ignoring case.
    #[instrument(skip_all, fields(location_id = ?location_id), err)]
    pub async fn create_sector(
        &self,
        location_id: Option<LocationId>,
        name: &str,
    ) -> StoreResult<Sector> {
        let draft = SectorDraft::validate(location_id, name)?;
        let mut tx = self.begin().await?;
        require_location(&mut tx, draft.location_id).await?;

        let result = sqlx::query(
            "INSERT INTO sectors (location_id, name, name_key, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(draft.location_id.as_i64())
        .bind(&draft.name)
        .bind(name_key(&draft.name))
        .bind(time::encode(Utc::now()))
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_as_conflict("create_sector", e, || duplicate_sector(&draft.name)))?;

        let sector = require_sector(&mut tx, SectorId::from_i64(result.last_insert_rowid())).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        info!(sector_id = %sector.id, location_id = %sector.location_id, "sector created");
        Ok(sector)
    }

    /// Rename and/or move a sector. A sector holding equipment cannot change location.
    #[instrument(skip_all, fields(sector_id = %id), err)]
    pub async fn update_sector(
        &self,
        id: SectorId,
        location_id: Option<LocationId>,
        name: &str,
    ) -> StoreResult<Sector> {
        let draft = SectorDraft::validate(location_id, name)?;
        let mut tx = self.begin().await?;

        let current = require_sector(&mut tx, id).await?;
        if current.location_id != draft.location_id {
            require_location(&mut tx, draft.location_id).await?;
            let held = count_equipment_in_sector(&mut tx, id).await?;
            if held > 0 {
                return Err(DomainError::conflict(format!(
                    "sector '{}' holds {held} equipment item(s) and cannot change location",
                    current.name
                ))
                .into());
            }
        }

        sqlx::query("UPDATE sectors SET location_id = ?1, name = ?2, name_key = ?3 WHERE id = ?4")
            .bind(draft.location_id.as_i64())
            .bind(&draft.name)
            .bind(name_key(&draft.name))
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| unique_as_conflict("update_sector", e, || duplicate_sector(&draft.name)))?;

        let sector = require_sector(&mut tx, id).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(sector)
    }

    /// Refused while any equipment is placed in the sector.
    #[instrument(skip_all, fields(sector_id = %id), err)]
    pub async fn delete_sector(&self, id: SectorId) -> StoreResult<Sector> {
        let mut tx = self.begin().await?;
        let sector = require_sector(&mut tx, id).await?;

        let held = count_equipment_in_sector(&mut tx, id).await?;
        if held > 0 {
            return Err(DomainError::conflict(format!(
                "sector '{}' still holds {held} equipment item(s)",
                sector.name
            ))
            .into());
        }

        sqlx::query("DELETE FROM sectors WHERE id = ?1")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_sector", e))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        info!(sector_id = %id, "sector deleted");
        Ok(sector)
    }

    pub async fn get_sector(&self, id: SectorId) -> StoreResult<Sector> {
        let mut conn = self
            .pool()
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire_connection", e))?;
        require_sector(&mut conn, id).await
    }

    /// Sectors of one location (or all), alphabetical.
    pub async fn list_sectors(&self, location_id: Option<LocationId>) -> StoreResult<Vec<Sector>> {
        if let Some(location_id) = location_id {
            self.get_location(location_id).await?;
        }

        let rows = sqlx::query(&format!(
            "SELECT {SECTOR_COLUMNS} FROM sectors \
             WHERE ?1 IS NULL OR location_id = ?1 \
             ORDER BY name_key ASC, id ASC"
        ))
        .bind(location_id.map(LocationId::as_i64))
        .fetch_all(self.pool())
        .await
        .map_err(|e| map_sqlx_error("list_sectors", e))?;

        rows.iter().map(sector_from_row).collect()
    }
}

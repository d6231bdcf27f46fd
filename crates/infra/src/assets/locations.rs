use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::{info, instrument};

use almox_assets::{Location, LocationDraft, LocationInput, name_key};
use almox_core::{DomainError, LocationId};

use super::{AssetStore, like_pattern};
use crate::error::{StoreError, StoreResult, map_sqlx_error, unique_as_conflict};
use crate::time;

const LOCATION_COLUMNS: &str = "id, name, address, notes, created_at";

fn location_from_row(row: &SqliteRow) -> StoreResult<Location> {
    let decode = |e: sqlx::Error| StoreError::corrupt_row("location", e);
    let created_at: String = row.try_get("created_at").map_err(decode)?;
    Ok(Location {
        id: LocationId::from_i64(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        address: row.try_get("address").map_err(decode)?,
        notes: row.try_get("notes").map_err(decode)?,
        created_at: time::decode(&created_at)?,
    })
}

fn duplicate_location(name: &str) -> String {
    format!("a location named '{name}' already exists")
}

pub(crate) async fn require_location(
    conn: &mut SqliteConnection,
    id: LocationId,
) -> StoreResult<Location> {
    let row = sqlx::query(&format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ?1"))
        .bind(id.as_i64())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("get_location", e))?;

    match row {
        Some(row) => location_from_row(&row),
        None => Err(DomainError::NotFound.into()),
    }
}

impl AssetStore {
    #[instrument(skip_all, err)]
    pub async fn create_location(&self, input: LocationInput<'_>) -> StoreResult<Location> {
        let draft = LocationDraft::validate(&input)?;
        let mut tx = self.begin().await?;

        let result = sqlx::query(
            "INSERT INTO locations (name, name_key, address, notes, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&draft.name)
        .bind(name_key(&draft.name))
        .bind(draft.address.as_deref())
        .bind(draft.notes.as_deref())
        .bind(time::encode(Utc::now()))
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_as_conflict("create_location", e, || duplicate_location(&draft.name)))?;

        let location = require_location(&mut tx, LocationId::from_i64(result.last_insert_rowid())).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        info!(location_id = %location.id, "location created");
        Ok(location)
    }

    #[instrument(skip_all, fields(location_id = %id), err)]
    pub async fn update_location(
        &self,
        id: LocationId,
        input: LocationInput<'_>,
    ) -> StoreResult<Location> {
        let draft = LocationDraft::validate(&input)?;
        let mut tx = self.begin().await?;

        let result = sqlx::query(
            "UPDATE locations SET name = ?1, name_key = ?2, address = ?3, notes = ?4 WHERE id = ?5",
        )
        .bind(&draft.name)
        .bind(name_key(&draft.name))
        .bind(draft.address.as_deref())
        .bind(draft.notes.as_deref())
        .bind(id.as_i64())
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_as_conflict("update_location", e, || duplicate_location(&draft.name)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound.into());
        }
        let location = require_location(&mut tx, id).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(location)
    }

    /// Refused while any sector or equipment still references the location.
    #[instrument(skip_all, fields(location_id = %id), err)]
    pub async fn delete_location(&self, id: LocationId) -> StoreResult<Location> {
        let mut tx = self.begin().await?;
        let location = require_location(&mut tx, id).await?;

        let (sectors, equipments): (i64, i64) = sqlx::query_as(
            "SELECT \
                (SELECT COUNT(*) FROM sectors WHERE location_id = ?1), \
                (SELECT COUNT(*) FROM equipments WHERE location_id = ?1)",
        )
        .bind(id.as_i64())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("count_location_references", e))?;

        if equipments > 0 {
            return Err(DomainError::conflict(format!(
                "location '{}' still holds {equipments} equipment item(s)",
                location.name
            ))
            .into());
        }
        if sectors > 0 {
            return Err(DomainError::conflict(format!(
                "location '{}' still has {sectors} sector(s)",
                location.name
            ))
            .into());
        }

        sqlx::query("DELETE FROM locations WHERE id = ?1")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_location", e))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        info!(location_id = %id, "location deleted");
        Ok(location)
    }

    pub async fn get_location(&self, id: LocationId) -> StoreResult<Location> {
        let mut conn = self
            .pool()
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire_connection", e))?;
        require_location(&mut conn, id).await
    }

    /// Alphabetical; `q` filters by name or address substring.
    pub async fn list_locations(&self, q: Option<&str>) -> StoreResult<Vec<Location>> {
        let pattern = q.map(str::trim).filter(|q| !q.is_empty()).map(like_pattern);
        let rows = sqlx::query(&format!(
            r"SELECT {LOCATION_COLUMNS} FROM locations
              WHERE ?1 IS NULL OR name LIKE ?1 ESCAPE '\' OR address LIKE ?1 ESCAPE '\'
              ORDER BY name_key ASC, id ASC"
        ))
        .bind(pattern)
        .fetch_all(self.pool())
        .await
        .map_err(|e| map_sqlx_error("list_locations", e))?;

        rows.iter().map(location_from_row).collect()
    }
}

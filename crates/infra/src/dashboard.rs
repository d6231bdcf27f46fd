//! Aggregate counts for the landing page.

use serde::Serialize;
use sqlx::Row;
use tracing::instrument;

use crate::assets::AssetStore;
use crate::error::{StoreError, StoreResult, map_sqlx_error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DashboardCounts {
    pub locations: i64,
    pub sectors: i64,
    pub equipments: i64,
    pub stock_items: i64,
}

/// Equipment count for one sector or location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EquipmentTally {
    pub id: i64,
    pub name: String,
    /// Owning location name; only set for sector tallies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    pub equipments: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub counts: DashboardCounts,
    /// Count desc, then name asc.
    pub by_sector: Vec<EquipmentTally>,
    /// Count desc, then name asc.
    pub by_location: Vec<EquipmentTally>,
}

impl AssetStore {
    #[instrument(skip_all, err)]
    pub async fn dashboard(&self) -> StoreResult<Dashboard> {
        let pool = self.pool();

        let (locations, sectors, equipments, stock_items): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT \
                (SELECT COUNT(*) FROM locations), \
                (SELECT COUNT(*) FROM sectors), \
                (SELECT COUNT(*) FROM equipments), \
                (SELECT COUNT(*) FROM stock_items)",
        )
        .fetch_one(pool)
        .await
        .map_err(|e| map_sqlx_error("dashboard_counts", e))?;

        let sector_rows = sqlx::query(
            r#"
            SELECT s.id, s.name, l.name AS location_name, COUNT(e.id) AS equipments
            FROM sectors s
            JOIN locations l ON l.id = s.location_id
            LEFT JOIN equipments e ON e.sector_id = s.id
            GROUP BY s.id, s.name, l.name
            ORDER BY equipments DESC, s.name_key ASC, s.id ASC
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(|e| map_sqlx_error("dashboard_by_sector", e))?;

        let location_rows = sqlx::query(
            r#"
            SELECT l.id, l.name, NULL AS location_name, COUNT(e.id) AS equipments
            FROM locations l
            LEFT JOIN equipments e ON e.location_id = l.id
            GROUP BY l.id, l.name
            ORDER BY equipments DESC, l.name_key ASC, l.id ASC
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(|e| map_sqlx_error("dashboard_by_location", e))?;

        Ok(Dashboard {
            counts: DashboardCounts {
                locations,
                sectors,
                equipments,
                stock_items,
            },
            by_sector: sector_rows.iter().map(tally_from_row).collect::<StoreResult<_>>()?,
            by_location: location_rows
                .iter()
                .map(tally_from_row)
                .collect::<StoreResult<_>>()?,
        })
    }
}

fn tally_from_row(row: &sqlx::sqlite::SqliteRow) -> StoreResult<EquipmentTally> {
    let decode = |e: sqlx::Error| StoreError::corrupt_row("dashboard", e);
    Ok(EquipmentTally {
        id: row.try_get("id").map_err(decode)?,
        name: row.try_get("name").map_err(decode)?,
        location_name: row.try_get("location_name").map_err(decode)?,
        equipments: row.try_get("equipments").map_err(decode)?,
    })
}

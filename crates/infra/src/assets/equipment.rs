use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::{info, instrument, warn};

use almox_assets::{
    AttachmentDecision, Equipment, EquipmentDraft, EquipmentFilter, EquipmentInput,
    InvoiceAttachment, ensure_sector_in_location,
};
use almox_core::{DomainError, EquipmentId, LocationId, SectorId};

use super::locations::require_location;
use super::sectors::require_sector;
use super::{AssetStore, like_pattern};
use crate::error::{StoreError, StoreResult, map_sqlx_error, unique_as_conflict};
use crate::time;

const EQUIPMENT_COLUMNS: &str = "id, name, brand, value, invoice_nf, barcode_pat, invoice_file, \
     invoice_mime, location_id, sector_id, created_at, updated_at";

fn equipment_from_row(row: &SqliteRow) -> StoreResult<Equipment> {
    let decode = |e: sqlx::Error| StoreError::corrupt_row("equipment", e);
    let value: Option<String> = row.try_get("value").map_err(decode)?;
    let value = value
        .as_deref()
        .map(Decimal::from_str)
        .transpose()
        .map_err(|e| StoreError::corrupt_row("equipment", e))?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode)?;

    Ok(Equipment {
        id: EquipmentId::from_i64(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        brand: row.try_get("brand").map_err(decode)?,
        value,
        invoice_nf: row.try_get("invoice_nf").map_err(decode)?,
        barcode_pat: row.try_get("barcode_pat").map_err(decode)?,
        invoice_file: row.try_get("invoice_file").map_err(decode)?,
        invoice_mime: row.try_get("invoice_mime").map_err(decode)?,
        location_id: LocationId::from_i64(row.try_get("location_id").map_err(decode)?),
        sector_id: SectorId::from_i64(row.try_get("sector_id").map_err(decode)?),
        created_at: time::decode(&created_at)?,
        updated_at: time::decode(&updated_at)?,
    })
}

fn duplicate_barcode(barcode: &str) -> String {
    format!("an equipment with PAT/barcode '{barcode}' already exists")
}

async fn require_equipment(conn: &mut SqliteConnection, id: EquipmentId) -> StoreResult<Equipment> {
    let row = sqlx::query(&format!("SELECT {EQUIPMENT_COLUMNS} FROM equipments WHERE id = ?1"))
        .bind(id.as_i64())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("get_equipment", e))?;

    match row {
        Some(row) => equipment_from_row(&row),
        None => Err(DomainError::NotFound.into()),
    }
}

/// Both placement ids must exist and the sector must sit in the location.
async fn check_placement(conn: &mut SqliteConnection, draft: &EquipmentDraft) -> StoreResult<()> {
    require_location(conn, draft.location_id).await?;
    let sector = require_sector(conn, draft.sector_id).await?;
    ensure_sector_in_location(&sector, draft.location_id)?;
    Ok(())
}

async fn store_attachment(
    conn: &mut SqliteConnection,
    id: EquipmentId,
    decision: &AttachmentDecision,
) -> StoreResult<()> {
    match decision {
        AttachmentDecision::Absent => {}
        AttachmentDecision::Dropped(reason) => {
            warn!(equipment_id = %id, %reason, "invoice attachment dropped");
        }
        AttachmentDecision::Attach(valid) => {
            sqlx::query("UPDATE equipments SET invoice_file = ?1, invoice_mime = ?2 WHERE id = ?3")
                .bind(valid.stored_file_name(id))
                .bind(valid.mime)
                .bind(id.as_i64())
                .execute(&mut *conn)
                .await
                .map_err(|e| map_sqlx_error("store_attachment", e))?;
        }
    }
    Ok(())
}

impl AssetStore {
    /// Register a piece of equipment, with optional invoice attachment metadata.
    ///
    /// An invalid attachment is handled per the store's
    /// [`InvoiceAttachmentPolicy`](almox_assets::InvoiceAttachmentPolicy).
    #[instrument(skip_all, fields(barcode = %input.barcode_pat.trim()), err)]
    pub async fn create_equipment(
        &self,
        input: EquipmentInput<'_>,
        attachment: Option<&InvoiceAttachment>,
    ) -> StoreResult<Equipment> {
        let draft = EquipmentDraft::validate(&input)?;
        let decision = self.attachment_policy().decide(attachment)?;
        let now = time::encode(Utc::now());

        let mut tx = self.begin().await?;
        check_placement(&mut tx, &draft).await?;

        let result = sqlx::query(
            "INSERT INTO equipments \
                (name, brand, value, invoice_nf, barcode_pat, location_id, sector_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        )
        .bind(&draft.name)
        .bind(draft.brand.as_deref())
        .bind(draft.value.map(|v| v.to_string()))
        .bind(draft.invoice_nf.as_deref())
        .bind(&draft.barcode_pat)
        .bind(draft.location_id.as_i64())
        .bind(draft.sector_id.as_i64())
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_as_conflict("create_equipment", e, || duplicate_barcode(&draft.barcode_pat)))?;

        let id = EquipmentId::from_i64(result.last_insert_rowid());
        store_attachment(&mut tx, id, &decision).await?;
        let equipment = require_equipment(&mut tx, id).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        info!(equipment_id = %id, "equipment created");
        Ok(equipment)
    }

    /// Replace an equipment's fields. Without a new attachment the stored one is kept.
    #[instrument(skip_all, fields(equipment_id = %id), err)]
    pub async fn update_equipment(
        &self,
        id: EquipmentId,
        input: EquipmentInput<'_>,
        attachment: Option<&InvoiceAttachment>,
    ) -> StoreResult<Equipment> {
        let draft = EquipmentDraft::validate(&input)?;
        let decision = self.attachment_policy().decide(attachment)?;

        let mut tx = self.begin().await?;
        require_equipment(&mut tx, id).await?;
        check_placement(&mut tx, &draft).await?;

        sqlx::query(
            "UPDATE equipments SET \
                name = ?1, brand = ?2, value = ?3, invoice_nf = ?4, barcode_pat = ?5, \
                location_id = ?6, sector_id = ?7, updated_at = ?8 \
             WHERE id = ?9",
        )
        .bind(&draft.name)
        .bind(draft.brand.as_deref())
        .bind(draft.value.map(|v| v.to_string()))
        .bind(draft.invoice_nf.as_deref())
        .bind(&draft.barcode_pat)
        .bind(draft.location_id.as_i64())
        .bind(draft.sector_id.as_i64())
        .bind(time::encode(Utc::now()))
        .bind(id.as_i64())
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_as_conflict("update_equipment", e, || duplicate_barcode(&draft.barcode_pat)))?;

        store_attachment(&mut tx, id, &decision).await?;
        let equipment = require_equipment(&mut tx, id).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(equipment)
    }

    #[instrument(skip_all, fields(equipment_id = %id), err)]
    pub async fn delete_equipment(&self, id: EquipmentId) -> StoreResult<Equipment> {
        let mut tx = self.begin().await?;
        let equipment = require_equipment(&mut tx, id).await?;

        sqlx::query("DELETE FROM equipments WHERE id = ?1")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_equipment", e))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        info!(equipment_id = %id, "equipment deleted");
        Ok(equipment)
    }

    pub async fn get_equipment(&self, id: EquipmentId) -> StoreResult<Equipment> {
        let mut conn = self
            .pool()
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire_connection", e))?;
        require_equipment(&mut conn, id).await
    }

    /// Exact (trimmed) barcode match.
    pub async fn find_by_barcode(&self, code: &str) -> StoreResult<Option<Equipment>> {
        let code = code.trim();
        if code.is_empty() {
            return Err(DomainError::validation("barcode is required").into());
        }

        let row = sqlx::query(&format!(
            "SELECT {EQUIPMENT_COLUMNS} FROM equipments WHERE barcode_pat = ?1"
        ))
        .bind(code)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| map_sqlx_error("find_by_barcode", e))?;

        row.as_ref().map(equipment_from_row).transpose()
    }

    /// Newest first. `q` is a case-insensitive substring over name, brand,
    /// barcode and invoice number.
    #[instrument(skip_all, fields(q = ?filter.query()), err)]
    pub async fn search_equipment(&self, filter: &EquipmentFilter) -> StoreResult<Vec<Equipment>> {
        let pattern = filter.query().map(like_pattern);

        let rows = sqlx::query(&format!(
            r"SELECT {EQUIPMENT_COLUMNS} FROM equipments
              WHERE (?1 IS NULL
                     OR name LIKE ?1 ESCAPE '\'
                     OR brand LIKE ?1 ESCAPE '\'
                     OR barcode_pat LIKE ?1 ESCAPE '\'
                     OR invoice_nf LIKE ?1 ESCAPE '\')
                AND (?2 IS NULL OR location_id = ?2)
                AND (?3 IS NULL OR sector_id = ?3)
              ORDER BY created_at DESC, id DESC"
        ))
        .bind(pattern)
        .bind(filter.location_id.map(LocationId::as_i64))
        .bind(filter.sector_id.map(SectorId::as_i64))
        .fetch_all(self.pool())
        .await
        .map_err(|e| map_sqlx_error("search_equipment", e))?;

        rows.iter().map(equipment_from_row).collect()
    }
}

//! Stock item registry.
//!
//! Item lookups and the case-insensitive name uniqueness rule. Every function
//! takes a borrowed connection so the ledger can run them inside its own
//! transaction; quantities are never changed here.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use almox_core::{DomainError, StockItemId};
use almox_stock::{StockItem, name_key, validate_item_name};

use crate::error::{StoreError, StoreResult, map_sqlx_error, unique_as_conflict};
use crate::time;

pub(crate) const ITEM_COLUMNS: &str = "id, name, quantity, created_at, updated_at";

pub(crate) fn item_from_row(row: &SqliteRow) -> StoreResult<StockItem> {
    let decode = |e: sqlx::Error| StoreError::corrupt_row("stock item", e);
    let created_at: String = row.try_get("created_at").map_err(decode)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode)?;
    Ok(StockItem {
        id: StockItemId::from_i64(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        quantity: row.try_get("quantity").map_err(decode)?,
        created_at: time::decode(&created_at)?,
        updated_at: time::decode(&updated_at)?,
    })
}

fn duplicate_name(name: &str) -> String {
    format!("a stock item named '{name}' already exists")
}

/// Find an item by name, ignoring case and surrounding whitespace.
pub async fn find_by_name(conn: &mut SqliteConnection, name: &str) -> StoreResult<Option<StockItem>> {
    let row = sqlx::query(&format!(
        "SELECT {ITEM_COLUMNS} FROM stock_items WHERE name_key = ?1"
    ))
    .bind(name_key(name))
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("find_item_by_name", e))?;

    row.as_ref().map(item_from_row).transpose()
}

pub async fn get(conn: &mut SqliteConnection, id: StockItemId) -> StoreResult<Option<StockItem>> {
    let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM stock_items WHERE id = ?1"))
        .bind(id.as_i64())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("get_item", e))?;

    row.as_ref().map(item_from_row).transpose()
}

/// Like [`get`], but a missing item is [`DomainError::NotFound`].
pub async fn require(conn: &mut SqliteConnection, id: StockItemId) -> StoreResult<StockItem> {
    get(conn, id).await?.ok_or_else(|| DomainError::NotFound.into())
}

/// All items, alphabetically (case-insensitive).
pub async fn list(conn: &mut SqliteConnection) -> StoreResult<Vec<StockItem>> {
    let rows = sqlx::query(&format!(
        "SELECT {ITEM_COLUMNS} FROM stock_items ORDER BY name_key ASC, id ASC"
    ))
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("list_items", e))?;

    rows.iter().map(item_from_row).collect()
}

/// Insert a new item holding `quantity` units.
///
/// The caller is responsible for recording the matching ENTRY.
pub async fn create(
    conn: &mut SqliteConnection,
    name: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> StoreResult<StockItem> {
    let name = validate_item_name(name)?;
    let ts = time::encode(now);

    let result = sqlx::query(
        "INSERT INTO stock_items (name, name_key, quantity, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?4)",
    )
    .bind(&name)
    .bind(name_key(&name))
    .bind(quantity)
    .bind(&ts)
    .execute(&mut *conn)
    .await
    .map_err(|e| unique_as_conflict("create_item", e, || duplicate_name(&name)))?;

    require(conn, StockItemId::from_i64(result.last_insert_rowid())).await
}

/// Rename an item. Renaming to a different casing of its own name is allowed.
pub async fn rename(
    conn: &mut SqliteConnection,
    id: StockItemId,
    new_name: &str,
    now: DateTime<Utc>,
) -> StoreResult<StockItem> {
    let name = validate_item_name(new_name)?;

    let result = sqlx::query(
        "UPDATE stock_items SET name = ?1, name_key = ?2, updated_at = ?3 WHERE id = ?4",
    )
    .bind(&name)
    .bind(name_key(&name))
    .bind(time::encode(now))
    .bind(id.as_i64())
    .execute(&mut *conn)
    .await
    .map_err(|e| unique_as_conflict("rename_item", e, || duplicate_name(&name)))?;

    if result.rows_affected() == 0 {
        return Err(DomainError::NotFound.into());
    }
    require(conn, id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    #[tokio::test]
    async fn lookup_ignores_case_and_whitespace() {
        let pool = connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let created = create(&mut conn, " Cabo HDMI ", 20, Utc::now()).await.unwrap();
        assert_eq!(created.name, "Cabo HDMI");
        assert_eq!(created.quantity, 20);

        let found = find_by_name(&mut conn, "cabo hdmi").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(find_by_name(&mut conn, "cabo").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_name_in_other_case_conflicts() {
        let pool = connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        create(&mut conn, "Cabo HDMI", 1, Utc::now()).await.unwrap();
        let err = create(&mut conn, "CABO HDMI", 1, Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(msg)) if msg.contains("CABO HDMI")));
    }

    #[tokio::test]
    async fn rename_respects_uniqueness_but_allows_recasing() {
        let pool = connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let cabo = create(&mut conn, "Cabo HDMI", 1, Utc::now()).await.unwrap();
        create(&mut conn, "Pilha AA", 1, Utc::now()).await.unwrap();

        let recased = rename(&mut conn, cabo.id, "cabo hdmi", Utc::now()).await.unwrap();
        assert_eq!(recased.name, "cabo hdmi");

        let err = rename(&mut conn, cabo.id, "pilha aa", Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));

        let missing = rename(&mut conn, StockItemId::from_i64(404), "X", Utc::now()).await;
        assert!(matches!(missing, Err(StoreError::Domain(DomainError::NotFound))));
    }

    #[tokio::test]
    async fn list_is_alphabetical() {
        let pool = connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        for name in ["pilha AA", "Cabo HDMI", "Adaptador"] {
            create(&mut conn, name, 1, Utc::now()).await.unwrap();
        }
        let names: Vec<_> = list(&mut conn).await.unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, ["Adaptador", "Cabo HDMI", "pilha AA"]);
    }
}

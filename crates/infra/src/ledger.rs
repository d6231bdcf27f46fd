//! Stock ledger: the only code path that changes item quantities.
//!
//! Every operation runs in one SQLite transaction. The stored quantity and the
//! movement log are written together, so `quantity == Σ signed(movements)`
//! holds after every commit.
//!
//! ## Overdraft
//!
//! Debits use a conditional decrement
//! (`UPDATE ... SET quantity = quantity - n WHERE id = ? AND quantity >= n`).
//! Zero affected rows means the item vanished or stock is short; the item is
//! re-read inside the same transaction to report what is actually available.
//! Concurrent debits therefore cannot drive a quantity below zero.
//!
//! Write transactions start with `BEGIN IMMEDIATE` (see [`db::begin_write`]),
//! so concurrent writers queue on the busy timeout instead of failing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, info, instrument};

use almox_core::{DomainError, MovementId, StockItemId};
use almox_stock::{
    MovementRequest, MovementType, MovementWithItem, NewMovement, Reconciliation, StockItem,
    StockMovement, deposit_movement, plan_adjustment, validate_item_name, validate_movement,
    validate_quantity,
};

use crate::db;
use crate::error::{StoreError, StoreResult, map_sqlx_error};
use crate::registry;
use crate::time;

pub const DEFAULT_MOVEMENT_LIMIT: i64 = 50;
pub const MAX_MOVEMENT_LIMIT: i64 = 500;

/// Result of [`Ledger::register_or_deposit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deposit {
    pub item: StockItem,
    pub movement: StockMovement,
    /// `true` when the deposit registered a new item.
    pub created: bool,
}

/// Result of [`Ledger::apply_movement`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovementOutcome {
    pub item: StockItem,
    pub movement: StockMovement,
}

/// Result of [`Ledger::adjust_item`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Adjustment {
    pub item: StockItem,
    /// ENTRY first, then LOSS; empty for a rename-only adjustment.
    pub movements: Vec<StockMovement>,
}

/// Result of [`Ledger::delete_item`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedItem {
    pub item: StockItem,
    pub movements_removed: u64,
}

/// Clamp a caller-supplied page size into `1..=MAX_MOVEMENT_LIMIT`.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_MOVEMENT_LIMIT)
        .clamp(1, MAX_MOVEMENT_LIMIT)
}

#[derive(Debug, Clone)]
pub struct Ledger {
    pool: Arc<SqlitePool>,
}

impl Ledger {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Deposit `quantity` units under `name`, registering the item if no item
    /// with that name exists (ignoring case).
    ///
    /// The ENTRY reason tells the two cases apart: `initial registration` for
    /// a new item, `stock entry` otherwise.
    #[instrument(skip_all, fields(name = %name.trim(), quantity = quantity), err)]
    pub async fn register_or_deposit(&self, name: &str, quantity: i64) -> StoreResult<Deposit> {
        let name = validate_item_name(name)?;
        let quantity = validate_quantity(quantity)?;
        let now = Utc::now();

        let mut tx = db::begin_write(&self.pool).await?;

        let (item_id, created) = match registry::find_by_name(&mut tx, &name).await? {
            Some(existing) => {
                if let Err(err) = existing.quantity_after(MovementType::Entry, quantity) {
                    tx.rollback()
                        .await
                        .map_err(|e| map_sqlx_error("rollback", e))?;
                    return Err(err.into());
                }
                credit(&mut tx, existing.id, quantity, now).await?;
                (existing.id, false)
            }
            None => {
                let item = registry::create(&mut tx, &name, quantity, now).await?;
                (item.id, true)
            }
        };

        let entry = deposit_movement(quantity, created)?;
        let movement = insert_movement(&mut tx, item_id, &entry, now).await?;
        let item = registry::require(&mut tx, item_id).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        info!(item_id = %item.id, quantity, created, new_quantity = item.quantity, "stock deposited");
        Ok(Deposit {
            item,
            movement,
            created,
        })
    }

    /// Record one movement against an existing item.
    ///
    /// Validation (type, quantity, reason) happens before any storage access.
    /// A debit larger than the available quantity fails with
    /// [`DomainError::InsufficientStock`] and changes nothing.
    #[instrument(
        skip_all,
        fields(
            item_id = %item_id,
            movement_type = %request.movement_type.trim(),
            quantity = request.quantity
        ),
        err
    )]
    pub async fn apply_movement(
        &self,
        item_id: StockItemId,
        request: MovementRequest<'_>,
    ) -> StoreResult<MovementOutcome> {
        let movement = validate_movement(&request)?;
        let now = Utc::now();

        let mut tx = db::begin_write(&self.pool).await?;

        let current = registry::require(&mut tx, item_id).await?;
        if let Err(err) = current.quantity_after(movement.movement_type, movement.quantity) {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(err.into());
        }

        if movement.movement_type.is_debit() {
            if !debit(&mut tx, item_id, movement.quantity, now).await? {
                let available = registry::require(&mut tx, item_id).await?.quantity;
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(DomainError::insufficient_stock(available, movement.quantity).into());
            }
        } else {
            credit(&mut tx, item_id, movement.quantity, now).await?;
        }

        let stored = insert_movement(&mut tx, item_id, &movement, now).await?;
        let item = registry::require(&mut tx, item_id).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        info!(
            item_id = %item.id,
            movement_id = %stored.id,
            new_quantity = item.quantity,
            "movement recorded"
        );
        Ok(MovementOutcome {
            item,
            movement: stored,
        })
    }

    /// Rename an item and/or apply a manual `+add`/`-sub` correction.
    ///
    /// Appends an ENTRY for `add` and a LOSS for `sub` (in that order, when
    /// non-zero). A correction that would leave negative stock is a validation
    /// failure reporting the current quantity; nothing is changed.
    #[instrument(skip_all, fields(item_id = %item_id, add = add, sub = sub), err)]
    pub async fn adjust_item(
        &self,
        item_id: StockItemId,
        new_name: &str,
        add: i64,
        sub: i64,
        reason: Option<&str>,
    ) -> StoreResult<Adjustment> {
        let new_name = validate_item_name(new_name)?;
        let now = Utc::now();

        let mut tx = db::begin_write(&self.pool).await?;

        let current = registry::require(&mut tx, item_id).await?;
        let plan = match plan_adjustment(current.quantity, add, sub, reason) {
            Ok(plan) => plan,
            Err(err) => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(err.into());
            }
        };

        if new_name != current.name {
            registry::rename(&mut tx, item_id, &new_name, now).await?;
        }

        let result = sqlx::query(
            "UPDATE stock_items SET quantity = quantity + ?1, updated_at = ?2 \
             WHERE id = ?3 AND quantity + ?1 >= 0",
        )
        .bind(plan.delta)
        .bind(time::encode(now))
        .bind(item_id.as_i64())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("adjust_quantity", e))?;

        if result.rows_affected() == 0 {
            let latest = registry::require(&mut tx, item_id).await?.quantity;
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(DomainError::validation(format!(
                "adjustment would leave negative stock (current quantity: {latest})"
            ))
            .into());
        }

        let mut movements = Vec::with_capacity(plan.movements.len());
        for movement in &plan.movements {
            movements.push(insert_movement(&mut tx, item_id, movement, now).await?);
        }
        let item = registry::require(&mut tx, item_id).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        info!(
            item_id = %item.id,
            delta = plan.delta,
            new_quantity = item.quantity,
            "item adjusted"
        );
        Ok(Adjustment { item, movements })
    }

    /// Delete an item together with its whole movement history.
    #[instrument(skip_all, fields(item_id = %item_id), err)]
    pub async fn delete_item(&self, item_id: StockItemId) -> StoreResult<DeletedItem> {
        let mut tx = db::begin_write(&self.pool).await?;

        let item = registry::require(&mut tx, item_id).await?;

        let movements_removed = sqlx::query("DELETE FROM stock_movements WHERE item_id = ?1")
            .bind(item_id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_movements", e))?
            .rows_affected();

        sqlx::query("DELETE FROM stock_items WHERE id = ?1")
            .bind(item_id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        info!(item_id = %item.id, movements_removed, "item deleted");
        Ok(DeletedItem {
            item,
            movements_removed,
        })
    }

    /// Most recent movements across all items, newest first.
    #[instrument(skip(self), err)]
    pub async fn list_movements(&self, limit: Option<i64>) -> StoreResult<Vec<MovementWithItem>> {
        let limit = clamp_limit(limit);
        let rows = sqlx::query(
            r#"
            SELECT
                m.id, m.item_id, m.movement_type, m.quantity, m.location, m.reason, m.created_at,
                i.name AS item_name
            FROM stock_movements m
            JOIN stock_items i ON i.id = m.item_id
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_movements", e))?;

        let movements = rows
            .iter()
            .map(|row| {
                Ok(MovementWithItem {
                    movement: movement_from_row(row)?,
                    item_name: row
                        .try_get("item_name")
                        .map_err(|e| StoreError::corrupt_row("movement", e))?,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        debug!(count = movements.len(), "movements listed");
        Ok(movements)
    }

    /// One item's movements, newest first.
    #[instrument(skip_all, fields(item_id = %item_id), err)]
    pub async fn item_movements(
        &self,
        item_id: StockItemId,
        limit: Option<i64>,
    ) -> StoreResult<Vec<StockMovement>> {
        let mut conn = self.acquire().await?;
        registry::require(&mut conn, item_id).await?;

        let rows = sqlx::query(
            r#"
            SELECT id, item_id, movement_type, quantity, location, reason, created_at
            FROM stock_movements
            WHERE item_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#,
        )
        .bind(item_id.as_i64())
        .bind(clamp_limit(limit))
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("item_movements", e))?;

        rows.iter().map(movement_from_row).collect()
    }

    pub async fn get_item(&self, item_id: StockItemId) -> StoreResult<StockItem> {
        let mut conn = self.acquire().await?;
        registry::require(&mut conn, item_id).await
    }

    pub async fn list_items(&self) -> StoreResult<Vec<StockItem>> {
        let mut conn = self.acquire().await?;
        registry::list(&mut conn).await
    }

    /// Compare an item's stored quantity with the sum of its movement log.
    #[instrument(skip_all, fields(item_id = %item_id), err)]
    pub async fn reconcile(&self, item_id: StockItemId) -> StoreResult<Reconciliation> {
        let mut conn = self.acquire().await?;
        let item = registry::require(&mut conn, item_id).await?;

        let rows = sqlx::query(
            "SELECT movement_type, quantity FROM stock_movements WHERE item_id = ?1 ORDER BY id ASC",
        )
        .bind(item_id.as_i64())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("reconcile", e))?;

        let log = rows
            .iter()
            .map(|row| {
                let code: String = row
                    .try_get("movement_type")
                    .map_err(|e| StoreError::corrupt_row("movement", e))?;
                let quantity: i64 = row
                    .try_get("quantity")
                    .map_err(|e| StoreError::corrupt_row("movement", e))?;
                Ok((parse_type(&code)?, quantity))
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let reconciliation = Reconciliation::compute(&item, log);
        if !reconciliation.is_balanced() {
            tracing::warn!(
                item_id = %item_id,
                stored = reconciliation.stored,
                computed = reconciliation.computed,
                "stock quantity drifted from movement log"
            );
        }
        Ok(reconciliation)
    }

    async fn acquire(&self) -> StoreResult<sqlx::pool::PoolConnection<sqlx::Sqlite>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire_connection", e))
    }
}

async fn credit(
    conn: &mut SqliteConnection,
    item_id: StockItemId,
    quantity: i64,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    let result = sqlx::query(
        "UPDATE stock_items SET quantity = quantity + ?1, updated_at = ?2 WHERE id = ?3",
    )
    .bind(quantity)
    .bind(time::encode(now))
    .bind(item_id.as_i64())
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("credit_item", e))?;

    if result.rows_affected() == 0 {
        return Err(DomainError::NotFound.into());
    }
    Ok(())
}

/// Conditional decrement. `false` when the item is missing or short.
async fn debit(
    conn: &mut SqliteConnection,
    item_id: StockItemId,
    quantity: i64,
    now: DateTime<Utc>,
) -> StoreResult<bool> {
    let result = sqlx::query(
        "UPDATE stock_items SET quantity = quantity - ?1, updated_at = ?2 \
         WHERE id = ?3 AND quantity >= ?1",
    )
    .bind(quantity)
    .bind(time::encode(now))
    .bind(item_id.as_i64())
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("debit_item", e))?;

    Ok(result.rows_affected() == 1)
}

async fn insert_movement(
    conn: &mut SqliteConnection,
    item_id: StockItemId,
    movement: &NewMovement,
    now: DateTime<Utc>,
) -> StoreResult<StockMovement> {
    let result = sqlx::query(
        "INSERT INTO stock_movements (item_id, movement_type, quantity, location, reason, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(item_id.as_i64())
    .bind(movement.movement_type.code())
    .bind(movement.quantity)
    .bind(movement.location.as_deref())
    .bind(movement.reason.as_deref())
    .bind(time::encode(now))
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("insert_movement", e))?;

    Ok(StockMovement {
        id: MovementId::from_i64(result.last_insert_rowid()),
        item_id,
        movement_type: movement.movement_type,
        quantity: movement.quantity,
        location: movement.location.clone(),
        reason: movement.reason.clone(),
        created_at: now,
    })
}

fn parse_type(code: &str) -> StoreResult<MovementType> {
    MovementType::from_code(code)
        .ok_or_else(|| StoreError::Database(format!("unknown movement type '{code}' in row")))
}

fn movement_from_row(row: &SqliteRow) -> StoreResult<StockMovement> {
    let decode = |e: sqlx::Error| StoreError::corrupt_row("movement", e);
    let code: String = row.try_get("movement_type").map_err(decode)?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;
    Ok(StockMovement {
        id: MovementId::from_i64(row.try_get("id").map_err(decode)?),
        item_id: StockItemId::from_i64(row.try_get("item_id").map_err(decode)?),
        movement_type: parse_type(&code)?,
        quantity: row.try_get("quantity").map_err(decode)?,
        location: row.try_get("location").map_err(decode)?,
        reason: row.try_get("reason").map_err(decode)?,
        created_at: time::decode(&created_at)?,
    })
}

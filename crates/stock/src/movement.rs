use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use almox_core::{DomainError, MovementId, StockItemId};

/// Reason recorded on the ENTRY that creates an item.
pub const REASON_INITIAL_REGISTRATION: &str = "initial registration";
/// Reason recorded on an ENTRY that tops up an existing item.
pub const REASON_STOCK_ENTRY: &str = "stock entry";
/// Default reason for the ENTRY half of a manual adjustment.
pub const REASON_ADJUSTMENT_ENTRY: &str = "adjustment (entry)";
/// Default reason for the LOSS half of a manual adjustment.
pub const REASON_ADJUSTMENT_WRITE_OFF: &str = "adjustment (write-off)";

/// Kind of stock movement.
///
/// This is the canonical vocabulary; wire aliases are normalized into it by
/// [`crate::validator::normalize_movement_type`] before anything else happens.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    /// Goods received. Credits the item.
    Entry,
    /// Goods taken out for use ("saída"). Debits the item.
    Use,
    /// Goods lost. Debits the item.
    Loss,
    /// Goods damaged beyond use. Debits the item.
    Damage,
}

impl MovementType {
    pub const ALL: [MovementType; 4] = [
        MovementType::Entry,
        MovementType::Use,
        MovementType::Loss,
        MovementType::Damage,
    ];

    /// Canonical storage/wire code.
    pub fn code(self) -> &'static str {
        match self {
            MovementType::Entry => "ENTRY",
            MovementType::Use => "USE",
            MovementType::Loss => "LOSS",
            MovementType::Damage => "DAMAGE",
        }
    }

    /// Strict inverse of [`MovementType::code`] (no aliases).
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Every type except ENTRY takes goods out of stock.
    pub fn is_debit(self) -> bool {
        !matches!(self, MovementType::Entry)
    }

    /// Signed contribution of a movement of `quantity` units to the item balance.
    pub fn signed(self, quantity: i64) -> i64 {
        if self.is_debit() { -quantity } else { quantity }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl core::str::FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::validator::normalize_movement_type(s)
    }
}

/// A validated movement that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    pub movement_type: MovementType,
    pub quantity: i64,
    pub location: Option<String>,
    pub reason: Option<String>,
}

impl NewMovement {
    pub fn signed_quantity(&self) -> i64 {
        self.movement_type.signed(self.quantity)
    }
}

/// A persisted, immutable ledger line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub item_id: StockItemId,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub location: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn signed_quantity(&self) -> i64 {
        self.movement_type.signed(self.quantity)
    }
}

/// Movement joined with the name of its item (history listings).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementWithItem {
    #[serde(flatten)]
    pub movement: StockMovement,
    pub item_name: String,
}

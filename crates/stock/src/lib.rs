//! Consumable-stock ("almoxarifado") domain module.
//!
//! This crate contains the business rules of the stock ledger, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage):
//!
//! - [`movement`]: the closed movement vocabulary and ledger line types
//! - [`validator`]: input normalization and validation, run before any state is touched
//! - [`item`]: the per-item quantity state machine, deposits, adjustments and replay

pub mod item;
pub mod movement;
pub mod validator;

pub use item::{
    AdjustmentPlan, Reconciliation, StockItem, deposit_movement, next_quantity, plan_adjustment,
    replay,
};
pub use movement::{
    MovementType, MovementWithItem, NewMovement, REASON_ADJUSTMENT_ENTRY,
    REASON_ADJUSTMENT_WRITE_OFF, REASON_INITIAL_REGISTRATION, REASON_STOCK_ENTRY, StockMovement,
};
pub use validator::{
    MovementRequest, name_key, normalize_movement_type, validate_item_name, validate_movement,
    validate_quantity,
};

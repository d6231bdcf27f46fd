//! Infrastructure layer: SQLite persistence for the stock ledger and the asset registry.
//!
//! - [`db`]: pool construction and idempotent schema bootstrap
//! - [`registry`]: stock item lookups and case-insensitive name uniqueness
//! - [`ledger`]: transactional stock movements (the only place quantities change)
//! - [`assets`]: locations, sectors and equipment
//! - [`dashboard`]: aggregate counts for the landing page

pub mod assets;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod ledger;
pub mod registry;
mod time;

pub use assets::AssetStore;
pub use dashboard::{Dashboard, DashboardCounts, EquipmentTally};
pub use db::{connect, connect_in_memory, migrate};
pub use error::{StoreError, StoreResult};
pub use ledger::{Adjustment, DEFAULT_MOVEMENT_LIMIT, DeletedItem, Deposit, Ledger, MAX_MOVEMENT_LIMIT, MovementOutcome};

//! Asset registry domain module: locations, sectors and equipment.
//!
//! Pure validation and modelling only (no IO, no HTTP, no storage). Persistence
//! lives in `almox-infra::assets`.

pub mod attachment;
pub mod equipment;
pub mod location;
pub mod sector;
mod text;

pub use attachment::{AttachmentDecision, InvoiceAttachment, InvoiceAttachmentPolicy, ValidAttachment};
pub use equipment::{
    Equipment, EquipmentDraft, EquipmentFilter, EquipmentInput, MoneyInput, parse_money,
    parse_plain_money,
};
pub use location::{Location, LocationDraft, LocationInput};
pub use sector::{Sector, SectorDraft, ensure_sector_in_location};
pub use text::name_key;

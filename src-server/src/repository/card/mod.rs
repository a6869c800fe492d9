//! Card Repository Module
//!
//! - card_repo: core CRUD operations
//! - card_positioning: moves within and across lists, compaction
//! - card_detail: description, attachments and the activity log

mod card_detail;
mod card_positioning;
mod card_repo;

pub use card_detail::{CardDetailOperations, RemovedAttachment};
pub use card_positioning::{CardPositioningOperations, DeletedCard};
pub use card_repo::CardRepository;
pub(super) use card_repo::{latest_attachment, row_to_card, CARD_COLUMNS};

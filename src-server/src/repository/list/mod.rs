//! List Repository Module
//!
//! - list_repo: core CRUD operations
//! - list_positioning: moves, compaction and reindexing within a board

mod list_positioning;
mod list_repo;

pub use list_positioning::{DeletedList, ListPositioningOperations};
pub use list_repo::ListRepository;
pub(super) use list_repo::{row_to_list, LIST_COLUMNS};

//! Domain Layer
//!
//! Entities come from `kanban-core` so the server and the browser share one
//! definition; this layer adds the storage-facing contract.

mod entity;

pub use entity::{new_id, now_millis, DomainError, DomainResult, Entity};
pub use kanban_core::{
    Activity, Attachment, Board, Card, Invitation, List, ListWithCards, User, Visibility,
};

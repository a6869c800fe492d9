//! Domain Layer - Core Entity Trait
//!
//! Every stored entity has a unique string id assigned by the server.

use kanban_core::{Board, CommandError, List};

/// Core trait for all domain entities
pub trait Entity: Sized + Send + Sync + Clone {
    /// The type of the entity's unique identifier
    type Id: Clone + Eq + std::hash::Hash + Send + Sync;

    /// Returns the entity's unique identifier
    fn id(&self) -> Self::Id;
}

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level errors, shared with the wire protocol
pub type DomainError = CommandError;

/// Fresh random identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Unix time in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

macro_rules! string_entity {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Entity for $ty {
                type Id = String;

                fn id(&self) -> Self::Id {
                    self.id.clone()
                }
            }
        )*
    };
}

string_entity!(Board, List);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(new_id(), new_id());
    }

    #[test]
    fn test_entity_id() {
        let list = List {
            id: "l1".to_string(),
            name: "Todo".to_string(),
            board_id: "b1".to_string(),
            position: 0,
            created_by: "u1".to_string(),
            created_at: 0,
        };
        assert_eq!(list.id(), "l1");
    }
}

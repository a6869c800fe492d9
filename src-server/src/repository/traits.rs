//! Repository Layer - Core Traits
//!
//! Defines the abstract interfaces for data access.

use async_trait::async_trait;

use crate::domain::{DomainResult, Entity};

/// Create, look up and edit an entity's own fields
///
/// Generic over any Entity type. Positioned entities get their position
/// from the store on `create`, whatever the caller passed in. Deletion is
/// not here: removing a positioned entity also compacts its scope and frees
/// attachment blobs, so each repository exposes its own delete.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Create a new entity
    async fn create(&self, entity: &T) -> DomainResult<T>;

    /// Find entity by ID
    async fn find_by_id(&self, id: &T::Id) -> DomainResult<Option<T>>;

    /// Update an existing entity's own fields (never its position)
    async fn update(&self, entity: &T) -> DomainResult<T>;
}

//! Persistence collaborator.
//!
//! The form pipeline depends only on the [`Store`] trait. Two implementations
//! ship with the crate:
//! - [`MemoryStore`] keeps records in process (CLI dry runs, tests)
//! - [`JsonApiStore`] talks to the tracker's JSON:API endpoints with the
//!   session's bearer token

pub mod jsonapi;
pub mod memory;
pub mod record;

pub use jsonapi::JsonApiStore;
pub use memory::MemoryStore;
pub use record::{Attributes, ChangedAttributes, Record};

use crate::errors::StoreError;
use async_trait::async_trait;

/// Abstraction over record persistence.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persist a record and return the stored version (with its id assigned).
    async fn save(&self, record: Record) -> Result<Record, StoreError>;

    /// Delete a persisted record.
    async fn destroy(&self, record: &Record) -> Result<(), StoreError>;

    /// Attributes changed since the record was loaded or last saved.
    fn changed_attributes(&self, record: &Record) -> ChangedAttributes {
        record.changed_attributes()
    }

    /// Discard the record's uncommitted changes.
    fn rollback(&self, record: &mut Record) {
        record.rollback();
    }
}

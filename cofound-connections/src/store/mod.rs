//! Connection Store: the single durable record of every requester -> receiver
//! relationship. Written only by the lifecycle manager.
//!
//! Implementations must enforce one row per unordered pair across all
//! statuses, and must apply `transition_if` / `delete_if` atomically against
//! the current status (compare-and-swap).

use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Connection, ConnectionStatus};

mod memory;
mod postgres;

pub use memory::MemoryConnectionStore;
pub use postgres::PgConnectionStore;

pub trait ConnectionStore: Send + Sync {
    /// Inserts a `pending` row. Fails with `StoreError::Duplicate` if any row
    /// already exists for `{requester_id, receiver_id}` in either direction.
    fn insert_pending(&self, requester_id: Uuid, receiver_id: Uuid) -> Result<Connection, StoreError>;

    fn find(&self, id: Uuid) -> Result<Option<Connection>, StoreError>;

    /// The row for the unordered pair `{a, b}`, if any.
    fn find_between(&self, a: Uuid, b: Uuid) -> Result<Option<Connection>, StoreError>;

    /// Every row where `profile_id` is requester or receiver, any status,
    /// most recently updated first.
    fn list_for_profile(&self, profile_id: Uuid) -> Result<Vec<Connection>, StoreError>;

    /// Ids of every profile `profile_id` shares a row with, any status.
    fn counterpart_ids(&self, profile_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        Ok(self
            .list_for_profile(profile_id)?
            .iter()
            .filter_map(|c| c.counterpart(profile_id))
            .collect())
    }

    /// Sets `status = next` only if the row still has status `expected`.
    /// Returns the updated row, or `None` if the row is gone or has moved on.
    fn transition_if(
        &self,
        id: Uuid,
        expected: ConnectionStatus,
        next: ConnectionStatus,
    ) -> Result<Option<Connection>, StoreError>;

    /// Deletes the row only if it still has status `expected`. Returns the
    /// deleted row, or `None` if the row is gone or has moved on.
    fn delete_if(&self, id: Uuid, expected: ConnectionStatus) -> Result<Option<Connection>, StoreError>;

    /// Cheap liveness probe for health checks.
    fn ping(&self) -> Result<(), StoreError>;
}

/// Canonical key for an unordered pair.
pub(crate) fn pair_key(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a < b { (a, b) } else { (b, a) }
}

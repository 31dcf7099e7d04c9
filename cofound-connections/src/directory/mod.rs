//! Read-only view of the profile service's `profiles` table.

use std::collections::HashSet;

use uuid::Uuid;

use cofound_shared::types::CursorPage;

use crate::error::StoreError;
use crate::models::Profile;

mod memory;
mod postgres;

pub use memory::MemoryProfileDirectory;
pub use postgres::PgProfileDirectory;

pub trait ProfileDirectory: Send + Sync {
    /// Completed profiles not in `exclude`, ordered by id ascending, starting
    /// strictly after `after`. At most `limit` items.
    fn completed_profiles(
        &self,
        exclude: &HashSet<Uuid>,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<CursorPage<Profile>, StoreError>;

    fn profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError>;

    fn profile_by_credential(&self, credential_id: Uuid) -> Result<Option<Profile>, StoreError>;

    /// Profiles for `ids`, in no particular order. Unknown ids are skipped.
    fn profiles(&self, ids: &[Uuid]) -> Result<Vec<Profile>, StoreError>;
}

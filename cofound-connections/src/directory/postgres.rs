use std::collections::HashSet;

use diesel::prelude::*;
use uuid::Uuid;

use cofound_shared::clients::db::DbPool;
use cofound_shared::types::CursorPage;

use super::ProfileDirectory;
use crate::error::StoreError;
use crate::models::{Profile, ProfileRow};
use crate::schema::profiles;

#[derive(Clone)]
pub struct PgProfileDirectory {
    pool: DbPool,
}

impl PgProfileDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn unavailable(err: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

/// Deck rows that fail validation are dropped rather than failing the whole
/// fetch; single lookups surface the error.
fn keep_valid(row: ProfileRow) -> Option<Profile> {
    let id = row.id;
    match Profile::try_from(row) {
        Ok(profile) => Some(profile),
        Err(e) => {
            tracing::warn!(profile_id = %id, error = %e, "skipping invalid profile row");
            None
        }
    }
}

impl ProfileDirectory for PgProfileDirectory {
    fn completed_profiles(
        &self,
        exclude: &HashSet<Uuid>,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<CursorPage<Profile>, StoreError> {
        if limit == 0 {
            return Ok(CursorPage::empty());
        }
        let mut conn = self.pool.get().map_err(unavailable)?;
        let excluded: Vec<Uuid> = exclude.iter().copied().collect();

        let mut query = profiles::table
            .filter(profiles::profile_completed.eq(true))
            .filter(profiles::id.ne_all(excluded))
            .order(profiles::id.asc())
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .select(ProfileRow::as_select())
            .into_boxed();

        if let Some(after) = after {
            query = query.filter(profiles::id.gt(after));
        }

        let rows = query.load(&mut conn).map_err(unavailable)?;
        Ok(CursorPage::from_fetch(rows, limit, |row| row.id).filter_map(keep_valid))
    }

    fn profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        let mut conn = self.pool.get().map_err(unavailable)?;

        profiles::table
            .find(id)
            .select(ProfileRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(unavailable)?
            .map(|row| Profile::try_from(row).map_err(StoreError::from))
            .transpose()
    }

    fn profile_by_credential(&self, credential_id: Uuid) -> Result<Option<Profile>, StoreError> {
        let mut conn = self.pool.get().map_err(unavailable)?;

        profiles::table
            .filter(profiles::credential_id.eq(credential_id))
            .select(ProfileRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(unavailable)?
            .map(|row| Profile::try_from(row).map_err(StoreError::from))
            .transpose()
    }

    fn profiles(&self, ids: &[Uuid]) -> Result<Vec<Profile>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().map_err(unavailable)?;

        let rows = profiles::table
            .filter(profiles::id.eq_any(ids))
            .select(ProfileRow::as_select())
            .load(&mut conn)
            .map_err(unavailable)?;

        Ok(rows.into_iter().filter_map(keep_valid).collect())
    }
}

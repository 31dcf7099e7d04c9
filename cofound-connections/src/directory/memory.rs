use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use uuid::Uuid;

use cofound_shared::types::CursorPage;

use super::ProfileDirectory;
use crate::error::StoreError;
use crate::models::Profile;

/// Directory backed by an ordered map, for tests and local runs.
#[derive(Default)]
pub struct MemoryProfileDirectory {
    profiles: RwLock<BTreeMap<Uuid, Profile>>,
}

impl MemoryProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, profile: Profile) {
        if let Ok(mut profiles) = self.profiles.write() {
            profiles.insert(profile.id, profile);
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<Uuid, Profile>>, StoreError> {
        self.profiles
            .read()
            .map_err(|_| StoreError::Unavailable("memory directory lock poisoned".into()))
    }
}

impl ProfileDirectory for MemoryProfileDirectory {
    fn completed_profiles(
        &self,
        exclude: &HashSet<Uuid>,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<CursorPage<Profile>, StoreError> {
        let profiles = self.read()?;
        let items: Vec<Profile> = profiles
            .values()
            .filter(|p| after.map_or(true, |cursor| p.id > cursor))
            .filter(|p| p.profile_completed && !exclude.contains(&p.id))
            .take(limit)
            .cloned()
            .collect();
        Ok(CursorPage::from_fetch(items, limit, |p| p.id))
    }

    fn profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.read()?.get(&id).cloned())
    }

    fn profile_by_credential(&self, credential_id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self
            .read()?
            .values()
            .find(|p| p.credential_id == credential_id)
            .cloned())
    }

    fn profiles(&self, ids: &[Uuid]) -> Result<Vec<Profile>, StoreError> {
        let profiles = self.read()?;
        Ok(ids.iter().filter_map(|id| profiles.get(id).cloned()).collect())
    }
}

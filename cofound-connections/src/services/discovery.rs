use std::sync::Arc;

use uuid::Uuid;

use cofound_shared::types::CursorPage;

use super::exclusion::build_exclusion_set;
use super::retry::RetryPolicy;
use crate::directory::ProfileDirectory;
use crate::error::ConnectionError;
use crate::models::Profile;
use crate::store::ConnectionStore;

/// Builds the swipe deck: completed profiles outside the viewer's exclusion
/// set, in id order, paged by keyset.
#[derive(Clone)]
pub struct DiscoverySelector {
    store: Arc<dyn ConnectionStore>,
    directory: Arc<dyn ProfileDirectory>,
    retry: RetryPolicy,
    max_limit: usize,
}

impl DiscoverySelector {
    pub fn new(
        store: Arc<dyn ConnectionStore>,
        directory: Arc<dyn ProfileDirectory>,
        retry: RetryPolicy,
        max_limit: usize,
    ) -> Self {
        Self { store, directory, retry, max_limit: max_limit.max(1) }
    }

    /// At most `limit` candidates (clamped to the configured maximum) after
    /// the `after` cursor.
    pub async fn candidates(
        &self,
        viewer_id: Uuid,
        limit: usize,
        after: Option<Uuid>,
    ) -> Result<CursorPage<Profile>, ConnectionError> {
        let limit = limit.clamp(1, self.max_limit);

        let (exclusion, page) = self
            .retry
            .read("discovery.candidates", || {
                let exclusion = build_exclusion_set(self.store.as_ref(), viewer_id)?;
                let page = self.directory.completed_profiles(exclusion.ids(), after, limit)?;
                Ok((exclusion, page))
            })
            .await?;

        let page = page.filter_map(|p| {
            (p.profile_completed && !exclusion.contains(&p.id)).then_some(p)
        });

        tracing::debug!(
            viewer_id = %viewer_id,
            excluded = exclusion.len(),
            returned = page.items.len(),
            "discovery page built"
        );

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryProfileDirectory;
    use crate::store::MemoryConnectionStore;
    use chrono::Utc;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn profile(completed: bool) -> Profile {
        let now = Utc::now();
        Profile {
            id: Uuid::now_v7(),
            credential_id: Uuid::now_v7(),
            display_name: Some("Founder".into()),
            age: Some(31),
            city: Some("Berlin".into()),
            country: Some("DE".into()),
            looking_for: Some("CTO".into()),
            interests: BTreeSet::new(),
            avatar_url: None,
            profile_completed: completed,
            created_at: now,
            updated_at: now,
        }
    }

    fn selector(
        store: Arc<MemoryConnectionStore>,
        directory: Arc<MemoryProfileDirectory>,
    ) -> DiscoverySelector {
        DiscoverySelector::new(store, directory, RetryPolicy::immediate(), 50)
    }

    #[tokio::test]
    async fn skips_incomplete_and_self() {
        let store = Arc::new(MemoryConnectionStore::new());
        let directory = Arc::new(MemoryProfileDirectory::new());
        let viewer = profile(true);
        let draft = profile(false);
        let other = profile(true);
        for p in [&viewer, &draft, &other] {
            directory.upsert(p.clone());
        }

        let page = selector(store, directory).candidates(viewer.id, 10, None).await.unwrap();
        let ids: Vec<_> = page.items.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![other.id]);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn pages_do_not_overlap() {
        let store = Arc::new(MemoryConnectionStore::new());
        let directory = Arc::new(MemoryProfileDirectory::new());
        let viewer = profile(true);
        directory.upsert(viewer.clone());
        for _ in 0..5 {
            directory.upsert(profile(true));
        }
        let selector = selector(store, directory);

        let first = selector.candidates(viewer.id, 2, None).await.unwrap();
        let second = selector.candidates(viewer.id, 2, first.next_cursor).await.unwrap();
        let third = selector.candidates(viewer.id, 2, second.next_cursor).await.unwrap();

        let mut seen: Vec<Uuid> = first.items.iter().chain(&second.items).chain(&third.items).map(|p| p.id).collect();
        assert_eq!(seen.len(), 5);
        seen.dedup();
        assert_eq!(seen.len(), 5);
        assert!(third.next_cursor.is_none());
    }

    #[tokio::test]
    async fn transient_store_failure_is_retried() {
        let store = Arc::new(MemoryConnectionStore::new());
        let directory = Arc::new(MemoryProfileDirectory::new());
        let viewer = profile(true);
        directory.upsert(viewer.clone());
        directory.upsert(profile(true));

        store.fail_next(2);
        let page = selector(store, directory).candidates(viewer.id, 10, None).await.unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_store_unavailable() {
        let store = Arc::new(MemoryConnectionStore::new());
        let directory = Arc::new(MemoryProfileDirectory::new());
        store.fail_next(3);
        let err = selector(store, directory).candidates(Uuid::now_v7(), 10, None).await.unwrap_err();
        assert!(err.is_retryable());
    }

    proptest! {
        #[test]
        fn never_returns_excluded_or_incomplete(
            completed in proptest::collection::vec(any::<bool>(), 1..12),
            requests in proptest::collection::vec((0usize..12, any::<bool>()), 0..12),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let store = Arc::new(MemoryConnectionStore::new());
            let directory = Arc::new(MemoryProfileDirectory::new());
            let viewer = profile(true);
            directory.upsert(viewer.clone());
            let people: Vec<Profile> = completed.iter().map(|c| profile(*c)).collect();
            for p in &people {
                directory.upsert(p.clone());
            }
            for (idx, outgoing) in requests {
                let other = people[idx % people.len()].id;
                let _ = if outgoing {
                    store.insert_pending(viewer.id, other)
                } else {
                    store.insert_pending(other, viewer.id)
                };
            }

            let excluded = build_exclusion_set(store.as_ref(), viewer.id).unwrap();
            let page = rt
                .block_on(selector(store.clone(), directory).candidates(viewer.id, 50, None))
                .unwrap();
            for p in &page.items {
                prop_assert!(p.profile_completed);
                prop_assert!(!excluded.contains(&p.id));
            }
            let expected = people
                .iter()
                .filter(|p| p.profile_completed && !excluded.contains(&p.id))
                .count();
            prop_assert_eq!(page.items.len(), expected);
        }
    }
}

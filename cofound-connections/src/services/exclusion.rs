use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::ConnectionStore;

/// Profile ids a viewer must never see in discovery: the viewer plus every
/// counterpart of every row they are on, whatever its status. Built fresh
/// for each fetch and never cached.
#[derive(Debug, Clone, Serialize)]
pub struct ExclusionSet {
    viewer_id: Uuid,
    ids: HashSet<Uuid>,
}

impl ExclusionSet {
    pub fn viewer_id(&self) -> Uuid {
        self.viewer_id
    }

    pub fn contains(&self, profile_id: &Uuid) -> bool {
        self.ids.contains(profile_id)
    }

    pub fn ids(&self) -> &HashSet<Uuid> {
        &self.ids
    }

    /// Number of excluded ids, the viewer included.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

pub fn build_exclusion_set(store: &dyn ConnectionStore, viewer_id: Uuid) -> Result<ExclusionSet, StoreError> {
    let mut ids: HashSet<Uuid> = store.counterpart_ids(viewer_id)?.into_iter().collect();
    ids.insert(viewer_id);
    Ok(ExclusionSet { viewer_id, ids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConnectionStatus;
    use crate::store::MemoryConnectionStore;
    use proptest::prelude::*;

    #[test]
    fn viewer_always_excludes_themselves() {
        let store = MemoryConnectionStore::new();
        let viewer = Uuid::now_v7();
        let set = build_exclusion_set(&store, viewer).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains(&viewer));
    }

    #[test]
    fn every_status_excludes() {
        let store = MemoryConnectionStore::new();
        let viewer = Uuid::now_v7();
        let (pending, accepted, rejected, incoming) =
            (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());

        store.insert_pending(viewer, pending).unwrap();
        let a = store.insert_pending(viewer, accepted).unwrap();
        store.transition_if(a.id, ConnectionStatus::Pending, ConnectionStatus::Accepted).unwrap();
        let r = store.insert_pending(rejected, viewer).unwrap();
        store.transition_if(r.id, ConnectionStatus::Pending, ConnectionStatus::Rejected).unwrap();
        store.insert_pending(incoming, viewer).unwrap();

        let set = build_exclusion_set(&store, viewer).unwrap();
        for id in [viewer, pending, accepted, rejected, incoming] {
            assert!(set.contains(&id));
        }
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn deleted_rows_leave_no_residue() {
        let store = MemoryConnectionStore::new();
        let (viewer, other) = (Uuid::now_v7(), Uuid::now_v7());
        let c = store.insert_pending(viewer, other).unwrap();
        store.delete_if(c.id, ConnectionStatus::Pending).unwrap();
        assert!(!build_exclusion_set(&store, viewer).unwrap().contains(&other));
        assert!(!build_exclusion_set(&store, other).unwrap().contains(&viewer));
    }

    proptest! {
        #[test]
        fn exclusion_is_symmetric(edges in proptest::collection::vec((0usize..8, 0usize..8), 0..24)) {
            let people: Vec<Uuid> = (0..8).map(|_| Uuid::now_v7()).collect();
            let store = MemoryConnectionStore::new();
            for (a, b) in edges {
                if a != b {
                    let _ = store.insert_pending(people[a], people[b]);
                }
            }
            for a in &people {
                let set_a = build_exclusion_set(&store, *a).unwrap();
                prop_assert!(set_a.contains(a));
                for b in &people {
                    if a != b && set_a.contains(b) {
                        prop_assert!(build_exclusion_set(&store, *b).unwrap().contains(a));
                    }
                }
            }
        }
    }
}

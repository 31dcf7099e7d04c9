use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use super::{pair_key, ConnectionStore};
use crate::error::StoreError;
use crate::models::{Connection, ConnectionStatus};

#[derive(Default)]
struct Inner {
    rows: HashMap<Uuid, Connection>,
    pairs: HashMap<(Uuid, Uuid), Uuid>,
}

/// In-process store with the same pair-uniqueness and CAS semantics as the
/// Postgres store. Every call takes one lock, so each operation is atomic.
#[derive(Default)]
pub struct MemoryConnectionStore {
    inner: Mutex<Inner>,
    pending_failures: AtomicU32,
}

impl MemoryConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` calls fail with `StoreError::Unavailable`.
    pub fn fail_next(&self, n: u32) {
        self.pending_failures.store(n, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn begin(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        let injected = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        self.lock()
    }
}

impl ConnectionStore for MemoryConnectionStore {
    fn insert_pending(&self, requester_id: Uuid, receiver_id: Uuid) -> Result<Connection, StoreError> {
        let mut inner = self.begin()?;
        let key = pair_key(requester_id, receiver_id);
        if inner.pairs.contains_key(&key) {
            return Err(StoreError::Duplicate);
        }

        let now = Utc::now();
        let connection = Connection {
            id: Uuid::now_v7(),
            requester_id,
            receiver_id,
            status: ConnectionStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        inner.pairs.insert(key, connection.id);
        inner.rows.insert(connection.id, connection.clone());
        Ok(connection)
    }

    fn find(&self, id: Uuid) -> Result<Option<Connection>, StoreError> {
        Ok(self.begin()?.rows.get(&id).cloned())
    }

    fn find_between(&self, a: Uuid, b: Uuid) -> Result<Option<Connection>, StoreError> {
        let inner = self.begin()?;
        Ok(inner
            .pairs
            .get(&pair_key(a, b))
            .and_then(|id| inner.rows.get(id))
            .cloned())
    }

    fn list_for_profile(&self, profile_id: Uuid) -> Result<Vec<Connection>, StoreError> {
        let inner = self.begin()?;
        let mut rows: Vec<Connection> = inner
            .rows
            .values()
            .filter(|c| c.involves(profile_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    fn transition_if(
        &self,
        id: Uuid,
        expected: ConnectionStatus,
        next: ConnectionStatus,
    ) -> Result<Option<Connection>, StoreError> {
        let mut inner = self.begin()?;
        match inner.rows.get_mut(&id) {
            Some(row) if row.status == expected => {
                row.status = next;
                row.updated_at = Utc::now();
                Ok(Some(row.clone()))
            }
            _ => Ok(None),
        }
    }

    fn delete_if(&self, id: Uuid, expected: ConnectionStatus) -> Result<Option<Connection>, StoreError> {
        let mut inner = self.begin()?;
        match inner.rows.get(&id) {
            Some(row) if row.status == expected => {
                let key = pair_key(row.requester_id, row.receiver_id);
                inner.pairs.remove(&key);
                Ok(inner.rows.remove(&id))
            }
            _ => Ok(None),
        }
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.begin().map(|_| ())
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use uuid::Uuid;

use super::exclusion::{build_exclusion_set, ExclusionSet};
use super::retry::RetryPolicy;
use crate::directory::ProfileDirectory;
use crate::error::{ConnectionError, StoreError};
use crate::events::{ConnectionEvent, ConnectionEventKind, NotificationEmitter};
use crate::models::{
    Connection, ConnectionStatus, ConnectionView, ConnectionsOverview, Profile, RelationshipStatus,
};
use crate::store::ConnectionStore;

/// Connection state machine.
///
/// ```text
/// (none) --create--> pending --accept--> accepted --remove--> (none)
///                       |  \--reject--> rejected
///                       \--withdraw--> (none)
/// ```
///
/// Every transition is a single conditional write against the store, so
/// concurrent actors on the same row resolve to one winner and the loser gets
/// `NotPending` / `NotAccepted` / `ConnectionNotFound`. Rejected rows are
/// terminal and stay in the store.
#[derive(Clone)]
pub struct LifecycleManager {
    store: Arc<dyn ConnectionStore>,
    directory: Arc<dyn ProfileDirectory>,
    emitter: Arc<dyn NotificationEmitter>,
    retry: RetryPolicy,
}

fn record(op: &'static str, outcome: &'static str) {
    counter!("connection_transitions_total", "op" => op, "outcome" => outcome).increment(1);
}

fn outcome_of(result: &Result<Connection, ConnectionError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(ConnectionError::InvalidSelfRequest) => "invalid_self_request",
        Err(ConnectionError::NotReceiver) => "not_receiver",
        Err(ConnectionError::NotRequester) => "not_requester",
        Err(ConnectionError::NotParty) => "not_party",
        Err(ConnectionError::DuplicateConnection) => "duplicate",
        Err(ConnectionError::NotPending) => "not_pending",
        Err(ConnectionError::NotAccepted) => "not_accepted",
        Err(ConnectionError::ConnectionNotFound(_)) => "not_found",
        Err(ConnectionError::ProfileNotFound(_)) => "profile_not_found",
        Err(ConnectionError::NoProfileForCredential(_)) => "no_caller_profile",
        Err(ConnectionError::StoreUnavailable(_)) => "store_unavailable",
    }
}

impl LifecycleManager {
    pub fn new(
        store: Arc<dyn ConnectionStore>,
        directory: Arc<dyn ProfileDirectory>,
        emitter: Arc<dyn NotificationEmitter>,
        retry: RetryPolicy,
    ) -> Self {
        Self { store, directory, emitter, retry }
    }

    // --- Mutations ---

    /// Creates a pending request from `requester_id` to `receiver_id`.
    ///
    /// A `DuplicateConnection` error means some row already exists for the
    /// pair, possibly created concurrently by the other party; callers should
    /// re-read with [`Self::status_between`] instead of retrying.
    pub async fn create_request(
        &self,
        requester_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<Connection, ConnectionError> {
        let result = self.try_create_request(requester_id, receiver_id).await;
        record("create_request", outcome_of(&result));

        match &result {
            Ok(connection) => {
                tracing::info!(
                    connection_id = %connection.id,
                    requester_id = %requester_id,
                    receiver_id = %receiver_id,
                    "connection request created"
                );
                self.emit(ConnectionEventKind::RequestCreated, connection, requester_id).await;
            }
            Err(ConnectionError::DuplicateConnection) => {
                tracing::warn!(
                    requester_id = %requester_id,
                    receiver_id = %receiver_id,
                    "connection already exists for pair"
                );
            }
            Err(_) => {}
        }
        result
    }

    async fn try_create_request(
        &self,
        requester_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<Connection, ConnectionError> {
        if requester_id == receiver_id {
            return Err(ConnectionError::InvalidSelfRequest);
        }

        let receiver = self
            .retry
            .read("directory.profile", || self.directory.profile(receiver_id))
            .await?;
        if receiver.is_none() {
            return Err(ConnectionError::ProfileNotFound(receiver_id));
        }

        let attempts = self.retry.write_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.store.insert_pending(requester_id, receiver_id) {
                Ok(connection) => return Ok(connection),
                Err(e) if e.is_transient() && attempt < attempts => {
                    tracing::warn!(attempt, error = %e, "insert failed, re-reading pair before retry");
                    self.retry.pause(attempt).await;
                    attempt += 1;
                    // The failed insert may have committed; never write twice.
                    if self.store.find_between(requester_id, receiver_id)?.is_some() {
                        return Err(ConnectionError::DuplicateConnection);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Receiver accepts a pending request.
    pub async fn accept(&self, connection_id: Uuid, acting_profile_id: Uuid) -> Result<Connection, ConnectionError> {
        self.respond(connection_id, acting_profile_id, ConnectionStatus::Accepted).await
    }

    /// Receiver rejects a pending request. The row stays as a permanent
    /// do-not-rematch record.
    pub async fn reject(&self, connection_id: Uuid, acting_profile_id: Uuid) -> Result<Connection, ConnectionError> {
        self.respond(connection_id, acting_profile_id, ConnectionStatus::Rejected).await
    }

    async fn respond(
        &self,
        connection_id: Uuid,
        acting_profile_id: Uuid,
        next: ConnectionStatus,
    ) -> Result<Connection, ConnectionError> {
        let (op, kind) = match next {
            ConnectionStatus::Rejected => ("reject", ConnectionEventKind::RequestRejected),
            _ => ("accept", ConnectionEventKind::RequestAccepted),
        };

        let result = self.try_respond(connection_id, acting_profile_id, next).await;
        record(op, outcome_of(&result));

        match &result {
            Ok(connection) => {
                tracing::info!(
                    connection_id = %connection.id,
                    requester_id = %connection.requester_id,
                    receiver_id = %connection.receiver_id,
                    actor_id = %acting_profile_id,
                    status = %connection.status,
                    "connection request answered"
                );
                self.emit(kind, connection, acting_profile_id).await;
            }
            Err(e) => {
                tracing::debug!(connection_id = %connection_id, actor_id = %acting_profile_id, error = %e, op, "answer refused");
            }
        }
        result
    }

    async fn try_respond(
        &self,
        connection_id: Uuid,
        acting_profile_id: Uuid,
        next: ConnectionStatus,
    ) -> Result<Connection, ConnectionError> {
        let current = self.load(connection_id).await?;
        if !current.is_receiver(acting_profile_id) {
            return Err(ConnectionError::NotReceiver);
        }
        if current.status != ConnectionStatus::Pending {
            return Err(ConnectionError::NotPending);
        }

        let updated = self
            .write_settled(
                "store.transition_if",
                connection_id,
                || self.store.transition_if(connection_id, ConnectionStatus::Pending, next),
                |row| row.filter(|c| c.status == next),
            )
            .await?;

        match updated {
            Some(connection) => Ok(connection),
            None => Err(self.lost_race(connection_id, ConnectionError::NotPending).await),
        }
    }

    /// Requester takes back a pending request. Deletes the row, which puts
    /// both profiles back in each other's discovery pool. Also backs "undo
    /// last swipe": if the receiver accepted first this fails with
    /// `NotPending` and the connection stands.
    pub async fn withdraw(&self, connection_id: Uuid, acting_profile_id: Uuid) -> Result<Connection, ConnectionError> {
        let result = self.try_withdraw(connection_id, acting_profile_id).await;
        record("withdraw", outcome_of(&result));

        if let Ok(connection) = &result {
            tracing::info!(
                connection_id = %connection.id,
                requester_id = %connection.requester_id,
                receiver_id = %connection.receiver_id,
                "connection request withdrawn"
            );
            self.emit(ConnectionEventKind::RequestWithdrawn, connection, acting_profile_id).await;
        }
        result
    }

    async fn try_withdraw(&self, connection_id: Uuid, acting_profile_id: Uuid) -> Result<Connection, ConnectionError> {
        let current = self.load(connection_id).await?;
        if !current.is_requester(acting_profile_id) {
            return Err(ConnectionError::NotRequester);
        }
        if current.status != ConnectionStatus::Pending {
            return Err(ConnectionError::NotPending);
        }

        let deleted = self
            .write_settled(
                "store.delete_if",
                connection_id,
                || self.store.delete_if(connection_id, ConnectionStatus::Pending),
                |row| row.is_none().then(|| current.clone()),
            )
            .await?;

        match deleted {
            Some(connection) => Ok(connection),
            None => Err(self.lost_race(connection_id, ConnectionError::NotPending).await),
        }
    }

    /// Either party severs an accepted connection. Deletes the row.
    pub async fn remove(&self, connection_id: Uuid, acting_profile_id: Uuid) -> Result<Connection, ConnectionError> {
        let result = self.try_remove(connection_id, acting_profile_id).await;
        record("remove", outcome_of(&result));

        if let Ok(connection) = &result {
            tracing::info!(
                connection_id = %connection.id,
                requester_id = %connection.requester_id,
                receiver_id = %connection.receiver_id,
                actor_id = %acting_profile_id,
                "connection removed"
            );
            self.emit(ConnectionEventKind::ConnectionRemoved, connection, acting_profile_id).await;
        }
        result
    }

    async fn try_remove(&self, connection_id: Uuid, acting_profile_id: Uuid) -> Result<Connection, ConnectionError> {
        let current = self.load(connection_id).await?;
        if !current.involves(acting_profile_id) {
            return Err(ConnectionError::NotParty);
        }
        if current.status != ConnectionStatus::Accepted {
            return Err(ConnectionError::NotAccepted);
        }

        let deleted = self
            .write_settled(
                "store.delete_if",
                connection_id,
                || self.store.delete_if(connection_id, ConnectionStatus::Accepted),
                |row| row.is_none().then(|| current.clone()),
            )
            .await?;

        match deleted {
            Some(connection) => Ok(connection),
            None => Err(self.lost_race(connection_id, ConnectionError::NotAccepted).await),
        }
    }

    // --- Reads ---

    /// The profile owned by an authenticated credential.
    pub async fn profile_for_credential(&self, credential_id: Uuid) -> Result<Profile, ConnectionError> {
        self.retry
            .read("directory.profile_by_credential", || self.directory.profile_by_credential(credential_id))
            .await?
            .ok_or(ConnectionError::NoProfileForCredential(credential_id))
    }

    pub async fn connection(&self, connection_id: Uuid) -> Result<Connection, ConnectionError> {
        self.load(connection_id).await
    }

    pub async fn exclusion_set(&self, viewer_id: Uuid) -> Result<ExclusionSet, ConnectionError> {
        Ok(self
            .retry
            .read("exclusion.build", || build_exclusion_set(self.store.as_ref(), viewer_id))
            .await?)
    }

    /// Where `viewer_id` stands with `other_id`.
    pub async fn status_between(&self, viewer_id: Uuid, other_id: Uuid) -> Result<RelationshipStatus, ConnectionError> {
        if viewer_id == other_id {
            return Ok(RelationshipStatus::none());
        }
        let row = self
            .retry
            .read("store.find_between", || self.store.find_between(viewer_id, other_id))
            .await?;
        Ok(row
            .map(|c| RelationshipStatus::from_connection(viewer_id, &c))
            .unwrap_or_else(RelationshipStatus::none))
    }

    pub async fn are_connected(&self, a: Uuid, b: Uuid) -> Result<bool, ConnectionError> {
        if a == b {
            return Ok(false);
        }
        let row = self
            .retry
            .read("store.find_between", || self.store.find_between(a, b))
            .await?;
        Ok(matches!(row, Some(c) if c.status == ConnectionStatus::Accepted))
    }

    /// Counterparts of every accepted connection, most recent first.
    pub async fn connected_ids(&self, profile_id: Uuid) -> Result<Vec<Uuid>, ConnectionError> {
        let rows = self
            .retry
            .read("store.list_for_profile", || self.store.list_for_profile(profile_id))
            .await?;
        Ok(rows
            .iter()
            .filter(|c| c.status == ConnectionStatus::Accepted)
            .filter_map(|c| c.counterpart(profile_id))
            .collect())
    }

    /// Pending-received, pending-sent and accepted buckets for `profile_id`.
    /// Rejected rows are never listed.
    pub async fn connections_for_profile(&self, profile_id: Uuid) -> Result<ConnectionsOverview, ConnectionError> {
        let rows = self
            .retry
            .read("store.list_for_profile", || self.store.list_for_profile(profile_id))
            .await?;

        let visible: Vec<(Connection, Uuid)> = rows
            .into_iter()
            .filter(|c| c.status != ConnectionStatus::Rejected)
            .filter_map(|c| c.counterpart(profile_id).map(|other| (c, other)))
            .collect();

        let counterpart_ids: Vec<Uuid> = visible.iter().map(|(_, other)| *other).collect();
        let mut profiles: HashMap<Uuid, _> = self
            .retry
            .read("directory.profiles", || self.directory.profiles(&counterpart_ids))
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut overview = ConnectionsOverview::default();
        for (connection, counterpart_id) in visible {
            let bucket = match connection.status {
                ConnectionStatus::Accepted => &mut overview.accepted,
                ConnectionStatus::Pending if connection.is_receiver(profile_id) => &mut overview.pending_received,
                ConnectionStatus::Pending => &mut overview.pending_sent,
                ConnectionStatus::Rejected => continue,
            };
            bucket.push(ConnectionView {
                counterpart: profiles.remove(&counterpart_id),
                counterpart_id,
                connection,
            });
        }
        Ok(overview)
    }

    pub fn store(&self) -> &Arc<dyn ConnectionStore> {
        &self.store
    }

    pub fn emitter(&self) -> &Arc<dyn NotificationEmitter> {
        &self.emitter
    }

    // --- Helpers ---

    async fn load(&self, connection_id: Uuid) -> Result<Connection, ConnectionError> {
        self.retry
            .read("store.find", || self.store.find(connection_id))
            .await?
            .ok_or(ConnectionError::ConnectionNotFound(connection_id))
    }

    /// Runs a conditional write within the write budget. A transient failure
    /// may still have committed, so the row is re-read first and `committed`
    /// decides whether it already shows the write's outcome.
    async fn write_settled(
        &self,
        op: &'static str,
        connection_id: Uuid,
        mut write: impl FnMut() -> Result<Option<Connection>, StoreError>,
        committed: impl Fn(Option<Connection>) -> Option<Connection>,
    ) -> Result<Option<Connection>, ConnectionError> {
        let attempts = self.retry.write_attempts.max(1);
        let mut attempt = 1;
        loop {
            match write() {
                Err(e) if e.is_transient() => {
                    tracing::warn!(op, attempt, connection_id = %connection_id, error = %e, "conditional write failed, re-reading row");
                    let row = self.retry.read("store.find", || self.store.find(connection_id)).await?;
                    if let Some(done) = committed(row) {
                        return Ok(Some(done));
                    }
                    if attempt >= attempts {
                        return Err(e.into());
                    }
                    self.retry.pause(attempt).await;
                    attempt += 1;
                }
                result => return Ok(result?),
            }
        }
    }

    /// A conditional write matched nothing: the row was deleted or moved on
    /// between our read and our write.
    async fn lost_race(&self, connection_id: Uuid, moved_on: ConnectionError) -> ConnectionError {
        match self.retry.read("store.find", || self.store.find(connection_id)).await {
            Ok(Some(_)) => moved_on,
            Ok(None) => ConnectionError::ConnectionNotFound(connection_id),
            Err(e) => e.into(),
        }
    }

    async fn emit(&self, kind: ConnectionEventKind, connection: &Connection, actor_id: Uuid) {
        self.emitter.emit(ConnectionEvent::new(kind, connection, actor_id)).await;
    }
}

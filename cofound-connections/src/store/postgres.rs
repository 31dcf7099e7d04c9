use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use cofound_shared::clients::db::DbPool;

use super::ConnectionStore;
use crate::error::StoreError;
use crate::models::{Connection, ConnectionRow, ConnectionStatus, NewConnection};
use crate::schema::connections;

/// Diesel-backed store. The unordered-pair unique index and the status CHECK
/// live in the migration; this type relies on them rather than re-checking.
#[derive(Clone)]
pub struct PgConnectionStore {
    pool: DbPool,
}

impl PgConnectionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>, StoreError> {
        self.pool
            .get()
            .map_err(|e| StoreError::Unavailable(format!("pool: {e}")))
    }
}

fn map_diesel(err: DieselError) -> StoreError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => StoreError::Duplicate,
        other => StoreError::Unavailable(other.to_string()),
    }
}

fn to_connection(row: ConnectionRow) -> Result<Connection, StoreError> {
    Ok(Connection::try_from(row)?)
}

impl ConnectionStore for PgConnectionStore {
    fn insert_pending(&self, requester_id: Uuid, receiver_id: Uuid) -> Result<Connection, StoreError> {
        let mut conn = self.conn()?;

        let row = diesel::insert_into(connections::table)
            .values(&NewConnection::pending(requester_id, receiver_id))
            .returning(ConnectionRow::as_returning())
            .get_result(&mut conn)
            .map_err(map_diesel)?;

        to_connection(row)
    }

    fn find(&self, id: Uuid) -> Result<Option<Connection>, StoreError> {
        let mut conn = self.conn()?;

        connections::table
            .find(id)
            .select(ConnectionRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(map_diesel)?
            .map(to_connection)
            .transpose()
    }

    fn find_between(&self, a: Uuid, b: Uuid) -> Result<Option<Connection>, StoreError> {
        let mut conn = self.conn()?;

        connections::table
            .filter(
                connections::requester_id.eq(a).and(connections::receiver_id.eq(b))
                    .or(connections::requester_id.eq(b).and(connections::receiver_id.eq(a))),
            )
            .select(ConnectionRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(map_diesel)?
            .map(to_connection)
            .transpose()
    }

    fn list_for_profile(&self, profile_id: Uuid) -> Result<Vec<Connection>, StoreError> {
        let mut conn = self.conn()?;

        connections::table
            .filter(
                connections::requester_id.eq(profile_id)
                    .or(connections::receiver_id.eq(profile_id)),
            )
            .order((connections::updated_at.desc(), connections::id.desc()))
            .select(ConnectionRow::as_select())
            .load(&mut conn)
            .map_err(map_diesel)?
            .into_iter()
            .map(to_connection)
            .collect()
    }

    fn counterpart_ids(&self, profile_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let mut conn = self.conn()?;

        let sent: Vec<Uuid> = connections::table
            .filter(connections::requester_id.eq(profile_id))
            .select(connections::receiver_id)
            .load(&mut conn)
            .map_err(map_diesel)?;

        let received: Vec<Uuid> = connections::table
            .filter(connections::receiver_id.eq(profile_id))
            .select(connections::requester_id)
            .load(&mut conn)
            .map_err(map_diesel)?;

        Ok(sent.into_iter().chain(received).collect())
    }

    fn transition_if(
        &self,
        id: Uuid,
        expected: ConnectionStatus,
        next: ConnectionStatus,
    ) -> Result<Option<Connection>, StoreError> {
        let mut conn = self.conn()?;

        diesel::update(
            connections::table
                .filter(connections::id.eq(id))
                .filter(connections::status.eq(expected.as_str())),
        )
        .set((
            connections::status.eq(next.as_str()),
            connections::updated_at.eq(Utc::now()),
        ))
        .returning(ConnectionRow::as_returning())
        .get_result(&mut conn)
        .optional()
        .map_err(map_diesel)?
        .map(to_connection)
        .transpose()
    }

    fn delete_if(&self, id: Uuid, expected: ConnectionStatus) -> Result<Option<Connection>, StoreError> {
        let mut conn = self.conn()?;

        diesel::delete(
            connections::table
                .filter(connections::id.eq(id))
                .filter(connections::status.eq(expected.as_str())),
        )
        .returning(ConnectionRow::as_returning())
        .get_result(&mut conn)
        .optional()
        .map_err(map_diesel)?
        .map(to_connection)
        .transpose()
    }

    fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        diesel::sql_query("SELECT 1")
            .execute(&mut conn)
            .map(|_| ())
            .map_err(map_diesel)
    }
}

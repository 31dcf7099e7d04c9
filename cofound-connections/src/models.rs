use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RowError;
use crate::schema::{connections, profiles};

const MIN_AGE: i32 = 16;
const MAX_AGE: i32 = 120;

// --- Profile ---

/// Raw `profiles` row as the directory returns it. Converted into `Profile`
/// before anything else sees it.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProfileRow {
    pub id: Uuid,
    pub credential_id: Uuid,
    pub display_name: Option<String>,
    pub age: Option<i32>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub looking_for: Option<String>,
    pub interests: Vec<String>,
    pub avatar_url: Option<String>,
    pub profile_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub credential_id: Uuid,
    pub display_name: Option<String>,
    pub age: Option<i32>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub looking_for: Option<String>,
    pub interests: BTreeSet<String>,
    pub avatar_url: Option<String>,
    pub profile_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = RowError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        if let Some(age) = row.age {
            if !(MIN_AGE..=MAX_AGE).contains(&age) {
                return Err(RowError::AgeOutOfRange { profile_id: row.id, age });
            }
        }

        let display_name = row
            .display_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if row.profile_completed && display_name.is_none() {
            return Err(RowError::MissingDisplayName(row.id));
        }

        let interests = row
            .interests
            .into_iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();

        Ok(Self {
            id: row.id,
            credential_id: row.credential_id,
            display_name,
            age: row.age,
            city: row.city,
            country: row.country,
            looking_for: row.looking_for,
            interests,
            avatar_url: row.avatar_url,
            profile_completed: row.profile_completed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// --- Connection ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConnectionStatus {
    type Err = RowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(RowError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = connections)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ConnectionRow {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub receiver_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub receiver_id: Uuid,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ConnectionRow> for Connection {
    type Error = RowError;

    fn try_from(row: ConnectionRow) -> Result<Self, Self::Error> {
        if row.requester_id == row.receiver_id {
            return Err(RowError::SelfConnection(row.id));
        }
        Ok(Self {
            id: row.id,
            requester_id: row.requester_id,
            receiver_id: row.receiver_id,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl Connection {
    pub fn is_requester(&self, profile_id: Uuid) -> bool {
        self.requester_id == profile_id
    }

    pub fn is_receiver(&self, profile_id: Uuid) -> bool {
        self.receiver_id == profile_id
    }

    pub fn involves(&self, profile_id: Uuid) -> bool {
        self.is_requester(profile_id) || self.is_receiver(profile_id)
    }

    /// The other party as seen from `viewer`, or `None` if `viewer` is not on this row.
    pub fn counterpart(&self, viewer: Uuid) -> Option<Uuid> {
        if self.is_requester(viewer) {
            Some(self.receiver_id)
        } else if self.is_receiver(viewer) {
            Some(self.requester_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = connections)]
pub struct NewConnection {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub receiver_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewConnection {
    pub fn pending(requester_id: Uuid, receiver_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            requester_id,
            receiver_id,
            status: ConnectionStatus::Pending.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

// --- Read models ---

/// Where a viewer stands with one other profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipState {
    None,
    PendingSent,
    PendingReceived,
    Connected,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipStatus {
    pub state: RelationshipState,
    pub connection_id: Option<Uuid>,
}

impl RelationshipStatus {
    pub fn none() -> Self {
        Self { state: RelationshipState::None, connection_id: None }
    }

    pub fn from_connection(viewer: Uuid, connection: &Connection) -> Self {
        let state = match connection.status {
            ConnectionStatus::Accepted => RelationshipState::Connected,
            ConnectionStatus::Rejected => RelationshipState::Rejected,
            ConnectionStatus::Pending if connection.is_requester(viewer) => RelationshipState::PendingSent,
            ConnectionStatus::Pending => RelationshipState::PendingReceived,
        };
        Self { state, connection_id: Some(connection.id) }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionView {
    pub connection: Connection,
    pub counterpart_id: Uuid,
    /// `None` when the counterpart's profile is no longer in the directory.
    pub counterpart: Option<Profile>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionsOverview {
    pub pending_received: Vec<ConnectionView>,
    pub pending_sent: Vec<ConnectionView>,
    pub accepted: Vec<ConnectionView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(requester: Uuid, receiver: Uuid, status: &str) -> ConnectionRow {
        let now = Utc::now();
        ConnectionRow {
            id: Uuid::now_v7(),
            requester_id: requester,
            receiver_id: receiver,
            status: status.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn profile_row(completed: bool, name: Option<&str>) -> ProfileRow {
        let now = Utc::now();
        ProfileRow {
            id: Uuid::now_v7(),
            credential_id: Uuid::now_v7(),
            display_name: name.map(str::to_string),
            age: Some(29),
            city: Some("Lyon".into()),
            country: Some("FR".into()),
            looking_for: Some("technical co-founder".into()),
            interests: vec![" Fintech ".into(), "fintech".into(), "".into(), "B2B".into()],
            avatar_url: None,
            profile_completed: completed,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn counterpart_is_symmetric() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let c = Connection::try_from(row(a, b, "pending")).unwrap();
        assert_eq!(c.counterpart(a), Some(b));
        assert_eq!(c.counterpart(b), Some(a));
        assert_eq!(c.counterpart(Uuid::now_v7()), None);
    }

    #[test]
    fn self_connection_row_is_rejected() {
        let a = Uuid::now_v7();
        assert!(matches!(
            Connection::try_from(row(a, a, "pending")),
            Err(RowError::SelfConnection(_))
        ));
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = Connection::try_from(row(Uuid::now_v7(), Uuid::now_v7(), "blocked")).unwrap_err();
        assert_eq!(err, RowError::UnknownStatus("blocked".into()));
    }

    #[test]
    fn interests_are_normalized() {
        let p = Profile::try_from(profile_row(true, Some("Ada"))).unwrap();
        let tags: Vec<_> = p.interests.iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["b2b", "fintech"]);
    }

    #[test]
    fn completed_profile_needs_a_name() {
        assert!(matches!(
            Profile::try_from(profile_row(true, Some("  "))),
            Err(RowError::MissingDisplayName(_))
        ));
        assert!(Profile::try_from(profile_row(false, None)).is_ok());
    }

    #[test]
    fn relationship_state_depends_on_viewer() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let c = Connection::try_from(row(a, b, "pending")).unwrap();
        assert_eq!(RelationshipStatus::from_connection(a, &c).state, RelationshipState::PendingSent);
        assert_eq!(RelationshipStatus::from_connection(b, &c).state, RelationshipState::PendingReceived);
    }
}

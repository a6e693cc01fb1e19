//! Activity event types.

use chrono::{DateTime, Utc};
use common::UserId;
use uuid::Uuid;

/// Who performed an action: a user, or the administrative sentinel for
/// paths with no acting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    User(UserId),
    Admin,
}

impl Actor {
    /// Parses the stored string form. Anything that is not a UUID is
    /// treated as the administrative sentinel.
    pub fn parse(s: &str) -> Self {
        match Uuid::parse_str(s) {
            Ok(uuid) => Self::User(UserId::from_uuid(uuid)),
            Err(_) => Self::Admin,
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "{id}"),
            Self::Admin => f.write_str("ADMIN"),
        }
    }
}

/// The kind of domain action an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    CreateUser,
    UpdateUser,
    DeleteUser,
    CreateProduct,
    UpdateProduct,
    DeleteProduct,
    CreateOrder,
    UpdateOrder,
    DeleteOrder,
}

impl ActionKind {
    /// Canonical string form, as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateUser => "CREATE_USER",
            Self::UpdateUser => "UPDATE_USER",
            Self::DeleteUser => "DELETE_USER",
            Self::CreateProduct => "CREATE_PRODUCT",
            Self::UpdateProduct => "UPDATE_PRODUCT",
            Self::DeleteProduct => "DELETE_PRODUCT",
            Self::CreateOrder => "CREATE_ORDER",
            Self::UpdateOrder => "UPDATE_ORDER",
            Self::DeleteOrder => "DELETE_ORDER",
        }
    }

    /// Parses the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATE_USER" => Some(Self::CreateUser),
            "UPDATE_USER" => Some(Self::UpdateUser),
            "DELETE_USER" => Some(Self::DeleteUser),
            "CREATE_PRODUCT" => Some(Self::CreateProduct),
            "UPDATE_PRODUCT" => Some(Self::UpdateProduct),
            "DELETE_PRODUCT" => Some(Self::DeleteProduct),
            "CREATE_ORDER" => Some(Self::CreateOrder),
            "UPDATE_ORDER" => Some(Self::UpdateOrder),
            "DELETE_ORDER" => Some(Self::DeleteOrder),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An append-only audit record of a domain action.
///
/// Holds only soft references: the user or order it mentions may be
/// deleted later without invalidating the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    pub id: Uuid,
    pub actor: Actor,
    pub action: ActionKind,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

impl ActivityEvent {
    /// Creates an event stamped with the current time.
    pub fn new(actor: Actor, action: ActionKind, detail: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor,
            action,
            detail: detail.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_string_roundtrip() {
        let user = Actor::User(UserId::new());
        assert_eq!(Actor::parse(&user.to_string()), user);
        assert_eq!(Actor::parse("ADMIN"), Actor::Admin);
        assert_eq!(Actor::Admin.to_string(), "ADMIN");
    }

    #[test]
    fn action_kind_string_roundtrip() {
        for kind in [
            ActionKind::CreateUser,
            ActionKind::UpdateUser,
            ActionKind::DeleteUser,
            ActionKind::CreateProduct,
            ActionKind::UpdateProduct,
            ActionKind::DeleteProduct,
            ActionKind::CreateOrder,
            ActionKind::UpdateOrder,
            ActionKind::DeleteOrder,
        ] {
            assert_eq!(ActionKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ActionKind::parse("SOMETHING_ELSE"), None);
    }
}

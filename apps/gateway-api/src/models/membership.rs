use serde::{Deserialize, Serialize};

/// Server role, ordered by privilege: `Owner > Admin > Member`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
    Owner,
}

impl Role {
    /// Moderation roles may act on other users' messages.
    pub fn can_moderate(self) -> bool {
        matches!(self, Role::Admin | Role::Owner)
    }
}

/// A user's membership in a server, as read from the persistence layer.
///
/// The gateway never writes memberships; role changes land through the REST
/// layer and take effect here on the member's next action.
#[derive(Debug, Clone, Serialize)]
pub struct Membership {
    pub server_id: i64,
    pub user_id: i64,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privilege_ordering() {
        assert!(Role::Owner > Role::Admin);
        assert!(Role::Admin > Role::Member);
    }

    #[test]
    fn moderation_roles() {
        assert!(Role::Owner.can_moderate());
        assert!(Role::Admin.can_moderate());
        assert!(!Role::Member.can_moderate());
    }
}

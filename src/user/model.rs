use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// region:    --- Roles
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Student,
    Admin,
    SuperAdmin,
    Suspended,
    Other(String),
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Student" => Role::Student,
            "Admin" => Role::Admin,
            "SuperAdmin" => Role::SuperAdmin,
            "Suspended" => Role::Suspended,
            _ => Role::Other(raw),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Student => "Student".to_string(),
            Role::Admin => "Admin".to_string(),
            Role::SuperAdmin => "SuperAdmin".to_string(),
            Role::Suspended => "Suspended".to_string(),
            Role::Other(raw) => raw,
        }
    }
}

/// Multi-valued role assignment of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn contains(&self, role: &Role) -> bool {
        self.0.contains(role)
    }

    pub fn is_admin(&self) -> bool {
        self.contains(&Role::Admin) || self.contains(&Role::SuperAdmin)
    }

    pub fn is_suspended(&self) -> bool {
        self.contains(&Role::Suspended)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        RoleSet(iter.into_iter().collect())
    }
}
// endregion: --- Roles

// region:    --- User
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub roles: RoleSet,
    #[serde(default)]
    pub campus: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(rename = "createdAt", default = "epoch")]
    pub created_at: DateTime<Utc>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.roles.is_admin()
    }

    pub fn is_suspended(&self) -> bool {
        self.roles.is_suspended()
    }
}
// endregion: --- User

// region:    --- User Reference
/// A user as it appears inside another entity: either the full object or just its id.
///
/// The service returns both shapes depending on whether it populated the
/// reference. The cache resolves `Reference`s against its user table on ingest,
/// so callers only ever need [`UserRef::id`] and [`UserRef::user`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Resolved(User),
    Reference(String),
}

impl UserRef {
    pub fn id(&self) -> &str {
        match self {
            UserRef::Resolved(user) => &user.id,
            UserRef::Reference(id) => id,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            UserRef::Resolved(user) => Some(user),
            UserRef::Reference(_) => None,
        }
    }

    /// Display name, empty when only the id is known.
    pub fn name(&self) -> &str {
        self.user().map(|u| u.name.as_str()).unwrap_or("")
    }

    pub fn is(&self, user_id: &str) -> bool {
        self.id() == user_id
    }
}

impl From<User> for UserRef {
    fn from(user: User) -> Self {
        UserRef::Resolved(user)
    }
}

impl From<&str> for UserRef {
    fn from(id: &str) -> Self {
        UserRef::Reference(id.to_string())
    }
}
// endregion: --- User Reference

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn roles_decode_as_a_set_and_keep_unknown_values() {
        let user: User = serde_json::from_value(json!({
            "_id": "u1",
            "name": "Ada",
            "email": "ada@campus.edu",
            "roles": ["Student", "SuperAdmin", "Moderator", "Student"],
            "campus": "Unilag",
            "createdAt": "2025-01-10T08:00:00.000Z"
        }))
        .unwrap();

        assert!(user.is_admin());
        assert!(!user.is_suspended());
        assert_eq!(user.roles.iter().count(), 3);
        assert!(user.roles.contains(&Role::Other("Moderator".to_string())));
    }

    #[test]
    fn user_ref_accepts_both_shapes() {
        let bare: UserRef = serde_json::from_value(json!("u2")).unwrap();
        assert_eq!(bare, UserRef::Reference("u2".to_string()));
        assert_eq!(bare.name(), "");

        let full: UserRef = serde_json::from_value(json!({
            "_id": "u3",
            "name": "Bola",
            "roles": ["Suspended"]
        }))
        .unwrap();
        assert_eq!(full.id(), "u3");
        assert_eq!(full.name(), "Bola");
        assert!(full.user().unwrap().is_suspended());
    }
}

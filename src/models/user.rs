//! User model
//!
//! Users as the backend reports them, plus the role set that gates pages.
//! Role checks are plain membership tests against the `*_ROLES` slices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A registered user as seen by the front end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend identifier
    #[serde(alias = "_id", deserialize_with = "super::de_id")]
    pub id: String,
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Role
    #[serde(default)]
    pub role: Role,
    /// Whether the account may sign in
    #[serde(default = "default_active", alias = "isActive")]
    pub active: bool,
    /// Avatar URL
    #[serde(default)]
    pub avatar: Option<String>,
    /// Short biography
    #[serde(default)]
    pub bio: Option<String>,
    /// Registration timestamp
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl User {
    /// Check the user's role against a role group
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.role.is_any_of(roles)
    }

    /// Check if the user is an administrator (ADMIN or SUPERADMIN)
    pub fn is_admin(&self) -> bool {
        self.has_any_role(ADMIN_ROLES)
    }

    /// Check if the user may write articles
    pub fn is_writer(&self) -> bool {
        self.has_any_role(WRITER_ROLES)
    }

    /// Check if the user may read premium articles in full
    pub fn can_read_premium(&self) -> bool {
        self.has_any_role(SUBSCRIBER_ROLES)
    }

    /// Writers edit their own articles; administrators edit any.
    pub fn can_edit_article(&self, author_id: &str) -> bool {
        self.is_admin() || (self.is_writer() && self.id == author_id)
    }

    /// Anyone may delete their own comment; administrators may delete any.
    pub fn can_delete_comment(&self, author_id: &str) -> bool {
        self.is_admin() || self.id == author_id
    }
}

/// User role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Role {
    /// Registered reader
    #[default]
    User,
    /// Paying reader with access to premium articles
    Subscriber,
    /// Can write and manage own articles
    Writer,
    /// Back-office access
    Admin,
    /// Back-office access including administrator management
    Superadmin,
}

/// Every role
pub const ALL_ROLES: &[Role] = &[
    Role::User,
    Role::Subscriber,
    Role::Writer,
    Role::Admin,
    Role::Superadmin,
];

/// Roles that can read premium content
pub const SUBSCRIBER_ROLES: &[Role] = &[Role::Subscriber, Role::Writer, Role::Admin, Role::Superadmin];

/// Roles that can use the writer dashboard
pub const WRITER_ROLES: &[Role] = &[Role::Writer, Role::Admin, Role::Superadmin];

/// Roles that can use the admin back office
pub const ADMIN_ROLES: &[Role] = &[Role::Admin, Role::Superadmin];

/// Roles that can manage administrators
pub const SUPERADMIN_ROLES: &[Role] = &[Role::Superadmin];

impl Role {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Subscriber => "SUBSCRIBER",
            Role::Writer => "WRITER",
            Role::Admin => "ADMIN",
            Role::Superadmin => "SUPERADMIN",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Subscriber => "Subscriber",
            Role::Writer => "Writer",
            Role::Admin => "Admin",
            Role::Superadmin => "Super admin",
        }
    }

    /// Membership test against a role group
    pub fn is_any_of(&self, roles: &[Role]) -> bool {
        roles.contains(self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "SUBSCRIBER" => Ok(Role::Subscriber),
            "WRITER" => Ok(Role::Writer),
            "ADMIN" => Ok(Role::Admin),
            "SUPERADMIN" | "SUPER_ADMIN" => Ok(Role::Superadmin),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Roles `actor` may give to `target` from the user-management table.
///
/// Empty when the target cannot be changed by the actor at all.
pub fn assignable_roles(actor: &User, target: &User) -> Vec<Role> {
    if actor.id == target.id || target.role == Role::Superadmin {
        return Vec::new();
    }
    match actor.role {
        Role::Superadmin => vec![Role::User, Role::Subscriber, Role::Writer, Role::Admin],
        Role::Admin if !target.is_admin() => vec![Role::User, Role::Subscriber, Role::Writer],
        _ => Vec::new(),
    }
}

#[cfg(test)]
pub(crate) fn test_user(id: &str, role: Role) -> User {
    User {
        id: id.to_string(),
        name: format!("User {}", id),
        email: format!("user{}@example.com", id),
        role,
        active: true,
        avatar: None,
        bio: None,
        created_at: None,
    }
}

//! Users own spots; only the fields the spot workflow needs are modelled here.

use serde::Serialize;
use sqlx::FromRow;

/// Role attached to a user account.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Parse the stored role text. Anything other than `admin` is an ordinary user.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

/// The caller resolved from a bearer token.
#[derive(Serialize, Clone, Debug)]
pub struct AuthUser {
    pub id: i64,
    pub name: String,
    pub role: Role,
}

/// Row shape returned by the token lookup.
#[derive(FromRow, Debug)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub role: String,
}

impl From<UserRow> for AuthUser {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            role: Role::parse(&row.role),
        }
    }
}

/// Owner summary embedded in spot and review payloads.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct UserRef {
    pub id: i64,
    pub name: String,
}

/// Whether `user` may change or remove a spot owned by `owner_id`.
pub fn can_modify(user: &AuthUser, owner_id: i64) -> bool {
    user.id == owner_id || user.role == Role::Admin
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, role: Role) -> AuthUser {
        AuthUser {
            id,
            name: format!("user-{id}"),
            role,
        }
    }

    #[test]
    fn owner_may_modify() {
        assert!(can_modify(&user(4, Role::User), 4));
    }

    #[test]
    fn admin_may_modify_foreign_spot() {
        assert!(can_modify(&user(1, Role::Admin), 4));
    }

    #[test]
    fn other_users_may_not_modify() {
        assert!(!can_modify(&user(2, Role::User), 4));
    }

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!(Role::parse("ADMIN"), Role::Admin);
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("USER"), Role::User);
        assert_eq!(Role::parse(""), Role::User);
    }
}

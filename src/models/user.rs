//! User (principal) model, permissions and JWT claims

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::AppError;

/// Named permission grants checked by the catalog views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Permission {
    /// View every loan and renew due dates
    #[serde(rename = "catalog.can_mark_returned")]
    CanMarkReturned,
    /// Create, edit and delete authors and books
    #[serde(rename = "catalog.manage_catalog")]
    ManageCatalog,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::CanMarkReturned => "catalog.can_mark_returned",
            Permission::ManageCatalog => "catalog.manage_catalog",
        }
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "catalog.can_mark_returned" => Ok(Permission::CanMarkReturned),
            "catalog.manage_catalog" => Ok(Permission::ManageCatalog),
            _ => Err(format!("Unknown permission: {}", s)),
        }
    }
}

/// Account type slug
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountTypeSlug {
    Reader,
    Librarian,
    Admin,
}

impl AccountTypeSlug {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountTypeSlug::Reader => "reader",
            AccountTypeSlug::Librarian => "librarian",
            AccountTypeSlug::Admin => "admin",
        }
    }
}

impl std::fmt::Display for AccountTypeSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for AccountTypeSlug {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "librarian" => AccountTypeSlug::Librarian,
            "admin" => AccountTypeSlug::Admin,
            _ => AccountTypeSlug::Reader,
        }
    }
}

/// Internal row structure for database queries (with String fields)
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub account_type: String,
    pub permissions: Vec<String>,
}

/// User as exposed by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub account_type: AccountTypeSlug,
    pub permissions: Vec<Permission>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let permissions = row
            .permissions
            .iter()
            .filter_map(|p| match p.parse() {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!("Ignoring permission on user {}: {}", row.id, e);
                    None
                }
            })
            .collect();

        Self {
            id: row.id,
            account_type: AccountTypeSlug::from(row.account_type.as_str()),
            username: row.username,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            permissions,
        }
    }
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub account_type: AccountTypeSlug,
    pub permissions: Vec<Permission>,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Check if user is admin (account_type = "admin")
    pub fn is_admin(&self) -> bool {
        self.account_type == AccountTypeSlug::Admin
    }

    /// Administrators implicitly hold every permission
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.is_admin() || self.permissions.contains(&permission)
    }

    pub fn require_permission(&self, permission: Permission) -> Result<(), AppError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "Permission {} required",
                permission.as_str()
            )))
        }
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(account_type: AccountTypeSlug, permissions: Vec<Permission>) -> UserClaims {
        UserClaims {
            sub: "marian".into(),
            user_id: 7,
            account_type,
            permissions,
            exp: chrono::Utc::now().timestamp() + 3600,
            iat: chrono::Utc::now().timestamp(),
        }
    }

    #[test]
    fn token_round_trip_keeps_permissions() {
        let original = claims(AccountTypeSlug::Librarian, vec![Permission::CanMarkReturned]);
        let token = original.create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, 7);
        assert_eq!(parsed.permissions, vec![Permission::CanMarkReturned]);
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn reader_without_grant_is_forbidden() {
        let reader = claims(AccountTypeSlug::Reader, vec![]);
        assert!(matches!(
            reader.require_permission(Permission::CanMarkReturned),
            Err(AppError::Authorization(_))
        ));
        assert!(reader.require_admin().is_err());
    }

    #[test]
    fn admin_holds_every_permission() {
        let admin = claims(AccountTypeSlug::Admin, vec![]);
        assert!(admin.has_permission(Permission::CanMarkReturned));
        assert!(admin.has_permission(Permission::ManageCatalog));
    }

    #[test]
    fn unknown_permissions_are_dropped_from_rows() {
        let user = User::from(UserRow {
            id: 1,
            username: "lib".into(),
            password_hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            email: None,
            account_type: "librarian".into(),
            permissions: vec!["catalog.can_mark_returned".into(), "bogus".into()],
        });
        assert_eq!(user.permissions, vec![Permission::CanMarkReturned]);
        assert_eq!(user.account_type, AccountTypeSlug::Librarian);
    }
}

//! Token claims.

use bastion_core::Principal;
use serde::{Deserialize, Deserializer, Serialize};

/// Claims carried by an authorization token.
///
/// Custom claims use camelCase names on the wire (`userId`, `userRoles`, ...).
/// Missing or `null` custom claims decode as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    /// Issuer.
    pub iss: String,
    /// Issued at, seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    /// Token id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// User id.
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_id: String,
    /// Application the user signed into.
    #[serde(default, deserialize_with = "null_as_default")]
    pub app_name: String,
    /// Username.
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    /// Roles.
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_roles: Vec<String>,
    /// Capabilities.
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_events: Vec<String>,
}

impl TokenClaims {
    /// Converts verified claims into a [`Principal`].
    #[must_use]
    pub fn into_principal(self, raw_token: &str) -> Principal {
        let builder = Principal::builder(self.user_id)
            .app_name(self.app_name)
            .username(self.username)
            .roles(self.user_roles)
            .capabilities(self.user_events)
            .raw_token(raw_token);

        match self.jti {
            Some(token_id) => builder.token_id(token_id),
            None => builder,
        }
        .build()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

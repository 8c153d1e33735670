//! Verified caller identity.
//!
//! A [`Principal`] is built once from verified token claims and never changes
//! afterwards. Fields are private; use [`PrincipalBuilder`] to construct one.

use std::collections::BTreeSet;
use std::fmt;

/// The verified identity and claims extracted from a credential.
///
/// # Example
///
/// ```
/// use bastion_core::Principal;
///
/// let principal = Principal::builder("u-123")
///     .app_name("billing")
///     .username("alice")
///     .role("admin")
///     .capability("invoice.create")
///     .build();
///
/// assert!(principal.has_role("admin"));
/// assert_eq!(principal.log_id(), "user:u-123");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
    user_id: String,
    app_name: String,
    username: String,
    roles: BTreeSet<String>,
    capabilities: BTreeSet<String>,
    token_id: Option<String>,
    raw_token: Option<String>,
}

impl Principal {
    /// Starts building a principal for the given user id.
    #[must_use]
    pub fn builder(user_id: impl Into<String>) -> PrincipalBuilder {
        PrincipalBuilder {
            principal: Self {
                user_id: user_id.into(),
                app_name: String::new(),
                username: String::new(),
                roles: BTreeSet::new(),
                capabilities: BTreeSet::new(),
                token_id: None,
                raw_token: None,
            },
        }
    }

    /// Returns the user id.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns the application the user signed into.
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the held roles.
    #[must_use]
    pub const fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Returns the held capabilities ("events").
    #[must_use]
    pub const fn capabilities(&self) -> &BTreeSet<String> {
        &self.capabilities
    }

    /// Returns the token id (`jti`), if the token carried one.
    #[must_use]
    pub fn token_id(&self) -> Option<&str> {
        self.token_id.as_deref()
    }

    /// Returns the raw token text the principal was verified from.
    #[must_use]
    pub fn raw_token(&self) -> Option<&str> {
        self.raw_token.as_deref()
    }

    /// Returns `true` if the principal holds `role`. Case-sensitive.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Returns `true` if the principal holds `capability`. Case-sensitive.
    #[must_use]
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// Returns an identifier suitable for logs. Never contains the token.
    #[must_use]
    pub fn log_id(&self) -> String {
        format!("user:{}", self.user_id)
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("user_id", &self.user_id)
            .field("app_name", &self.app_name)
            .field("username", &self.username)
            .field("roles", &self.roles)
            .field("capabilities", &self.capabilities)
            .field("token_id", &self.token_id)
            .field("raw_token", &self.raw_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Builder for [`Principal`].
#[derive(Debug, Clone)]
pub struct PrincipalBuilder {
    principal: Principal,
}

impl PrincipalBuilder {
    /// Sets the application name.
    #[must_use]
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.principal.app_name = app_name.into();
        self
    }

    /// Sets the username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.principal.username = username.into();
        self
    }

    /// Adds a role.
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.principal.roles.insert(role.into());
        self
    }

    /// Adds several roles.
    #[must_use]
    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.principal.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Adds a capability.
    #[must_use]
    pub fn capability(mut self, capability: impl Into<String>) -> Self {
        self.principal.capabilities.insert(capability.into());
        self
    }

    /// Adds several capabilities.
    #[must_use]
    pub fn capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.principal
            .capabilities
            .extend(capabilities.into_iter().map(Into::into));
        self
    }

    /// Sets the token id.
    #[must_use]
    pub fn token_id(mut self, token_id: impl Into<String>) -> Self {
        self.principal.token_id = Some(token_id.into());
        self
    }

    /// Sets the raw token text.
    #[must_use]
    pub fn raw_token(mut self, raw_token: impl Into<String>) -> Self {
        self.principal.raw_token = Some(raw_token.into());
        self
    }

    /// Finishes the principal.
    #[must_use]
    pub fn build(self) -> Principal {
        self.principal
    }
}

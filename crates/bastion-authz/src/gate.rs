//! Authorization gates over the current principal.
//!
//! Every gate first requires a principal: with none present it fails with
//! [`BastionError::AuthenticationRequired`]. A principal that does not satisfy
//! the gate, including one with an empty role or capability set, fails with
//! [`BastionError::AuthorizationDenied`].
//!
//! Matching is exact and case-sensitive. "Any" gates pass when the required
//! and held sets intersect; "all" gates pass when every required value is held.
//!
//! # Example
//!
//! ```
//! use bastion_authz::{require_any_role, require_capability, require_signed_in};
//! use bastion_core::{BastionError, Principal, PrincipalContext};
//!
//! let mut ctx = PrincipalContext::new();
//! assert!(matches!(
//!     require_signed_in(&ctx),
//!     Err(BastionError::AuthenticationRequired { .. })
//! ));
//!
//! ctx.set(Principal::builder("u-1").role("editor").capability("doc.publish").build());
//! assert!(require_any_role(&ctx, ["admin", "editor"]).is_ok());
//! assert!(matches!(
//!     require_capability(&ctx, "doc.delete"),
//!     Err(BastionError::AuthorizationDenied { .. })
//! ));
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use bastion_core::{BastionError, BastionResult, Principal, PrincipalContext};
use tracing::debug;

/// Something that may hold the current principal.
pub trait PrincipalSource {
    /// Returns the principal, if one is present.
    fn principal(&self) -> Option<&Principal>;
}

impl PrincipalSource for PrincipalContext {
    fn principal(&self) -> Option<&Principal> {
        self.get_optional()
    }
}

impl PrincipalSource for Principal {
    fn principal(&self) -> Option<&Principal> {
        Some(self)
    }
}

impl PrincipalSource for Arc<Principal> {
    fn principal(&self) -> Option<&Principal> {
        Some(self)
    }
}

impl PrincipalSource for Option<&Principal> {
    fn principal(&self) -> Option<&Principal> {
        *self
    }
}

/// Returns the principal, or fails with `AuthenticationRequired`.
pub fn require_signed_in<S>(source: &S) -> BastionResult<&Principal>
where
    S: PrincipalSource + ?Sized,
{
    source
        .principal()
        .ok_or_else(|| BastionError::authentication_required("User is not signed in."))
}

/// Requires the principal to hold `role`.
pub fn require_role<S>(source: &S, role: &str) -> BastionResult<()>
where
    S: PrincipalSource + ?Sized,
{
    require_any_role(source, [role])
}

/// Requires the principal to hold at least one of `roles`.
pub fn require_any_role<S, I, R>(source: &S, roles: I) -> BastionResult<()>
where
    S: PrincipalSource + ?Sized,
    I: IntoIterator<Item = R>,
    R: AsRef<str>,
{
    let principal = require_signed_in(source)?;
    check_any(
        principal,
        principal.roles(),
        roles,
        "User is not authorized for any of the necessary roles.",
    )
}

/// Requires the principal to hold every one of `roles`.
pub fn require_all_roles<S, I, R>(source: &S, roles: I) -> BastionResult<()>
where
    S: PrincipalSource + ?Sized,
    I: IntoIterator<Item = R>,
    R: AsRef<str>,
{
    let principal = require_signed_in(source)?;
    check_all(
        principal,
        principal.roles(),
        roles,
        "User is not authorized for any of the necessary roles.",
        "User is not authorized for all of the necessary roles.",
    )
}

/// Requires the principal to hold `capability`.
pub fn require_capability<S>(source: &S, capability: &str) -> BastionResult<()>
where
    S: PrincipalSource + ?Sized,
{
    require_any_capability(source, [capability])
}

/// Requires the principal to hold at least one of `capabilities`.
pub fn require_any_capability<S, I, R>(source: &S, capabilities: I) -> BastionResult<()>
where
    S: PrincipalSource + ?Sized,
    I: IntoIterator<Item = R>,
    R: AsRef<str>,
{
    let principal = require_signed_in(source)?;
    check_any(
        principal,
        principal.capabilities(),
        capabilities,
        "User is not authorized for any of the necessary events.",
    )
}

/// Requires the principal to hold every one of `capabilities`.
pub fn require_all_capabilities<S, I, R>(source: &S, capabilities: I) -> BastionResult<()>
where
    S: PrincipalSource + ?Sized,
    I: IntoIterator<Item = R>,
    R: AsRef<str>,
{
    let principal = require_signed_in(source)?;
    check_all(
        principal,
        principal.capabilities(),
        capabilities,
        "User is not authorized for any of the necessary events.",
        "User is not authorized for all of the necessary events.",
    )
}

/// Returns whether the principal is `username` signed into `app_name`.
pub fn is_same_user<S>(source: &S, app_name: &str, username: &str) -> BastionResult<bool>
where
    S: PrincipalSource + ?Sized,
{
    let principal = require_signed_in(source)?;
    Ok(principal.app_name() == app_name && principal.username() == username)
}

/// Returns whether the principal has `user_id`.
pub fn is_same_user_id<S>(source: &S, user_id: &str) -> BastionResult<bool>
where
    S: PrincipalSource + ?Sized,
{
    let principal = require_signed_in(source)?;
    Ok(principal.user_id() == user_id)
}

/// Requires the principal to have `user_id`.
pub fn require_user_id<S>(source: &S, user_id: &str) -> BastionResult<()>
where
    S: PrincipalSource + ?Sized,
{
    if is_same_user_id(source, user_id)? {
        Ok(())
    } else {
        deny(
            source.principal(),
            "User is signed in as a different user.",
        )
    }
}

/// Gates bound to the application this service runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppGate {
    app_name: String,
}

impl AppGate {
    /// Creates a gate for `app_name`, which must not be blank.
    pub fn new(app_name: impl Into<String>) -> BastionResult<Self> {
        let app_name = app_name.into();
        if app_name.trim().is_empty() {
            return Err(BastionError::internal_configuration(
                "app name must not be empty",
            ));
        }
        Ok(Self { app_name })
    }

    /// Returns the application name.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Requires the principal to be signed into this application.
    pub fn require_signed_into_app<'a, S>(&self, source: &'a S) -> BastionResult<&'a Principal>
    where
        S: PrincipalSource + ?Sized,
    {
        let principal = require_signed_in(source)?;
        if principal.app_name() == self.app_name {
            Ok(principal)
        } else {
            deny(
                Some(principal),
                "User is not signed into this application.",
            )
        }
    }

    /// Requires the principal to be `username` signed into this application.
    pub fn require_username<S>(&self, source: &S, username: &str) -> BastionResult<()>
    where
        S: PrincipalSource + ?Sized,
    {
        let principal = self.require_signed_into_app(source)?;
        if username.trim().is_empty() {
            return Err(BastionError::internal("username to check must not be empty"));
        }
        if principal.username() == username {
            Ok(())
        } else {
            deny(Some(principal), "User is signed in as a different user.")
        }
    }
}

fn check_any<I, R>(
    principal: &Principal,
    held: &BTreeSet<String>,
    required: I,
    message: &str,
) -> BastionResult<()>
where
    I: IntoIterator<Item = R>,
    R: AsRef<str>,
{
    if !held.is_empty() && required.into_iter().any(|value| held.contains(value.as_ref())) {
        Ok(())
    } else {
        deny(Some(principal), message)
    }
}

fn check_all<I, R>(
    principal: &Principal,
    held: &BTreeSet<String>,
    required: I,
    empty_message: &str,
    message: &str,
) -> BastionResult<()>
where
    I: IntoIterator<Item = R>,
    R: AsRef<str>,
{
    if held.is_empty() {
        return deny(Some(principal), empty_message);
    }
    if required.into_iter().all(|value| held.contains(value.as_ref())) {
        Ok(())
    } else {
        deny(Some(principal), message)
    }
}

fn deny<T>(principal: Option<&Principal>, message: &str) -> BastionResult<T> {
    debug!(
        user_id = principal.map_or("", Principal::user_id),
        reason = message,
        "Authorization denied"
    );
    Err(BastionError::authorization_denied(message))
}

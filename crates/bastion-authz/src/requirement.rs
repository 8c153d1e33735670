//! Declarative authorization requirements.
//!
//! A [`Requirement`] is the data form of a gate. Call sites that know up front
//! what an operation needs can declare it once and run the operation through
//! [`guard`].

use std::fmt;

use bastion_core::{BastionResult, Principal};

use crate::gate::{
    require_all_capabilities, require_all_roles, require_any_capability, require_any_role,
    require_capability, require_role, require_signed_in, require_user_id, PrincipalSource,
};

/// What an operation requires of the current principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Any signed-in principal.
    SignedIn,
    /// A single role.
    Role(String),
    /// At least one of the roles.
    AnyRole(Vec<String>),
    /// Every one of the roles.
    AllRoles(Vec<String>),
    /// A single capability.
    Capability(String),
    /// At least one of the capabilities.
    AnyCapability(Vec<String>),
    /// Every one of the capabilities.
    AllCapabilities(Vec<String>),
    /// A specific user id.
    UserId(String),
    /// Every nested requirement, checked in order.
    All(Vec<Requirement>),
}

impl Requirement {
    /// Shorthand for [`Requirement::Role`].
    pub fn role(role: impl Into<String>) -> Self {
        Self::Role(role.into())
    }

    /// Shorthand for [`Requirement::Capability`].
    pub fn capability(capability: impl Into<String>) -> Self {
        Self::Capability(capability.into())
    }

    /// Checks the requirement against `source`.
    pub fn check<S>(&self, source: &S) -> BastionResult<()>
    where
        S: PrincipalSource + ?Sized,
    {
        match self {
            Self::SignedIn => require_signed_in(source).map(|_| ()),
            Self::Role(role) => require_role(source, role),
            Self::AnyRole(roles) => require_any_role(source, roles),
            Self::AllRoles(roles) => require_all_roles(source, roles),
            Self::Capability(capability) => require_capability(source, capability),
            Self::AnyCapability(capabilities) => require_any_capability(source, capabilities),
            Self::AllCapabilities(capabilities) => require_all_capabilities(source, capabilities),
            Self::UserId(user_id) => require_user_id(source, user_id),
            Self::All(requirements) => {
                require_signed_in(source)?;
                requirements
                    .iter()
                    .try_for_each(|requirement| requirement.check(source))
            }
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignedIn => f.write_str("signed in"),
            Self::Role(role) => write!(f, "role {role}"),
            Self::AnyRole(roles) => write!(f, "any role of [{}]", roles.join(", ")),
            Self::AllRoles(roles) => write!(f, "all roles of [{}]", roles.join(", ")),
            Self::Capability(capability) => write!(f, "capability {capability}"),
            Self::AnyCapability(capabilities) => {
                write!(f, "any capability of [{}]", capabilities.join(", "))
            }
            Self::AllCapabilities(capabilities) => {
                write!(f, "all capabilities of [{}]", capabilities.join(", "))
            }
            Self::UserId(user_id) => write!(f, "user {user_id}"),
            Self::All(requirements) => {
                let parts: Vec<String> = requirements.iter().map(ToString::to_string).collect();
                write!(f, "all of ({})", parts.join("; "))
            }
        }
    }
}

/// Runs `op` with the principal only if `requirement` holds.
///
/// # Example
///
/// ```
/// use bastion_authz::{guard, Requirement};
/// use bastion_core::Principal;
///
/// let principal = Principal::builder("u-1").role("admin").build();
/// let greeting = guard(&principal, &Requirement::role("admin"), |p| {
///     Ok(format!("hello {}", p.user_id()))
/// });
/// assert_eq!(greeting.unwrap(), "hello u-1");
/// ```
pub fn guard<S, T, F>(source: &S, requirement: &Requirement, op: F) -> BastionResult<T>
where
    S: PrincipalSource + ?Sized,
    F: FnOnce(&Principal) -> BastionResult<T>,
{
    requirement.check(source)?;
    op(require_signed_in(source)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::{BastionError, PrincipalContext};

    fn principal() -> Principal {
        Principal::builder("u-1")
            .roles(["reader"])
            .capabilities(["doc.read"])
            .build()
    }

    #[test]
    fn test_check_matches_gates() {
        let principal = principal();

        assert!(Requirement::SignedIn.check(&principal).is_ok());
        assert!(Requirement::role("reader").check(&principal).is_ok());
        assert!(Requirement::AnyRole(vec!["admin".into(), "reader".into()])
            .check(&principal)
            .is_ok());
        assert!(Requirement::AllRoles(vec!["admin".into(), "reader".into()])
            .check(&principal)
            .is_err());
        assert!(Requirement::capability("doc.read").check(&principal).is_ok());
        assert!(Requirement::UserId("u-2".into()).check(&principal).is_err());
    }

    #[test]
    fn test_all_checks_in_order() {
        let principal = principal();
        let requirement = Requirement::All(vec![
            Requirement::role("reader"),
            Requirement::capability("doc.delete"),
        ]);

        assert!(matches!(
            requirement.check(&principal),
            Err(BastionError::AuthorizationDenied { .. })
        ));
        assert!(matches!(
            Requirement::All(Vec::new()).check(&PrincipalContext::new()),
            Err(BastionError::AuthenticationRequired { .. })
        ));
    }

    #[test]
    fn test_guard_skips_op_when_denied() {
        let principal = principal();
        let mut ran = false;

        let result = guard(&principal, &Requirement::role("admin"), |_| {
            ran = true;
            Ok(())
        });

        assert!(result.is_err());
        assert!(!ran);
    }

    #[test]
    fn test_display() {
        let requirement = Requirement::All(vec![
            Requirement::role("admin"),
            Requirement::AnyCapability(vec!["a".into(), "b".into()]),
        ]);
        assert_eq!(
            requirement.to_string(),
            "all of (role admin; any capability of [a, b])"
        );
    }
}

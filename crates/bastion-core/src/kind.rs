//! Failure kinds and their ancestry.
//!
//! A [`FailureKind`] names a category of failure and optionally points at a
//! parent kind. The parent chain is what the classification registry walks
//! when no adapter is registered for the exact kind.
//!
//! Kinds are declared as statics so that ancestry links are `&'static`:
//!
//! ```
//! use bastion_core::{kinds, FailureKind};
//!
//! static PAYMENT_DECLINED: FailureKind = FailureKind::new("payment_declined", Some(&kinds::LOGIC));
//!
//! let names: Vec<_> = PAYMENT_DECLINED.ancestors().map(FailureKind::name).collect();
//! assert_eq!(names, vec!["logic", "error"]);
//! ```
//!
//! Kind names are registry keys and must be unique within a process.

use std::fmt;

/// A node in the failure-kind tree.
#[derive(Debug)]
pub struct FailureKind {
    name: &'static str,
    parent: Option<&'static FailureKind>,
}

impl FailureKind {
    /// Declares a kind with an optional parent.
    #[must_use]
    pub const fn new(name: &'static str, parent: Option<&'static FailureKind>) -> Self {
        Self { name, parent }
    }

    /// Declares a kind without a parent.
    #[must_use]
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// Returns the unique name of this kind.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the direct parent, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<&'static FailureKind> {
        self.parent
    }

    /// Iterates over the ancestors of this kind, nearest first.
    ///
    /// The kind itself is not included.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors {
            next: self.parent,
        }
    }

    /// Returns `true` if `self` is `other` or descends from it.
    #[must_use]
    pub fn is_a(&self, other: &FailureKind) -> bool {
        self == other || self.ancestors().any(|kind| kind == other)
    }
}

impl PartialEq for FailureKind {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for FailureKind {}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Iterator over a kind's ancestors. See [`FailureKind::ancestors`].
#[derive(Debug, Clone)]
pub struct Ancestors {
    next: Option<&'static FailureKind>,
}

impl Iterator for Ancestors {
    type Item = &'static FailureKind;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent;
        Some(current)
    }
}

/// Built-in failure kinds.
///
/// ```text
/// error
/// ├── logic
/// │   ├── invalid_request
/// │   ├── not_found
/// │   ├── authentication
/// │   │   ├── invalid_credential
/// │   │   └── authentication_required
/// │   └── authorization_denied
/// └── system
///     ├── internal
///     │   ├── internal_configuration
///     │   └── no_principal
///     └── external
///         └── external_timeout
/// ```
pub mod kinds {
    use super::FailureKind;

    /// Root of every built-in kind.
    pub static ERROR: FailureKind = FailureKind::root("error");

    /// Failures caused by the caller or by business rules.
    pub static LOGIC: FailureKind = FailureKind::new("logic", Some(&ERROR));

    /// Failures caused by the service or its dependencies.
    pub static SYSTEM: FailureKind = FailureKind::new("system", Some(&ERROR));

    /// Malformed or semantically invalid request.
    pub static INVALID_REQUEST: FailureKind = FailureKind::new("invalid_request", Some(&LOGIC));

    /// Requested resource does not exist.
    pub static NOT_FOUND: FailureKind = FailureKind::new("not_found", Some(&LOGIC));

    /// Parent of all authentication failures.
    pub static AUTHENTICATION: FailureKind = FailureKind::new("authentication", Some(&LOGIC));

    /// Bad, expired or unverifiable bearer credential.
    pub static INVALID_CREDENTIAL: FailureKind =
        FailureKind::new("invalid_credential", Some(&AUTHENTICATION));

    /// No principal where one is mandatory.
    pub static AUTHENTICATION_REQUIRED: FailureKind =
        FailureKind::new("authentication_required", Some(&AUTHENTICATION));

    /// Principal lacks a required role, capability or identity.
    pub static AUTHORIZATION_DENIED: FailureKind =
        FailureKind::new("authorization_denied", Some(&LOGIC));

    /// Unexpected internal failure.
    pub static INTERNAL: FailureKind = FailureKind::new("internal", Some(&SYSTEM));

    /// Missing or invalid required configuration.
    pub static INTERNAL_CONFIGURATION: FailureKind =
        FailureKind::new("internal_configuration", Some(&INTERNAL));

    /// Principal requested from an empty context.
    pub static NO_PRINCIPAL: FailureKind = FailureKind::new("no_principal", Some(&INTERNAL));

    /// A downstream service failed.
    pub static EXTERNAL: FailureKind = FailureKind::new("external", Some(&SYSTEM));

    /// A downstream service did not answer in time.
    pub static EXTERNAL_TIMEOUT: FailureKind =
        FailureKind::new("external_timeout", Some(&EXTERNAL));
}

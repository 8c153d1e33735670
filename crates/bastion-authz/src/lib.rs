//! # Bastion Authz
//!
//! Role and capability gates over the current [`Principal`](bastion_core::Principal).
//!
//! ```text
//!      PrincipalSource ──▶ require_signed_in ──none──▶ AuthenticationRequired
//!                                │
//!                                ▼
//!              role / capability / identity gate ──no──▶ AuthorizationDenied
//!                                │
//!                               ok
//! ```
//!
//! - Free functions ([`require_any_role`], [`require_all_capabilities`], ...)
//!   check the principal held by any [`PrincipalSource`]
//! - [`AppGate`] adds checks bound to the application this service runs as
//! - [`Requirement`] and [`guard`] declare an operation's needs as data
//!
//! Gates never mutate the principal or the context they read from.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod gate;
mod requirement;

pub use gate::{
    is_same_user, is_same_user_id, require_all_capabilities, require_all_roles,
    require_any_capability, require_any_role, require_capability, require_role,
    require_signed_in, require_user_id, AppGate, PrincipalSource,
};
pub use requirement::{guard, Requirement};

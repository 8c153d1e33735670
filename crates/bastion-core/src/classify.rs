//! Failure classification.
//!
//! The [`ErrorRegistry`] maps a [`FailureKind`] to an [`ErrorAdapter`]: a stable
//! numeric code, a client-safe default message and an optional HTTP status hint.
//!
//! Resolution order for a kind:
//!
//! 1. an entry for the exact kind,
//! 2. the nearest ancestor with a registered entry,
//! 3. the registered fallback adapter,
//! 4. the built-in generic adapter (code 690).
//!
//! Whatever steps 2-4 find is memoized under the exact kind. Classification
//! never fails and never panics.
//!
//! # Example
//!
//! ```
//! use bastion_core::{kinds, BastionError, ErrorAdapter, ErrorRegistry};
//!
//! let registry = ErrorRegistry::with_defaults();
//! let classification = registry.describe(&BastionError::authorization_denied("missing role admin"));
//! assert_eq!(classification.code, 320);
//! assert_eq!(classification.message, "The request was understood, but it has been refused.");
//!
//! registry.register(ErrorAdapter::new("denied", 403_001, "Not allowed."), &[&kinds::AUTHORIZATION_DENIED]);
//! assert_eq!(registry.classify(&kinds::AUTHORIZATION_DENIED).code(), 403_001);
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use http::StatusCode;
use parking_lot::RwLock;
use tracing::debug;

use crate::context::RequestId;
use crate::error::{BastionError, ErrorDetail, ErrorEnvelope, ExternalDetail, Failure};
use crate::kind::{kinds, FailureKind};

/// Extracts downstream code/message from a failure.
pub type ExternalExtractor = Arc<dyn Fn(&dyn Failure) -> Option<ExternalDetail> + Send + Sync>;

type FailureDowncast = for<'a> fn(&'a (dyn StdError + 'static)) -> Option<&'a dyn Failure>;

/// Code of the built-in generic adapter.
pub const UNKNOWN_ERROR_CODE: u32 = 690;

/// Message of the built-in generic adapter.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

/// A classification record: stable code, default message, optional status hint.
#[derive(Clone)]
pub struct ErrorAdapter {
    name: String,
    code: u32,
    message: String,
    status: Option<StatusCode>,
    external: Option<ExternalExtractor>,
}

impl ErrorAdapter {
    /// Creates an adapter without status hint or external extraction.
    #[must_use]
    pub fn new(name: impl Into<String>, code: u32, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code,
            message: message.into(),
            status: None,
            external: None,
        }
    }

    /// Sets the HTTP status hint.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Reports the failure's own [`Failure::external_detail`].
    #[must_use]
    pub fn with_external_detail(self) -> Self {
        self.with_external_extractor(|failure: &dyn Failure| failure.external_detail())
    }

    /// Reports downstream code/message using a custom extractor.
    #[must_use]
    pub fn with_external_extractor<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&dyn Failure) -> Option<ExternalDetail> + Send + Sync + 'static,
    {
        self.external = Some(Arc::new(extractor));
        self
    }

    /// Returns the adapter name, used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stable error code.
    #[must_use]
    pub const fn code(&self) -> u32 {
        self.code
    }

    /// Returns the default client message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status hint, if any.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Describes a failure using this adapter.
    ///
    /// The failure's own client message, when it carries one, replaces the
    /// default message.
    #[must_use]
    pub fn describe(&self, failure: &dyn Failure) -> Classification {
        Classification {
            adapter: self.name.clone(),
            code: self.code,
            message: failure
                .client_message()
                .map_or_else(|| self.message.clone(), ToString::to_string),
            status: self.status_or_default(),
            external: self.external.as_ref().and_then(|extract| extract(failure)),
        }
    }

    /// Describes an error that is not a [`Failure`]: default message, no
    /// external detail.
    #[must_use]
    pub fn describe_opaque(&self) -> Classification {
        Classification {
            adapter: self.name.clone(),
            code: self.code,
            message: self.message.clone(),
            status: self.status_or_default(),
            external: None,
        }
    }

    fn status_or_default(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Debug for ErrorAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorAdapter")
            .field("name", &self.name)
            .field("code", &self.code)
            .field("message", &self.message)
            .field("status", &self.status)
            .field("external", &self.external.is_some())
            .finish()
    }
}

/// The client-facing outcome of classifying a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Name of the adapter that matched.
    pub adapter: String,
    /// Stable error code.
    pub code: u32,
    /// Client-safe message.
    pub message: String,
    /// HTTP status (adapter hint, else 500).
    pub status: StatusCode,
    /// Downstream code/message, for failures wrapping a third-party error.
    pub external: Option<ExternalDetail>,
}

impl Classification {
    /// Builds the client-safe error envelope.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<RequestId>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.code,
                message: self.message.clone(),
                external: self.external.clone(),
            },
            request_id: request_id.map(|id| id.to_string()),
        }
    }
}

/// How a registry entry came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Registered with [`ErrorRegistry::register`].
    Explicit,
    /// Registered with [`ErrorRegistry::register_default`].
    Default,
    /// Filled by an ancestry or fallback lookup.
    Memoized {
        /// Registration generation the lookup observed.
        generation: u64,
    },
}

#[derive(Clone)]
struct Entry {
    adapter: Arc<ErrorAdapter>,
    provenance: Provenance,
}

impl Entry {
    const fn is_registered(&self) -> bool {
        !matches!(self.provenance, Provenance::Memoized { .. })
    }

    const fn is_valid_at(&self, generation: u64) -> bool {
        match self.provenance {
            Provenance::Memoized { generation: seen } => seen == generation,
            Provenance::Explicit | Provenance::Default => true,
        }
    }
}

/// Registry of error adapters keyed by failure kind.
///
/// Safe for concurrent classification and registration.
pub struct ErrorRegistry {
    entries: DashMap<&'static str, Entry>,
    fallback: RwLock<Option<Arc<ErrorAdapter>>>,
    generic: Arc<ErrorAdapter>,
    generation: AtomicU64,
    failure_types: RwLock<Vec<FailureDowncast>>,
}

impl ErrorRegistry {
    /// Creates a registry with no registrations.
    ///
    /// Every kind resolves to the built-in generic adapter until something is
    /// registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            fallback: RwLock::new(None),
            generic: Arc::new(
                ErrorAdapter::new("unknown", UNKNOWN_ERROR_CODE, UNKNOWN_ERROR_MESSAGE)
                    .with_status(StatusCode::INTERNAL_SERVER_ERROR),
            ),
            generation: AtomicU64::new(0),
            failure_types: RwLock::new(Vec::new()),
        }
    }

    /// Creates a registry with default adapters for every built-in kind.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for (adapter, kind) in default_adapters() {
            registry.register_default(adapter, &[kind]);
        }
        registry
    }

    /// Returns the process-wide registry, preloaded with defaults.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<ErrorRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::with_defaults)
    }

    /// Registers `adapter` for each kind, replacing any existing entry.
    pub fn register(&self, adapter: ErrorAdapter, kinds: &[&'static FailureKind]) {
        let adapter = Arc::new(adapter);
        for kind in kinds {
            self.entries.insert(
                kind.name(),
                Entry {
                    adapter: Arc::clone(&adapter),
                    provenance: Provenance::Explicit,
                },
            );
        }
        self.bump_generation();
    }

    /// Registers `adapter` for each kind that has no explicit or default entry.
    ///
    /// The first default registered for a kind is kept.
    pub fn register_default(&self, adapter: ErrorAdapter, kinds: &[&'static FailureKind]) {
        let adapter = Arc::new(adapter);
        for kind in kinds {
            let entry = Entry {
                adapter: Arc::clone(&adapter),
                provenance: Provenance::Default,
            };
            match self.entries.entry(kind.name()) {
                MapEntry::Vacant(vacant) => {
                    vacant.insert(entry);
                }
                MapEntry::Occupied(mut occupied) => {
                    if !occupied.get().is_registered() {
                        occupied.insert(entry);
                    }
                }
            }
        }
        self.bump_generation();
    }

    /// Sets the fallback adapter. The last call wins.
    pub fn register_fallback(&self, adapter: ErrorAdapter) {
        *self.fallback.write() = Some(Arc::new(adapter));
        self.bump_generation();
    }

    /// Resolves the adapter for a kind.
    pub fn classify(&self, kind: &'static FailureKind) -> Arc<ErrorAdapter> {
        let generation = self.generation.load(Ordering::SeqCst);

        if let Some(entry) = self.entries.get(kind.name()) {
            if entry.is_valid_at(generation) {
                return Arc::clone(&entry.adapter);
            }
        }

        let resolved = self
            .nearest_registered_ancestor(kind)
            .or_else(|| self.fallback.read().clone())
            .unwrap_or_else(|| Arc::clone(&self.generic));

        self.memoize(kind, &resolved, generation);
        resolved
    }

    /// Classifies a failure and describes it for the client.
    #[must_use]
    pub fn describe(&self, failure: &dyn Failure) -> Classification {
        self.classify(failure.kind()).describe(failure)
    }

    /// Lets [`classify_error`](Self::classify_error) recognize `F` inside a
    /// `source()` chain.
    ///
    /// [`BastionError`] is always recognized.
    pub fn register_failure_type<F: Failure>(&self) {
        self.failure_types
            .write()
            .push(|error| error.downcast_ref::<F>().map(|failure| failure as &dyn Failure));
    }

    /// Classifies an arbitrary error.
    ///
    /// The `source()` chain is searched, outermost first, for a [`BastionError`]
    /// or a type added with [`register_failure_type`](Self::register_failure_type).
    /// Other [`Failure`] types are not recognized. Errors that carry none resolve
    /// to the fallback, else the generic adapter.
    #[must_use]
    pub fn classify_error(&self, error: &(dyn StdError + 'static)) -> Classification {
        let failure_types = self.failure_types.read().clone();
        let failure = std::iter::successors(Some(error), |&current| current.source()).find_map(
            |current| {
                current
                    .downcast_ref::<BastionError>()
                    .map(|failure| failure as &dyn Failure)
                    .or_else(|| failure_types.iter().find_map(|downcast| downcast(current)))
            },
        );

        match failure {
            Some(failure) => self.describe(failure),
            None => self.fallback_adapter().describe_opaque(),
        }
    }

    /// Returns how the entry for `kind` was created, if one exists.
    #[must_use]
    pub fn provenance(&self, kind: &FailureKind) -> Option<Provenance> {
        self.entries.get(kind.name()).map(|entry| entry.provenance)
    }

    /// Returns the fallback adapter, or the built-in generic adapter.
    #[must_use]
    pub fn fallback_adapter(&self) -> Arc<ErrorAdapter> {
        self.fallback
            .read()
            .clone()
            .unwrap_or_else(|| Arc::clone(&self.generic))
    }

    fn nearest_registered_ancestor(&self, kind: &FailureKind) -> Option<Arc<ErrorAdapter>> {
        kind.ancestors().find_map(|ancestor| {
            self.entries
                .get(ancestor.name())
                .filter(|entry| entry.is_registered())
                .map(|entry| Arc::clone(&entry.adapter))
        })
    }

    fn memoize(&self, kind: &'static FailureKind, adapter: &Arc<ErrorAdapter>, generation: u64) {
        let entry = Entry {
            adapter: Arc::clone(adapter),
            provenance: Provenance::Memoized { generation },
        };
        match self.entries.entry(kind.name()) {
            MapEntry::Vacant(vacant) => {
                vacant.insert(entry);
            }
            MapEntry::Occupied(mut occupied) => {
                // Never overwrite a registration made since the lookup started.
                if occupied.get().is_registered() {
                    return;
                }
                occupied.insert(entry);
            }
        }
        debug!(kind = %kind, adapter = %adapter.name(), "Memoized error adapter");
    }

    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for ErrorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ErrorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorRegistry")
            .field("entries", &self.entries.len())
            .field("fallback", &self.fallback.read().is_some())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

fn default_adapters() -> Vec<(ErrorAdapter, &'static FailureKind)> {
    vec![
        (
            ErrorAdapter::new(
                "invalid_request",
                100,
                "The request was invalid or cannot be served.",
            )
            .with_status(StatusCode::BAD_REQUEST),
            &kinds::INVALID_REQUEST,
        ),
        (
            ErrorAdapter::new(
                "not_found",
                110,
                "The URI requested is invalid or the resource does not exist.",
            )
            .with_status(StatusCode::NOT_FOUND),
            &kinds::NOT_FOUND,
        ),
        (
            ErrorAdapter::new("authentication", 300, "Failed to authorize user.")
                .with_status(StatusCode::UNAUTHORIZED),
            &kinds::AUTHENTICATION,
        ),
        (
            ErrorAdapter::new("invalid_credential", 310, "Missing or incorrect credentials.")
                .with_status(StatusCode::UNAUTHORIZED),
            &kinds::INVALID_CREDENTIAL,
        ),
        (
            ErrorAdapter::new(
                "authorization_denied",
                320,
                "The request was understood, but it has been refused.",
            )
            .with_status(StatusCode::FORBIDDEN),
            &kinds::AUTHORIZATION_DENIED,
        ),
        (
            ErrorAdapter::new(
                "external",
                510,
                "An error occurred on an external server while processing your request.",
            )
            .with_status(StatusCode::BAD_GATEWAY)
            .with_external_detail(),
            &kinds::EXTERNAL,
        ),
        (
            ErrorAdapter::new(
                "external_timeout",
                530,
                "A timeout occurred while connecting to an external server while processing your request.",
            )
            .with_status(StatusCode::GATEWAY_TIMEOUT)
            .with_external_detail(),
            &kinds::EXTERNAL_TIMEOUT,
        ),
        (
            ErrorAdapter::new("internal", 610, "An internal server error occurred.")
                .with_status(StatusCode::INTERNAL_SERVER_ERROR),
            &kinds::INTERNAL,
        ),
    ]
}

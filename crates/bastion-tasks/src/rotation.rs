//! Self-rescheduling secret rotation.
//!
//! Each cycle fetches the latest secret material from the identity service
//! and installs it into the [`CredentialVerifier`]:
//!
//! ```text
//! fetch ──ok──────────────────────▶ install, next run after the validity window
//!   │
//!   └─fail─▶ fetch again ──ok─────▶ install, next run after the validity window
//!                 │
//!                 └─fail──────────▶ next run after the retry backoff (30s)
//! ```
//!
//! Failures never leave the loop. The verifier keeps its last installed state
//! until a later cycle succeeds. A disabled loop never schedules anything, and
//! a loop only ever runs once: later `run` or `spawn` calls are no-ops.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bastion_identity::CredentialVerifier;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::client::IdentityService;
use crate::error::{RotationError, RotationResult};
use crate::signing::RequestSigner;

/// Fetch attempts per cycle: the first try plus one immediate retry.
const ATTEMPTS_PER_CYCLE: u32 = 2;

/// Configuration for the rotation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationConfig {
    /// When `false` the loop never runs.
    pub enabled: bool,
    /// Upper bound on one fetch.
    pub fetch_timeout: Duration,
    /// Delay before the next cycle after both attempts failed.
    pub retry_backoff: Duration,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fetch_timeout: Duration::from_secs(10),
            retry_backoff: Duration::from_secs(30),
        }
    }
}

impl RotationConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a disabled configuration.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set the fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the retry backoff.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}

/// Result of one rotation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// New material was installed.
    Installed {
        /// Delay until the next cycle.
        next_run: Duration,
    },
    /// Both attempts failed; the installed state is unchanged.
    Backoff {
        /// Delay until the next cycle.
        next_run: Duration,
    },
}

impl CycleOutcome {
    /// Delay until the next cycle.
    pub const fn next_run(&self) -> Duration {
        match self {
            Self::Installed { next_run } | Self::Backoff { next_run } => *next_run,
        }
    }
}

/// Counters for the rotation loop.
#[derive(Debug, Default)]
pub struct RotationStats {
    cycles: AtomicU64,
    installs: AtomicU64,
    failed_attempts: AtomicU64,
    last_installed_at: RwLock<Option<DateTime<Utc>>>,
}

impl RotationStats {
    /// Cycles run so far.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Successful installs so far.
    pub fn installs(&self) -> u64 {
        self.installs.load(Ordering::Relaxed)
    }

    /// Failed fetch or install attempts so far.
    pub fn failed_attempts(&self) -> u64 {
        self.failed_attempts.load(Ordering::Relaxed)
    }

    /// When material was last installed.
    pub fn last_installed_at(&self) -> Option<DateTime<Utc>> {
        *self.last_installed_at.read()
    }
}

/// Keeps a [`CredentialVerifier`] supplied with current secret material.
pub struct SecretRotationLoop {
    config: RotationConfig,
    signer: RequestSigner,
    service: Arc<dyn IdentityService>,
    verifier: Arc<CredentialVerifier>,
    stats: Arc<RotationStats>,
    started: AtomicBool,
}

impl SecretRotationLoop {
    /// Creates a rotation loop.
    pub fn new(
        config: RotationConfig,
        signer: RequestSigner,
        service: Arc<dyn IdentityService>,
        verifier: Arc<CredentialVerifier>,
    ) -> Self {
        Self {
            config,
            signer,
            service,
            verifier,
            stats: Arc::new(RotationStats::default()),
            started: AtomicBool::new(false),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    /// Returns the counters.
    pub fn stats(&self) -> Arc<RotationStats> {
        Arc::clone(&self.stats)
    }

    /// Runs one cycle: fetch, retry once on failure, install.
    pub async fn run_cycle(&self) -> CycleOutcome {
        self.stats.cycles.fetch_add(1, Ordering::Relaxed);

        for attempt in 1..=ATTEMPTS_PER_CYCLE {
            match self.attempt().await {
                Ok(validity_window) => {
                    self.stats.installs.fetch_add(1, Ordering::Relaxed);
                    *self.stats.last_installed_at.write() = Some(Utc::now());

                    let next_run = if validity_window.is_zero() {
                        warn!(
                            backoff_ms = duration_ms(self.config.retry_backoff),
                            "Identity service reported an empty validity window"
                        );
                        self.config.retry_backoff
                    } else {
                        validity_window
                    };

                    info!(
                        attempt,
                        app_name = %self.signer.app_name(),
                        next_run_ms = duration_ms(next_run),
                        "Rotated signing secret"
                    );
                    return CycleOutcome::Installed { next_run };
                }
                Err(e) => {
                    self.stats.failed_attempts.fetch_add(1, Ordering::Relaxed);
                    warn!(attempt, error = %e, "Secret rotation attempt failed");
                    if !e.should_retry() {
                        break;
                    }
                }
            }
        }

        error!(
            app_name = %self.signer.app_name(),
            backoff_ms = duration_ms(self.config.retry_backoff),
            "Secret rotation failed, keeping current key material"
        );
        CycleOutcome::Backoff {
            next_run: self.config.retry_backoff,
        }
    }

    /// Returns `true` once the loop has been started by `run` or `spawn`.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Runs cycles forever, sleeping between them as each outcome dictates.
    ///
    /// Returns immediately when the loop is disabled or already running.
    pub async fn run(&self) {
        if self.try_start() {
            self.run_loop().await;
        }
    }

    /// Spawns the loop on the current Tokio runtime.
    ///
    /// Returns `None` when the loop is disabled or already running; nothing
    /// is scheduled then.
    pub fn spawn(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.try_start() {
            return None;
        }

        info!(app_name = %self.signer.app_name(), "Starting secret rotation loop");
        Some(tokio::spawn(async move { self.run_loop().await }))
    }

    fn try_start(&self) -> bool {
        if !self.config.enabled {
            warn!("Secret rotation is disabled, not scheduling");
            return false;
        }
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(
                app_name = %self.signer.app_name(),
                "Secret rotation loop is already running, not scheduling another"
            );
            return false;
        }
        true
    }

    async fn run_loop(&self) {
        loop {
            let outcome = self.run_cycle().await;
            debug!(?outcome, "Secret rotation cycle finished");
            tokio::time::sleep(outcome.next_run()).await;
        }
    }

    async fn attempt(&self) -> RotationResult<Duration> {
        let request = self.signer.sign()?;
        let material = tokio::time::timeout(
            self.config.fetch_timeout,
            self.service.fetch_latest_secret(&request),
        )
        .await
        .map_err(|_| RotationError::timeout(self.config.fetch_timeout))?
        .map_err(RotationError::Fetch)?;

        self.verifier
            .install(&material)
            .map_err(RotationError::Install)?;
        Ok(material.validity_window())
    }
}

impl std::fmt::Debug for SecretRotationLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretRotationLoop")
            .field("config", &self.config)
            .field("signer", &self.signer)
            .field("stats", &self.stats)
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

use crate::duration::serde_duration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ProbeKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProbeKind {
    /// Run a command; exit code 0 means the unit is ready.
    Command { argv: Vec<String> },
    /// GET a URL; any 2xx status means the unit is ready (the `curl -f`
    /// contract).
    Http { url: String },
}

// ---------------------------------------------------------------------------
// HealthCheck
// ---------------------------------------------------------------------------

/// A unit's readiness/liveness descriptor.
///
/// The same descriptor serves two roles: the startup gate (dependents wait
/// until one probe passes within the retry budget) and the post-start
/// monitor (periodic liveness reporting).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthCheck {
    pub probe: ProbeKind,
    /// Spacing between attempts.
    #[serde(default = "default_interval", with = "serde_duration")]
    pub interval: Duration,
    /// Bound on a single attempt. A timed-out probe is a failed attempt,
    /// not an error.
    #[serde(default = "default_timeout", with = "serde_duration")]
    pub timeout: Duration,
    /// Total attempt budget. `1` means a single attempt; attempts are
    /// 1-indexed in `ProbeResult.attempt`.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Grace period before the first attempt.
    #[serde(default = "default_start_period", with = "serde_duration")]
    pub start_period: Duration,
}

fn default_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_retries() -> u32 {
    3
}

fn default_start_period() -> Duration {
    Duration::ZERO
}

// ---------------------------------------------------------------------------
// HealthState / ProbeResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// Within the start grace period, or no probe has completed yet.
    Starting,
    Healthy,
    Unhealthy,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Starting => "starting",
            HealthState::Healthy => "healthy",
            HealthState::Unhealthy => "unhealthy",
        }
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub passed: bool,
    pub output: String,
    /// 1-indexed attempt number within the retry budget.
    pub attempt: u32,
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

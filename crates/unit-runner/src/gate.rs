use crate::error::{Result, RunnerError};
use crate::probe::run_probe;
use slipway_core::{HealthCheck, ProbeResult};
use tracing::{debug, info};

/// Block until the unit's probe passes or the retry budget is exhausted.
///
/// Waits out `start_period` first, then runs up to `retries` attempts
/// spaced by `interval`. Returns the passing attempt (1-indexed) or
/// [`RunnerError::ProbeExhausted`]. Exhaustion is a hard failure: the
/// caller must not start dependents gated on this unit.
pub async fn await_healthy(
    unit: &str,
    check: &HealthCheck,
    client: &reqwest::Client,
) -> Result<ProbeResult> {
    if !check.start_period.is_zero() {
        debug!(unit, period = ?check.start_period, "waiting out start period");
        tokio::time::sleep(check.start_period).await;
    }

    let budget = check.retries.max(1);
    for attempt in 1..=budget {
        let outcome = run_probe(&check.probe, check.timeout, client).await;
        if outcome.passed {
            info!(unit, attempt, "readiness gate passed");
            return Ok(ProbeResult {
                passed: true,
                output: outcome.output,
                attempt,
                duration_ms: outcome.duration.as_millis() as u64,
            });
        }
        debug!(unit, attempt, output = %outcome.output, "probe attempt failed");
        if attempt < budget {
            tokio::time::sleep(check.interval).await;
        }
    }

    Err(RunnerError::ProbeExhausted {
        unit: unit.to_string(),
        attempts: budget,
    })
}

/// One post-start monitor pass: run a single probe attempt and report
/// whether it passed. The supervisor counts consecutive failures against
/// the retry budget; the monitor itself never restarts anything.
pub async fn monitor_probe(check: &HealthCheck, client: &reqwest::Client) -> (bool, String) {
    let outcome = run_probe(&check.probe, check.timeout, client).await;
    (outcome.passed, outcome.output)
}

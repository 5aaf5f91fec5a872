use slipway_core::ProbeKind;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Result of one probe attempt. A timeout or transport error is a failed
/// attempt, not a hard error: the caller owns the retry budget.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub passed: bool,
    pub output: String,
    pub duration: Duration,
}

/// Run one probe attempt, bounded by `timeout`.
pub async fn run_probe(
    kind: &ProbeKind,
    timeout: Duration,
    client: &reqwest::Client,
) -> ProbeOutcome {
    let start = Instant::now();
    let (passed, output) = match kind {
        ProbeKind::Command { argv } => run_command(argv, timeout).await,
        ProbeKind::Http { url } => run_http(url, timeout, client).await,
    };
    ProbeOutcome {
        passed,
        output,
        duration: start.elapsed(),
    }
}

async fn run_command(argv: &[String], timeout: Duration) -> (bool, String) {
    let Some((program, args)) = argv.split_first() else {
        return (false, "empty probe command".to_string());
    };
    let run = Command::new(program).args(args).output();
    match tokio::time::timeout(timeout, run).await {
        Ok(Ok(out)) => {
            let text = if out.status.success() {
                String::from_utf8_lossy(&out.stdout).trim().to_string()
            } else {
                String::from_utf8_lossy(&out.stderr).trim().to_string()
            };
            (out.status.success(), text)
        }
        Ok(Err(e)) => (false, format!("failed to run '{program}': {e}")),
        Err(_) => (false, format!("probe timed out after {timeout:?}")),
    }
}

/// Any 2xx status passes; anything else fails. Matches the `curl -f`
/// contract the stack file format documents.
async fn run_http(url: &str, timeout: Duration, client: &reqwest::Client) -> (bool, String) {
    match client.get(url).timeout(timeout).send().await {
        Ok(response) => {
            let status = response.status();
            (status.is_success(), format!("GET {url} -> {status}"))
        }
        Err(e) if e.is_timeout() => (false, format!("probe timed out after {timeout:?}")),
        Err(e) => (false, format!("GET {url} failed: {e}")),
    }
}

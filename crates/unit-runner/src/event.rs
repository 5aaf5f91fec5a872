use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// Lifecycle and log events fanned out to CLI output and SSE subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StackEvent {
    UnitStarting {
        unit: String,
    },
    UnitStarted {
        unit: String,
        pid: u32,
    },
    /// The unit's readiness gate passed on the given 1-indexed attempt.
    UnitHealthy {
        unit: String,
        attempt: u32,
    },
    /// The post-start monitor saw the retry budget of consecutive failures.
    UnitUnhealthy {
        unit: String,
        output: String,
    },
    /// Never launched because an upstream gate failed.
    UnitBlocked {
        unit: String,
        reason: String,
    },
    UnitExited {
        unit: String,
        exit_code: i32,
        duration_seconds: f64,
    },
    Log {
        unit: String,
        stream: LogStream,
        line: String,
    },
    /// Every unit has started and every gated unit passed its gate.
    StackReady,
    StackStopped,
}

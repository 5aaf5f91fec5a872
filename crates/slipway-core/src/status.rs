use crate::error::{Result, SlipwayError};
use crate::health::HealthState;
use crate::io::atomic_write;
use crate::paths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// Unit state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    /// Not yet launched.
    Pending,
    /// Launched, readiness gate still in progress.
    Starting,
    Running,
    Exited,
    /// Never launched because an upstream gate failed.
    Blocked,
}

impl UnitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitState::Pending => "pending",
            UnitState::Starting => "starting",
            UnitState::Running => "running",
            UnitState::Exited => "exited",
            UnitState::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStatus {
    pub name: String,
    pub state: UnitState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl UnitStatus {
    pub fn pending(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: UnitState::Pending,
            health: None,
            pid: None,
            exit_code: None,
            started_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackStatus {
    pub name: String,
    pub units: Vec<UnitStatus>,
}

// ---------------------------------------------------------------------------
// Runtime record
// ---------------------------------------------------------------------------

/// Persistent record of a running stack, written by `up` and consumed by
/// `down`/`ps` in later invocations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeRecord {
    pub stack: String,
    pub started_at: Option<DateTime<Utc>>,
    /// Unit name -> host pid, in start order.
    #[serde(default)]
    pub pids: BTreeMap<String, u32>,
}

impl RuntimeRecord {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::runtime_file(root);
        if !path.exists() {
            return Err(SlipwayError::NotRunning);
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let raw = serde_yaml::to_string(self)?;
        atomic_write(&paths::runtime_file(root), &raw)
    }

    pub fn remove(root: &Path) -> Result<()> {
        let path = paths::runtime_file(root);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Process liveness (unix)
// ---------------------------------------------------------------------------

/// Whether a pid refers to a live process (`kill -0` semantics).
#[cfg(unix)]
pub fn is_pid_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

/// Send SIGTERM to a pid. Errors from already-dead processes are ignored.
#[cfg(unix)]
pub fn signal_stop(pid: u32) {
    let _ = std::process::Command::new("kill")
        .arg(pid.to_string())
        .output();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

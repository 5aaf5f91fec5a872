use crate::error::Result;
use crate::event::StackEvent;
use crate::gate::{await_healthy, monitor_probe};
use crate::process::{launch_argv, spawn_unit, LaunchSpec, UnitHandle};
use chrono::Utc;
use slipway_core::resource::VolumeStore;
use slipway_core::unit::DependsCondition;
use slipway_core::{
    graph, HealthState, ProbeResult, SlipwayError, StackConfig, StackStatus, UnitState, UnitStatus,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

const STOP_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

/// Owns a stack's processes for the lifetime of an `up`. Launches units in
/// dependency order, holds gated dependents until upstream readiness probes
/// pass, and keeps a live status registry that the HTTP API reads.
pub struct Supervisor {
    stack: StackConfig,
    root: PathBuf,
    volumes: VolumeStore,
    registry: Arc<RwLock<BTreeMap<String, UnitStatus>>>,
    event_tx: broadcast::Sender<StackEvent>,
    handles: Mutex<Vec<UnitHandle>>,
    monitors: Mutex<Vec<tokio::task::JoinHandle<()>>>,
    client: reqwest::Client,
}

/// What `up` accomplished: the passing gate result per health-gated unit.
#[derive(Debug, Default)]
pub struct UpReport {
    pub gates: Vec<(String, ProbeResult)>,
}

impl Supervisor {
    pub fn new(stack: StackConfig, root: &Path) -> Self {
        let (event_tx, _) = broadcast::channel(1024);
        let registry: BTreeMap<String, UnitStatus> = stack
            .units
            .keys()
            .map(|name| (name.clone(), UnitStatus::pending(name)))
            .collect();
        let supervisor = Self {
            volumes: VolumeStore::new(root),
            root: root.to_path_buf(),
            registry: Arc::new(RwLock::new(registry)),
            event_tx,
            handles: Mutex::new(Vec::new()),
            monitors: Mutex::new(Vec::new()),
            client: reqwest::Client::new(),
            stack,
        };
        supervisor.spawn_exit_bookkeeper();
        supervisor
    }

    pub fn stack(&self) -> &StackConfig {
        &self.stack
    }

    /// Subscribe to lifecycle and log events.
    pub fn subscribe(&self) -> broadcast::Receiver<StackEvent> {
        self.event_tx.subscribe()
    }

    // -----------------------------------------------------------------------
    // up
    // -----------------------------------------------------------------------

    /// Launch the whole stack. Units start in dependency order; a unit with
    /// a `unit_healthy` dependency is held until the upstream gate passes.
    /// A failed gate blocks the dependent and everything downstream of the
    /// failed unit, and `up` returns the gate error. A health check that no
    /// other unit gates on is report-only: its exhaustion marks the unit
    /// unhealthy without failing the stack.
    pub async fn up(&self) -> Result<UpReport> {
        let order = graph::start_order(&self.stack)?;
        let volume_paths = self.ensure_volumes()?;
        let mut report = UpReport::default();
        // Units whose readiness gate has already passed this run.
        let mut verified: BTreeSet<String> = BTreeSet::new();

        for name in &order {
            let unit = self.stack.unit(name)?;
            for (dep, depends) in &unit.depends_on {
                if depends.condition != DependsCondition::UnitHealthy || verified.contains(dep) {
                    continue;
                }
                let check = match &self.stack.unit(dep)?.healthcheck {
                    Some(check) => check.clone(),
                    // Gating on a unit without a healthcheck degrades to
                    // unit_started, which already held by start order.
                    None => {
                        verified.insert(dep.clone());
                        continue;
                    }
                };
                match await_healthy(dep, &check, &self.client).await {
                    Ok(result) => {
                        self.set_health(dep, HealthState::Healthy);
                        let _ = self.event_tx.send(StackEvent::UnitHealthy {
                            unit: dep.clone(),
                            attempt: result.attempt,
                        });
                        report.gates.push((dep.clone(), result));
                        verified.insert(dep.clone());
                    }
                    Err(err) => {
                        self.set_health(dep, HealthState::Unhealthy);
                        self.block_downstream_of(dep, &err.to_string());
                        return Err(err);
                    }
                }
            }

            let spec = self.launch_spec(name, unit, &volume_paths)?;
            let _ = self.event_tx.send(StackEvent::UnitStarting { unit: name.clone() });
            let handle = spawn_unit(spec, self.event_tx.clone())?;
            info!(unit = %name, pid = handle.pid, "unit started");
            let _ = self.event_tx.send(StackEvent::UnitStarted {
                unit: name.clone(),
                pid: handle.pid,
            });
            {
                let mut registry = self.registry.write().unwrap();
                let status = registry.get_mut(name).unwrap();
                status.state = UnitState::Running;
                status.pid = Some(handle.pid);
                status.started_at = Some(Utc::now());
                status.health = unit.healthcheck.as_ref().map(|_| HealthState::Starting);
            }
            self.handles.lock().unwrap().push(handle);
        }

        // Readiness checks for units nothing gates on still run, feeding
        // the report and the status registry before monitors take over.
        // Exhaustion here is report-only: it flips the unit to unhealthy
        // but never fails the stack, since no dependent is waiting.
        for name in &order {
            let Some(check) = self.stack.unit(name)?.healthcheck.clone() else {
                continue;
            };
            if !verified.contains(name) {
                match await_healthy(name, &check, &self.client).await {
                    Ok(result) => {
                        self.set_health(name, HealthState::Healthy);
                        let _ = self.event_tx.send(StackEvent::UnitHealthy {
                            unit: name.clone(),
                            attempt: result.attempt,
                        });
                        report.gates.push((name.clone(), result));
                    }
                    Err(err) => {
                        warn!(unit = %name, "readiness probe exhausted; unit marked unhealthy");
                        self.set_health(name, HealthState::Unhealthy);
                        let _ = self.event_tx.send(StackEvent::UnitUnhealthy {
                            unit: name.clone(),
                            output: err.to_string(),
                        });
                    }
                }
            }
            self.spawn_monitor(name.clone(), check);
        }

        let _ = self.event_tx.send(StackEvent::StackReady);
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // down
    // -----------------------------------------------------------------------

    /// Stop every unit in reverse start order. Named volumes survive unless
    /// `remove_volumes` is set; external volumes are never touched.
    pub async fn down(&self, remove_volumes: bool) -> Result<()> {
        for task in self.monitors.lock().unwrap().drain(..) {
            task.abort();
        }

        let mut handles: Vec<UnitHandle> = self.handles.lock().unwrap().drain(..).collect();
        for handle in handles.iter_mut().rev() {
            info!(unit = %handle.name, "stopping unit");
            handle.signal_stop();
            handle.wait_stopped(STOP_TIMEOUT).await;
            let mut registry = self.registry.write().unwrap();
            if let Some(status) = registry.get_mut(&handle.name) {
                status.state = UnitState::Exited;
                status.pid = None;
            }
        }

        if remove_volumes {
            for (name, volume) in &self.stack.volumes {
                if volume.external {
                    continue;
                }
                self.volumes.remove(name)?;
                info!(volume = %name, "volume removed");
            }
        }

        let _ = self.event_tx.send(StackEvent::StackStopped);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // status
    // -----------------------------------------------------------------------

    /// Snapshot of every unit's status, in start order.
    pub fn status(&self) -> Result<StackStatus> {
        let order = graph::start_order(&self.stack)?;
        let registry = self.registry.read().unwrap();
        Ok(StackStatus {
            name: self.stack.name.clone(),
            units: order
                .iter()
                .map(|name| registry.get(name).cloned().unwrap_or_else(|| UnitStatus::pending(name)))
                .collect(),
        })
    }

    pub fn unit_status(&self, name: &str) -> Option<UnitStatus> {
        self.registry.read().unwrap().get(name).cloned()
    }

    // -----------------------------------------------------------------------
    // internals
    // -----------------------------------------------------------------------

    /// Materialize volume backing directories and verify that every mount
    /// and network a unit references is declared in the stack.
    fn ensure_volumes(&self) -> Result<BTreeMap<String, PathBuf>> {
        let mut paths = BTreeMap::new();
        for (name, volume) in &self.stack.volumes {
            let path = if volume.external {
                self.volumes.path(name)
            } else {
                self.volumes.ensure(name)?
            };
            paths.insert(name.clone(), path);
        }
        for (name, unit) in &self.stack.units {
            for mount in &unit.volumes {
                if !paths.contains_key(&mount.source) {
                    return Err(SlipwayError::UnknownVolume {
                        unit: name.clone(),
                        volume: mount.source.clone(),
                    }
                    .into());
                }
            }
            for network in &unit.networks {
                if !self.stack.networks.contains_key(network) {
                    return Err(SlipwayError::UnknownNetwork {
                        unit: name.clone(),
                        network: network.clone(),
                    }
                    .into());
                }
            }
        }
        Ok(paths)
    }

    fn launch_spec(
        &self,
        name: &str,
        unit: &slipway_core::UnitConfig,
        volume_paths: &BTreeMap<String, PathBuf>,
    ) -> Result<LaunchSpec> {
        let argv = launch_argv(name, unit, volume_paths)?;
        // Image-backed units get env through `docker run -e`; plain
        // processes inherit it directly, plus the host path of each mount.
        let mut env = BTreeMap::new();
        if unit.image.is_none() {
            env.extend(unit.env.clone());
            for mount in &unit.volumes {
                if let Some(path) = volume_paths.get(&mount.source) {
                    env.insert(
                        format!("SLIPWAY_VOLUME_{}", env_key(&mount.source)),
                        path.display().to_string(),
                    );
                }
            }
        }
        Ok(LaunchSpec {
            name: name.to_string(),
            argv,
            env,
            cwd: self.root.clone(),
        })
    }

    fn set_health(&self, name: &str, health: HealthState) {
        let mut registry = self.registry.write().unwrap();
        if let Some(status) = registry.get_mut(name) {
            status.health = Some(health);
        }
    }

    /// Mark every not-yet-started unit downstream of `failed` as blocked.
    fn block_downstream_of(&self, failed: &str, reason: &str) {
        let downstream = graph::dependents(&self.stack, failed);
        let mut registry = self.registry.write().unwrap();
        for name in downstream {
            let Some(status) = registry.get_mut(&name) else { continue };
            if status.state == UnitState::Pending {
                status.state = UnitState::Blocked;
                warn!(unit = %name, %reason, "unit blocked");
                let _ = self.event_tx.send(StackEvent::UnitBlocked {
                    unit: name.clone(),
                    reason: reason.to_string(),
                });
            }
        }
    }

    /// Post-start liveness monitor: one probe per interval, flipping the
    /// unit to unhealthy after `retries` consecutive failures. Reports
    /// only; it never restarts the unit.
    fn spawn_monitor(&self, name: String, check: slipway_core::HealthCheck) {
        let registry = self.registry.clone();
        let event_tx = self.event_tx.clone();
        let client = self.client.clone();
        let task = tokio::spawn(async move {
            let mut failures: u32 = 0;
            loop {
                tokio::time::sleep(check.interval).await;
                let (passed, output) = monitor_probe(&check, &client).await;
                if passed {
                    failures = 0;
                    let mut reg = registry.write().unwrap();
                    if let Some(status) = reg.get_mut(&name) {
                        status.health = Some(HealthState::Healthy);
                    }
                } else {
                    failures += 1;
                    if failures >= check.retries.max(1) {
                        let mut flipped = false;
                        {
                            let mut reg = registry.write().unwrap();
                            if let Some(status) = reg.get_mut(&name) {
                                flipped = status.health != Some(HealthState::Unhealthy);
                                status.health = Some(HealthState::Unhealthy);
                            }
                        }
                        if flipped {
                            warn!(unit = %name, %output, "unit became unhealthy");
                            let _ = event_tx.send(StackEvent::UnitUnhealthy {
                                unit: name.clone(),
                                output: output.clone(),
                            });
                        }
                    }
                }
            }
        });
        self.monitors.lock().unwrap().push(task);
    }

    /// Keep the registry in sync with process exits observed on the event
    /// channel. No-op outside a runtime so construction stays sync-friendly.
    fn spawn_exit_bookkeeper(&self) {
        if tokio::runtime::Handle::try_current().is_err() {
            return;
        }
        let registry = self.registry.clone();
        let mut rx = self.event_tx.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                if let StackEvent::UnitExited { unit, exit_code, .. } = event {
                    let mut reg = registry.write().unwrap();
                    if let Some(status) = reg.get_mut(&unit) {
                        status.state = UnitState::Exited;
                        status.exit_code = Some(exit_code);
                        status.pid = None;
                    }
                }
            }
        });
    }
}

fn env_key(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RunnerError;

    fn stack(yaml: &str) -> StackConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[tokio::test]
    async fn up_starts_units_in_dependency_order() {
        let dir = tempfile::tempdir().unwrap();
        let s = stack(
            "name: demo\nunits:\n  app:\n    command: [sleep, \"30\"]\n    depends_on:\n      db: {}\n  db:\n    command: [sleep, \"30\"]\n",
        );
        let supervisor = Supervisor::new(s, dir.path());
        let mut rx = supervisor.subscribe();
        supervisor.up().await.unwrap();

        let mut started = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let StackEvent::UnitStarted { unit, .. } = event {
                started.push(unit);
            }
        }
        assert_eq!(started, vec!["db", "app"]);

        let status = supervisor.status().unwrap();
        assert!(status.units.iter().all(|u| u.state == UnitState::Running));
        supervisor.down(false).await.unwrap();
    }

    #[tokio::test]
    async fn gate_holds_dependent_until_probe_passes() {
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("count");
        let script = format!(
            "n=$(cat {c} 2>/dev/null || echo 0); n=$((n+1)); echo $n > {c}; [ \"$n\" -ge 3 ]",
            c = counter.display()
        );
        let yaml = format!(
            "name: demo\nunits:\n  app:\n    command: [sleep, \"30\"]\n    depends_on:\n      db:\n        condition: unit_healthy\n  db:\n    command: [sleep, \"30\"]\n    healthcheck:\n      probe:\n        type: command\n        argv: [sh, -c, '{script}']\n      interval: 20ms\n      retries: 5\n"
        );
        let supervisor = Supervisor::new(stack(&yaml), dir.path());
        let report = supervisor.up().await.unwrap();

        let (unit, result) = &report.gates[0];
        assert_eq!(unit, "db");
        assert_eq!(result.attempt, 3);
        assert_eq!(
            supervisor.unit_status("db").unwrap().health,
            Some(HealthState::Healthy)
        );
        assert_eq!(
            supervisor.unit_status("app").unwrap().state,
            UnitState::Running
        );
        supervisor.down(false).await.unwrap();
    }

    #[tokio::test]
    async fn failed_gate_blocks_dependents() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "name: demo\nunits:\n  app:\n    command: [sleep, \"30\"]\n    depends_on:\n      db:\n        condition: unit_healthy\n  db:\n    command: [sleep, \"30\"]\n    healthcheck:\n      probe:\n        type: command\n        argv: [\"false\"]\n      interval: 20ms\n      retries: 2\n";
        let supervisor = Supervisor::new(stack(yaml), dir.path());
        let mut rx = supervisor.subscribe();

        let err = supervisor.up().await.unwrap_err();
        assert!(matches!(err, RunnerError::ProbeExhausted { .. }));

        let app = supervisor.unit_status("app").unwrap();
        assert_eq!(app.state, UnitState::Blocked);
        assert!(app.pid.is_none());
        assert_eq!(
            supervisor.unit_status("db").unwrap().health,
            Some(HealthState::Unhealthy)
        );

        let mut blocked = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, StackEvent::UnitBlocked { ref unit, .. } if unit == "app") {
                blocked = true;
            }
        }
        assert!(blocked);
        supervisor.down(false).await.unwrap();
    }

    #[tokio::test]
    async fn blocked_state_is_transitive() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "name: demo\nunits:\n  web:\n    command: [sleep, \"30\"]\n    depends_on:\n      api: {}\n  api:\n    command: [sleep, \"30\"]\n    depends_on:\n      db:\n        condition: unit_healthy\n  db:\n    command: [sleep, \"30\"]\n    healthcheck:\n      probe:\n        type: command\n        argv: [\"false\"]\n      interval: 20ms\n      retries: 1\n";
        let supervisor = Supervisor::new(stack(yaml), dir.path());
        supervisor.up().await.unwrap_err();

        assert_eq!(supervisor.unit_status("api").unwrap().state, UnitState::Blocked);
        assert_eq!(supervisor.unit_status("web").unwrap().state, UnitState::Blocked);
        supervisor.down(false).await.unwrap();
    }

    #[tokio::test]
    async fn own_healthcheck_failure_is_report_only() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "name: demo\nunits:\n  app:\n    command: [sleep, \"30\"]\n    healthcheck:\n      probe:\n        type: command\n        argv: [\"false\"]\n      interval: 20ms\n      retries: 2\n";
        let supervisor = Supervisor::new(stack(yaml), dir.path());
        let mut rx = supervisor.subscribe();

        // Nothing gates on app, so exhaustion must not fail the stack.
        let report = supervisor.up().await.unwrap();
        assert!(report.gates.is_empty());

        let app = supervisor.unit_status("app").unwrap();
        assert_eq!(app.state, UnitState::Running);
        assert_eq!(app.health, Some(HealthState::Unhealthy));

        let mut unhealthy = false;
        let mut ready = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                StackEvent::UnitUnhealthy { ref unit, .. } if unit == "app" => unhealthy = true,
                StackEvent::StackReady => ready = true,
                _ => {}
            }
        }
        assert!(unhealthy);
        assert!(ready);
        supervisor.down(false).await.unwrap();
    }

    #[tokio::test]
    async fn undeclared_volume_fails_up() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "name: demo\nunits:\n  db:\n    command: [sleep, \"30\"]\n    volumes:\n      - ghost:/data\n";
        let supervisor = Supervisor::new(stack(yaml), dir.path());
        let err = supervisor.up().await.unwrap_err();
        assert!(matches!(
            err,
            RunnerError::Stack(SlipwayError::UnknownVolume { .. })
        ));
        assert_eq!(supervisor.unit_status("db").unwrap().state, UnitState::Pending);
    }

    #[tokio::test]
    async fn undeclared_network_fails_up() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "name: demo\nunits:\n  app:\n    image: app:latest\n    networks:\n      - ghost-net\n";
        let supervisor = Supervisor::new(stack(yaml), dir.path());
        let err = supervisor.up().await.unwrap_err();
        assert!(matches!(
            err,
            RunnerError::Stack(SlipwayError::UnknownNetwork { .. })
        ));
    }

    #[tokio::test]
    async fn down_reverses_start_order_and_reaps() {
        let dir = tempfile::tempdir().unwrap();
        let s = stack(
            "name: demo\nunits:\n  app:\n    command: [sleep, \"30\"]\n    depends_on:\n      db: {}\n  db:\n    command: [sleep, \"30\"]\n",
        );
        let supervisor = Supervisor::new(s, dir.path());
        supervisor.up().await.unwrap();
        supervisor.down(false).await.unwrap();

        let status = supervisor.status().unwrap();
        assert!(status.units.iter().all(|u| u.state == UnitState::Exited));
        assert!(status.units.iter().all(|u| u.pid.is_none()));
    }

    #[tokio::test]
    async fn volumes_survive_down_unless_removed() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "name: demo\nunits:\n  db:\n    command: [sleep, \"30\"]\n    volumes:\n      - data:/var/lib/data\nvolumes:\n  data: {}\n";
        let supervisor = Supervisor::new(stack(yaml), dir.path());
        supervisor.up().await.unwrap();

        let store = VolumeStore::new(dir.path());
        assert!(store.exists("data"));
        supervisor.down(false).await.unwrap();
        assert!(store.exists("data"));

        let supervisor = Supervisor::new(stack(yaml), dir.path());
        supervisor.up().await.unwrap();
        supervisor.down(true).await.unwrap();
        assert!(!store.exists("data"));
    }

    #[tokio::test]
    async fn process_unit_sees_volume_path_in_env() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("seen");
        let yaml = format!(
            "name: demo\nunits:\n  writer:\n    command: [sh, -c, 'echo $SLIPWAY_VOLUME_DATA > {}']\n    volumes:\n      - data:/data\nvolumes:\n  data: {{}}\n",
            marker.display()
        );
        let supervisor = Supervisor::new(stack(&yaml), dir.path());
        supervisor.up().await.unwrap();
        // Give the one-shot command time to run and exit.
        tokio::time::sleep(Duration::from_millis(300)).await;
        supervisor.down(false).await.unwrap();

        let seen = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(
            seen.trim(),
            VolumeStore::new(dir.path()).path("data").display().to_string()
        );
    }

    #[tokio::test]
    async fn exited_unit_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let s = stack("name: demo\nunits:\n  oneshot:\n    command: [\"true\"]\n");
        let supervisor = Supervisor::new(s, dir.path());
        let mut rx = supervisor.subscribe();
        supervisor.up().await.unwrap();

        // Wait for the exit event to flow through the bookkeeper.
        loop {
            match rx.recv().await {
                Ok(StackEvent::UnitExited { exit_code, .. }) => {
                    assert_eq!(exit_code, 0);
                    break;
                }
                Ok(_) => {}
                Err(_) => panic!("event channel closed before exit"),
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        let status = supervisor.unit_status("oneshot").unwrap();
        assert_eq!(status.state, UnitState::Exited);
        supervisor.down(false).await.unwrap();
    }
}

use crate::error::{Result, RunnerError};
use crate::event::{LogStream, StackEvent};
use slipway_core::UnitConfig;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{broadcast, oneshot};

// ---------------------------------------------------------------------------
// LaunchSpec
// ---------------------------------------------------------------------------

/// Everything needed to launch one unit, resolved ahead of spawn so the
/// argv construction stays testable without actually running anything.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchSpec {
    pub name: String,
    pub argv: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub cwd: PathBuf,
}

/// Build the argv for a unit. Image-backed units launch through
/// `docker run`; units without an image run their command directly.
/// `volume_paths` maps mount source names to host backing directories.
pub fn launch_argv(
    name: &str,
    unit: &UnitConfig,
    volume_paths: &BTreeMap<String, PathBuf>,
) -> Result<Vec<String>> {
    if let Some(image) = &unit.image {
        let mut argv = vec![
            "docker".to_string(),
            "run".to_string(),
            "--rm".to_string(),
        ];
        argv.push("--name".to_string());
        argv.push(unit.container_name.clone().unwrap_or_else(|| name.to_string()));
        for network in &unit.networks {
            argv.push("--network".to_string());
            argv.push(network.clone());
        }
        for port in &unit.ports {
            argv.push("-p".to_string());
            argv.push(format!("{}:{}", port.host, port.container));
        }
        for (key, value) in &unit.env {
            argv.push("-e".to_string());
            argv.push(format!("{key}={value}"));
        }
        for mount in &unit.volumes {
            if let Some(host) = volume_paths.get(&mount.source) {
                argv.push("-v".to_string());
                argv.push(format!("{}:{}", host.display(), mount.target));
            }
        }
        argv.push(image.clone());
        if let Some(command) = unit.effective_command() {
            argv.extend(command);
        }
        return Ok(argv);
    }

    unit.effective_command()
        .ok_or_else(|| RunnerError::NoLaunchMethod(name.to_string()))
}

// ---------------------------------------------------------------------------
// UnitHandle
// ---------------------------------------------------------------------------

/// Handle to a spawned unit. Dropping it detaches from the process; use
/// [`signal_stop`](Self::signal_stop) and [`wait_stopped`](Self::wait_stopped)
/// for an orderly shutdown.
pub struct UnitHandle {
    pub name: String,
    pub pid: u32,
    kill_tx: Option<oneshot::Sender<()>>,
    watcher: Option<tokio::task::JoinHandle<()>>,
}

impl UnitHandle {
    /// Ask the watcher to kill the child. Idempotent.
    pub fn signal_stop(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Wait until the watcher has reaped the child, bounded by `timeout`.
    pub async fn wait_stopped(&mut self, timeout: std::time::Duration) {
        if let Some(watcher) = self.watcher.take() {
            let _ = tokio::time::timeout(timeout, watcher).await;
        }
    }
}

// ---------------------------------------------------------------------------
// spawn_unit
// ---------------------------------------------------------------------------

/// Spawn a unit and stream its output through the broadcast channel. The
/// watcher task owns the child: it forwards stdout/stderr lines as
/// [`StackEvent::Log`], emits [`StackEvent::UnitExited`] when the process
/// ends, and kills the child when [`UnitHandle::signal_stop`] fires.
pub fn spawn_unit(spec: LaunchSpec, tx: broadcast::Sender<StackEvent>) -> Result<UnitHandle> {
    let mut child = Command::new(&spec.argv[0])
        .args(&spec.argv[1..])
        .envs(&spec.env)
        .current_dir(&spec.cwd)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| RunnerError::Spawn {
            unit: spec.name.clone(),
            message: format!("'{}': {e}", spec.argv[0]),
        })?;

    let pid = child.id().ok_or_else(|| RunnerError::Spawn {
        unit: spec.name.clone(),
        message: "process exited before a pid was assigned".to_string(),
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (kill_tx, kill_rx) = oneshot::channel::<()>();
    let name = spec.name.clone();

    let tx_out = tx.clone();
    let out_name = name.clone();
    let stdout_task = tokio::spawn(async move {
        if let Some(stdout) = stdout {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = tx_out.send(StackEvent::Log {
                    unit: out_name.clone(),
                    stream: LogStream::Stdout,
                    line,
                });
            }
        }
    });

    let tx_err = tx.clone();
    let err_name = name.clone();
    let stderr_task = tokio::spawn(async move {
        if let Some(stderr) = stderr {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = tx_err.send(StackEvent::Log {
                    unit: err_name.clone(),
                    stream: LogStream::Stderr,
                    line,
                });
            }
        }
    });

    let watcher_name = name.clone();
    let watcher = tokio::spawn(async move {
        let start = Instant::now();
        let exit_code = tokio::select! {
            status = child.wait() => status.ok().and_then(|s| s.code()).unwrap_or(-1),
            _ = kill_rx => {
                let _ = child.kill().await;
                child.wait().await.ok().and_then(|s| s.code()).unwrap_or(-1)
            }
        };
        let _ = tokio::join!(stdout_task, stderr_task);
        let _ = tx.send(StackEvent::UnitExited {
            unit: watcher_name,
            exit_code,
            duration_seconds: start.elapsed().as_secs_f64(),
        });
    });

    Ok(UnitHandle {
        name,
        pid,
        kill_tx: Some(kill_tx),
        watcher: Some(watcher),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(yaml: &str) -> UnitConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn image_unit_launches_through_docker() {
        let u = unit(
            "image: postgres:15\ncontainer_name: app-postgres\nnetworks: [app-network]\nports: [\"80:8000\"]\nenv:\n  POSTGRES_USER: postgres\nvolumes:\n  - postgres_data:/var/lib/postgresql/data\n",
        );
        let mut volumes = BTreeMap::new();
        volumes.insert(
            "postgres_data".to_string(),
            PathBuf::from("/proj/.slipway/volumes/postgres_data"),
        );
        let argv = launch_argv("postgres", &u, &volumes).unwrap();
        assert_eq!(argv[..3], ["docker", "run", "--rm"]);
        let joined = argv.join(" ");
        assert!(joined.contains("--name app-postgres"));
        assert!(joined.contains("--network app-network"));
        assert!(joined.contains("-p 80:8000"));
        assert!(joined.contains("-e POSTGRES_USER=postgres"));
        assert!(joined
            .contains("-v /proj/.slipway/volumes/postgres_data:/var/lib/postgresql/data"));
        assert_eq!(argv.last().unwrap(), "postgres:15");
    }

    #[test]
    fn image_unit_appends_command_override() {
        let u = unit("image: app:latest\ncommand: python main.py\n");
        let argv = launch_argv("app", &u, &BTreeMap::new()).unwrap();
        assert_eq!(argv[argv.len() - 3..], ["app:latest", "python", "main.py"]);
    }

    #[test]
    fn container_name_defaults_to_unit_name() {
        let u = unit("image: app:latest\n");
        let argv = launch_argv("app", &u, &BTreeMap::new()).unwrap();
        let pos = argv.iter().position(|a| a == "--name").unwrap();
        assert_eq!(argv[pos + 1], "app");
    }

    #[test]
    fn process_unit_runs_command_directly() {
        let u = unit("command: [python, main.py]\n");
        let argv = launch_argv("app", &u, &BTreeMap::new()).unwrap();
        assert_eq!(argv, vec!["python", "main.py"]);
    }

    #[test]
    fn unit_without_launch_method_errors() {
        let u = unit("env:\n  KEY: value\n");
        assert!(matches!(
            launch_argv("app", &u, &BTreeMap::new()),
            Err(RunnerError::NoLaunchMethod(_))
        ));
    }

    #[tokio::test]
    async fn spawn_streams_output_and_exit() {
        let (tx, mut rx) = broadcast::channel(64);
        let spec = LaunchSpec {
            name: "echoer".to_string(),
            argv: vec!["sh".to_string(), "-c".to_string(), "echo hello".to_string()],
            env: BTreeMap::new(),
            cwd: std::env::temp_dir(),
        };
        let mut handle = spawn_unit(spec, tx).unwrap();
        assert!(handle.pid > 0);

        let mut saw_line = false;
        let mut exit_code = None;
        while let Ok(event) = rx.recv().await {
            match event {
                StackEvent::Log { line, .. } if line == "hello" => saw_line = true,
                StackEvent::UnitExited { exit_code: code, .. } => {
                    exit_code = Some(code);
                    break;
                }
                _ => {}
            }
        }
        assert!(saw_line);
        assert_eq!(exit_code, Some(0));
        handle.wait_stopped(std::time::Duration::from_secs(5)).await;
    }

    #[tokio::test]
    async fn signal_stop_kills_long_running_unit() {
        let (tx, mut rx) = broadcast::channel(64);
        let spec = LaunchSpec {
            name: "sleeper".to_string(),
            argv: vec!["sleep".to_string(), "60".to_string()],
            env: BTreeMap::new(),
            cwd: std::env::temp_dir(),
        };
        let mut handle = spawn_unit(spec, tx).unwrap();
        handle.signal_stop();
        handle.wait_stopped(std::time::Duration::from_secs(5)).await;

        let mut exited = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, StackEvent::UnitExited { .. }) {
                exited = true;
            }
        }
        assert!(exited);
    }

    #[tokio::test]
    async fn spawn_missing_binary_is_spawn_error() {
        let (tx, _rx) = broadcast::channel(8);
        let spec = LaunchSpec {
            name: "ghost".to_string(),
            argv: vec!["no-such-binary-slipway-test".to_string()],
            env: BTreeMap::new(),
            cwd: std::env::temp_dir(),
        };
        assert!(matches!(
            spawn_unit(spec, tx),
            Err(RunnerError::Spawn { .. })
        ));
    }
}

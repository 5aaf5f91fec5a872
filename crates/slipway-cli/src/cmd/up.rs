use anyhow::Context;
use chrono::Utc;
use slipway_core::{RuntimeRecord, StackConfig, UnitState};
use std::path::Path;
use std::sync::Arc;
use unit_runner::{StackEvent, Supervisor};

pub fn run(stack_file: &Path, api_port: u16, no_api: bool) -> anyhow::Result<()> {
    let root = crate::stackfile::root_of(stack_file);
    let loaded = StackConfig::load_reporting(stack_file).context("failed to load stack file")?;
    for name in &loaded.missing_vars {
        tracing::warn!("environment variable '{name}' is unset (substituted as empty)");
    }
    let stack = loaded.stack;
    let errors: Vec<_> = stack
        .validate()
        .into_iter()
        .filter(|w| w.level == slipway_core::WarnLevel::Error)
        .collect();
    if !errors.is_empty() {
        for w in &errors {
            eprintln!("[error] {}", w.message);
        }
        anyhow::bail!("stack validation found errors");
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let supervisor = Arc::new(Supervisor::new(stack, &root));
        spawn_event_printer(&supervisor);

        if let Err(err) = supervisor.up().await {
            // Reap anything that did start before reporting the failure.
            let _ = supervisor.down(false).await;
            return Err(err.into());
        }

        write_record(&supervisor, &root)?;
        println!("Stack is up. Press Ctrl-C to stop.");

        let result = if no_api {
            wait_for_interrupt().await
        } else {
            tokio::select! {
                res = slipway_server::serve(supervisor.clone(), api_port) => res,
                res = wait_for_interrupt() => res,
            }
        };

        supervisor.down(false).await?;
        RuntimeRecord::remove(&root)?;
        println!("Stack stopped.");
        result
    })
}

async fn wait_for_interrupt() -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    println!();
    Ok(())
}

fn write_record(supervisor: &Supervisor, root: &Path) -> anyhow::Result<()> {
    let status = supervisor.status()?;
    let mut record = RuntimeRecord {
        stack: status.name.clone(),
        started_at: Some(Utc::now()),
        pids: Default::default(),
    };
    for unit in &status.units {
        if unit.state == UnitState::Running {
            if let Some(pid) = unit.pid {
                record.pids.insert(unit.name.clone(), pid);
            }
        }
    }
    record.save(root)?;
    Ok(())
}

fn spawn_event_printer(supervisor: &Arc<Supervisor>) {
    let mut rx = supervisor.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                StackEvent::UnitStarted { unit, pid } => {
                    println!("  started: {unit} (pid {pid})");
                }
                StackEvent::UnitHealthy { unit, attempt } => {
                    println!("  healthy: {unit} (attempt {attempt})");
                }
                StackEvent::UnitUnhealthy { unit, output } => {
                    eprintln!("  unhealthy: {unit}: {output}");
                }
                StackEvent::UnitBlocked { unit, reason } => {
                    eprintln!("  blocked: {unit}: {reason}");
                }
                StackEvent::UnitExited { unit, exit_code, .. } => {
                    println!("  exited: {unit} (code {exit_code})");
                }
                StackEvent::Log { unit, line, .. } => {
                    println!("  [{unit}] {line}");
                }
                _ => {}
            }
        }
    });
}

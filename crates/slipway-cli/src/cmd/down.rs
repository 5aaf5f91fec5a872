use anyhow::Context;
use slipway_core::resource::VolumeStore;
use slipway_core::{status, RuntimeRecord, SlipwayError, StackConfig};
use std::path::Path;
use std::time::{Duration, Instant};

const REAP_TIMEOUT: Duration = Duration::from_secs(10);

/// Stop a stack started by an earlier `up` invocation: signal the recorded
/// pids in reverse start order and wait for them to exit.
pub fn run(stack_file: &Path, remove_volumes: bool) -> anyhow::Result<()> {
    let root = crate::stackfile::root_of(stack_file);
    let record = match RuntimeRecord::load(&root) {
        Ok(record) => record,
        Err(SlipwayError::NotRunning) => {
            println!("Stack is not running.");
            return maybe_remove_volumes(stack_file, &root, remove_volumes);
        }
        Err(e) => return Err(e.into()),
    };

    let stack = StackConfig::load(stack_file).context("failed to load stack file")?;
    let mut order = slipway_core::graph::stop_order(&stack)?;
    // Units missing from the record (blocked, or added since) are skipped.
    order.retain(|name| record.pids.contains_key(name));

    for name in &order {
        let pid = record.pids[name];
        if !status::is_pid_alive(pid) {
            println!("  already stopped: {name}");
            continue;
        }
        println!("  stopping: {name} (pid {pid})");
        status::signal_stop(pid);
        let deadline = Instant::now() + REAP_TIMEOUT;
        while status::is_pid_alive(pid) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(100));
        }
        if status::is_pid_alive(pid) {
            tracing::warn!(unit = %name, pid, "unit did not stop within timeout");
        }
    }

    RuntimeRecord::remove(&root)?;
    println!("Stack stopped.");
    maybe_remove_volumes(stack_file, &root, remove_volumes)
}

fn maybe_remove_volumes(stack_file: &Path, root: &Path, remove: bool) -> anyhow::Result<()> {
    if !remove {
        return Ok(());
    }
    let stack = StackConfig::load(stack_file).context("failed to load stack file")?;
    let store = VolumeStore::new(root);
    for (name, volume) in &stack.volumes {
        if volume.external {
            continue;
        }
        store.remove(name)?;
        println!("  removed volume: {name}");
    }
    Ok(())
}

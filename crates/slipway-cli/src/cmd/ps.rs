use crate::output::{print_json, print_status_table, StatusRow};
use slipway_core::{status, RuntimeRecord, SlipwayError};
use std::path::Path;

pub fn run(stack_file: &Path, json: bool) -> anyhow::Result<()> {
    let root = crate::stackfile::root_of(stack_file);
    let record = match RuntimeRecord::load(&root) {
        Ok(record) => record,
        Err(SlipwayError::NotRunning) => {
            if json {
                print_json(&serde_json::json!({ "running": false, "units": [] }))?;
            } else {
                println!("Stack is not running.");
            }
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let rows: Vec<StatusRow> = record
        .pids
        .iter()
        .map(|(name, pid)| StatusRow {
            name: name.clone(),
            pid: *pid,
            state: if status::is_pid_alive(*pid) {
                "running"
            } else {
                "exited"
            },
        })
        .collect();

    if json {
        let units: Vec<serde_json::Value> = rows
            .iter()
            .map(|row| {
                serde_json::json!({
                    "name": row.name,
                    "pid": row.pid,
                    "state": row.state,
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "running": true,
            "stack": record.stack,
            "started_at": record.started_at,
            "units": units,
        }))?;
    } else {
        print_status_table(&record.stack, &rows);
    }
    Ok(())
}

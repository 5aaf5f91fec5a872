use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One row of `slipway ps` output.
pub struct StatusRow {
    pub name: String,
    pub pid: u32,
    pub state: &'static str,
}

pub fn print_status_table(stack: &str, rows: &[StatusRow]) {
    print!("{}", render_status_table(stack, rows));
}

fn render_status_table(stack: &str, rows: &[StatusRow]) -> String {
    let name_w = rows
        .iter()
        .map(|r| r.name.len())
        .chain(std::iter::once("NAME".len()))
        .max()
        .unwrap();
    let pid_w = rows
        .iter()
        .map(|r| r.pid.to_string().len())
        .chain(std::iter::once("PID".len()))
        .max()
        .unwrap();

    let mut out = format!("Stack: {stack}\n");
    out.push_str(&format!("{:<name_w$}  {:>pid_w$}  STATE\n", "NAME", "PID"));
    for row in rows {
        out.push_str(&format!(
            "{:<name_w$}  {:>pid_w$}  {}\n",
            row.name, row.pid, row.state
        ));
    }
    out
}

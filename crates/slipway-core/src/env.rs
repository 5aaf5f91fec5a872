use regex::{Captures, Regex};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Variable reference syntax
// ---------------------------------------------------------------------------

static VAR_RE: OnceLock<Regex> = OnceLock::new();

fn var_re() -> &'static Regex {
    VAR_RE.get_or_init(|| {
        Regex::new(r"\$\$|\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}|\$([A-Za-z_][A-Za-z0-9_]*)")
            .unwrap()
    })
}

// ---------------------------------------------------------------------------
// Interpolation
// ---------------------------------------------------------------------------

/// Result of substituting variable references in a stack file.
#[derive(Debug, Clone)]
pub struct Interpolation {
    pub text: String,
    /// Plain `${VAR}` / `$VAR` references that were unset (no default);
    /// they substitute to empty and are surfaced to the caller as warnings.
    pub missing: Vec<String>,
}

/// Substitute `${VAR}`, `${VAR:-default}`, `$VAR`, and the `$$` escape in
/// `raw`. The `:-` form falls back to the default when the variable is unset
/// *or* empty. Unset plain references substitute to empty and are recorded
/// in `missing` rather than failing: external credentials pass through
/// unvalidated, and the unit itself surfaces any resulting failure.
pub fn interpolate<F>(raw: &str, lookup: F) -> Interpolation
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing = Vec::new();
    let text = var_re()
        .replace_all(raw, |caps: &Captures<'_>| {
            if &caps[0] == "$$" {
                return "$".to_string();
            }
            let name = caps
                .get(1)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or("");
            let default = caps.get(2).map(|m| m.as_str().to_string());
            match lookup(name) {
                Some(value) if !value.is_empty() => value,
                Some(_) | None if default.is_some() => default.unwrap(),
                Some(value) => value,
                None => {
                    missing.push(name.to_string());
                    String::new()
                }
            }
        })
        .into_owned();
    Interpolation { text, missing }
}

/// Interpolate against the process environment.
pub fn interpolate_env(raw: &str) -> Interpolation {
    interpolate(raw, |name| std::env::var(name).ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use crate::config::StackConfig;
use crate::error::{Result, SlipwayError};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

// ---------------------------------------------------------------------------
// Topological ordering
// ---------------------------------------------------------------------------

/// Start order for the stack's units: dependencies before dependents.
/// Deterministic for a given stack (ties broken by unit name) so repeated
/// runs launch in the same order.
pub fn start_order(stack: &StackConfig) -> Result<Vec<String>> {
    let mut in_degree: BTreeMap<&str, usize> = stack
        .units
        .keys()
        .map(|name| (name.as_str(), 0))
        .collect();
    // dependency -> dependents
    let mut edges: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, unit) in &stack.units {
        for dep in unit.depends_on.keys() {
            if !stack.units.contains_key(dep) {
                return Err(SlipwayError::UnknownDependency {
                    unit: name.clone(),
                    dependency: dep.clone(),
                });
            }
            edges.entry(dep.as_str()).or_default().push(name.as_str());
            *in_degree.get_mut(name.as_str()).unwrap() += 1;
        }
    }

    let mut ready: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut order = Vec::with_capacity(stack.units.len());
    while let Some(name) = ready.pop_front() {
        order.push(name.to_string());
        for dependent in edges.get(name).into_iter().flatten() {
            let deg = in_degree.get_mut(dependent).unwrap();
            *deg -= 1;
            if *deg == 0 {
                ready.push_back(dependent);
            }
        }
    }

    if order.len() != stack.units.len() {
        let stuck = in_degree
            .iter()
            .find(|(_, deg)| **deg > 0)
            .map(|(name, _)| name.to_string())
            .unwrap_or_default();
        return Err(SlipwayError::DependencyCycle(stuck));
    }
    Ok(order)
}

/// Stop order is the reverse of start order.
pub fn stop_order(stack: &StackConfig) -> Result<Vec<String>> {
    let mut order = start_order(stack)?;
    order.reverse();
    Ok(order)
}

/// All units downstream of `name`, directly or transitively. Used to mark
/// units as blocked when an upstream readiness gate fails.
pub fn dependents(stack: &StackConfig, name: &str) -> Vec<String> {
    let mut found: BTreeSet<&str> = BTreeSet::new();
    let mut frontier = vec![name];
    while let Some(current) = frontier.pop() {
        for (candidate, unit) in &stack.units {
            if unit.depends_on.contains_key(current) && found.insert(candidate.as_str()) {
                frontier.push(candidate.as_str());
            }
        }
    }
    found.into_iter().map(str::to_string).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

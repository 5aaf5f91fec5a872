use crate::error::SlipwayError;
use crate::health::HealthCheck;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// PortMapping
// ---------------------------------------------------------------------------

/// A `HOST:CONTAINER` port binding, e.g. `"80:8000"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PortMapping {
    pub host: u16,
    pub container: u16,
}

impl TryFrom<String> for PortMapping {
    type Error = SlipwayError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let (host, container) = raw
            .split_once(':')
            .ok_or_else(|| SlipwayError::InvalidPortMapping(raw.clone()))?;
        let host = host
            .parse()
            .map_err(|_| SlipwayError::InvalidPortMapping(raw.clone()))?;
        let container = container
            .parse()
            .map_err(|_| SlipwayError::InvalidPortMapping(raw.clone()))?;
        Ok(Self { host, container })
    }
}

impl From<PortMapping> for String {
    fn from(p: PortMapping) -> Self {
        format!("{}:{}", p.host, p.container)
    }
}

// ---------------------------------------------------------------------------
// VolumeMount
// ---------------------------------------------------------------------------

/// A `NAME:/absolute/target` mount of a named volume into a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VolumeMount {
    pub source: String,
    pub target: String,
}

impl TryFrom<String> for VolumeMount {
    type Error = SlipwayError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let (source, target) = raw
            .split_once(':')
            .ok_or_else(|| SlipwayError::InvalidVolumeMount(raw.clone()))?;
        if source.is_empty() || !target.starts_with('/') {
            return Err(SlipwayError::InvalidVolumeMount(raw));
        }
        Ok(Self {
            source: source.to_string(),
            target: target.to_string(),
        })
    }
}

impl From<VolumeMount> for String {
    fn from(m: VolumeMount) -> Self {
        format!("{}:{}", m.source, m.target)
    }
}

// ---------------------------------------------------------------------------
// CommandLine
// ---------------------------------------------------------------------------

/// A unit command: either a single line (split on whitespace) or an argv
/// list. An empty line means "use the image's built-in default", which is
/// how `command: ${APP_COMMAND:-}` resolves when the override is unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    Line(String),
    Argv(Vec<String>),
}

impl CommandLine {
    pub fn argv(&self) -> Vec<String> {
        match self {
            CommandLine::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            CommandLine::Argv(argv) => argv.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.argv().is_empty()
    }
}

// ---------------------------------------------------------------------------
// DependsOn
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependsCondition {
    /// The upstream unit's process has been spawned.
    #[default]
    UnitStarted,
    /// The upstream unit's readiness probe has passed within its retry
    /// budget. A hard precondition: exhaustion means the dependent is
    /// never started.
    UnitHealthy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependsOn {
    #[serde(default)]
    pub condition: DependsCondition,
}

// ---------------------------------------------------------------------------
// UnitConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitConfig {
    /// Container image for image-backed units. Units without an image run
    /// `command` as a plain process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandLine>,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "de_env"
    )]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortMapping>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, DependsOn>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeMount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<HealthCheck>,
}

impl UnitConfig {
    /// The unit's command as argv, or `None` when absent or empty.
    pub fn effective_command(&self) -> Option<Vec<String>> {
        match &self.command {
            Some(cmd) if !cmd.is_empty() => Some(cmd.argv()),
            _ => None,
        }
    }
}

/// Accept YAML scalars (string, number, bool, null) as env values; a null
/// value becomes the empty string. This is what `KEY: ${VAR:-}` resolves
/// to when the variable is unset.
fn de_env<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, serde_yaml::Value> = Deserialize::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_yaml::Value::Null => String::new(),
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                other => {
                    return Err(serde::de::Error::custom(format!(
                        "env value for '{key}' must be a scalar, got: {other:?}"
                    )))
                }
            };
            Ok((key, value))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

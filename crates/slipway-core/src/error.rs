use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlipwayError {
    #[error("stack file not found: {0}: run 'slipway init' or pass --file")]
    StackFileNotFound(std::path::PathBuf),

    #[error("unit not found: {0}")]
    UnitNotFound(String),

    #[error("invalid unit name '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidUnitName(String),

    #[error("unit '{unit}' depends on unknown unit '{dependency}'")]
    UnknownDependency { unit: String, dependency: String },

    #[error("dependency cycle involving unit '{0}'")]
    DependencyCycle(String),

    #[error("invalid port mapping '{0}': expected HOST:CONTAINER")]
    InvalidPortMapping(String),

    #[error("invalid volume mount '{0}': expected NAME:/absolute/target")]
    InvalidVolumeMount(String),

    #[error("invalid duration '{0}': expected forms like 500ms, 5s, 2m, 1h")]
    InvalidDuration(String),

    #[error("unit '{unit}' references undeclared volume '{volume}'")]
    UnknownVolume { unit: String, volume: String },

    #[error("unit '{unit}' references undeclared network '{network}'")]
    UnknownNetwork { unit: String, network: String },

    #[error("stack is not running: no runtime record found")]
    NotRunning,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SlipwayError>;

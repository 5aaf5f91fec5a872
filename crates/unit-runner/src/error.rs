use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn unit '{unit}': {message}")]
    Spawn { unit: String, message: String },

    #[error("unit '{0}' has neither an image nor a command to launch")]
    NoLaunchMethod(String),

    #[error(
        "unit '{unit}' failed its readiness gate after {attempts} attempts: dependents were not started"
    )]
    ProbeExhausted { unit: String, attempts: u32 },

    #[error(transparent)]
    Stack(#[from] slipway_core::SlipwayError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RunnerError>;

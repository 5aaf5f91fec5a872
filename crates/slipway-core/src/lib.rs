//! Core domain model for slipway: stack file schema, dependency graph,
//! health descriptors, and on-disk runtime state. Everything here is
//! synchronous; process supervision lives in `unit-runner`.

pub mod config;
pub mod duration;
pub mod env;
pub mod error;
pub mod graph;
pub mod health;
pub mod io;
pub mod paths;
pub mod resource;
pub mod status;
pub mod unit;

pub use config::{ConfigWarning, LoadedStack, StackConfig, WarnLevel};
pub use error::{Result, SlipwayError};
pub use health::{HealthCheck, HealthState, ProbeKind, ProbeResult};
pub use status::{RuntimeRecord, StackStatus, UnitState, UnitStatus};
pub use unit::{CommandLine, DependsCondition, DependsOn, PortMapping, UnitConfig, VolumeMount};

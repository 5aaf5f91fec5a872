//! Async runtime for slipway stacks: launching unit processes, running
//! readiness gates and liveness monitors, and supervising the whole stack
//! through `up`/`down`.

pub mod error;
pub mod event;
pub mod gate;
pub mod probe;
pub mod process;
pub mod supervisor;

pub use error::{Result, RunnerError};
pub use event::{LogStream, StackEvent};
pub use process::{launch_argv, spawn_unit, LaunchSpec, UnitHandle};
pub use supervisor::{Supervisor, UpReport};

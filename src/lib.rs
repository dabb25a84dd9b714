//! vm-warden - lifecycle control for ephemeral VM-backed build agents.
//!
//! The warden decides, on a polling cadence driven by the host scheduler,
//! whether an agent's connection should be (re)established, whether the
//! agent should be reclaimed because it is idle, and whether its backing
//! VM should be torn down, while the same scheduler keeps assigning work
//! to the agent. It owns no tasks, threads, or intervals; all concurrency
//! is imposed by the host.
//!
//! - [`retention`] - the per-agent check/reclaim state machine
//! - [`launcher`] - connection-strategy selection (SSH/JNLP) and launch
//! - [`events`] - task-accepted/-completed hooks from the scheduler
//! - [`startup`] - bootstrap reconciliation against current VM reality

pub mod agent;
pub mod cloud;
pub mod config;
pub mod error;
pub mod events;
pub mod instance;
pub mod launcher;
pub mod retention;
pub mod startup;

pub use error::{Error, Result};

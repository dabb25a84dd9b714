//! Host scheduler capabilities consumed by the warden.
//!
//! The host framework owns the agents, their nodes, and the process
//! bootstrap state. The warden sees them only through these traits,
//! and the host polls only objects that implement them; an agent of a
//! foreign kind is never handed to the warden in the first place.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::error::Result;

/// One schedulable execution slot backed by a VM, as seen by the host
/// scheduler.
///
/// The snapshot accessors reflect the scheduler's live view and may
/// change between two calls within one poll cycle; the warden re-reads
/// them wherever a decision depends on the current value.
#[async_trait]
pub trait HostAgent: Send + Sync {
    /// Display name of the agent in the host scheduler.
    fn name(&self) -> String;

    /// Number of executors currently running a task.
    fn busy_executor_count(&self) -> usize;

    /// Whether a connection attempt is currently in flight.
    fn is_connecting(&self) -> bool;

    /// Whether the scheduler is still staging the image or workload.
    fn is_scheduling_or_pulling(&self) -> bool;

    /// Whether the agent process is connected and responsive.
    fn is_online(&self) -> bool;

    /// Whether the agent has no running tasks.
    fn is_idle(&self) -> bool;

    /// When the agent last became idle, if it is idle now.
    fn idle_since(&self) -> Option<Instant>;

    /// Whether the scheduler may route new work to this agent.
    fn accepting_tasks(&self) -> bool;

    /// Stop or resume routing new work to this agent.
    fn set_accepting_tasks(&self, accepting: bool);

    /// Name of the cloud that provisioned this agent's VM.
    fn cloud_name(&self) -> String;

    /// Instance id of the backing VM.
    fn instance_id(&self) -> String;

    /// The node owning the backing VM, if one still exists.
    fn node(&self) -> Option<Arc<dyn NodeHandle>>;

    /// Set the agent's display name. Informational only, never used
    /// for identity.
    fn set_display_name(&self, name: &str);

    /// Ask the host to (re)establish the agent connection. `forced`
    /// discards any half-open prior connection state before retrying.
    async fn connect(&self, forced: bool) -> Result<()>;
}

/// The host's handle to the node owning a backing VM.
#[async_trait]
pub trait NodeHandle: Send + Sync {
    /// Node name in the host scheduler.
    fn node_name(&self) -> String;

    /// Whether termination policy currently allows tearing the VM down
    /// (a keep-on-failure policy may forbid it).
    fn can_terminate(&self) -> bool;

    /// Tear down the node and its VM. Must tolerate the node already
    /// being gone.
    async fn terminate(&self) -> Result<()>;
}

/// Host process bootstrap state.
pub trait HostRuntime: Send + Sync {
    /// True once the host process has passed its fully-started
    /// milestone and normal polling can be trusted.
    fn startup_complete(&self) -> bool;
}

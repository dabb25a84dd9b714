//! Task lifecycle events pushed by the host scheduler.
//!
//! These callbacks can fire between polls. Completion of a one-shot
//! task frees its VM promptly instead of waiting for the idle-timeout
//! poll to notice.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::agent::HostAgent;
use crate::retention::AgentLifecycleController;

/// Reacts to task-accepted / task-completed events.
pub struct TaskLifecycleListener {
    controller: Arc<AgentLifecycleController>,
}

impl TaskLifecycleListener {
    pub fn new(controller: Arc<AgentLifecycleController>) -> Self {
        Self { controller }
    }

    /// Informational only.
    pub fn task_accepted(&self, agent: &dyn HostAgent, task: &str) {
        info!(agent = %agent.name(), task, "Task accepted");
    }

    /// A one-shot task finished: stop routing new work to the agent,
    /// then reclaim. The acceptance flag is cleared before reclamation
    /// runs, even when reclamation aborts on the busy re-check.
    pub async fn task_completed(&self, agent: &dyn HostAgent, task: &str, duration: Duration) {
        info!(agent = %agent.name(), task, ?duration, "Task completed");
        agent.set_accepting_tasks(false);
        self.controller.reclaim(agent).await;
    }

    /// Problem completion is treated as terminal regardless; the
    /// acceptance flag is left untouched.
    pub async fn task_completed_with_problems(
        &self,
        agent: &dyn HostAgent,
        task: &str,
        duration: Duration,
        problem: &str,
    ) {
        warn!(agent = %agent.name(), task, ?duration, problem, "Task completed with problems");
        self.controller.reclaim(agent).await;
    }
}

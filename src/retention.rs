//! Run-once retention: the per-agent lifecycle state machine.
//!
//! The host scheduler invokes [`AgentLifecycleController::check`] once
//! per agent per cadence. Each check observes the agent's live state
//! and decides reconnect / wait / reclaim, returning the delay until
//! the next check. Reclamation is idempotent and re-validates the busy
//! count at the moment it runs, so a poll-triggered and an
//! event-triggered reclamation may interleave without
//! double-terminating a VM that just accepted new work.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::agent::HostAgent;
use crate::config::RetentionConfig;

/// Offline observations before the agent is treated as unrecoverable.
pub const MAX_RECONNECTION_RETRIES: u32 = 7;
/// Offline observations after which reconnects are forced.
const FORCE_RECONNECT_AFTER: u32 = 4;

/// Default delay until the next check.
const RECHECK: Duration = Duration::from_secs(60);
/// Delay after issuing a reconnect, giving the attempt room to finish.
const RECHECK_AFTER_RECONNECT: Duration = Duration::from_secs(120);

/// Per-agent lifecycle state.
///
/// Counted since the controller first observed the agent and never
/// reset within the agent's lifetime; removed only by
/// [`AgentLifecycleController::forget`]. Kept out of the template and
/// policy configuration so cloning those never duplicates live state.
#[derive(Debug, Clone, Default)]
struct ControllerState {
    reconnection_retries: u32,
}

/// Per-agent controller state keyed by agent name.
#[derive(Debug, Default)]
struct LifecycleStateStore {
    states: RwLock<HashMap<String, ControllerState>>,
}

impl LifecycleStateStore {
    async fn retries(&self, agent_name: &str) -> u32 {
        let states = self.states.read().await;
        states
            .get(agent_name)
            .map(|s| s.reconnection_retries)
            .unwrap_or(0)
    }

    async fn bump_retries(&self, agent_name: &str) -> u32 {
        let mut states = self.states.write().await;
        let state = states.entry(agent_name.to_string()).or_default();
        state.reconnection_retries += 1;
        state.reconnection_retries
    }

    async fn forget(&self, agent_name: &str) {
        let mut states = self.states.write().await;
        states.remove(agent_name);
    }
}

/// The retention policy for run-once VM-backed agents.
///
/// One controller serves the whole fleet; state is tracked per agent
/// in the store. No lock is held across `connect` or `terminate`.
pub struct AgentLifecycleController {
    config: RetentionConfig,
    states: LifecycleStateStore,
}

impl AgentLifecycleController {
    pub fn new(config: RetentionConfig) -> Self {
        Self {
            config,
            states: LifecycleStateStore::default(),
        }
    }

    /// Minutes an agent may sit idle before reclamation.
    pub fn idle_minutes(&self) -> u64 {
        self.config.idle_minutes
    }

    /// Offline observations recorded for an agent so far.
    pub async fn reconnection_retries(&self, agent_name: &str) -> u32 {
        self.states.retries(agent_name).await
    }

    /// One poll cycle for one agent.
    ///
    /// Returns the delay until the host should check this agent again.
    /// A failure affecting this agent is contained to this cycle; the
    /// next scheduled check is the only recovery path.
    pub async fn check(&self, agent: &dyn HostAgent) -> Duration {
        let name = agent.name();
        debug!(agent = %name, "Checking agent");

        let busy = agent.busy_executor_count();
        if busy > 1 {
            info!(agent = %name, busy, "Agent has multiple busy executors");
            return RECHECK;
        }

        if agent.is_connecting() {
            return RECHECK;
        }

        if agent.is_scheduling_or_pulling() {
            // image or workload still being staged - wait
            return RECHECK;
        }

        let retries = self.states.retries(&name).await;
        if retries >= MAX_RECONNECTION_RETRIES {
            info!(agent = %name, retries, "Reconnection retry budget exhausted");
            self.reclaim(agent).await;
            return RECHECK;
        }

        if !agent.is_online() {
            // forced reconnects only once soft attempts have gone
            // unanswered for a while
            let forced = retries > FORCE_RECONNECT_AFTER;
            info!(agent = %name, retries, forced, "Agent is offline, reconnecting");
            if let Err(e) = agent.connect(forced).await {
                warn!(agent = %name, "Reconnect request failed: {e}");
            }
            self.states.bump_retries(&name).await;
            return RECHECK_AFTER_RECONNECT;
        }

        if agent.is_idle() {
            if let Some(idle_since) = agent.idle_since() {
                let idle_for = idle_since.elapsed();
                if idle_for > self.config.idle_timeout() {
                    info!(agent = %name, ?idle_for, "Reclaiming agent after idle timeout");
                    self.reclaim(agent).await;
                }
            }
        }

        RECHECK
    }

    /// Reclaim the agent's slot and terminate the backing VM when safe.
    ///
    /// Idempotent and advisory, not transactional: node existence and
    /// the busy count are re-read here, so a task that started between
    /// the trigger and this call aborts the reclamation harmlessly.
    /// Callable from the idle timeout, retry exhaustion, or task
    /// completion, concurrently or interleaved.
    pub async fn reclaim(&self, agent: &dyn HostAgent) {
        let name = agent.name();
        let Some(node) = agent.node() else {
            debug!(agent = %name, "No node to reclaim");
            return;
        };

        if agent.busy_executor_count() > 1 {
            info!(agent = %name, "Agent became busy again, not terminating");
            return;
        }

        if node.can_terminate() {
            info!(agent = %name, node = %node.node_name(), "Terminating node");
            if let Err(e) = node.terminate().await {
                // best effort - the next poll or an external reaper retries
                warn!(agent = %name, "Failed to terminate node: {e}");
            }
        } else {
            info!(
                agent = %name,
                node = %node.node_name(),
                "Not terminating node due to termination configuration"
            );
        }
    }

    /// Drop per-agent state once the host retires the agent.
    pub async fn forget(&self, agent_name: &str) {
        self.states.forget(agent_name).await;
    }
}

//! Bootstrap reconciliation of known agents against VM reality.
//!
//! While the host process is still below its fully-started milestone,
//! the scheduler's view of each agent is inherently stale: VMs may have
//! died or finished their work while the process was down. Each agent
//! is reconciled once against the management service before normal
//! polling is trusted.

use std::sync::Arc;

use tracing::{info, warn};

use crate::agent::{HostAgent, HostRuntime};
use crate::cloud::CloudDirectory;
use crate::error::Result;

/// Outcome of one bootstrap reconciliation.
enum Reconciled {
    /// Instance is alive; a forced reconnect was issued.
    Reconnected,
    /// Instance is gone or never started; it was torn down and no
    /// connection attempt must follow.
    InstanceGone,
    /// The agent's cloud is not registered; fall back to a normal
    /// connect.
    UnknownCloud,
}

/// Reconciles agents during process bootstrap, then hands off to the
/// normal connect path.
pub struct StartupReconciler {
    clouds: Arc<CloudDirectory>,
    runtime: Arc<dyn HostRuntime>,
}

impl StartupReconciler {
    pub fn new(clouds: Arc<CloudDirectory>, runtime: Arc<dyn HostRuntime>) -> Self {
        Self { clouds, runtime }
    }

    /// Entry point invoked when the scheduler first brings an agent
    /// online.
    pub async fn start(&self, agent: &dyn HostAgent) {
        if !self.runtime.startup_complete() {
            match self.reconcile(agent).await {
                Ok(Reconciled::Reconnected) | Ok(Reconciled::InstanceGone) => return,
                Ok(Reconciled::UnknownCloud) => {}
                Err(e) => {
                    // leave the agent untouched until the next normal poll
                    warn!(agent = %agent.name(), "Reconciliation failed: {e}");
                    return;
                }
            }
        }

        info!(agent = %agent.name(), "Start requested");
        if let Err(e) = agent.connect(false).await {
            warn!(agent = %agent.name(), "Connect request failed: {e}");
        }
    }

    /// Reconcile one agent against the current instance record.
    async fn reconcile(&self, agent: &dyn HostAgent) -> Result<Reconciled> {
        let name = agent.name();
        let cloud_name = agent.cloud_name();
        let Some(cloud) = self.clouds.get(&cloud_name).await else {
            warn!(agent = %name, cloud = %cloud_name, "Unknown cloud, skipping reconciliation");
            return Ok(Reconciled::UnknownCloud);
        };

        let instance_id = agent.instance_id();
        match cloud.show_instance(&instance_id).await? {
            Some(instance) if instance.is_started() => {
                info!(agent = %name, instance = %instance_id, "Instance is started, forcing reconnect");
                if let Err(e) = agent.connect(true).await {
                    warn!(agent = %name, "Forced reconnect request failed: {e}");
                }
                Ok(Reconciled::Reconnected)
            }
            _ => {
                info!(agent = %name, instance = %instance_id, "Instance gone or not started, tearing down");
                match agent.node() {
                    Some(node) => {
                        if let Err(e) = node.terminate().await {
                            warn!(agent = %name, "Failed to terminate node: {e}");
                        }
                    }
                    // no node left to own the teardown
                    None => cloud.terminate_vm_instance(&instance_id).await?,
                }
                Ok(Reconciled::InstanceGone)
            }
        }
    }
}

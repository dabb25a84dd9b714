//! Connection-strategy selection and launch driving.
//!
//! Picks the transport (by VM network identity) used to reach the agent
//! process on a newly-ready VM, and hands the descriptor to the
//! host-provided transport. SSH endpoints are rebuilt on every launch
//! attempt because the instance's host IP and forwarded ports only
//! appear some time after the VM starts; JNLP descriptors depend on the
//! template alone.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::agent::HostAgent;
use crate::cloud::CloudClient;
use crate::config::{AgentTemplate, LaunchMethod};
use crate::error::Result;
use crate::instance::VmInstance;

/// Transport-level timeout for a single launch.
pub const LAUNCH_TIMEOUT: Duration = Duration::from_secs(2000);
/// Transport-level retry count within a single launch.
pub const MAX_LAUNCH_RETRIES: u32 = 5;
/// Wait between transport-level retries.
pub const RETRY_WAIT: Duration = Duration::from_millis(100);

/// Connection descriptor for one transport family.
///
/// The timeout/retry fields on the SSH variant are resilience knobs of
/// one connection attempt; the lifecycle controller keeps its own
/// reconnection counter across poll cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionDescriptor {
    Ssh {
        host: String,
        port: u16,
        credentials_id: Option<String>,
        java_args: Option<String>,
        launch_timeout: Duration,
        max_retries: u32,
        retry_wait: Duration,
    },
    Jnlp {
        tunnel: Option<String>,
        extra_args: Option<String>,
    },
}

/// Outcome of connection-strategy selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Transport endpoint is known; a launch may proceed.
    Ready(ConnectionDescriptor),
    /// The instance has not published the network identity this
    /// transport needs; try again on a later poll.
    Pending,
}

/// Pick the transport descriptor for reaching `instance`'s agent process.
pub fn select(template: &AgentTemplate, instance: &VmInstance) -> Result<Selection> {
    match template.launch_method()? {
        LaunchMethod::Jnlp => Ok(Selection::Ready(ConnectionDescriptor::Jnlp {
            tunnel: template.tunnel.clone(),
            extra_args: template.extra_args.clone(),
        })),
        LaunchMethod::Ssh => {
            let Some(vm_info) = &instance.vm_info else {
                return Ok(Selection::Pending);
            };
            let Some(host) = &vm_info.host_ip else {
                return Ok(Selection::Pending);
            };
            let Some(port) = vm_info.forwarded_port(template.ssh_port) else {
                return Ok(Selection::Pending);
            };
            Ok(Selection::Ready(ConnectionDescriptor::Ssh {
                host: host.clone(),
                port,
                credentials_id: template.credentials_id.clone(),
                java_args: template.java_args.clone(),
                launch_timeout: LAUNCH_TIMEOUT,
                max_retries: MAX_LAUNCH_RETRIES,
                retry_wait: RETRY_WAIT,
            }))
        }
    }
}

/// Per-agent log sink consumed by the host's UI.
pub trait LogSink: Send + Sync {
    fn line(&self, message: &str);
}

/// Log sink that forwards to the tracing subscriber.
pub struct TracingSink;

impl LogSink for TracingSink {
    fn line(&self, message: &str) {
        info!("{message}");
    }
}

/// Host-provided connection primitive for a selected descriptor.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the agent connection described by `descriptor`.
    ///
    /// Carries its own timeout/retry policy from the descriptor; the
    /// warden does not retry a failed launch within the same poll.
    async fn launch(
        &self,
        descriptor: &ConnectionDescriptor,
        agent: &dyn HostAgent,
        log: &dyn LogSink,
    ) -> Result<()>;
}

/// Drives selection and launch for one agent's backing instance.
pub struct AgentLauncher {
    cloud: Arc<dyn CloudClient>,
    transport: Arc<dyn Transport>,
    template: AgentTemplate,
    instance_id: String,
}

impl AgentLauncher {
    /// Fails with a configuration error when the template's launch
    /// method is unknown, before any launch is attempted.
    pub fn new(
        cloud: Arc<dyn CloudClient>,
        transport: Arc<dyn Transport>,
        template: AgentTemplate,
        instance_id: String,
    ) -> Result<Self> {
        template.launch_method()?;
        Ok(Self {
            cloud,
            transport,
            template,
            instance_id,
        })
    }

    /// One launch attempt against the current instance snapshot.
    ///
    /// Skips without error while the instance is unknown, not yet
    /// started, or still missing the network identity the selected
    /// transport needs; the next poll cycle retries.
    pub async fn launch(&self, agent: &dyn HostAgent, log: &dyn LogSink) -> Result<()> {
        let Some(instance) = self.cloud.show_instance(&self.instance_id).await? else {
            return Ok(());
        };

        if !instance.is_started() {
            log.line(&format!(
                "Instance {} is in state {}",
                self.instance_id, instance.session_state
            ));
            return Ok(());
        }

        log.line(&format!("Instance {} is started", self.instance_id));
        let Some(vm_name) = instance.vm_info.as_ref().map(|info| info.name.clone()) else {
            return Ok(());
        };

        match select(&self.template, &instance)? {
            Selection::Pending => {
                log.line(&format!(
                    "Instance {} has not published its endpoint yet",
                    self.instance_id
                ));
                Ok(())
            }
            Selection::Ready(descriptor) => {
                match &descriptor {
                    ConnectionDescriptor::Ssh { host, port, .. } => log.line(&format!(
                        "Launching SSH connection for {} via {}:{}",
                        self.instance_id, host, port
                    )),
                    ConnectionDescriptor::Jnlp { .. } => {
                        log.line(&format!("Launching JNLP for {}", self.instance_id))
                    }
                }
                self.transport.launch(&descriptor, agent, log).await?;
                agent.set_display_name(&vm_name);
                Ok(())
            }
        }
    }
}

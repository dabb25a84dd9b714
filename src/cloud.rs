//! VM-management service abstraction.
//!
//! The warden never provisions VMs itself; it reads instance snapshots
//! and requests best-effort teardown through whichever management
//! endpoint the host registered for the agent's cloud.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::instance::{SessionState, VmInstance, VmNetworkInfo};

/// Client for one VM-management endpoint.
///
/// Both calls cross the network and may take non-trivial wall-clock
/// time; callers must not hold agent-wide locks across them.
#[async_trait]
pub trait CloudClient: Send + Sync {
    /// Look up the live record for a provisioned VM.
    ///
    /// `None` means the management service no longer knows the instance.
    async fn show_instance(&self, instance_id: &str) -> Result<Option<VmInstance>>;

    /// Best-effort instance teardown, used when no node owns the VM.
    async fn terminate_vm_instance(&self, instance_id: &str) -> Result<()>;
}

/// Resolves a cloud name to its client.
///
/// Hosts typically register several management endpoints; each agent
/// records which cloud provisioned its VM.
#[derive(Default)]
pub struct CloudDirectory {
    clouds: RwLock<HashMap<String, Arc<dyn CloudClient>>>,
}

impl CloudDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a management endpoint under a cloud name.
    pub async fn register(&self, name: impl Into<String>, client: Arc<dyn CloudClient>) {
        let name = name.into();
        let mut clouds = self.clouds.write().await;
        clouds.insert(name, client);
    }

    /// Look up the client for a cloud name.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn CloudClient>> {
        let clouds = self.clouds.read().await;
        clouds.get(name).cloned()
    }
}

/// In-memory VM-management service for dry-run and testing.
///
/// Mirrors the real management API closely enough to drive the full
/// agent lifecycle: instances can be provisioned, flipped to started,
/// and terminated.
#[derive(Default)]
pub struct MockCloud {
    instances: RwLock<HashMap<String, VmInstance>>,
}

impl MockCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a new instance in `Scheduling` state, returning its id.
    pub async fn provision(&self) -> String {
        let id = format!("inst-{}", &Uuid::new_v4().to_string()[..8]);
        let instance = VmInstance {
            id: id.clone(),
            started: false,
            session_state: SessionState::Scheduling,
            vm_info: None,
        };
        self.instances.write().await.insert(id.clone(), instance);
        info!(instance = %id, "DRY-RUN: Provisioned instance");
        id
    }

    /// Mark an instance started with the given network identity.
    pub async fn mark_started(&self, instance_id: &str, vm_info: VmNetworkInfo) {
        let mut instances = self.instances.write().await;
        if let Some(instance) = instances.get_mut(instance_id) {
            instance.started = true;
            instance.session_state = SessionState::Started;
            instance.vm_info = Some(vm_info);
        }
    }

    /// Insert a fully-formed instance snapshot.
    pub async fn insert(&self, instance: VmInstance) {
        let mut instances = self.instances.write().await;
        instances.insert(instance.id.clone(), instance);
    }

    /// Whether the cloud still knows an instance.
    pub async fn contains(&self, instance_id: &str) -> bool {
        self.instances.read().await.contains_key(instance_id)
    }
}

#[async_trait]
impl CloudClient for MockCloud {
    async fn show_instance(&self, instance_id: &str) -> Result<Option<VmInstance>> {
        let instances = self.instances.read().await;
        Ok(instances.get(instance_id).cloned())
    }

    async fn terminate_vm_instance(&self, instance_id: &str) -> Result<()> {
        let removed = {
            let mut instances = self.instances.write().await;
            instances.remove(instance_id).is_some()
        };
        if removed {
            info!(instance = %instance_id, "DRY-RUN: Terminated instance");
        }
        Ok(())
    }
}

//! Live VM instance snapshots reported by the VM-management service.
//!
//! Instances are created and mutated exclusively by the management
//! service; the warden only reads snapshots of them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Session state of an instance as reported by the management service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Instance is waiting for a host to be picked.
    Scheduling,
    /// VM image is being pulled to the host.
    Pulling,
    /// VM is up.
    Started,
    /// VM is being stopped.
    Stopping,
    /// VM has stopped.
    Stopped,
    /// Instance failed.
    Error,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Scheduling => "scheduling",
            SessionState::Pulling => "pulling",
            SessionState::Started => "started",
            SessionState::Stopping => "stopping",
            SessionState::Stopped => "stopped",
            SessionState::Error => "error",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network identity of a booted VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmNetworkInfo {
    /// VM name assigned by the management service.
    pub name: String,
    /// Host IP the VM is reachable through, once published.
    pub host_ip: Option<String>,
    /// Port forwards from logical guest port to actual host port.
    #[serde(default)]
    pub forwarded_ports: HashMap<u16, u16>,
}

impl VmNetworkInfo {
    /// Look up the actual host port forwarded for a logical guest port.
    pub fn forwarded_port(&self, logical: u16) -> Option<u16> {
        self.forwarded_ports.get(&logical).copied()
    }
}

/// Snapshot of one VM instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmInstance {
    /// Instance identifier assigned by the management service.
    pub id: String,
    /// Whether the VM has reached the started state.
    pub started: bool,
    /// Current session state.
    pub session_state: SessionState,
    /// Network identity, available some time after the VM starts.
    pub vm_info: Option<VmNetworkInfo>,
}

impl VmInstance {
    pub fn is_started(&self) -> bool {
        self.started
    }
}

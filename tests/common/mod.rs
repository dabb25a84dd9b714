//! Shared test doubles: a scripted host agent, node, runtime, and
//! transport.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use vm_warden::agent::{HostAgent, HostRuntime, NodeHandle};
use vm_warden::error::{Error, Result};
use vm_warden::launcher::{ConnectionDescriptor, LogSink, Transport};

/// Scripted host agent whose state tests mutate directly.
pub struct FakeAgent {
    pub name: String,
    pub cloud: String,
    pub instance: String,
    pub busy: AtomicUsize,
    pub connecting: AtomicBool,
    pub scheduling_or_pulling: AtomicBool,
    pub online: AtomicBool,
    pub idle_since: Mutex<Option<Instant>>,
    pub accepting: AtomicBool,
    pub fail_connect: AtomicBool,
    pub node: Mutex<Option<Arc<FakeNode>>>,
    pub display_name: Mutex<Option<String>>,
    /// Forced flags of connect requests, in call order.
    pub connects: Mutex<Vec<bool>>,
}

impl FakeAgent {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cloud: "build-cloud".to_string(),
            instance: "inst-1".to_string(),
            busy: AtomicUsize::new(0),
            connecting: AtomicBool::new(false),
            scheduling_or_pulling: AtomicBool::new(false),
            online: AtomicBool::new(true),
            idle_since: Mutex::new(None),
            accepting: AtomicBool::new(true),
            fail_connect: AtomicBool::new(false),
            node: Mutex::new(None),
            display_name: Mutex::new(None),
            connects: Mutex::new(Vec::new()),
        }
    }

    pub fn with_node(self, node: Arc<FakeNode>) -> Self {
        *self.node.lock().unwrap() = Some(node);
        self
    }

    pub fn set_idle_for(&self, idle_for: Duration) {
        *self.idle_since.lock().unwrap() = Some(Instant::now() - idle_for);
    }

    pub fn connect_calls(&self) -> Vec<bool> {
        self.connects.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostAgent for FakeAgent {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn busy_executor_count(&self) -> usize {
        self.busy.load(Ordering::SeqCst)
    }

    fn is_connecting(&self) -> bool {
        self.connecting.load(Ordering::SeqCst)
    }

    fn is_scheduling_or_pulling(&self) -> bool {
        self.scheduling_or_pulling.load(Ordering::SeqCst)
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn is_idle(&self) -> bool {
        self.idle_since.lock().unwrap().is_some()
    }

    fn idle_since(&self) -> Option<Instant> {
        *self.idle_since.lock().unwrap()
    }

    fn accepting_tasks(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    fn set_accepting_tasks(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }

    fn cloud_name(&self) -> String {
        self.cloud.clone()
    }

    fn instance_id(&self) -> String {
        self.instance.clone()
    }

    fn node(&self) -> Option<Arc<dyn NodeHandle>> {
        self.node
            .lock()
            .unwrap()
            .clone()
            .map(|n| n as Arc<dyn NodeHandle>)
    }

    fn set_display_name(&self, name: &str) {
        *self.display_name.lock().unwrap() = Some(name.to_string());
    }

    async fn connect(&self, forced: bool) -> Result<()> {
        self.connects.lock().unwrap().push(forced);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(Error::Launch("scripted connect failure".to_string()));
        }
        Ok(())
    }
}

/// Scripted node handle counting termination attempts.
pub struct FakeNode {
    pub name: String,
    pub can_terminate: AtomicBool,
    pub fail_terminate: AtomicBool,
    pub terminations: AtomicUsize,
}

impl FakeNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            can_terminate: AtomicBool::new(true),
            fail_terminate: AtomicBool::new(false),
            terminations: AtomicUsize::new(0),
        }
    }

    pub fn termination_count(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeHandle for FakeNode {
    fn node_name(&self) -> String {
        self.name.clone()
    }

    fn can_terminate(&self) -> bool {
        self.can_terminate.load(Ordering::SeqCst)
    }

    async fn terminate(&self) -> Result<()> {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        if self.fail_terminate.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::other("scripted terminate failure")));
        }
        Ok(())
    }
}

/// Host runtime pinned to one bootstrap state.
pub struct FixedRuntime(pub bool);

impl HostRuntime for FixedRuntime {
    fn startup_complete(&self) -> bool {
        self.0
    }
}

/// Transport that records every descriptor it was asked to launch.
#[derive(Default)]
pub struct RecordingTransport {
    pub launches: Mutex<Vec<ConnectionDescriptor>>,
    pub fail: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn launch(
        &self,
        descriptor: &ConnectionDescriptor,
        _agent: &dyn HostAgent,
        _log: &dyn LogSink,
    ) -> Result<()> {
        self.launches.lock().unwrap().push(descriptor.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Launch("scripted transport failure".to_string()));
        }
        Ok(())
    }
}

/// Log sink collecting lines for assertions.
#[derive(Default)]
pub struct CollectingSink {
    pub lines: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().unwrap().iter().any(|l| l.contains(needle))
    }
}

impl LogSink for CollectingSink {
    fn line(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }
}

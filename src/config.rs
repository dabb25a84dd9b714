//! Configuration for vm-warden.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Transport family used to reach the agent process on a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMethod {
    Ssh,
    Jnlp,
}

impl std::fmt::Display for LaunchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaunchMethod::Ssh => write!(f, "ssh"),
            LaunchMethod::Jnlp => write!(f, "jnlp"),
        }
    }
}

impl FromStr for LaunchMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ssh" => Ok(LaunchMethod::Ssh),
            "jnlp" => Ok(LaunchMethod::Jnlp),
            _ => Err(Error::Config(format!("Unknown launch method: {s}"))),
        }
    }
}

/// Main configuration structure loaded from TOML file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Retention policy settings (optional)
    #[serde(default)]
    pub retention: RetentionConfig,
    /// Agent class templates
    #[serde(default, rename = "template")]
    pub templates: Vec<AgentTemplate>,
}

/// Retention policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    /// Minutes an agent may sit idle before it is reclaimed
    #[serde(default = "default_idle_minutes")]
    pub idle_minutes: u64,
}

fn default_idle_minutes() -> u64 {
    1
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            idle_minutes: default_idle_minutes(),
        }
    }
}

impl RetentionConfig {
    /// Idle timeout as a duration.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_minutes * 60)
    }
}

/// Immutable configuration for one agent class.
///
/// Templates carry no live state; per-agent counters live in the
/// lifecycle state store, so a template may be cloned or shared freely.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentTemplate {
    /// Template name referenced by the host cloud configuration
    pub name: String,
    /// Launch method: "ssh" or "jnlp"
    pub launch_method: String,
    /// Credentials id for SSH launches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_id: Option<String>,
    /// Extra JVM arguments passed to the remote agent process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_args: Option<String>,
    /// Logical SSH port key into the instance's forwarded-ports map
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
    /// JNLP tunnel in "host:port" form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tunnel: Option<String>,
    /// Extra arguments for the JNLP agent command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_args: Option<String>,
}

fn default_ssh_port() -> u16 {
    22
}

impl AgentTemplate {
    /// Parse the configured launch method.
    ///
    /// An unknown value is a configuration error, fatal at
    /// construction time and never retried.
    pub fn launch_method(&self) -> Result<LaunchMethod> {
        self.launch_method.parse()
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate required fields, collecting every problem at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        for template in &self.templates {
            if template.name.is_empty() {
                errors.push("template.name: Name referenced by the host cloud".to_string());
            }
            if let Err(e) = template.launch_method() {
                errors.push(format!("template '{}': {}", template.name, e));
            }
        }

        if !errors.is_empty() {
            return Err(Error::Config(format!(
                "Configuration incomplete:\n  - {}",
                errors.join("\n  - ")
            )));
        }

        Ok(())
    }
}

//! Simulation configuration parser (TOML).
//!
//! A configuration names the hosts to build, the scheduler / data loader /
//! visualization to select by registry name, and the run parameters. Unknown
//! keys are rejected so a typo never silently falls back to a default.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Labels;
use crate::units::{QuantityError, parse_cpu, parse_memory};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid {field}: {source}")]
    Quantity {
        field: String,
        #[source]
        source: QuantityError,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    #[serde(default = "default_steps")]
    pub steps: u64,
    pub scheduler: String,
    pub dataloader: String,
    #[serde(default = "default_visualization")]
    pub visualization: String,
    /// Seed for every random choice made during a run.
    #[serde(default)]
    pub seed: u64,
    /// Artificial pause between ticks, for pacing only.
    #[serde(default)]
    pub step_delay_ms: u64,
    #[serde(default = "default_runtime_steps")]
    pub workload_runtime_steps: u64,
    #[serde(default = "default_deadline")]
    pub default_deadline: u64,
    /// Directory used by file-backed visualization sinks.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Input file for the trace data loader.
    #[serde(default)]
    pub trace_path: Option<PathBuf>,
    #[serde(default)]
    pub solver: SolverConfig,
    pub hosts: Vec<HostSpec>,
}

/// A host to instantiate as a simulated node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostSpec {
    pub name: String,
    /// Device type, e.g. `xaviernx` or `rpi`.
    pub device: String,
    /// CPU capacity override (`"6"`, `"3000m"`).
    #[serde(default)]
    pub cpu: Option<String>,
    /// Memory capacity override (`"8Gi"`).
    #[serde(default)]
    pub memory: Option<String>,
    #[serde(default)]
    pub labels: Labels,
}

/// Parameters of the dual-descent solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverConfig {
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iters")]
    pub max_iters: usize,
    /// Subgradient step size. Zero picks `1 / node count`.
    #[serde(default)]
    pub step_size: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            max_iters: default_max_iters(),
            step_size: 0.0,
        }
    }
}

fn default_steps() -> u64 {
    20
}

fn default_visualization() -> String {
    "log".to_string()
}

fn default_runtime_steps() -> u64 {
    3
}

fn default_deadline() -> u64 {
    5
}

fn default_tolerance() -> f64 {
    1e-3
}

fn default_max_iters() -> usize {
    100
}

impl HostSpec {
    pub fn new(name: &str, device: &str) -> Self {
        Self {
            name: name.to_string(),
            device: device.to_string(),
            cpu: None,
            memory: None,
            labels: Labels::new(),
        }
    }

    pub fn with_capacity(mut self, cpu: &str, memory: &str) -> Self {
        self.cpu = Some(cpu.to_string());
        self.memory = Some(memory.to_string());
        self
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    /// CPU override in millicores, if one is set.
    pub fn cpu_millicores(&self) -> ConfigResult<Option<u64>> {
        self.cpu
            .as_deref()
            .map(|v| {
                parse_cpu(v).map_err(|source| ConfigError::Quantity {
                    field: format!("hosts.{}.cpu", self.name),
                    source,
                })
            })
            .transpose()
    }

    /// Memory override in bytes, if one is set.
    pub fn memory_bytes(&self) -> ConfigResult<Option<u64>> {
        self.memory
            .as_deref()
            .map(|v| {
                parse_memory(v).map_err(|source| ConfigError::Quantity {
                    field: format!("hosts.{}.memory", self.name),
                    source,
                })
            })
            .transpose()
    }
}

impl SimConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: SimConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Structural checks that do not depend on any registry.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.steps == 0 {
            return Err(ConfigError::Invalid("steps must be at least 1".into()));
        }
        if self.workload_runtime_steps == 0 {
            return Err(ConfigError::Invalid(
                "workload_runtime_steps must be at least 1".into(),
            ));
        }
        if self.hosts.is_empty() {
            return Err(ConfigError::Invalid("at least one host is required".into()));
        }

        let mut seen = HashSet::new();
        for host in &self.hosts {
            if host.name.trim().is_empty() {
                return Err(ConfigError::Invalid("host name must not be empty".into()));
            }
            if !seen.insert(host.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate host name: {}",
                    host.name
                )));
            }
            host.cpu_millicores()?;
            host.memory_bytes()?;
        }

        if !(self.solver.tolerance > 0.0) {
            return Err(ConfigError::Invalid("solver.tolerance must be positive".into()));
        }
        if self.solver.max_iters == 0 {
            return Err(ConfigError::Invalid("solver.max_iters must be at least 1".into()));
        }
        if !(self.solver.step_size >= 0.0) {
            return Err(ConfigError::Invalid(
                "solver.step_size must be zero or positive".into(),
            ));
        }
        Ok(())
    }

    /// Minimal configuration for a set of hosts, used by tests and scaffolding.
    pub fn scaffold(scheduler: &str, dataloader: &str, hosts: Vec<HostSpec>) -> Self {
        SimConfig {
            steps: default_steps(),
            scheduler: scheduler.to_string(),
            dataloader: dataloader.to_string(),
            visualization: default_visualization(),
            seed: 0,
            step_delay_ms: 0,
            workload_runtime_steps: default_runtime_steps(),
            default_deadline: default_deadline(),
            output_dir: None,
            trace_path: None,
            solver: SolverConfig::default(),
            hosts,
        }
    }
}

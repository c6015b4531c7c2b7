pub mod config;
pub mod types;
pub mod units;

pub use config::{ConfigError, ConfigResult, HostSpec, SimConfig, SolverConfig};
pub use types::*;
pub use units::{QuantityError, format_cpu, format_memory, parse_cpu, parse_memory};

//! Name → constructor table for visualization sinks.

use std::path::Path;

use crate::error::{SinkError, SinkResult};
use crate::file::{JsonLinesSink, PrometheusSink};
use crate::sink::{MetricsSink, NullSink, TracingSink};

pub const SINK_NAMES: [&str; 4] = ["log", "jsonl", "prometheus", "none"];

/// Build the sink registered under `name`. File sinks need `output_dir`.
pub fn build_sink(name: &str, output_dir: Option<&Path>) -> SinkResult<Box<dyn MetricsSink>> {
    let require_dir = || output_dir.ok_or_else(|| SinkError::MissingOutputDir(name.to_string()));
    let sink: Box<dyn MetricsSink> = match name {
        "log" => Box::new(TracingSink),
        "jsonl" => Box::new(JsonLinesSink::create(require_dir()?)?),
        "prometheus" => Box::new(PrometheusSink::create(require_dir()?)?),
        "none" => Box::new(NullSink),
        other => return Err(SinkError::UnknownSink(other.to_string())),
    };
    Ok(sink)
}

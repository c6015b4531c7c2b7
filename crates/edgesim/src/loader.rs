//! Data loaders: where each tick's new workloads come from.

use std::path::{Path, PathBuf};

use edgesim_core::{SimConfig, WorkloadSpec};
use tracing::info;

use crate::error::{SimError, SimResult};

/// Produces the batch of new workloads for every tick.
pub trait DataLoader {
    fn name(&self) -> &str;

    fn next(&mut self) -> SimResult<Vec<WorkloadSpec>>;
}

/// Replays a fixed list of batches, wrapping around at the end.
#[derive(Debug, Clone)]
struct Cycle {
    batches: Vec<Vec<WorkloadSpec>>,
    index: usize,
}

impl Cycle {
    fn new(batches: Vec<Vec<WorkloadSpec>>) -> Self {
        Self { batches, index: 0 }
    }

    fn next(&mut self) -> Vec<WorkloadSpec> {
        if self.batches.is_empty() {
            return Vec::new();
        }
        let batch = self.batches[self.index].clone();
        self.index = (self.index + 1) % self.batches.len();
        batch
    }
}

/// One object counter (2 cores, 3Gi) per tick.
#[derive(Debug, Clone)]
pub struct SimpleLoader {
    cycle: Cycle,
}

impl Default for SimpleLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleLoader {
    pub fn new() -> Self {
        Self {
            cycle: Cycle::new(vec![vec![WorkloadSpec::new("object-counter", "2000m", "3Gi")]]),
        }
    }
}

impl DataLoader for SimpleLoader {
    fn name(&self) -> &str {
        "simple"
    }

    fn next(&mut self) -> SimResult<Vec<WorkloadSpec>> {
        Ok(self.cycle.next())
    }
}

/// The science-rule job mix of a camera-and-microphone edge node:
/// hourly image sampling, cloud cover every ten minutes, object counting
/// and motion detection every five, sound events every ten. One tick is
/// five minutes; ten ticks make one cycle.
#[derive(Debug, Clone)]
pub struct JobLoader {
    cycle: Cycle,
}

impl Default for JobLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl JobLoader {
    pub fn new() -> Self {
        let imagesampler = WorkloadSpec::new("imagesampler", "100m", "10Mi");
        let cloudcover = WorkloadSpec::new("cloudcover", "1500m", "2500Mi").with_label("resource.gpu", "true");
        let objectcounter = WorkloadSpec::new("objectcounter", "2000m", "3Gi").with_label("resource.gpu", "true");
        let motiondetection = WorkloadSpec::new("motiondetection", "1000m", "1Gi");
        let soundeventdetection = WorkloadSpec::new("soundeventdetection", "1000m", "200Mi");

        let full = vec![
            imagesampler,
            cloudcover.clone(),
            objectcounter.clone(),
            motiondetection.clone(),
            soundeventdetection.clone(),
        ];
        let ten_minute = vec![
            cloudcover,
            objectcounter.clone(),
            motiondetection.clone(),
            soundeventdetection,
        ];
        let five_minute = vec![objectcounter, motiondetection];

        let mut batches = vec![full, five_minute.clone()];
        for _ in 0..4 {
            batches.push(ten_minute.clone());
            batches.push(five_minute.clone());
        }
        Self {
            cycle: Cycle::new(batches),
        }
    }

    pub fn batch_count(&self) -> usize {
        self.cycle.batches.len()
    }
}

impl DataLoader for JobLoader {
    fn name(&self) -> &str {
        "job"
    }

    fn next(&mut self) -> SimResult<Vec<WorkloadSpec>> {
        Ok(self.cycle.next())
    }
}

/// Replays batches recorded in a JSON file:
///
/// ```text
/// [
///   [{"name": "detector", "request_cpu": "500m", "request_memory": "1Gi",
///     "labels": {"resource.gpu": "true"}}],
///   [],
///   [{"name": "sampler"}]
/// ]
/// ```
///
/// Missing requests default to 100m / 1Mi. The trace wraps around when
/// the run is longer than the file.
#[derive(Debug, Clone)]
pub struct TraceLoader {
    cycle: Cycle,
}

impl TraceLoader {
    pub fn from_file(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SimError::TraceIo {
            path: path.to_path_buf(),
            source,
        })?;
        let batches: Vec<Vec<WorkloadSpec>> =
            serde_json::from_str(&content).map_err(|source| SimError::TraceFormat {
                path: path.to_path_buf(),
                source,
            })?;
        if batches.is_empty() {
            return Err(SimError::EmptyTrace(path.to_path_buf()));
        }
        info!(path = %path.display(), batches = batches.len(), "trace loaded");
        Ok(Self::from_batches(batches))
    }

    pub fn from_batches(batches: Vec<Vec<WorkloadSpec>>) -> Self {
        Self {
            cycle: Cycle::new(batches),
        }
    }
}

impl DataLoader for TraceLoader {
    fn name(&self) -> &str {
        "trace"
    }

    fn next(&mut self) -> SimResult<Vec<WorkloadSpec>> {
        Ok(self.cycle.next())
    }
}

pub const LOADER_NAMES: [&str; 3] = ["simple", "job", "trace"];

/// Build the loader the config names.
pub fn build_loader(config: &SimConfig) -> SimResult<Box<dyn DataLoader>> {
    let loader: Box<dyn DataLoader> = match config.dataloader.as_str() {
        "simple" => Box::new(SimpleLoader::new()),
        "job" => Box::new(JobLoader::new()),
        "trace" => {
            let path: &PathBuf = config.trace_path.as_ref().ok_or(SimError::MissingTracePath)?;
            Box::new(TraceLoader::from_file(path)?)
        }
        other => return Err(SimError::UnknownLoader(other.to_string())),
    };
    Ok(loader)
}

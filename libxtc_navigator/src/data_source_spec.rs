use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use super::error::DataSourceSpecError;

/// How the record store is traversed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessMode {
    /// Random access through the run's time index (`:idx`)
    Indexed,
    /// Small-data streaming with step boundaries (`:smd`)
    Stepped,
    /// Sequential access without index or steps: shared memory, or plain files
    Live,
}

impl Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Indexed => write!(f, "idx"),
            Self::Stepped => write!(f, "smd"),
            Self::Live => write!(f, "live"),
        }
    }
}

/// Largest number of runs a single `first-last` range may expand to
pub const MAX_RUN_RANGE: i64 = 10_000;

/// A parsed data source string.
///
/// Accepted forms are `exp=<experiment>:run=<runs>[:idx|:smd]` and
/// `shmem=<server>[:...]`. Runs may be given as `54`, `54,56` or `54-56`. Other
/// `key=value` fields (`dir=`, `stream=`, ...) are kept verbatim for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceSpec {
    pub experiment: Option<String>,
    pub runs: Vec<i32>,
    pub mode: AccessMode,
    pub shmem_server: Option<String>,
    pub options: Vec<(String, String)>,
}

impl DataSourceSpec {
    /// The instrument is the first three characters of the experiment name
    pub fn instrument(&self) -> Option<&str> {
        self.experiment
            .as_deref()
            .and_then(|exp| exp.get(0..3))
    }

    pub fn first_run(&self) -> Option<i32> {
        self.runs.first().copied()
    }

    pub fn is_shared_memory(&self) -> bool {
        self.shmem_server.is_some()
    }

    /// The same data source traversed in another mode
    pub fn with_mode(&self, mode: AccessMode) -> Self {
        let mut spec = self.clone();
        spec.mode = mode;
        spec
    }

    fn parse_runs(value: &str) -> Result<Vec<i32>, DataSourceSpecError> {
        let mut runs = Vec::new();
        for part in value.split(',') {
            if let Some((first, last)) = part.split_once('-') {
                let first: i32 = first.trim().parse()?;
                let last: i32 = last.trim().parse()?;
                if last < first || i64::from(last) - i64::from(first) >= MAX_RUN_RANGE {
                    return Err(DataSourceSpecError::BadRunRange(first, last));
                }
                runs.extend(first..=last);
            } else {
                runs.push(part.trim().parse()?);
            }
        }
        Ok(runs)
    }
}

impl FromStr for DataSourceSpec {
    type Err = DataSourceSpecError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DataSourceSpecError::Empty);
        }
        let mut spec = DataSourceSpec {
            experiment: None,
            runs: Vec::new(),
            mode: AccessMode::Live,
            shmem_server: None,
            options: Vec::new(),
        };
        for field in s.split(':') {
            match field.split_once('=') {
                Some(("exp", value)) => spec.experiment = Some(value.to_string()),
                Some(("run", value)) => spec.runs = Self::parse_runs(value)?,
                Some(("shmem", value)) => spec.shmem_server = Some(value.to_string()),
                Some((key, value)) if !key.is_empty() => {
                    spec.options.push((key.to_string(), value.to_string()))
                }
                None if field == "idx" => spec.mode = AccessMode::Indexed,
                None if field == "smd" => spec.mode = AccessMode::Stepped,
                None if field == "live" => spec.mode = AccessMode::Live,
                _ => return Err(DataSourceSpecError::BadField(field.to_string())),
            }
        }

        if spec.is_shared_memory() {
            // Shared memory has neither index nor steps
            spec.mode = AccessMode::Live;
            return Ok(spec);
        }
        if spec.experiment.is_none() {
            return Err(DataSourceSpecError::MissingExperiment(s.to_string()));
        }
        if spec.runs.is_empty() {
            return Err(DataSourceSpecError::MissingRun(s.to_string()));
        }
        Ok(spec)
    }
}

impl Display for DataSourceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fields: Vec<String> = Vec::new();
        if let Some(server) = &self.shmem_server {
            fields.push(format!("shmem={server}"));
        }
        if let Some(exp) = &self.experiment {
            fields.push(format!("exp={exp}"));
        }
        if !self.runs.is_empty() {
            let runs: Vec<String> = self.runs.iter().map(|run| run.to_string()).collect();
            fields.push(format!("run={}", runs.join(",")));
        }
        for (key, value) in self.options.iter() {
            fields.push(format!("{key}={value}"));
        }
        match self.mode {
            AccessMode::Indexed => fields.push(String::from("idx")),
            AccessMode::Stepped => fields.push(String::from("smd")),
            AccessMode::Live => (),
        }
        write!(f, "{}", fields.join(":"))
    }
}

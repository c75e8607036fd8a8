use std::path::PathBuf;
use thiserror::Error;

use super::cursor::JumpTarget;
use super::data_source_spec::AccessMode;
use super::event_time::EventTime;
use super::record::RecordKey;
use super::source::Source;
use super::worker_status::WorkerStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Invalid source string {0:?}; expected the form Kind(body)")]
    BadSource(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeNameError {
    #[error("Invalid record type name {0:?}; expected <module>.<type>")]
    BadTypeName(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record {0} was not found in the record store")]
    NotFound(RecordKey),
    #[error("EventTime {0:?} is not part of the run index")]
    TimeNotFound(EventTime),
    #[error("Event index {0} is out of range for a run with {1} events")]
    IndexOutOfRange(i64, usize),
    #[error("Run {0} is not present in the run archive")]
    RunNotFound(i32),
    #[error("Run archive has no runs for experiment {0}")]
    EmptyArchive(String),
    #[error("Record {0} was found but does not hold the expected record type")]
    WrongRecordType(RecordKey),
    #[error("Could not open run archive because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Record store failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Record store failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

/// Fatal failures of a Source Graph build. No graph is produced.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Source graph requires at most one Partition record, found {0}")]
    ConfigurationMissing(usize),
    #[error("Source graph failed to read the Partition record: {0}")]
    Store(#[from] StoreError),
}

/// Per-item failures of a Source Graph build. These are logged and the item is
/// skipped; they never abort the build.
#[derive(Debug, Error)]
pub enum AliasResolutionError {
    #[error("Alias {alias} for {dropped} collides with the alias of {kept}")]
    DuplicateAlias {
        alias: String,
        kept: Source,
        dropped: Source,
    },
    #[error("Alias declared for {0} is empty after sanitizing")]
    EmptyAlias(Source),
    #[error("Trigger channel references source {0} which is not in the source graph")]
    UnknownSource(Source),
    #[error("Trigger channel references output map (module {0}, connector {1}) which was never declared")]
    MissingOutputMap(u16, u16),
    #[error("Output map (module {0}, connector {1}) references undeclared pulse {2}")]
    MissingPulse(u16, u16, usize),
    #[error("Alias resolution failed to read a record: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("Cursor reached the end of the sequence")]
    SequenceExhausted,
    #[error("Cursor was given no runs to navigate")]
    NoRuns,
    #[error("Cursor could not jump to {0}; the target is not part of this run")]
    JumpTargetInvalid(JumpTarget),
    #[error("Cursor in {0} mode does not support jumps")]
    JumpUnsupported(AccessMode),
    #[error("Cursor in {0} mode does not iterate steps")]
    StepsUnsupported(AccessMode),
    #[error("Live feed has no event available yet")]
    FeedBlocked,
    #[error("Live feed has been closed")]
    FeedClosed,
    #[error("Cursor was interrupted while waiting for the live feed")]
    Interrupted,
    #[error("Cursor failed due to configuration error: {0}")]
    Configuration(#[from] ResolveError),
}

impl CursorError {
    /// True for the clean end-of-sequence signal
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::SequenceExhausted)
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Scan table is not available for {0} data")]
    Unavailable(AccessMode),
    #[error("Scan table could not be built because the run has no events")]
    EmptyRun,
    #[error("Scan table failed due to configuration error: {0}")]
    Configuration(#[from] ResolveError),
    #[error("Scan table failed due to record store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataSourceSpecError {
    #[error("Data source string is empty")]
    Empty,
    #[error("Data source field {0:?} is not of the form key=value or a known flag")]
    BadField(String),
    #[error("Data source {0:?} does not name an experiment")]
    MissingExperiment(String),
    #[error("Data source {0:?} does not name a run")]
    MissingRun(String),
    #[error("Data source failed to parse run number: {0}")]
    BadRunNumber(#[from] std::num::ParseIntError),
    #[error("Data source run range {0}-{1} is reversed or spans more than {max} runs", max = crate::data_source_spec::MAX_RUN_RANGE)]
    BadRunRange(i32, i32),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config failed to parse the data source: {0}")]
    SpecError(#[from] DataSourceSpecError),
}

#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("DataSource failed due to data source string error: {0}")]
    SpecError(#[from] DataSourceSpecError),
    #[error("DataSource failed due to record store error: {0}")]
    StoreError(#[from] StoreError),
    #[error("DataSource failed due to configuration error: {0}")]
    ResolveError(#[from] ResolveError),
    #[error("DataSource failed due to cursor error: {0}")]
    CursorError(#[from] CursorError),
    #[error("DataSource failed due to scan error: {0}")]
    ScanError(#[from] ScanError),
    #[error("DataSource failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to record store error: {0}")]
    StoreError(#[from] StoreError),
    #[error("Processor failed due to DataSource error: {0}")]
    DataSourceError(#[from] DataSourceError),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
}

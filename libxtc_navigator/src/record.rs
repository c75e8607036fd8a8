//! Typed records as delivered by the record store.
//!
//! Each external record type has an explicit struct here; consumers reach the
//! payload through the `as_*` accessors on [`Record`] instead of introspecting
//! attributes at runtime. Which variant a `(type, source, key)` tuple should hold
//! is decided by the [`TypeRegistry`](crate::registry::TypeRegistry).
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use super::error::{StoreError, TypeNameError};
use super::event_time::EventTime;
use super::source::Source;

/// The external type of a record, written `<module>.<type>` (e.g. `EvrData.ConfigV7`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeName {
    pub module: String,
    pub name: String,
}

impl TypeName {
    pub fn new(module: &str, name: &str) -> Self {
        Self {
            module: module.to_string(),
            name: name.to_string(),
        }
    }
}

impl FromStr for TypeName {
    type Err = TypeNameError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('.') {
            Some((module, name)) if !module.is_empty() && !name.is_empty() => {
                Ok(Self::new(module, name))
            }
            _ => Err(TypeNameError::BadTypeName(s.to_string())),
        }
    }
}

impl TryFrom<String> for TypeName {
    type Error = TypeNameError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value)
    }
}

impl From<TypeName> for String {
    fn from(value: TypeName) -> Self {
        value.to_string()
    }
}

impl Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

/// The `(type, source, key)` tuple addressing a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub type_name: TypeName,
    pub source: Source,
    pub key: String,
}

impl RecordKey {
    pub fn new(type_name: TypeName, source: Source, key: &str) -> Self {
        Self {
            type_name,
            source,
            key: key.to_string(),
        }
    }
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.key.is_empty() {
            write!(f, "({}, {})", self.type_name, self.source)
        } else {
            write!(f, "({}, {}, {})", self.type_name, self.source, self.key)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionSource {
    pub src: Source,
    pub group: i32,
}

/// The DAQ partition: which sources take part in the run and in which readout group
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PartitionConfig {
    #[serde(default)]
    pub bld_mask: u64,
    pub sources: Vec<PartitionSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrcAlias {
    pub alias_name: String,
    pub src: Source,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AliasConfig {
    pub src_alias: Vec<SrcAlias>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCodeConfig {
    pub code: u16,
    #[serde(default)]
    pub readout_group: i32,
    #[serde(default)]
    pub is_readout: bool,
    #[serde(default)]
    pub desc: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Negative,
    Positive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseConfig {
    pub pulse_id: usize,
    pub polarity: Polarity,
    pub prescale: u32,
    pub delay: u32,
    pub width: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputSource {
    Pulse,
    DBus,
    Prescaler,
    ForceHigh,
    ForceLow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputConnector {
    #[default]
    FrontPanel,
    UnivIO,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputMapConfig {
    pub source: OutputSource,
    pub source_id: usize,
    #[serde(default)]
    pub conn: OutputConnector,
    pub conn_id: u16,
    pub module: u16,
}

/// Event receiver configuration: event codes, pulse generators and output wiring
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvrConfig {
    #[serde(default)]
    pub eventcodes: Vec<EventCodeConfig>,
    #[serde(default)]
    pub pulses: Vec<PulseConfig>,
    #[serde(default)]
    pub output_maps: Vec<OutputMapConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputAddress {
    pub module: u16,
    pub conn_id: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoChannel {
    #[serde(default)]
    pub name: String,
    pub output: OutputAddress,
    #[serde(default)]
    pub infos: Vec<Source>,
}

/// Which sources are cabled to which event receiver output
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvrIoConfig {
    pub channels: Vec<IoChannel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvControl {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvMonitor {
    pub name: String,
    pub lo_value: f64,
    pub hi_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvLabel {
    pub name: String,
    pub value: String,
}

/// Scan control data: the variables held fixed during one step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlDataConfig {
    #[serde(default)]
    pub pv_controls: Vec<PvControl>,
    #[serde(default)]
    pub pv_monitors: Vec<PvMonitor>,
    #[serde(default)]
    pub pv_labels: Vec<PvLabel>,
    #[serde(default)]
    pub uses_duration: bool,
    #[serde(default)]
    pub uses_events: bool,
    #[serde(default)]
    pub uses_l3t_events: bool,
    #[serde(default)]
    pub events: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpicsPvConfig {
    pub pv_id: u32,
    /// The PV name as known to the control system
    pub pv_name: String,
    /// The human alias given in the archiver configuration
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub interval: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EpicsConfig {
    pub pvs: Vec<EpicsPvConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FifoEvent {
    pub event_code: u16,
    #[serde(default)]
    pub timestamp_high: u32,
    #[serde(default)]
    pub timestamp_low: u32,
}

/// Event receiver data for a single event: the codes fired on this beam crossing
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvrEventData {
    pub fifo_events: Vec<FifoEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct L3tData {
    pub accept: bool,
}

/// A typed record. Detector payloads are opaque to navigation and are carried as
/// raw YAML values for the detector library to interpret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Partition(PartitionConfig),
    Alias(AliasConfig),
    EvrConfig(EvrConfig),
    EvrIoConfig(EvrIoConfig),
    ControlData(ControlDataConfig),
    EpicsConfig(EpicsConfig),
    EvrData(EvrEventData),
    L3t(L3tData),
    Detector { payload: serde_yaml::Value },
}

impl Record {
    pub fn as_partition(&self) -> Option<&PartitionConfig> {
        match self {
            Self::Partition(config) => Some(config),
            _ => None,
        }
    }

    pub fn as_alias(&self) -> Option<&AliasConfig> {
        match self {
            Self::Alias(config) => Some(config),
            _ => None,
        }
    }

    pub fn as_evr_config(&self) -> Option<&EvrConfig> {
        match self {
            Self::EvrConfig(config) => Some(config),
            _ => None,
        }
    }

    pub fn as_evr_io_config(&self) -> Option<&EvrIoConfig> {
        match self {
            Self::EvrIoConfig(config) => Some(config),
            _ => None,
        }
    }

    pub fn as_control_data(&self) -> Option<&ControlDataConfig> {
        match self {
            Self::ControlData(config) => Some(config),
            _ => None,
        }
    }

    pub fn as_epics_config(&self) -> Option<&EpicsConfig> {
        match self {
            Self::EpicsConfig(config) => Some(config),
            _ => None,
        }
    }

    pub fn as_evr_data(&self) -> Option<&EvrEventData> {
        match self {
            Self::EvrData(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_l3t(&self) -> Option<&L3tData> {
        match self {
            Self::L3t(data) => Some(data),
            _ => None,
        }
    }
}

/// Serialized form of a single keyed record, as found in run archives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEntry {
    #[serde(rename = "type")]
    pub type_name: TypeName,
    pub source: Source,
    #[serde(default)]
    pub key: String,
    pub record: Record,
}

impl RecordEntry {
    pub fn new(type_name: TypeName, source: Source, record: Record) -> Self {
        Self {
            type_name,
            source,
            key: String::new(),
            record,
        }
    }

    pub fn record_key(&self) -> RecordKey {
        RecordKey::new(self.type_name.clone(), self.source.clone(), &self.key)
    }
}

/// The set of records present at one position of the store.
///
/// Keys are kept in insertion order so that enumeration is deterministic; a key
/// inserted twice keeps its first position and its last record.
#[derive(Debug, Clone, Default)]
pub struct RecordSnapshot {
    keys: Vec<RecordKey>,
    records: FxHashMap<RecordKey, Record>,
}

impl RecordSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a RecordEntry>) -> Self {
        let mut snapshot = Self::new();
        snapshot.extend(entries);
        snapshot
    }

    pub fn extend<'a>(&mut self, entries: impl IntoIterator<Item = &'a RecordEntry>) {
        for entry in entries {
            self.insert(entry.record_key(), entry.record.clone());
        }
    }

    pub fn insert(&mut self, key: RecordKey, record: Record) {
        if self.records.insert(key.clone(), record).is_none() {
            self.keys.push(key);
        }
    }

    pub fn keys(&self) -> &[RecordKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.records.contains_key(key)
    }

    /// Point lookup by key
    pub fn get(&self, key: &RecordKey) -> Result<&Record, StoreError> {
        self.records
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    /// Point lookup by the individual parts of the key
    pub fn get_parts(
        &self,
        type_name: &TypeName,
        source: &Source,
        key: &str,
    ) -> Result<&Record, StoreError> {
        self.get(&RecordKey::new(type_name.clone(), source.clone(), key))
    }

    /// All keys belonging to a source
    pub fn keys_for<'a>(&'a self, source: &'a Source) -> impl Iterator<Item = &'a RecordKey> {
        self.keys.iter().filter(move |key| &key.source == source)
    }

    /// Distinct sources in key order
    pub fn sources(&self) -> Vec<&Source> {
        let mut sources: Vec<&Source> = Vec::new();
        for key in self.keys.iter() {
            if !sources.contains(&&key.source) {
                sources.push(&key.source);
            }
        }
        sources
    }
}

/// One recorded event: its time and the records it carries
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub time: EventTime,
    pub records: RecordSnapshot,
}

impl EventRecord {
    pub fn new(time: EventTime, records: RecordSnapshot) -> Self {
        Self { time, records }
    }
}

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use super::output_map::{OutputKey, OutputMapTable, Timing};
use super::record::{ControlDataConfig, EventCodeConfig};
use super::source::Source;

/// The acquisition role of a source.
///
/// Stored by the DAQ as an integer: 0 for beamline data recorded on every shot,
/// positive for a readout group of the partition, -1 for controls devices recorded
/// outside the partition and -2 for devices only seen by a live monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum Group {
    Background,
    Readout(u32),
    Controls,
    Monitor,
}

impl From<i32> for Group {
    fn from(value: i32) -> Self {
        match value {
            0 => Self::Background,
            -2 => Self::Monitor,
            v if v > 0 => Self::Readout(v as u32),
            _ => Self::Controls,
        }
    }
}

impl From<Group> for i32 {
    fn from(value: Group) -> Self {
        match value {
            Group::Background => 0,
            Group::Readout(group) => group as i32,
            Group::Controls => -1,
            Group::Monitor => -2,
        }
    }
}

impl Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Controls => write!(f, "Controls"),
            Self::Monitor => write!(f, "Monitor"),
            other => write!(f, "{}", i32::from(*other)),
        }
    }
}

/// The trigger event codes gating a readout group, and the sources it reads out
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReadoutGroup {
    pub event_codes: Vec<u16>,
    pub sources: Vec<Source>,
}

/// Where a source's trigger comes from and when it fires
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerInfo {
    pub output: OutputKey,
    pub timing: Timing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    pub source: Source,
    pub alias: String,
    pub group: Group,
    pub in_partition: bool,
    pub event_code: Option<u16>,
    pub trigger: Option<TriggerInfo>,
}

impl SourceInfo {
    /// The event code the source is read out on. Background sources follow the 120 Hz
    /// beam code unless wired otherwise.
    pub fn effective_event_code(&self) -> Option<u16> {
        match (self.event_code, self.group) {
            (Some(code), _) => Some(code),
            (None, Group::Background) => Some(BACKGROUND_EVENT_CODE),
            _ => None,
        }
    }
}

/// Event code of the 120 Hz beam synchronous trigger
pub const BACKGROUND_EVENT_CODE: u16 = 40;

/// Nominal rate of the standard timing system event codes
pub fn event_code_rate(code: u16) -> Option<&'static str> {
    match code {
        40 => Some("120 Hz"),
        41 => Some("60 Hz"),
        42 => Some("30 Hz"),
        43 => Some("10 Hz"),
        44 => Some("5 Hz"),
        45 => Some("1 Hz"),
        46 => Some("0.5 Hz"),
        140 => Some("Beam & 120 Hz"),
        141 => Some("Beam & 60 Hz"),
        142 => Some("Beam & 30 Hz"),
        143 => Some("Beam & 10 Hz"),
        144 => Some("Beam & 5 Hz"),
        145 => Some("Beam & 1 Hz"),
        146 => Some("Beam & 0.5 Hz"),
        150 => Some("Burst"),
        162 => Some("BYKIK"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSummary {
    pub source: Source,
    pub ip_addr: u32,
    pub bld_mask: u64,
}

/// SourceGraph is the resolved view of a configuration snapshot: every source with
/// its alias and group, the readout groups and their trigger wiring.
///
/// A graph is built in one piece by the
/// [`ConfigResolver`](crate::resolver::ConfigResolver) and never changed afterwards.
#[derive(Debug, Clone, Default)]
pub struct SourceGraph {
    pub(crate) sources: BTreeMap<Source, SourceInfo>,
    pub(crate) aliases: BTreeMap<String, Source>,
    pub(crate) readout_groups: BTreeMap<Group, ReadoutGroup>,
    pub(crate) output_maps: OutputMapTable,
    pub(crate) event_codes: BTreeMap<u16, EventCodeConfig>,
    pub(crate) configured: BTreeSet<Source>,
    pub(crate) control_data: Option<ControlDataConfig>,
    pub(crate) pv_aliases: BTreeMap<String, String>,
    pub(crate) partition: Option<PartitionSummary>,
    pub(crate) degraded: bool,
}

impl SourceGraph {
    /// Data sources, excluding NoDetector/NoDevice placeholders
    pub fn sources(&self) -> impl Iterator<Item = &SourceInfo> {
        self.sources
            .values()
            .filter(|info| !info.source.is_placeholder())
    }

    /// Every source known to the graph, placeholders included
    pub fn all_sources(&self) -> impl Iterator<Item = &SourceInfo> {
        self.sources.values()
    }

    /// Look up a data source. Placeholders are not visible through this lookup.
    pub fn source(&self, source: &Source) -> Option<&SourceInfo> {
        self.sources
            .get(source)
            .filter(|info| !info.source.is_placeholder())
    }

    pub fn by_alias(&self, alias: &str) -> Option<&SourceInfo> {
        self.aliases
            .get(alias)
            .and_then(|source| self.sources.get(source))
    }

    pub fn alias_of(&self, source: &Source) -> Option<&str> {
        self.sources.get(source).map(|info| info.alias.as_str())
    }

    pub fn group_of(&self, source: &Source) -> Option<Group> {
        self.sources.get(source).map(|info| info.group)
    }

    pub fn aliases(&self) -> &BTreeMap<String, Source> {
        &self.aliases
    }

    /// Source -> group for every source of the graph
    pub fn groups(&self) -> BTreeMap<&Source, Group> {
        self.sources
            .iter()
            .map(|(source, info)| (source, info.group))
            .collect()
    }

    pub fn readout_groups(&self) -> &BTreeMap<Group, ReadoutGroup> {
        &self.readout_groups
    }

    pub fn output_maps(&self) -> &OutputMapTable {
        &self.output_maps
    }

    /// Event code declarations by code
    pub fn event_codes(&self) -> &BTreeMap<u16, EventCodeConfig> {
        &self.event_codes
    }

    /// Data sources which carry configuration records of their own
    pub fn configured_sources(&self) -> impl Iterator<Item = &SourceInfo> {
        self.sources()
            .filter(|info| self.configured.contains(&info.source))
    }

    pub fn control_data(&self) -> Option<&ControlDataConfig> {
        self.control_data.as_ref()
    }

    /// Alias of an EPICS PV from the archiver configuration
    pub fn pv_alias(&self, pv_name: &str) -> Option<&str> {
        self.pv_aliases.get(pv_name).map(|alias| alias.as_str())
    }

    pub fn partition(&self) -> Option<&PartitionSummary> {
        self.partition.as_ref()
    }

    /// True when the graph was built without a partition record
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_conversion() {
        assert_eq!(Group::from(0), Group::Background);
        assert_eq!(Group::from(3), Group::Readout(3));
        assert_eq!(Group::from(-1), Group::Controls);
        assert_eq!(Group::from(-2), Group::Monitor);
        assert_eq!(i32::from(Group::Readout(5)), 5);
        assert_eq!(i32::from(Group::Monitor), -2);
        assert_eq!(Group::Controls.to_string(), "Controls");
        assert_eq!(Group::Readout(1).to_string(), "1");
    }

    #[test]
    fn test_effective_event_code() {
        let mut info = SourceInfo {
            source: Source::new("BldInfo(EBeam)").unwrap(),
            alias: String::from("EBeam"),
            group: Group::Background,
            in_partition: true,
            event_code: None,
            trigger: None,
        };
        assert_eq!(info.effective_event_code(), Some(BACKGROUND_EVENT_CODE));
        info.group = Group::Controls;
        assert_eq!(info.effective_event_code(), None);
        info.event_code = Some(140);
        assert_eq!(info.effective_event_code(), Some(140));
        assert_eq!(event_code_rate(140), Some("Beam & 120 Hz"));
        assert_eq!(event_code_rate(7), None);
    }
}

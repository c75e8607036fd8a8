use bit_set::BitSet;
use std::fmt::Display;
use std::sync::Arc;

use super::cursor::Position;
use super::error::StoreError;
use super::event_time::EventTime;
use super::graph::{SourceGraph, SourceInfo};
use super::record::{Record, RecordKey, RecordSnapshot, TypeName};
use super::registry::{RecordCategory, TypeRegistry};
use super::source::Source;

/// The set of EVR event codes fired on one beam crossing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventCodes {
    codes: BitSet,
}

impl EventCodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: u16) {
        self.codes.insert(code as usize);
    }

    /// Was the given event code present for this event
    pub fn present(&self, code: u16) -> bool {
        self.codes.contains(code as usize)
    }

    /// Codes in ascending order
    pub fn codes(&self) -> Vec<u16> {
        self.codes.iter().map(|code| code as u16).collect()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl FromIterator<u16> for EventCodes {
    fn from_iter<T: IntoIterator<Item = u16>>(iter: T) -> Self {
        let mut codes = Self::new();
        for code in iter {
            codes.insert(code);
        }
        codes
    }
}

impl Display for EventCodes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.codes())
    }
}

/// EventHandle is the caller's view of the cursor's current event.
///
/// The handle is bound to the record snapshot and the SourceGraph which were valid when
/// the cursor last moved. It owns shared references to both, so it stays valid (and
/// unchanged) after the cursor moves on.
#[derive(Debug, Clone)]
pub struct EventHandle {
    position: Position,
    time: EventTime,
    records: Arc<RecordSnapshot>,
    graph: Arc<SourceGraph>,
    registry: Arc<TypeRegistry>,
}

impl EventHandle {
    pub fn new(
        position: Position,
        time: EventTime,
        records: Arc<RecordSnapshot>,
        graph: Arc<SourceGraph>,
        registry: Arc<TypeRegistry>,
    ) -> Self {
        Self {
            position,
            time,
            records,
            graph,
            registry,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn time(&self) -> EventTime {
        self.time
    }

    pub fn graph(&self) -> &SourceGraph {
        &self.graph
    }

    pub fn records(&self) -> &RecordSnapshot {
        &self.records
    }

    /// Keys of every record carried by the event
    pub fn keys(&self) -> &[RecordKey] {
        self.records.keys()
    }

    pub fn get(&self, key: &RecordKey) -> Result<&Record, StoreError> {
        self.records.get(key)
    }

    pub fn get_parts(
        &self,
        type_name: &TypeName,
        source: &Source,
        key: &str,
    ) -> Result<&Record, StoreError> {
        self.records.get_parts(type_name, source, key)
    }

    /// The graph entries of the data sources carrying records in this event
    pub fn detectors(&self) -> Vec<&SourceInfo> {
        self.records
            .sources()
            .into_iter()
            .filter_map(|source| self.graph.source(source))
            .collect()
    }

    /// Aliases of the data sources present in this event, sorted
    pub fn detector_aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self
            .detectors()
            .into_iter()
            .map(|info| info.alias.as_str())
            .collect();
        aliases.sort_unstable();
        aliases
    }

    /// Event codes of all EVR data records in the event
    pub fn evr(&self) -> EventCodes {
        self.registry
            .keys_of(&self.records, RecordCategory::EvrData)
            .filter_map(|key| self.records.get(key).ok())
            .filter_map(|record| record.as_evr_data())
            .flat_map(|data| data.fifo_events.iter().map(|fifo| fifo.event_code))
            .collect()
    }

    /// The level 3 trigger decision. Events recorded without a level 3 trigger were
    /// all accepted.
    pub fn l3t_accept(&self) -> bool {
        self.registry
            .keys_of(&self.records, RecordCategory::L3t)
            .filter_map(|key| self.records.get(key).ok())
            .find_map(|record| record.as_l3t())
            .map_or(true, |l3t| l3t.accept)
    }

    /// Records of the source with the given alias. Empty if the alias is unknown or the
    /// source did not record anything in this event.
    pub fn records_for(&self, alias: &str) -> Vec<(&RecordKey, &Record)> {
        let Some(info) = self.graph.by_alias(alias) else {
            return Vec::new();
        };
        self.records
            .keys_for(&info.source)
            .filter_map(|key| self.records.get(key).ok().map(|record| (key, record)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{EvrEventData, FifoEvent, L3tData};
    use crate::resolver::{ConfigResolver, ResolveOptions};

    fn fifo(code: u16) -> FifoEvent {
        FifoEvent {
            event_code: code,
            timestamp_high: 0,
            timestamp_low: 0,
        }
    }

    fn handle(records: RecordSnapshot) -> EventHandle {
        let registry = Arc::new(TypeRegistry::new());
        let graph = ConfigResolver::new(registry.clone(), ResolveOptions::default())
            .resolve(&records)
            .unwrap();
        EventHandle::new(
            Position::new(0, 0, 0),
            EventTime::new(1, 2, 3),
            Arc::new(records),
            Arc::new(graph),
            registry,
        )
    }

    #[test]
    fn test_evr_codes() {
        let evr = Source::new("DetInfo(NoDetector.0:Evr.0)").unwrap();
        let mut records = RecordSnapshot::new();
        records.insert(
            RecordKey::new(TypeName::new("EvrData", "DataV4"), evr, ""),
            Record::EvrData(EvrEventData {
                fifo_events: vec![fifo(140), fifo(40), fifo(162)],
            }),
        );
        let event = handle(records);
        let codes = event.evr();
        assert!(codes.present(40));
        assert!(codes.present(162));
        assert!(!codes.present(41));
        assert_eq!(codes.codes(), vec![40, 140, 162]);
        assert_eq!(codes.to_string(), "[40, 140, 162]");
        assert!(event.l3t_accept());
    }

    #[test]
    fn test_l3t_and_detectors() {
        let cspad = Source::new("DetInfo(XppGon.0:Cspad.0)").unwrap();
        let mut records = RecordSnapshot::new();
        records.insert(
            RecordKey::new(
                TypeName::new("L3T", "DataV2"),
                Source::new("ProcInfo(0.0.0.0, pid=1)").unwrap(),
                "",
            ),
            Record::L3t(L3tData { accept: false }),
        );
        records.insert(
            RecordKey::new(TypeName::new("CsPad", "DataV2"), cspad.clone(), ""),
            Record::Detector {
                payload: serde_yaml::Value::Null,
            },
        );
        records.insert(
            RecordKey::new(TypeName::new("CsPad", "DataV2"), cspad, "calib"),
            Record::Detector {
                payload: serde_yaml::Value::Null,
            },
        );
        let event = handle(records);
        assert!(!event.l3t_accept());
        assert_eq!(event.detector_aliases(), vec!["XppGon_0_Cspad_0"]);
        assert_eq!(event.records_for("XppGon_0_Cspad_0").len(), 2);
        assert!(event.records_for("nothing").is_empty());
        assert_eq!(event.keys().len(), 3);
    }
}

#![allow(dead_code)]
// Shared builders for the integration tests. Runs are built in memory and served
// through a RunArchive, the same way the CLI serves archives read from YAML.
use libxtc_navigator::archive::{EventData, RunArchive, RunData, StepData};
use libxtc_navigator::datasource::{DataSource, DataSourceOptions};
use libxtc_navigator::event_time::EventTime;
use libxtc_navigator::record::{
    ControlDataConfig, EventCodeConfig, EvrConfig, PartitionConfig, PartitionSource, PvControl,
    Record, RecordEntry, TypeName,
};
use libxtc_navigator::source::Source;

pub const PARTITION_NODE: &str = "ProcInfo(172.21.22.5, pid=1203)";
pub const EVR_SOURCE: &str = "DetInfo(NoDetector.0:Evr.0)";
pub const EXPERIMENT: &str = "xpptut15";

pub fn src(repr: &str) -> Source {
    Source::new(repr).unwrap()
}

pub fn entry(type_name: &str, source: &str, record: Record) -> RecordEntry {
    RecordEntry::new(type_name.parse().unwrap(), src(source), record)
}

pub fn partition(sources: &[(&str, i32)]) -> RecordEntry {
    entry(
        "Partition.ConfigV2",
        PARTITION_NODE,
        Record::Partition(PartitionConfig {
            bld_mask: 0,
            sources: sources
                .iter()
                .map(|(source, group)| PartitionSource {
                    src: src(source),
                    group: *group,
                })
                .collect(),
        }),
    )
}

pub fn evr_config(codes: &[(u16, i32)]) -> RecordEntry {
    entry(
        "EvrData.ConfigV7",
        EVR_SOURCE,
        Record::EvrConfig(EvrConfig {
            eventcodes: codes
                .iter()
                .map(|(code, group)| EventCodeConfig {
                    code: *code,
                    readout_group: *group,
                    is_readout: true,
                    desc: String::new(),
                })
                .collect(),
            pulses: Vec::new(),
            output_maps: Vec::new(),
        }),
    )
}

pub fn control_data(controls: &[(&str, f64)]) -> RecordEntry {
    RecordEntry {
        type_name: TypeName::new("ControlData", "ConfigV2"),
        source: src(PARTITION_NODE),
        key: String::new(),
        record: Record::ControlData(ControlDataConfig {
            pv_controls: controls
                .iter()
                .map(|(name, value)| PvControl {
                    name: name.to_string(),
                    value: *value,
                })
                .collect(),
            uses_events: true,
            ..Default::default()
        }),
    }
}

/// A run whose events carry consecutive times, `step_config(k)` giving the
/// configuration records of step k
pub fn run(
    number: i32,
    config: Vec<RecordEntry>,
    events_per_step: &[usize],
    step_config: impl Fn(usize) -> Vec<RecordEntry>,
) -> RunData {
    let mut seconds = 1_500_000_000;
    let steps = events_per_step
        .iter()
        .enumerate()
        .map(|(step, count)| StepData {
            config: step_config(step),
            events: (0..*count)
                .map(|_| {
                    seconds += 1;
                    EventData {
                        time: EventTime::new(seconds, 500, seconds % 131_072),
                        records: Vec::new(),
                    }
                })
                .collect(),
        })
        .collect();
    RunData {
        number,
        config,
        steps,
    }
}

/// A run with a single-source partition and no step configuration
pub fn plain_run(number: i32, events_per_step: &[usize]) -> RunData {
    run(
        number,
        vec![partition(&[("BldInfo(EBeam)", 0)])],
        events_per_step,
        |_| Vec::new(),
    )
}

pub fn open(runs: Vec<RunData>, data_source: &str) -> DataSource {
    DataSource::open(
        data_source,
        Box::new(RunArchive::new(EXPERIMENT, runs)),
        DataSourceOptions::default(),
    )
    .unwrap()
}

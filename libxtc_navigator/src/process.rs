use std::collections::BTreeMap;
use std::sync::mpsc::Sender;

use super::archive::RunArchive;
use super::config::Config;
use super::data_source_spec::AccessMode;
use super::datasource::DataSource;
use super::error::ProcessorError;
use super::event_time::EventTime;
use super::graph::{event_code_rate, SourceGraph};
use super::scan::ScanTable;
use super::worker_status::{BarColor, WorkerStatus};

/// Live feeds report progress every this many events
const LIVE_STATUS_INTERVAL: u64 = 100;

/// What a walk over one run found
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub run_number: Option<i32>,
    pub events: u64,
    /// Events rejected by the level 3 trigger
    pub l3t_rejected: u64,
    /// Number of events carrying each EVR event code
    pub event_codes: BTreeMap<u16, u64>,
    /// Number of events each detector alias appears in
    pub detectors: BTreeMap<String, u64>,
    pub first_time: Option<EventTime>,
    pub last_time: Option<EventTime>,
}

/// Log the sources of a graph, one line per source
pub fn log_source_graph(graph: &SourceGraph) {
    match graph.partition() {
        Some(partition) => log::info!(
            "Partition from {} with BLD mask {:#x}",
            partition.source,
            partition.bld_mask
        ),
        None => log::warn!("No partition, source groups are unreliable"),
    }
    for info in graph.sources() {
        let code = match info.effective_event_code() {
            Some(code) => format!(
                "{code} ({})",
                event_code_rate(code).unwrap_or("unknown rate")
            ),
            None => String::from("none"),
        };
        log::info!(
            "{:<24} {:<40} group {:<8} event code {}",
            info.alias,
            info.source.as_str(),
            info.group.to_string(),
            code
        );
    }
}

pub fn log_scan_table(table: &ScanTable) {
    log::info!(
        "Run {} scan: {} steps, events per step {:?}",
        table.run,
        table.nsteps(),
        table.nevents()
    );
    if let Some(simple) = &table.simple {
        for (pv, alias) in simple.pv_aliases.iter() {
            if let Some(values) = simple.control_values.get(alias) {
                log::info!("Scan variable {alias} ({pv}): {values}");
            }
        }
    }
}

/// Walk the current run of a DataSource, reporting progress on `tx`
pub fn process_run(
    ds: &mut DataSource,
    config: &Config,
    tx: &Sender<WorkerStatus>,
) -> Result<RunSummary, ProcessorError> {
    let run_number = ds.cursor().run_number();
    let total = ds.event_count()?;
    let color = match total {
        Some(_) => BarColor::CYAN,
        None => BarColor::GREEN,
    };
    let limit = match (total, config.max_events) {
        (Some(total), Some(max)) => Some(total.min(max)),
        (total, max) => total.or(max),
    };
    let flush_val = limit.map_or(LIVE_STATUS_INTERVAL, |n| (n as u64 / 100).max(1));

    let mut summary = RunSummary {
        run_number,
        ..Default::default()
    };
    tx.send(WorkerStatus::new(0.0, run_number, 0, color))?;
    for event in ds.events() {
        summary.events += 1;
        if !event.l3t_accept() {
            summary.l3t_rejected += 1;
        }
        for code in event.evr().codes() {
            *summary.event_codes.entry(code).or_insert(0) += 1;
        }
        for alias in event.detector_aliases() {
            *summary.detectors.entry(alias.to_string()).or_insert(0) += 1;
        }
        if summary.first_time.is_none() {
            summary.first_time = Some(event.time());
        }
        summary.last_time = Some(event.time());

        if summary.events % flush_val == 0 {
            let progress = limit.map_or(0.0, |n| summary.events as f32 / n as f32);
            tx.send(WorkerStatus::new(progress, run_number, summary.events, color))?;
        }
        if config.max_events.is_some_and(|max| summary.events as usize >= max) {
            log::info!("Reached the limit of {} events", summary.events);
            break;
        }
    }
    tx.send(WorkerStatus::new(1.0, run_number, summary.events, color))?;

    if let (Some(first), Some(last)) = (summary.first_time, summary.last_time) {
        log::info!(
            "Walked {} events from {first} to {last} ({:.1} s)",
            summary.events,
            last.as_f64() - first.as_f64()
        );
    }
    Ok(summary)
}

/// The function to be called by a separate thread (typically the CLI).
///
/// Opens the run archive named by the config, logs the source graph and scan table
/// of each run and walks its events.
pub fn process(
    config: Config,
    tx: Sender<WorkerStatus>,
) -> Result<Vec<RunSummary>, ProcessorError> {
    let mut archive = RunArchive::read_archive_file(&config.archive_path)?;
    archive.live_poll_interval = config.live_poll_interval();
    let mut ds = DataSource::from_config(&config, Box::new(archive))?;

    let mut summaries = Vec::new();
    loop {
        let run = ds.cursor().run_number();
        match run {
            Some(run) => log::info!("Processing run {run}..."),
            None => log::info!("Processing live data..."),
        }
        log_source_graph(ds.graph());

        if config.build_scan_table && ds.mode() != AccessMode::Live {
            tx.send(WorkerStatus::new(0.0, run, 0, BarColor::MAGENTA))?;
            match ds.scan_table() {
                Ok(table) => log_scan_table(&table),
                Err(e) => log::warn!("Could not build the scan table: {e}"),
            }
            tx.send(WorkerStatus::new(1.0, run, 0, BarColor::MAGENTA))?;
        }

        summaries.push(process_run(&mut ds, &config, &tx)?);
        if !ds.next_run()? {
            break;
        }
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{EventData, RunData, StepData};
    use crate::record::{L3tData, Record, RecordEntry, TypeName};
    use crate::source::Source;
    use std::sync::mpsc;

    fn archive() -> RunArchive {
        let l3t = |accept: bool| {
            RecordEntry::new(
                TypeName::new("L3T", "DataV2"),
                Source::new("ProcInfo(0.0.0.0, pid=0)").unwrap(),
                Record::L3t(L3tData { accept }),
            )
        };
        let events = (0..10)
            .map(|i| EventData {
                time: EventTime::new(100 + i, 0, 0),
                records: vec![l3t(i % 3 != 0)],
            })
            .collect();
        RunArchive::new(
            "xpptut15",
            vec![RunData {
                number: 54,
                config: Vec::new(),
                steps: vec![StepData {
                    config: Vec::new(),
                    events,
                }],
            }],
        )
    }

    #[test]
    fn test_process_run() {
        let config = Config {
            data_source: String::from("exp=xpptut15:run=54:idx"),
            ..Default::default()
        };
        let mut ds = DataSource::from_config(&config, Box::new(archive())).unwrap();
        let (tx, rx) = mpsc::channel::<WorkerStatus>();
        let summary = process_run(&mut ds, &config, &tx).unwrap();
        assert_eq!(summary.run_number, Some(54));
        assert_eq!(summary.events, 10);
        assert_eq!(summary.l3t_rejected, 4);
        assert_eq!(summary.first_time, Some(EventTime::new(100, 0, 0)));
        assert_eq!(summary.last_time, Some(EventTime::new(109, 0, 0)));

        let statuses: Vec<WorkerStatus> = rx.try_iter().collect();
        assert_eq!(statuses.len(), 12);
        assert_eq!(statuses.last().map(|s| s.progress), Some(1.0));
        assert!(statuses.iter().all(|s| s.color == BarColor::CYAN));
    }

    #[test]
    fn test_max_events() {
        let config = Config {
            data_source: String::from("exp=xpptut15:run=54:idx"),
            max_events: Some(4),
            ..Default::default()
        };
        let mut ds = DataSource::from_config(&config, Box::new(archive())).unwrap();
        let (tx, _rx) = mpsc::channel::<WorkerStatus>();
        let summary = process_run(&mut ds, &config, &tx).unwrap();
        assert_eq!(summary.events, 4);
        assert_eq!(summary.l3t_rejected, 2);
    }
}

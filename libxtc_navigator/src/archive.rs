//! An in-memory record store holding complete recorded runs.
//!
//! A RunArchive is read from a YAML file and can be traversed in all three access
//! modes: as an indexed run, as a step stream, or replayed through a live feed.
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use super::data_source_spec::DataSourceSpec;
use super::error::StoreError;
use super::event_time::EventTime;
use super::record::{EventRecord, RecordEntry, RecordSnapshot};
use super::store::{IndexedStore, LiveFeed, LivePoll, RunProvider, StepStore};

const DEFAULT_LIVE_POLL_MS: u64 = 100;

fn default_live_poll() -> Duration {
    Duration::from_millis(DEFAULT_LIVE_POLL_MS)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub time: EventTime,
    #[serde(default)]
    pub records: Vec<RecordEntry>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepData {
    /// Configuration records which change at this step (scan control data etc.)
    #[serde(default)]
    pub config: Vec<RecordEntry>,
    #[serde(default)]
    pub events: Vec<EventData>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunData {
    pub number: i32,
    #[serde(default)]
    pub config: Vec<RecordEntry>,
    #[serde(default)]
    pub steps: Vec<StepData>,
}

impl RunData {
    /// Run configuration overlaid with the configuration of one step
    fn step_config(&self, step: usize) -> RecordSnapshot {
        let mut snapshot = RecordSnapshot::from_entries(self.config.iter());
        if let Some(step_data) = self.steps.get(step) {
            snapshot.extend(step_data.config.iter());
        }
        snapshot
    }

    fn event_record(&self, step: usize, event: usize) -> Option<EventRecord> {
        let data = self.steps.get(step)?.events.get(event)?;
        Some(EventRecord::new(
            data.time,
            RecordSnapshot::from_entries(data.records.iter()),
        ))
    }

    pub fn event_count(&self) -> usize {
        self.steps.iter().map(|step| step.events.len()).sum()
    }
}

/// A set of recorded runs of one experiment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunArchive {
    pub experiment: String,
    pub runs: Vec<RunData>,
    /// How long a live replay waits for an event before reporting the feed as blocked
    #[serde(skip, default = "default_live_poll")]
    pub live_poll_interval: Duration,
}

impl RunArchive {
    pub fn new(experiment: &str, runs: Vec<RunData>) -> Self {
        Self {
            experiment: experiment.to_string(),
            runs,
            live_poll_interval: default_live_poll(),
        }
    }

    /// Read an archive from a YAML file
    pub fn read_archive_file(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::BadFilePath(path.to_path_buf()));
        }
        let yaml_str = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    pub fn find_run(&self, number: i32) -> Result<&RunData, StoreError> {
        self.runs
            .iter()
            .find(|run| run.number == number)
            .ok_or(StoreError::RunNotFound(number))
    }

    /// The first requested run, or the first run of the archive
    fn requested_run(&self, spec: &DataSourceSpec) -> Result<Arc<RunData>, StoreError> {
        let run = match spec.first_run() {
            Some(number) => self.find_run(number)?,
            None => self
                .runs
                .first()
                .ok_or_else(|| StoreError::EmptyArchive(self.experiment.clone()))?,
        };
        Ok(Arc::new(run.clone()))
    }
}

impl RunProvider for RunArchive {
    fn open_indexed(
        &self,
        spec: &DataSourceSpec,
    ) -> Result<Vec<Box<dyn IndexedStore>>, StoreError> {
        if spec.runs.is_empty() {
            let run = self.requested_run(spec)?;
            return Ok(vec![Box::new(IndexedRunView::new(run))]);
        }
        let mut views: Vec<Box<dyn IndexedStore>> = Vec::new();
        for number in spec.runs.iter() {
            let run = Arc::new(self.find_run(*number)?.clone());
            views.push(Box::new(IndexedRunView::new(run)));
        }
        Ok(views)
    }

    fn open_stepped(&self, spec: &DataSourceSpec) -> Result<Box<dyn StepStore>, StoreError> {
        Ok(Box::new(StepStreamView::new(self.requested_run(spec)?)))
    }

    fn open_live(&self, spec: &DataSourceSpec) -> Result<Box<dyn LiveFeed>, StoreError> {
        let run = self.requested_run(spec)?;
        let (sender, feed) = live_channel(run.step_config(0), self.live_poll_interval);
        std::thread::spawn(move || replay_run(&run, &sender));
        Ok(Box::new(feed))
    }
}

/// Publish a run through a live feed, step configuration first
fn replay_run(run: &RunData, sender: &LiveSender) {
    for (step, step_data) in run.steps.iter().enumerate() {
        if !sender.send_config(run.step_config(step)) {
            return;
        }
        for event in 0..step_data.events.len() {
            let Some(record) = run.event_record(step, event) else {
                return;
            };
            if !sender.send_event(record) {
                log::debug!("Live replay stopped, the feed was dropped");
                return;
            }
        }
    }
}

/// Indexed traversal of one archived run
#[derive(Debug, Clone)]
pub struct IndexedRunView {
    run: Arc<RunData>,
    config: RecordSnapshot,
    times: Vec<EventTime>,
    lookup: FxHashMap<EventTime, (usize, usize)>,
}

impl IndexedRunView {
    pub fn new(run: Arc<RunData>) -> Self {
        let mut times = Vec::with_capacity(run.event_count());
        let mut lookup = FxHashMap::default();
        for (step, step_data) in run.steps.iter().enumerate() {
            for (event, event_data) in step_data.events.iter().enumerate() {
                times.push(event_data.time);
                lookup.insert(event_data.time, (step, event));
            }
        }
        Self {
            config: run.step_config(0),
            run,
            times,
            lookup,
        }
    }
}

impl IndexedStore for IndexedRunView {
    fn run_number(&self) -> i32 {
        self.run.number
    }

    fn config(&self) -> &RecordSnapshot {
        &self.config
    }

    fn event_count(&self) -> usize {
        self.times.len()
    }

    fn step_count(&self) -> usize {
        self.run.steps.len()
    }

    fn event_time_at(&self, index: i64) -> Result<EventTime, StoreError> {
        usize::try_from(index)
            .ok()
            .and_then(|idx| self.times.get(idx))
            .copied()
            .ok_or(StoreError::IndexOutOfRange(index, self.times.len()))
    }

    fn time_index_of(&self, time: &EventTime) -> Result<usize, StoreError> {
        self.times
            .binary_search(time)
            .or_else(|_| {
                // Archives are not required to be time sorted
                self.times
                    .iter()
                    .position(|candidate| candidate == time)
                    .ok_or(())
            })
            .map_err(|_| StoreError::TimeNotFound(*time))
    }

    fn event_at(&self, time: &EventTime) -> Result<EventRecord, StoreError> {
        let (step, event) = self
            .lookup
            .get(time)
            .ok_or(StoreError::TimeNotFound(*time))?;
        self.run
            .event_record(*step, *event)
            .ok_or(StoreError::TimeNotFound(*time))
    }
}

/// Step by step traversal of one archived run
#[derive(Debug, Clone)]
pub struct StepStreamView {
    run: Arc<RunData>,
    run_config: RecordSnapshot,
    step: Option<usize>,
    next_event: usize,
}

impl StepStreamView {
    pub fn new(run: Arc<RunData>) -> Self {
        Self {
            run_config: RecordSnapshot::from_entries(run.config.iter()),
            run,
            step: None,
            next_event: 0,
        }
    }
}

impl StepStore for StepStreamView {
    fn run_number(&self) -> i32 {
        self.run.number
    }

    fn run_config(&self) -> &RecordSnapshot {
        &self.run_config
    }

    fn next_step_snapshot(&mut self) -> Result<Option<RecordSnapshot>, StoreError> {
        let next = self.step.map_or(0, |step| step + 1);
        if next >= self.run.steps.len() {
            self.step = Some(self.run.steps.len());
            return Ok(None);
        }
        self.step = Some(next);
        self.next_event = 0;
        Ok(Some(self.run.step_config(next)))
    }

    fn next_event_in_step(&mut self) -> Result<Option<EventRecord>, StoreError> {
        let Some(step) = self.step else {
            return Ok(None);
        };
        let record = self.run.event_record(step, self.next_event);
        if record.is_some() {
            self.next_event += 1;
        }
        Ok(record)
    }

    fn open_index(&self) -> Result<Box<dyn IndexedStore>, StoreError> {
        Ok(Box::new(IndexedRunView::new(self.run.clone())))
    }
}

#[derive(Debug)]
enum LiveMessage {
    Config(RecordSnapshot),
    Event(EventRecord),
}

/// Producer half of a live feed
#[derive(Debug, Clone)]
pub struct LiveSender {
    tx: Sender<LiveMessage>,
}

impl LiveSender {
    /// Returns false once the feed has been dropped
    pub fn send_event(&self, event: EventRecord) -> bool {
        self.tx.send(LiveMessage::Event(event)).is_ok()
    }

    /// Publish a new configuration; it applies to all events sent after it
    pub fn send_config(&self, config: RecordSnapshot) -> bool {
        self.tx.send(LiveMessage::Config(config)).is_ok()
    }
}

/// Consumer half of a live feed backed by a channel.
///
/// Dropping every LiveSender closes the feed.
#[derive(Debug)]
pub struct ChannelFeed {
    rx: Receiver<LiveMessage>,
    config: RecordSnapshot,
    poll_interval: Duration,
}

/// Create a connected live feed with an initial configuration
pub fn live_channel(config: RecordSnapshot, poll_interval: Duration) -> (LiveSender, ChannelFeed) {
    let (tx, rx) = mpsc::channel::<LiveMessage>();
    (
        LiveSender { tx },
        ChannelFeed {
            rx,
            config,
            poll_interval,
        },
    )
}

impl LiveFeed for ChannelFeed {
    fn config_snapshot(&self) -> &RecordSnapshot {
        &self.config
    }

    fn next_live_event(&mut self) -> LivePoll {
        loop {
            match self.rx.recv_timeout(self.poll_interval) {
                Ok(LiveMessage::Config(config)) => self.config = config,
                Ok(LiveMessage::Event(event)) => return LivePoll::Event(event),
                Err(RecvTimeoutError::Timeout) => return LivePoll::Blocked,
                Err(RecvTimeoutError::Disconnected) => return LivePoll::FeedClosed,
            }
        }
    }
}

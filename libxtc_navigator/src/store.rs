//! The record store contract.
//!
//! The store itself is an external collaborator; these traits fix the queries the
//! cursors and the scan aggregator rely on. One trait per access mode, since the
//! three modes expose structurally different positioning.
use super::data_source_spec::DataSourceSpec;
use super::error::StoreError;
use super::event_time::EventTime;
use super::record::{EventRecord, RecordSnapshot};

/// Fully indexed random access to one run
pub trait IndexedStore {
    fn run_number(&self) -> i32;
    /// Configuration snapshot valid at the start of the run
    fn config(&self) -> &RecordSnapshot;
    fn event_count(&self) -> usize;
    fn step_count(&self) -> usize;
    /// Fails with `IndexOutOfRange` past the end of the run
    fn event_time_at(&self, index: i64) -> Result<EventTime, StoreError>;
    /// Fails with `TimeNotFound` if the time is not part of the run
    fn time_index_of(&self, time: &EventTime) -> Result<usize, StoreError>;
    fn event_at(&self, time: &EventTime) -> Result<EventRecord, StoreError>;
}

/// Streaming access to one run, step by step
pub trait StepStore {
    fn run_number(&self) -> i32;
    /// Configuration snapshot valid before the first step is opened
    fn run_config(&self) -> &RecordSnapshot;
    /// Open the next step, returning its configuration. `None` once all steps are read.
    fn next_step_snapshot(&mut self) -> Result<Option<RecordSnapshot>, StoreError>;
    /// Next event of the open step. `None` when the step (or the run) is exhausted.
    fn next_event_in_step(&mut self) -> Result<Option<EventRecord>, StoreError>;
    /// A parallel indexed view of the same run. Streaming data carries no time
    /// index of its own, so this is potentially expensive and callers open it lazily.
    fn open_index(&self) -> Result<Box<dyn IndexedStore>, StoreError>;
}

/// Result of polling a live feed
#[derive(Debug)]
pub enum LivePoll {
    Event(EventRecord),
    Blocked,
    FeedClosed,
}

/// A live (shared memory) feed: no index, no steps
pub trait LiveFeed {
    /// The most recent configuration published by the feed
    fn config_snapshot(&self) -> &RecordSnapshot;
    /// Wait a bounded time for the next event
    fn next_live_event(&mut self) -> LivePoll;
}

/// Opens the store views selected by a data source string
pub trait RunProvider {
    /// One indexed view per requested run, in run order
    fn open_indexed(&self, spec: &DataSourceSpec)
        -> Result<Vec<Box<dyn IndexedStore>>, StoreError>;
    fn open_stepped(&self, spec: &DataSourceSpec) -> Result<Box<dyn StepStore>, StoreError>;
    fn open_live(&self, spec: &DataSourceSpec) -> Result<Box<dyn LiveFeed>, StoreError>;
}

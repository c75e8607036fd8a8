//! The DataSource facade.
//!
//! A [`DataSource`] is opened from a data source string and a [`RunProvider`]. It picks
//! the cursor variant from the access mode, owns the cursor, and exposes event and
//! step iteration, jumps, reloading and the run's (cached) scan table.
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::config::Config;
use super::cursor::{Cursor, JumpTarget, Position};
use super::data_source_spec::{AccessMode, DataSourceSpec};
use super::error::{CursorError, DataSourceError, ScanError};
use super::event::EventHandle;
use super::graph::SourceGraph;
use super::indexed_cursor::IndexedCursor;
use super::live_cursor::LiveCursor;
use super::registry::{RecordCategory, TypeRegistry};
use super::resolver::{ConfigResolver, ResolveOptions};
use super::scan::{ScanAggregator, ScanTable};
use super::step_cursor::StepCursor;
use super::store::RunProvider;

/// Options applied when opening a DataSource
#[derive(Debug, Clone, Default)]
pub struct DataSourceOptions {
    /// Load indexed whatever the access flag of the data source string says
    pub force_indexed: bool,
    /// Extra default aliases, keyed by source string
    pub alias_defaults: BTreeMap<String, String>,
}

impl DataSourceOptions {
    /// The data source with `force_indexed` applied. Shared memory stays live.
    pub fn apply_to(&self, spec: DataSourceSpec) -> DataSourceSpec {
        if self.force_indexed && !spec.is_shared_memory() {
            return spec.with_mode(AccessMode::Indexed);
        }
        spec
    }

    pub fn resolve_options(&self, live: bool) -> ResolveOptions {
        ResolveOptions::new(live).with_alias_defaults(self.alias_defaults.clone())
    }
}

impl From<&Config> for DataSourceOptions {
    fn from(config: &Config) -> Self {
        Self {
            force_indexed: config.force_indexed,
            alias_defaults: config.alias_defaults.clone(),
        }
    }
}

pub struct DataSource {
    spec: DataSourceSpec,
    provider: Box<dyn RunProvider>,
    resolver: ConfigResolver,
    cursor: Cursor,
    scan_table: Option<Arc<ScanTable>>,
}

impl DataSource {
    /// Parse the data source string and open a cursor on it
    pub fn open(
        data_source: &str,
        provider: Box<dyn RunProvider>,
        options: DataSourceOptions,
    ) -> Result<Self, DataSourceError> {
        let spec = options.apply_to(DataSourceSpec::from_str(data_source)?);
        let resolve_options = options.resolve_options(spec.is_shared_memory());
        Self::open_spec(spec, provider, resolve_options)
    }

    /// Open a DataSource using the data source and options of a Config
    pub fn from_config(
        config: &Config,
        provider: Box<dyn RunProvider>,
    ) -> Result<Self, DataSourceError> {
        let spec = config.data_source_spec()?;
        let resolve_options = config.resolve_options(spec.is_shared_memory());
        Self::open_spec(spec, provider, resolve_options)
    }

    fn open_spec(
        mut spec: DataSourceSpec,
        provider: Box<dyn RunProvider>,
        resolve_options: ResolveOptions,
    ) -> Result<Self, DataSourceError> {
        let resolver = ConfigResolver::new(Arc::new(TypeRegistry::new()), resolve_options);
        let cursor = Self::open_cursor(&mut spec, provider.as_ref(), &resolver)?;
        log::info!("Opened data source {spec}");
        Ok(Self {
            spec,
            provider,
            resolver,
            cursor,
            scan_table: None,
        })
    }

    /// Build the cursor for the access mode. Streamed runs without a partition cannot
    /// be stepped through meaningfully and are loaded indexed instead, which updates
    /// the mode of `spec`.
    fn open_cursor(
        spec: &mut DataSourceSpec,
        provider: &dyn RunProvider,
        resolver: &ConfigResolver,
    ) -> Result<Cursor, DataSourceError> {
        match spec.mode {
            AccessMode::Indexed => Ok(Cursor::Indexed(IndexedCursor::new(
                provider.open_indexed(spec)?,
                resolver.clone(),
            )?)),
            AccessMode::Stepped => {
                let stream = provider.open_stepped(spec)?;
                let has_partition = resolver
                    .registry()
                    .keys_of(stream.run_config(), RecordCategory::Partition)
                    .next()
                    .is_some();
                if has_partition {
                    return Ok(Cursor::Stepped(StepCursor::new(stream, resolver.clone())?));
                }
                log::warn!(
                    "Run {} has no Partition configuration, loading it indexed instead",
                    stream.run_number()
                );
                spec.mode = AccessMode::Indexed;
                Ok(Cursor::Indexed(IndexedCursor::new(
                    provider.open_indexed(spec)?,
                    resolver.clone(),
                )?))
            }
            AccessMode::Live => Ok(Cursor::Live(LiveCursor::new(
                provider.open_live(spec)?,
                resolver.clone(),
            )?)),
        }
    }

    pub fn spec(&self) -> &DataSourceSpec {
        &self.spec
    }

    pub fn mode(&self) -> AccessMode {
        self.cursor.mode()
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    /// The SourceGraph currently in force
    pub fn graph(&self) -> &Arc<SourceGraph> {
        self.cursor.graph()
    }

    pub fn current(&self) -> Option<&EventHandle> {
        self.cursor.current()
    }

    pub fn position(&self) -> Position {
        self.cursor.position()
    }

    pub fn advance(&mut self) -> Result<EventHandle, CursorError> {
        self.cursor.advance()
    }

    pub fn jump(&mut self, target: impl Into<JumpTarget>) -> Result<EventHandle, CursorError> {
        self.cursor.jump(target)
    }

    /// Iterate over the remaining events. Iteration stops at the end of the data (or
    /// on the first cursor failure, which is logged).
    pub fn events(&mut self) -> Events<'_> {
        Events {
            cursor: &mut self.cursor,
        }
    }

    /// Open the next step and iterate over its events.
    ///
    /// Returns `Ok(None)` after the last step. Only streamed data has steps.
    pub fn next_step(&mut self) -> Result<Option<StepEvents<'_>>, DataSourceError> {
        match self.cursor.next_step() {
            Ok(position) => Ok(Some(StepEvents {
                step: position.step,
                cursor: &mut self.cursor,
            })),
            Err(CursorError::SequenceExhausted) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Move an indexed data source to its next run. Returns false after the last run.
    pub fn next_run(&mut self) -> Result<bool, DataSourceError> {
        match self.cursor.next_run() {
            Ok(()) => Ok(true),
            Err(CursorError::SequenceExhausted) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Interrupt flag of a live data source
    pub fn interrupt_handle(&self) -> Option<Arc<AtomicBool>> {
        match &self.cursor {
            Cursor::Live(cursor) => Some(cursor.interrupt_handle()),
            _ => None,
        }
    }

    /// Reopen the data from the start, rebuilding the cursor and its graph and
    /// dropping the cached scan table. Live feeds cannot be rewound and are kept.
    pub fn reload(&mut self) -> Result<(), DataSourceError> {
        self.scan_table = None;
        if self.mode() == AccessMode::Live {
            log::warn!("Live data source {} can not be reloaded", self.spec);
            return Ok(());
        }
        self.cursor = Self::open_cursor(&mut self.spec, self.provider.as_ref(), &self.resolver)?;
        log::info!("Reloaded data source {}", self.spec);
        Ok(())
    }

    /// Number of events of the run being read. Unknown for live data.
    pub fn event_count(&self) -> Result<Option<usize>, DataSourceError> {
        match &self.cursor {
            Cursor::Indexed(cursor) => Ok(Some(cursor.event_count())),
            Cursor::Stepped(_) => Ok(self
                .provider
                .open_indexed(&self.run_spec())?
                .first()
                .map(|run| run.event_count())),
            Cursor::Live(_) => Ok(None),
        }
    }

    /// The scan table of the run being read, built on first use
    pub fn scan_table(&mut self) -> Result<Arc<ScanTable>, DataSourceError> {
        if self.mode() == AccessMode::Live {
            return Err(ScanError::Unavailable(AccessMode::Live).into());
        }
        if let Some(table) = &self.scan_table {
            if Some(table.run) == self.cursor.run_number() {
                return Ok(table.clone());
            }
        }

        let run_spec = self.run_spec();
        let mut stream = self.provider.open_stepped(&run_spec)?;
        let index = self
            .provider
            .open_indexed(&run_spec)?
            .into_iter()
            .next()
            .ok_or(ScanError::EmptyRun)?;
        let table = Arc::new(
            ScanAggregator::new(self.resolver.clone()).build(stream.as_mut(), index.as_ref())?,
        );
        self.scan_table = Some(table.clone());
        Ok(table)
    }

    /// The data source narrowed to the run being read
    fn run_spec(&self) -> DataSourceSpec {
        let mut spec = self.spec.clone();
        if let Some(run) = self.cursor.run_number() {
            spec.runs = vec![run];
        }
        spec
    }
}

/// Events of a DataSource, across steps and without jumps
pub struct Events<'a> {
    cursor: &'a mut Cursor,
}

impl Iterator for Events<'_> {
    type Item = EventHandle;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor.advance() {
            Ok(handle) => Some(handle),
            Err(CursorError::SequenceExhausted) => None,
            Err(e) => {
                log::error!("Event iteration stopped: {e}");
                None
            }
        }
    }
}

/// Events of one step of a streamed DataSource
pub struct StepEvents<'a> {
    step: i64,
    cursor: &'a mut Cursor,
}

impl StepEvents<'_> {
    pub fn step(&self) -> i64 {
        self.step
    }

    /// Configuration of this step
    pub fn graph(&self) -> &Arc<SourceGraph> {
        self.cursor.graph()
    }
}

impl Iterator for StepEvents<'_> {
    type Item = EventHandle;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor.advance_in_step() {
            Ok(handle) => Some(handle),
            Err(CursorError::SequenceExhausted) => None,
            Err(e) => {
                log::error!("Step {} iteration stopped: {e}", self.step);
                None
            }
        }
    }
}

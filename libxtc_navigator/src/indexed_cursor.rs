use std::collections::VecDeque;
use std::sync::Arc;

use super::cursor::{JumpTarget, Position, ScopeState};
use super::error::{CursorError, StoreError};
use super::event::EventHandle;
use super::graph::SourceGraph;
use super::resolver::ConfigResolver;
use super::store::IndexedStore;

/// Random access over the runs of an indexed data source.
///
/// Runs are kept as a stack: the active run is navigated by event index (steps are not
/// modeled), and [`IndexedCursor::next_run`] pops the next run off the stack. The
/// SourceGraph is resolved once per run, from the run's configuration.
pub struct IndexedCursor {
    run_stack: VecDeque<Box<dyn IndexedStore>>,
    active_run: Box<dyn IndexedStore>,
    run_index: i64,
    event: i64,
    state: ScopeState,
    resolver: ConfigResolver,
    graph: Arc<SourceGraph>,
    current: Option<EventHandle>,
}

impl IndexedCursor {
    /// Create a cursor over the given runs, positioned before the first event of the
    /// first run. Fails if the runs are empty or the first run's configuration cannot
    /// be resolved.
    pub fn new(
        runs: Vec<Box<dyn IndexedStore>>,
        resolver: ConfigResolver,
    ) -> Result<Self, CursorError> {
        let mut run_stack = VecDeque::from(runs);
        let Some(active_run) = run_stack.pop_front() else {
            return Err(CursorError::NoRuns);
        };
        let graph = resolver.resolve(active_run.config())?;
        log::info!(
            "Opened run {} with {} events (indexed)",
            active_run.run_number(),
            active_run.event_count()
        );
        Ok(Self {
            run_stack,
            active_run,
            run_index: 0,
            event: -1,
            state: ScopeState::Unstarted,
            resolver,
            graph: Arc::new(graph),
            current: None,
        })
    }

    pub fn advance(&mut self) -> Result<EventHandle, CursorError> {
        if self.state == ScopeState::Exhausted {
            return Err(CursorError::SequenceExhausted);
        }
        match self.load(self.event + 1) {
            Ok(handle) => Ok(handle),
            Err(StoreError::IndexOutOfRange(..)) => {
                self.state = ScopeState::Exhausted;
                Err(CursorError::SequenceExhausted)
            }
            Err(e) => {
                log::warn!("Run {} ended early: {e}", self.run_number());
                self.state = ScopeState::Exhausted;
                Err(CursorError::SequenceExhausted)
            }
        }
    }

    /// Jump to an event of the active run.
    ///
    /// An index past either end of the run reports `SequenceExhausted`; a time which
    /// is not part of the run reports `JumpTargetInvalid`. Either way the cursor keeps
    /// its position.
    pub fn jump(&mut self, target: JumpTarget) -> Result<EventHandle, CursorError> {
        let index = match target {
            JumpTarget::Index(index) => {
                if index < 0 || index >= self.active_run.event_count() as i64 {
                    return Err(CursorError::SequenceExhausted);
                }
                index
            }
            JumpTarget::Time(time) => match self.active_run.time_index_of(&time) {
                Ok(index) => index as i64,
                Err(_) => return Err(CursorError::JumpTargetInvalid(target)),
            },
        };
        self.load(index).map_err(|e| {
            log::warn!("Failed to load {target}: {e}");
            CursorError::SequenceExhausted
        })
    }

    /// Move to the next run of the stack, before its first event
    pub fn next_run(&mut self) -> Result<(), CursorError> {
        let Some(next) = self.run_stack.pop_front() else {
            self.state = ScopeState::Exhausted;
            return Err(CursorError::SequenceExhausted);
        };
        let graph = self.resolver.resolve(next.config())?;
        log::info!(
            "Opened run {} with {} events (indexed)",
            next.run_number(),
            next.event_count()
        );
        self.active_run = next;
        self.graph = Arc::new(graph);
        self.run_index += 1;
        self.event = -1;
        self.state = ScopeState::Unstarted;
        self.current = None;
        Ok(())
    }

    fn load(&mut self, index: i64) -> Result<EventHandle, StoreError> {
        let time = self.active_run.event_time_at(index)?;
        let event = self.active_run.event_at(&time)?;
        self.event = index;
        self.state = ScopeState::Positioned;
        let handle = EventHandle::new(
            self.position(),
            time,
            Arc::new(event.records),
            self.graph.clone(),
            self.resolver.shared_registry(),
        );
        self.current = Some(handle.clone());
        Ok(handle)
    }

    pub fn current(&self) -> Option<&EventHandle> {
        self.current.as_ref()
    }

    pub fn position(&self) -> Position {
        Position::new(self.run_index, 0, self.event)
    }

    pub fn state(&self) -> ScopeState {
        self.state
    }

    pub fn graph(&self) -> &Arc<SourceGraph> {
        &self.graph
    }

    pub fn run_number(&self) -> i32 {
        self.active_run.run_number()
    }

    pub fn event_count(&self) -> usize {
        self.active_run.event_count()
    }

    /// Runs left on the stack after the active one
    pub fn remaining_runs(&self) -> usize {
        self.run_stack.len()
    }
}

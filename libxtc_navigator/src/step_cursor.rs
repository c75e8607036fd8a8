use std::sync::Arc;

use super::cursor::{JumpTarget, Position, ScopeState};
use super::error::CursorError;
use super::event::EventHandle;
use super::event_time::EventTime;
use super::graph::SourceGraph;
use super::record::EventRecord;
use super::resolver::ConfigResolver;
use super::store::{IndexedStore, StepStore};

/// Where a streaming cursor is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Unstarted,
    InStep,
    /// Sitting on an event reached by a jump. `resume` is the stream position at the
    /// time of the (first) jump; the next plain advance continues from there.
    Jumped { resume: Position },
    Exhausted,
}

/// Streaming traversal of one run, step by step.
///
/// Events are pulled from the open step; when it runs dry the next step is opened and
/// the pull retried, so plain `advance()` calls walk the whole run without the caller
/// seeing step boundaries. The SourceGraph is rebuilt from each step's configuration.
///
/// Jumps go through a parallel indexed view of the run which is only opened on the
/// first jump. The stream itself never moves during a jump.
pub struct StepCursor {
    stream: Box<dyn StepStore>,
    index: Option<Box<dyn IndexedStore>>,
    state: StepState,
    step: i64,
    event: i64,
    jumped_event: i64,
    resolver: ConfigResolver,
    graph: Arc<SourceGraph>,
    current: Option<EventHandle>,
}

impl StepCursor {
    /// Create a cursor before the first step. Fails if the run configuration cannot be
    /// resolved.
    pub fn new(stream: Box<dyn StepStore>, resolver: ConfigResolver) -> Result<Self, CursorError> {
        let graph = resolver.resolve(stream.run_config())?;
        log::info!("Opened run {} (streaming)", stream.run_number());
        Ok(Self {
            stream,
            index: None,
            state: StepState::Unstarted,
            step: -1,
            event: -1,
            jumped_event: -1,
            resolver,
            graph: Arc::new(graph),
            current: None,
        })
    }

    pub fn advance(&mut self) -> Result<EventHandle, CursorError> {
        loop {
            match self.state {
                StepState::Exhausted => return Err(CursorError::SequenceExhausted),
                StepState::Unstarted => {
                    self.next_step()?;
                    continue;
                }
                StepState::Jumped { resume } => self.restore(resume),
                StepState::InStep => (),
            }

            match self.stream.next_event_in_step() {
                Ok(Some(event)) => {
                    self.event += 1;
                    return Ok(self.publish(event));
                }
                // Step exhausted, try the next one
                Ok(None) => {
                    self.next_step()?;
                }
                Err(e) => {
                    log::warn!("Run {} ended early: {e}", self.run_number());
                    self.state = StepState::Exhausted;
                    return Err(CursorError::SequenceExhausted);
                }
            }
        }
    }

    /// Move to the next event of the open step only. Reports `SequenceExhausted` at
    /// the end of the step without opening the next one.
    pub fn advance_in_step(&mut self) -> Result<EventHandle, CursorError> {
        if let StepState::Jumped { resume } = self.state {
            self.restore(resume);
        }
        if self.state != StepState::InStep {
            return Err(CursorError::SequenceExhausted);
        }
        match self.stream.next_event_in_step() {
            Ok(Some(event)) => {
                self.event += 1;
                Ok(self.publish(event))
            }
            Ok(None) => Err(CursorError::SequenceExhausted),
            Err(e) => {
                log::warn!("Run {} ended early: {e}", self.run_number());
                self.state = StepState::Exhausted;
                Err(CursorError::SequenceExhausted)
            }
        }
    }

    /// Open the next step and rebuild the SourceGraph from its configuration.
    ///
    /// Returns the position before the first event of the new step, or
    /// `SequenceExhausted` after the last step.
    pub fn next_step(&mut self) -> Result<Position, CursorError> {
        match self.state {
            StepState::Exhausted => return Err(CursorError::SequenceExhausted),
            StepState::Jumped { resume } => self.restore(resume),
            _ => (),
        }

        let config = match self.stream.next_step_snapshot() {
            Ok(Some(config)) => config,
            Ok(None) => {
                self.state = StepState::Exhausted;
                return Err(CursorError::SequenceExhausted);
            }
            Err(e) => {
                log::warn!("Run {} ended early: {e}", self.run_number());
                self.state = StepState::Exhausted;
                return Err(CursorError::SequenceExhausted);
            }
        };
        // The stream is inside the new step from here on
        self.step += 1;
        self.event = -1;
        match self.resolver.resolve(&config) {
            Ok(graph) => self.graph = Arc::new(graph),
            Err(e) => {
                log::error!(
                    "Run {} step {} has an unusable configuration: {e}",
                    self.run_number(),
                    self.step
                );
                self.state = StepState::Exhausted;
                return Err(CursorError::SequenceExhausted);
            }
        }
        self.state = StepState::InStep;
        log::debug!("Run {} opened step {}", self.run_number(), self.step);
        Ok(self.position())
    }

    /// Jump to an event anywhere in the run.
    ///
    /// On failure the cursor is left untouched and `JumpTargetInvalid` is returned.
    pub fn jump(&mut self, target: JumpTarget) -> Result<EventHandle, CursorError> {
        if self.index.is_none() {
            log::debug!("Opening index of run {} for jumps", self.run_number());
            match self.stream.open_index() {
                Ok(index) => self.index = Some(index),
                Err(e) => {
                    log::warn!("Could not index run {}: {e}", self.run_number());
                    return Err(CursorError::JumpTargetInvalid(target));
                }
            }
        }
        let Some(index) = self.index.as_deref() else {
            return Err(CursorError::JumpTargetInvalid(target));
        };

        let (global, event) = match Self::lookup(index, target) {
            Some(found) => found,
            None => return Err(CursorError::JumpTargetInvalid(target)),
        };

        let resume = match self.state {
            StepState::Jumped { resume } => resume,
            _ => self.stream_position(),
        };
        self.state = StepState::Jumped { resume };
        self.jumped_event = global;
        Ok(self.publish(event))
    }

    fn lookup(index: &dyn IndexedStore, target: JumpTarget) -> Option<(i64, EventRecord)> {
        let time: EventTime = match target {
            JumpTarget::Index(i) => index.event_time_at(i).ok()?,
            JumpTarget::Time(time) => time,
        };
        let global = index.time_index_of(&time).ok()?;
        let event = index.event_at(&time).ok()?;
        Some((global as i64, event))
    }

    fn restore(&mut self, resume: Position) {
        self.step = resume.step;
        self.event = resume.event;
        self.state = if resume.step < 0 {
            StepState::Unstarted
        } else {
            StepState::InStep
        };
    }

    fn stream_position(&self) -> Position {
        Position::new(0, self.step, self.event)
    }

    fn publish(&mut self, event: EventRecord) -> EventHandle {
        let handle = EventHandle::new(
            self.position(),
            event.time,
            Arc::new(event.records),
            self.graph.clone(),
            self.resolver.shared_registry(),
        );
        self.current = Some(handle.clone());
        handle
    }

    pub fn current(&self) -> Option<&EventHandle> {
        self.current.as_ref()
    }

    pub fn position(&self) -> Position {
        match self.state {
            StepState::Jumped { .. } => Position::new(0, -1, self.jumped_event),
            _ => self.stream_position(),
        }
    }

    pub fn step_state(&self) -> StepState {
        self.state
    }

    pub fn state(&self) -> ScopeState {
        match self.state {
            StepState::Unstarted => ScopeState::Unstarted,
            StepState::InStep | StepState::Jumped { .. } => ScopeState::Positioned,
            StepState::Exhausted => ScopeState::Exhausted,
        }
    }

    pub fn graph(&self) -> &Arc<SourceGraph> {
        &self.graph
    }

    pub fn run_number(&self) -> i32 {
        self.stream.run_number()
    }
}

//! Event navigation.
//!
//! A [`Cursor`] presents one "current event" over the three ways a run can be read:
//! indexed random access, small-data streaming with step boundaries, and live feeds.
//! The variant is fixed at construction from the data source's access mode. Every
//! successful `advance()`/`jump()` yields an [`EventHandle`] bound to the record
//! snapshot and the SourceGraph valid for that event.
use std::fmt::Display;
use std::sync::Arc;

use super::data_source_spec::AccessMode;
use super::error::CursorError;
use super::event::EventHandle;
use super::event_time::EventTime;
use super::graph::SourceGraph;
use super::indexed_cursor::IndexedCursor;
use super::live_cursor::LiveCursor;
use super::step_cursor::StepCursor;

/// Where a cursor sits: run, step and event.
///
/// `event` is -1 before the first event of a run/step. `step` is -1 before the first
/// step of a streamed run and while a streaming cursor sits on a jumped-to event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub run: i64,
    pub step: i64,
    pub event: i64,
}

impl Position {
    pub fn new(run: i64, step: i64, event: i64) -> Self {
        Self { run, step, event }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(0, -1, -1)
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run {} step {} event {}", self.run, self.step, self.event)
    }
}

/// Life cycle of a cursor scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    Unstarted,
    Positioned,
    Exhausted,
}

/// A jump request: an event index within the run, or an event time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpTarget {
    Index(i64),
    Time(EventTime),
}

impl From<i64> for JumpTarget {
    fn from(value: i64) -> Self {
        Self::Index(value)
    }
}

impl From<usize> for JumpTarget {
    fn from(value: usize) -> Self {
        Self::Index(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<EventTime> for JumpTarget {
    fn from(value: EventTime) -> Self {
        Self::Time(value)
    }
}

impl From<(u32, u32, u32)> for JumpTarget {
    fn from(value: (u32, u32, u32)) -> Self {
        Self::Time(EventTime::from(value))
    }
}

impl Display for JumpTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(index) => write!(f, "event index {index}"),
            Self::Time(time) => write!(
                f,
                "event time ({}, {}, {})",
                time.seconds, time.nanoseconds, time.fiducial
            ),
        }
    }
}

/// A cursor over one data source, in one of the three access modes
pub enum Cursor {
    Indexed(IndexedCursor),
    Stepped(StepCursor),
    Live(LiveCursor),
}

impl Cursor {
    pub fn mode(&self) -> AccessMode {
        match self {
            Self::Indexed(_) => AccessMode::Indexed,
            Self::Stepped(_) => AccessMode::Stepped,
            Self::Live(_) => AccessMode::Live,
        }
    }

    /// Move to the next event. `SequenceExhausted` marks the clean end of the data.
    pub fn advance(&mut self) -> Result<EventHandle, CursorError> {
        match self {
            Self::Indexed(cursor) => cursor.advance(),
            Self::Stepped(cursor) => cursor.advance(),
            Self::Live(cursor) => cursor.advance(),
        }
    }

    /// Move to the next event without blocking. Only a live feed can report
    /// `FeedBlocked`; the other modes behave like [`Cursor::advance`].
    pub fn try_advance(&mut self) -> Result<EventHandle, CursorError> {
        match self {
            Self::Live(cursor) => cursor.try_advance(),
            other => other.advance(),
        }
    }

    pub fn jump(&mut self, target: impl Into<JumpTarget>) -> Result<EventHandle, CursorError> {
        let target = target.into();
        match self {
            Self::Indexed(cursor) => cursor.jump(target),
            Self::Stepped(cursor) => cursor.jump(target),
            Self::Live(cursor) => cursor.jump(),
        }
    }

    /// Move to the next event without leaving the open step
    pub fn advance_in_step(&mut self) -> Result<EventHandle, CursorError> {
        match self {
            Self::Stepped(cursor) => cursor.advance_in_step(),
            other => Err(CursorError::StepsUnsupported(other.mode())),
        }
    }

    /// Open the next step. Only streamed runs have steps.
    pub fn next_step(&mut self) -> Result<Position, CursorError> {
        match self {
            Self::Stepped(cursor) => cursor.next_step(),
            other => Err(CursorError::StepsUnsupported(other.mode())),
        }
    }

    /// Move to the start of the next run. Only indexed cursors hold more than one run.
    pub fn next_run(&mut self) -> Result<(), CursorError> {
        match self {
            Self::Indexed(cursor) => cursor.next_run(),
            _ => Err(CursorError::SequenceExhausted),
        }
    }

    /// The event of the last successful advance or jump
    pub fn current(&self) -> Option<&EventHandle> {
        match self {
            Self::Indexed(cursor) => cursor.current(),
            Self::Stepped(cursor) => cursor.current(),
            Self::Live(cursor) => cursor.current(),
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Self::Indexed(cursor) => cursor.position(),
            Self::Stepped(cursor) => cursor.position(),
            Self::Live(cursor) => cursor.position(),
        }
    }

    pub fn state(&self) -> ScopeState {
        match self {
            Self::Indexed(cursor) => cursor.state(),
            Self::Stepped(cursor) => cursor.state(),
            Self::Live(cursor) => cursor.state(),
        }
    }

    /// The SourceGraph currently in force
    pub fn graph(&self) -> &Arc<SourceGraph> {
        match self {
            Self::Indexed(cursor) => cursor.graph(),
            Self::Stepped(cursor) => cursor.graph(),
            Self::Live(cursor) => cursor.graph(),
        }
    }

    /// Number of the run being read. Live feeds carry no run number.
    pub fn run_number(&self) -> Option<i32> {
        match self {
            Self::Indexed(cursor) => Some(cursor.run_number()),
            Self::Stepped(cursor) => Some(cursor.run_number()),
            Self::Live(_) => None,
        }
    }
}

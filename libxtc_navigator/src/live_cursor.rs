use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::cursor::{Position, ScopeState};
use super::data_source_spec::AccessMode;
use super::error::CursorError;
use super::event::EventHandle;
use super::graph::SourceGraph;
use super::resolver::ConfigResolver;
use super::store::{LiveFeed, LivePoll};

/// Sequential access to a live feed: no index, no steps, no jumps.
///
/// A live feed has no stable step boundary, so the SourceGraph is rebuilt from the
/// feed's latest configuration before every event.
pub struct LiveCursor {
    feed: Box<dyn LiveFeed>,
    event: i64,
    state: ScopeState,
    interrupt: Arc<AtomicBool>,
    resolver: ConfigResolver,
    graph: Arc<SourceGraph>,
    current: Option<EventHandle>,
}

impl LiveCursor {
    pub fn new(feed: Box<dyn LiveFeed>, resolver: ConfigResolver) -> Result<Self, CursorError> {
        let graph = resolver.resolve(feed.config_snapshot())?;
        log::info!("Attached to live feed");
        Ok(Self {
            feed,
            event: -1,
            state: ScopeState::Unstarted,
            interrupt: Arc::new(AtomicBool::new(false)),
            resolver,
            graph: Arc::new(graph),
            current: None,
        })
    }

    /// Flag which interrupts a blocking [`LiveCursor::advance`] when set. The flag is
    /// cleared once the interruption has been reported.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }

    /// Block until the next event arrives.
    ///
    /// Returns `SequenceExhausted` once the feed is closed and `Interrupted` if the
    /// interrupt flag was raised while waiting. In both cases the cursor keeps its last
    /// event.
    pub fn advance(&mut self) -> Result<EventHandle, CursorError> {
        loop {
            if self.interrupt.swap(false, Ordering::SeqCst) {
                log::info!("Live feed wait interrupted at {}", self.position());
                return Err(CursorError::Interrupted);
            }
            match self.try_advance() {
                Err(CursorError::FeedBlocked) => continue,
                Err(CursorError::FeedClosed) => return Err(CursorError::SequenceExhausted),
                other => return other,
            }
        }
    }

    /// Poll the feed once
    pub fn try_advance(&mut self) -> Result<EventHandle, CursorError> {
        if self.state == ScopeState::Exhausted {
            return Err(CursorError::FeedClosed);
        }
        match self.feed.next_live_event() {
            LivePoll::Event(event) => {
                // An unusable configuration keeps the last good graph
                match self.resolver.resolve(self.feed.config_snapshot()) {
                    Ok(graph) => self.graph = Arc::new(graph),
                    Err(e) => log::warn!(
                        "Live feed configuration rejected at event {}: {e}",
                        self.event + 1
                    ),
                }
                self.event += 1;
                self.state = ScopeState::Positioned;
                let handle = EventHandle::new(
                    self.position(),
                    event.time,
                    Arc::new(event.records),
                    self.graph.clone(),
                    self.resolver.shared_registry(),
                );
                self.current = Some(handle.clone());
                Ok(handle)
            }
            LivePoll::Blocked => Err(CursorError::FeedBlocked),
            LivePoll::FeedClosed => {
                log::info!("Live feed closed after {} events", self.event + 1);
                self.state = ScopeState::Exhausted;
                Err(CursorError::FeedClosed)
            }
        }
    }

    pub fn jump(&mut self) -> Result<EventHandle, CursorError> {
        Err(CursorError::JumpUnsupported(AccessMode::Live))
    }

    pub fn current(&self) -> Option<&EventHandle> {
        self.current.as_ref()
    }

    pub fn position(&self) -> Position {
        Position::new(0, 0, self.event)
    }

    pub fn state(&self) -> ScopeState {
        self.state
    }

    pub fn graph(&self) -> &Arc<SourceGraph> {
        &self.graph
    }
}

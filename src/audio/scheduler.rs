//! Gapless playback scheduling for streamed audio chunks.
//!
//! Chunks arrive with network jitter but must play back strictly in
//! order, with no overlap and no avoidable gaps. A monotonic
//! "next start time" cursor decides where each chunk goes on the output
//! timeline: `start = max(cursor, now)`, then the cursor advances by the
//! chunk's duration.

use std::collections::HashMap;

/// Source of "now" on the output timeline, in seconds.
///
/// Real playback uses the sink's sample counter; tests use a manual clock.
pub trait OutputClock {
    fn now(&self) -> f64;
}

/// A chunk placed on the timeline, tracked until natural completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledSource {
    pub id: u64,
    pub start: f64,
    pub duration: f64,
}

impl ScheduledSource {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Single-owner scheduler: append-only timeline cursor plus an
/// id-addressable set of in-flight sources.
#[derive(Debug)]
pub struct PlaybackScheduler<C: OutputClock> {
    clock: C,
    cursor: f64,
    next_id: u64,
    active: HashMap<u64, ScheduledSource>,
}

impl<C: OutputClock> PlaybackScheduler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            cursor: 0.0,
            next_id: 0,
            active: HashMap::new(),
        }
    }

    /// Place a chunk of `duration` seconds on the timeline and track it
    pub fn schedule(&mut self, duration: f64) -> ScheduledSource {
        let start = self.cursor.max(self.clock.now());
        self.cursor = start + duration;

        let source = ScheduledSource {
            id: self.next_id,
            start,
            duration,
        };
        self.next_id += 1;
        self.active.insert(source.id, source);
        source
    }

    /// Remove a source that finished playing naturally
    pub fn complete(&mut self, id: u64) -> Option<ScheduledSource> {
        self.active.remove(&id)
    }

    /// Hard stop: drop every in-flight source and rewind the cursor to
    /// the current clock so the next chunk plays immediately.
    /// Returns how many sources were cancelled.
    pub fn clear(&mut self) -> usize {
        let cancelled = self.active.len();
        self.active.clear();
        self.cursor = self.clock.now();
        cancelled
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }
}

/// Manually advanced clock for tests
#[derive(Debug, Default)]
pub struct ManualClock {
    pub time: f64,
}

impl OutputClock for ManualClock {
    fn now(&self) -> f64 {
        self.time
    }
}

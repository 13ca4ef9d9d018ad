//! Recording output sinks for tests.
//!
//! Both sinks remember everything they were asked to do so tests can assert on
//! schedules, cancellations and light transitions without real hardware.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::audio::{ScheduledTone, ToneSink};
use crate::clock::Clock;
use crate::error::{EngineError, Result};
use crate::flash::{FlashColor, LightSink};
use crate::session::SessionId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Scheduled {
        session: SessionId,
        tones: Vec<ScheduledTone>,
    },
    Cancelled {
        session: SessionId,
        from: Duration,
    },
}

/// [`ToneSink`] that records calls and reads time from an injected clock
pub struct RecordingToneSink {
    clock: Arc<dyn Clock>,
    available: AtomicBool,
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingToneSink {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            available: AtomicBool::new(true),
            events: Mutex::new(Vec::new()),
        }
    }

    /// A sink whose device has gone away
    pub fn unavailable(clock: Arc<dyn Clock>) -> Self {
        let sink = Self::new(clock);
        sink.set_available(false);
        sink
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    /// Tones that will actually sound once cancellations are applied
    pub fn audible_tones(&self) -> Vec<ScheduledTone> {
        let events = self.events.lock();
        let mut cut: HashMap<SessionId, Duration> = HashMap::new();
        for event in events.iter() {
            if let SinkEvent::Cancelled { session, from } = event {
                cut.entry(*session).or_insert(*from);
            }
        }

        events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Scheduled { session, tones } => Some((session, tones)),
                SinkEvent::Cancelled { .. } => None,
            })
            .flat_map(|(session, tones)| {
                let limit = cut.get(session).copied();
                tones
                    .iter()
                    .filter(move |t| limit.map_or(true, |from| t.start < from))
                    .copied()
            })
            .collect()
    }
}

impl ToneSink for RecordingToneSink {
    fn now(&self) -> Duration {
        self.clock.now()
    }

    fn is_alive(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn schedule(&self, session: SessionId, tones: &[ScheduledTone]) -> Result<()> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(EngineError::AudioUnavailable(
                "recording sink disabled".to_string(),
            ));
        }
        self.events.lock().push(SinkEvent::Scheduled {
            session,
            tones: tones.to_vec(),
        });
        Ok(())
    }

    fn cancel(&self, session: SessionId, from: Duration) {
        self.events
            .lock()
            .push(SinkEvent::Cancelled { session, from });
    }
}

/// [`LightSink`] that keeps the current state and every transition
#[derive(Default)]
pub struct RecordingLight {
    state: Mutex<LightState>,
}

#[derive(Default)]
struct LightState {
    lit: bool,
    color: Option<FlashColor>,
    transitions: Vec<bool>,
}

impl RecordingLight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_lit(&self) -> bool {
        self.state.lock().lit
    }

    pub fn color(&self) -> Option<FlashColor> {
        self.state.lock().color
    }

    /// Every `set_lit` value received, in order
    pub fn transitions(&self) -> Vec<bool> {
        self.state.lock().transitions.clone()
    }

    /// Number of times the light was switched on
    pub fn flashes(&self) -> usize {
        self.state.lock().transitions.iter().filter(|lit| **lit).count()
    }
}

impl LightSink for RecordingLight {
    fn set_color(&self, color: FlashColor) {
        self.state.lock().color = Some(color);
    }

    fn set_lit(&self, lit: bool) {
        let mut state = self.state.lock();
        state.lit = lit;
        state.transitions.push(lit);
    }
}

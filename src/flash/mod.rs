mod terminal;

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::cw::TransmissionPlan;
use crate::session::{CancelToken, SessionId};

pub use terminal::TerminalLight;

/// Hue of the visual sink; never affects timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FlashColor {
    #[default]
    White,
    Yellow,
    Red,
    Blue,
}

impl FlashColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashColor::White => "white",
            FlashColor::Yellow => "yellow",
            FlashColor::Red => "red",
            FlashColor::Blue => "blue",
        }
    }
}

impl fmt::Display for FlashColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlashColor {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "white" => Ok(FlashColor::White),
            "yellow" => Ok(FlashColor::Yellow),
            "red" => Ok(FlashColor::Red),
            "blue" => Ok(FlashColor::Blue),
            other => Err(format!("unknown color '{other}' (white, yellow, red, blue)")),
        }
    }
}

/// Visual output that can be switched on and off
pub trait LightSink: Send + Sync {
    fn set_color(&self, color: FlashColor);
    fn set_lit(&self, lit: bool);
}

/// On/off events of one plan, at absolute clock times
#[derive(Debug, Clone)]
pub struct FlashTimeline {
    events: Vec<(Duration, bool)>,
    next: usize,
}

impl FlashTimeline {
    /// Every event is `t0 + offset`; nothing is derived from a previous event
    pub fn new(plan: &TransmissionPlan, t0: Duration) -> Self {
        let events = plan
            .audible()
            .flat_map(|i| [(t0 + i.offset, true), (t0 + i.end(), false)])
            .collect();
        Self { events, next: 0 }
    }

    /// When the next unfired event is due
    pub fn next_deadline(&self) -> Option<Duration> {
        self.events.get(self.next).map(|(at, _)| *at)
    }

    /// Apply every event due at or before `now`; returns how many fired
    pub fn fire_due(&mut self, now: Duration, light: &dyn LightSink) -> usize {
        let mut fired = 0;
        while let Some(&(at, lit)) = self.events.get(self.next) {
            if at > now {
                break;
            }
            light.set_lit(lit);
            self.next += 1;
            fired += 1;
        }
        fired
    }

    pub fn is_done(&self) -> bool {
        self.next >= self.events.len()
    }
}

/// Realizes plans as light pulses using wall-clock timers
#[derive(Clone)]
pub struct FlashEmitter {
    clock: Arc<dyn Clock>,
    light: Arc<dyn LightSink>,
}

impl FlashEmitter {
    pub fn new(clock: Arc<dyn Clock>, light: Arc<dyn LightSink>) -> Self {
        Self { clock, light }
    }

    /// Start a timer thread for `plan` and return immediately
    pub fn start(&self, plan: &TransmissionPlan, color: FlashColor, session: SessionId) -> FlashHandle {
        self.light.set_color(color);

        let t0 = self.clock.now();
        let timeline = FlashTimeline::new(plan, t0);
        let shared = Arc::new(FlashShared {
            light: Arc::clone(&self.light),
            gate: Mutex::new(false),
            done: AtomicBool::new(false),
        });
        let (wake_tx, wake_rx) = bounded::<()>(1);

        let thread_shared = Arc::clone(&shared);
        let clock = Arc::clone(&self.clock);
        let thread = thread::Builder::new()
            .name(format!("morse-flash-{}", session.0))
            .spawn(move || run_timeline(timeline, clock, thread_shared, wake_rx));

        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("[flash] failed to spawn timer thread: {}", e);
                shared.done.store(true, Ordering::Release);
                None
            }
        };

        debug!(
            "[flash] session {} started, {:?} in {}",
            session,
            plan.total_duration(),
            color
        );

        FlashHandle {
            session,
            shared,
            wake_tx,
            thread: Mutex::new(thread),
            token: CancelToken::new(),
        }
    }
}

struct FlashShared {
    light: Arc<dyn LightSink>,
    /// Set once cancelled; held while an event is applied so a cancel
    /// can never be followed by a late "on"
    gate: Mutex<bool>,
    done: AtomicBool,
}

fn run_timeline(
    mut timeline: FlashTimeline,
    clock: Arc<dyn Clock>,
    shared: Arc<FlashShared>,
    wake_rx: Receiver<()>,
) {
    while let Some(at) = timeline.next_deadline() {
        let now = clock.now();
        if at > now {
            match wake_rx.recv_timeout(at - now) {
                Err(RecvTimeoutError::Timeout) => {}
                // woken by cancel, or the handle went away
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            }
        }

        let cancelled = shared.gate.lock();
        if *cancelled {
            return;
        }
        timeline.fire_due(clock.now(), shared.light.as_ref());
    }

    shared.done.store(true, Ordering::Release);
}

/// Control over one running flash transmission
pub struct FlashHandle {
    session: SessionId,
    shared: Arc<FlashShared>,
    wake_tx: Sender<()>,
    thread: Mutex<Option<JoinHandle<()>>>,
    token: CancelToken,
}

impl FlashHandle {
    /// Clear all pending events and force the light off. Idempotent.
    ///
    /// When this returns the light is off and no further event will fire.
    pub fn cancel(&self) {
        {
            let mut cancelled = self.shared.gate.lock();
            if *cancelled {
                return;
            }
            *cancelled = true;
            self.token.cancel();
            self.shared.light.set_lit(false);
        }

        let _ = self.wake_tx.try_send(());
        if let Some(thread) = self.thread.lock().take() {
            let _ = thread.join();
        }
        debug!("[flash] session {} cancelled", self.session);
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancelled, or the last "off" event has fired
    pub fn is_finished(&self) -> bool {
        self.is_cancelled() || self.shared.done.load(Ordering::Acquire)
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }
}

impl Drop for FlashHandle {
    fn drop(&mut self) {
        if self.shared.done.load(Ordering::Acquire) {
            if let Some(thread) = self.thread.get_mut().take() {
                let _ = thread.join();
            }
        } else {
            self.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, MonotonicClock};
    use crate::cw::{encode, plan, TimingModel};
    use crate::testing::RecordingLight;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!("Red".parse::<FlashColor>(), Ok(FlashColor::Red));
        assert_eq!("BLUE".parse::<FlashColor>(), Ok(FlashColor::Blue));
        assert!("green".parse::<FlashColor>().is_err());
        assert_eq!(FlashColor::default(), FlashColor::White);
    }

    #[test]
    fn test_timeline_events_are_absolute() {
        let p = plan(&encode("EE"), &TimingModel::from_rate(20));
        let t = FlashTimeline::new(&p, ms(500));
        assert_eq!(
            t.events,
            vec![(ms(500), true), (ms(560), false), (ms(740), true), (ms(800), false)]
        );
    }

    #[test]
    fn test_fire_due_with_manual_time() {
        let clock = ManualClock::new();
        let light = RecordingLight::new();
        let p = plan(&encode("I"), &TimingModel::from_rate(20));
        let mut t = FlashTimeline::new(&p, clock.now());

        assert_eq!(t.fire_due(clock.now(), &light), 1);
        assert!(light.is_lit());
        clock.advance(ms(59));
        assert_eq!(t.fire_due(clock.now(), &light), 0);
        clock.advance(ms(1));
        assert_eq!(t.fire_due(clock.now(), &light), 1);
        assert!(!light.is_lit());
        // a late poll catches up on everything that is due
        clock.advance(ms(500));
        assert_eq!(t.fire_due(clock.now(), &light), 2);
        assert!(t.is_done());
        assert_eq!(light.transitions(), vec![true, false, true, false]);
    }

    #[test]
    fn test_cancel_forces_light_off_and_stops_events() {
        let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
        let light = Arc::new(RecordingLight::new());
        let emitter = FlashEmitter::new(clock, light.clone());

        let p = plan(&encode("TTTT"), &TimingModel::from_rate(5));
        let handle = emitter.start(&p, FlashColor::Red, SessionId(3));
        thread::sleep(ms(20));
        assert!(light.is_lit());

        handle.cancel();
        assert!(!light.is_lit());
        assert!(handle.is_cancelled());
        let seen = light.transitions().len();

        thread::sleep(ms(100));
        handle.cancel();
        assert_eq!(light.transitions().len(), seen);
        assert_eq!(light.color(), Some(FlashColor::Red));
    }

    #[test]
    fn test_runs_to_completion() {
        let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
        let light = Arc::new(RecordingLight::new());
        let emitter = FlashEmitter::new(clock, light.clone());

        // 50 WPM: unit 24 ms, "EE" lasts 120 ms
        let p = plan(&encode("EE"), &TimingModel::from_rate(50));
        let handle = emitter.start(&p, FlashColor::White, SessionId(1));
        thread::sleep(ms(400));

        assert!(handle.is_finished());
        assert!(!handle.is_cancelled());
        assert_eq!(light.transitions(), vec![true, false, true, false]);
    }
}

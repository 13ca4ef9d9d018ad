mod sidetone;

#[cfg(feature = "audio-cpal")]
mod device;

use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::cw::TransmissionPlan;
use crate::error::Result;
use crate::session::{CancelToken, SessionId};

pub use sidetone::{QueuedTone, ToneQueue, ToneRenderer};

#[cfg(feature = "audio-cpal")]
pub use device::CpalToneSink;

/// Carrier frequency used when nothing else is configured
pub const DEFAULT_FREQUENCY_HZ: f32 = 600.0;

/// Edge ramp applied to every tone to avoid key clicks
pub const DEFAULT_FADE: Duration = Duration::from_millis(5);

/// A tone on the sink's own clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTone {
    pub start: Duration,
    pub duration: Duration,
}

impl ScheduledTone {
    pub fn end(&self) -> Duration {
        self.start + self.duration
    }
}

/// Tone settings for an output device
#[derive(Debug, Clone, PartialEq)]
pub struct ToneConfig {
    pub frequency: f32,
    pub volume: f32,
    pub fade: Duration,
    /// Output device name; `None` picks the host default
    pub device: Option<String>,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            frequency: DEFAULT_FREQUENCY_HZ,
            volume: 0.5,
            fade: DEFAULT_FADE,
            device: None,
        }
    }
}

/// Audio output that schedules tones against its own sample clock
pub trait ToneSink: Send + Sync {
    /// Current position of the sink's playback clock
    fn now(&self) -> Duration;

    /// How far past [`now`](Self::now) a tone must start to be heard whole.
    ///
    /// A device that renders ahead of its reported clock returns at least the
    /// span it may already have rendered.
    fn lead_in(&self) -> Duration {
        Duration::ZERO
    }

    /// False once the device has failed and its clock no longer advances
    fn is_alive(&self) -> bool {
        true
    }

    /// Queue tones for `session`. Fails when the device can no longer produce a clock.
    fn schedule(&self, session: SessionId, tones: &[ScheduledTone]) -> Result<()>;

    /// Drop every tone of `session` starting at or after `from`; a tone already
    /// sounding plays out.
    fn cancel(&self, session: SessionId, from: Duration);
}

/// Open the default audio output for `config`
#[cfg(feature = "audio-cpal")]
pub fn open_output(config: &ToneConfig) -> Result<Arc<dyn ToneSink>> {
    Ok(Arc::new(CpalToneSink::open(config)?))
}

#[cfg(not(feature = "audio-cpal"))]
pub fn open_output(_config: &ToneConfig) -> Result<Arc<dyn ToneSink>> {
    Err(crate::error::EngineError::AudioUnavailable(
        "built without audio support".to_string(),
    ))
}

/// Names of the available output devices
#[cfg(feature = "audio-cpal")]
pub fn list_output_devices() -> Vec<String> {
    CpalToneSink::list_output_devices()
}

#[cfg(not(feature = "audio-cpal"))]
pub fn list_output_devices() -> Vec<String> {
    Vec::new()
}

/// Realizes plans as tones on a [`ToneSink`]
#[derive(Clone)]
pub struct AudioEmitter {
    sink: Arc<dyn ToneSink>,
}

impl AudioEmitter {
    pub fn new(sink: Arc<dyn ToneSink>) -> Self {
        Self { sink }
    }

    /// Schedule every audible interval of `plan` and return immediately.
    ///
    /// All tones are placed relative to one instant read from the sink clock,
    /// so rounding never accumulates across intervals. That instant sits the
    /// sink's lead-in ahead of its clock so the first element is never clipped.
    pub fn start(&self, plan: &TransmissionPlan, session: SessionId) -> Result<AudioHandle> {
        let t0 = self.sink.now() + self.sink.lead_in();
        let tones: Vec<ScheduledTone> = plan
            .audible()
            .map(|interval| ScheduledTone {
                start: t0 + interval.offset,
                duration: interval.duration,
            })
            .collect();

        self.sink.schedule(session, &tones)?;
        debug!(
            "[audio] session {} scheduled {} tones over {:?}",
            session,
            tones.len(),
            plan.total_duration()
        );

        Ok(AudioHandle {
            sink: Arc::clone(&self.sink),
            session,
            ends_at: t0 + plan.total_duration(),
            token: CancelToken::new(),
        })
    }
}

/// Control over one scheduled audio transmission
pub struct AudioHandle {
    sink: Arc<dyn ToneSink>,
    session: SessionId,
    ends_at: Duration,
    token: CancelToken,
}

impl AudioHandle {
    /// Stop any tone that has not started yet. Idempotent.
    pub fn cancel(&self) {
        if self.token.cancel() {
            self.sink.cancel(self.session, self.sink.now());
            debug!("[audio] session {} cancelled", self.session);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancelled, the device died, or the sink clock has passed the end of the plan
    pub fn is_finished(&self) -> bool {
        self.is_cancelled() || !self.sink.is_alive() || self.sink.now() >= self.ends_at
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }
}

impl Drop for AudioHandle {
    fn drop(&mut self) {
        if !self.is_finished() {
            self.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use parking_lot::Mutex;
    use crate::cw::{encode, plan, TimingModel};
    use crate::testing::{RecordingToneSink, SinkEvent};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_tones_are_anchored_to_one_instant() {
        let clock = Arc::new(ManualClock::new());
        clock.advance(ms(1000));
        let sink = Arc::new(RecordingToneSink::new(clock.clone()));
        let emitter = AudioEmitter::new(sink.clone());

        let p = plan(&encode("AE"), &TimingModel::from_rate(20));
        let _handle = emitter.start(&p, SessionId(1)).unwrap();

        let starts: Vec<_> = sink.audible_tones().iter().map(|t| t.start).collect();
        // A = dot(0) dash(120); char gap; E at 60+60+180+180
        assert_eq!(starts, vec![ms(1000), ms(1120), ms(1480)]);
    }

    #[test]
    fn test_cancel_drops_pending_tones_once() {
        let clock = Arc::new(ManualClock::new());
        let sink = Arc::new(RecordingToneSink::new(clock.clone()));
        let emitter = AudioEmitter::new(sink.clone());

        let p = plan(&encode("SOS"), &TimingModel::from_rate(20));
        let handle = emitter.start(&p, SessionId(7)).unwrap();
        clock.advance(ms(30));
        handle.cancel();
        handle.cancel();

        assert!(handle.is_cancelled());
        assert!(handle.is_finished());
        let cancels = sink
            .events()
            .iter()
            .filter(|e| matches!(e, SinkEvent::Cancelled { .. }))
            .count();
        assert_eq!(cancels, 1);
        // only the first dot had started
        assert_eq!(sink.audible_tones().len(), 1);
    }

    #[test]
    fn test_finishes_when_sink_clock_passes_total() {
        let clock = Arc::new(ManualClock::new());
        let sink = Arc::new(RecordingToneSink::new(clock.clone()));
        let emitter = AudioEmitter::new(sink.clone());

        let p = plan(&encode("E"), &TimingModel::from_rate(20));
        let handle = emitter.start(&p, SessionId(1)).unwrap();
        assert!(!handle.is_finished());
        clock.advance(ms(59));
        assert!(!handle.is_finished());
        clock.advance(ms(1));
        assert!(handle.is_finished());
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn test_dead_sink_finishes_session() {
        let clock = Arc::new(ManualClock::new());
        let sink = Arc::new(RecordingToneSink::new(clock.clone()));
        let emitter = AudioEmitter::new(sink.clone());

        let p = plan(&encode("PARIS"), &TimingModel::from_rate(20));
        let handle = emitter.start(&p, SessionId(1)).unwrap();
        clock.advance(ms(100));
        assert!(!handle.is_finished());

        // the device clock stalls after a stream error
        sink.set_available(false);
        assert!(handle.is_finished());
        assert!(!handle.is_cancelled());
    }

    /// Sink whose clock moves on while `schedule` waits for the render lock
    struct BusySink {
        clock: Arc<ManualClock>,
        lead: Duration,
        render_block: Duration,
        late: Mutex<Vec<ScheduledTone>>,
    }

    impl ToneSink for BusySink {
        fn now(&self) -> Duration {
            self.clock.now()
        }

        fn lead_in(&self) -> Duration {
            self.lead
        }

        fn schedule(&self, _session: SessionId, tones: &[ScheduledTone]) -> Result<()> {
            self.clock.advance(self.render_block);
            let head = self.clock.now();
            self.late
                .lock()
                .extend(tones.iter().filter(|t| t.start < head).copied());
            Ok(())
        }

        fn cancel(&self, _session: SessionId, _from: Duration) {}
    }

    #[test]
    fn test_lead_in_keeps_first_tone_ahead_of_render_head() {
        let clock = Arc::new(ManualClock::new());
        clock.advance(ms(500));
        let sink = Arc::new(BusySink {
            clock: clock.clone(),
            lead: ms(80),
            render_block: ms(64),
            late: Mutex::new(Vec::new()),
        });
        let emitter = AudioEmitter::new(sink.clone());

        let p = plan(&encode("E"), &TimingModel::from_rate(20));
        let handle = emitter.start(&p, SessionId(1)).unwrap();

        assert!(sink.late.lock().is_empty());
        // 500 ms clock + 80 ms lead-in + one 60 ms dot
        clock.set(ms(639));
        assert!(!handle.is_finished());
        clock.set(ms(640));
        assert!(handle.is_finished());
    }

    #[test]
    fn test_unavailable_sink_fails_start() {
        let clock = Arc::new(ManualClock::new());
        let sink = Arc::new(RecordingToneSink::unavailable(clock));
        let emitter = AudioEmitter::new(sink);
        let p = plan(&encode("E"), &TimingModel::default());
        assert!(emitter.start(&p, SessionId(1)).is_err());
    }
}

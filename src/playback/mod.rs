use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};
use parking_lot::Mutex;

use crate::audio::{AudioEmitter, AudioHandle, ToneSink};
use crate::clock::Clock;
use crate::cw::{self, Code, TimingModel};
use crate::error::{EngineError, Result};
use crate::flash::{FlashColor, FlashEmitter, FlashHandle, LightSink};
use crate::session::{CancelToken, SessionId};

/// What the controller is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Playing,
    Flashing,
}

/// Output chosen once per play/flash call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Audio,
    Flash(FlashColor),
}

enum ActiveOutput {
    Audio(AudioHandle),
    Flash(FlashHandle),
}

impl ActiveOutput {
    fn cancel(&self) {
        match self {
            ActiveOutput::Audio(h) => h.cancel(),
            ActiveOutput::Flash(h) => h.cancel(),
        }
    }

    fn is_finished(&self) -> bool {
        match self {
            ActiveOutput::Audio(h) => h.is_finished(),
            ActiveOutput::Flash(h) => h.is_finished(),
        }
    }

    fn token(&self) -> CancelToken {
        match self {
            ActiveOutput::Audio(h) => h.token(),
            ActiveOutput::Flash(h) => h.token(),
        }
    }

    fn mode(&self) -> Mode {
        match self {
            ActiveOutput::Audio(_) => Mode::Playing,
            ActiveOutput::Flash(_) => Mode::Flashing,
        }
    }
}

struct PlaybackSession {
    id: SessionId,
    output: ActiveOutput,
}

struct ControllerState {
    codes: Vec<Code>,
    active: Option<PlaybackSession>,
    next_id: u64,
}

impl ControllerState {
    /// Cancel and drop the active session, if any
    fn stop(&mut self) {
        if let Some(session) = self.active.take() {
            session.output.cancel();
            info!("[playback] session {} stopped", session.id);
        }
    }

    /// Drop a session that has run to completion
    fn reap(&mut self) {
        if self.active.as_ref().is_some_and(|s| s.output.is_finished()) {
            if let Some(session) = self.active.take() {
                debug!("[playback] session {} finished", session.id);
            }
        }
    }

    fn mode(&mut self) -> Mode {
        self.reap();
        self.active
            .as_ref()
            .map_or(Mode::Idle, |s| s.output.mode())
    }

    fn next_session(&mut self) -> SessionId {
        self.next_id += 1;
        SessionId(self.next_id)
    }
}

/// Owns the single playback session.
///
/// All transitions run under one lock, so `play`, `flash` and `stop` never
/// interleave and at most one emitter is ever active.
pub struct PlaybackController {
    state: Mutex<ControllerState>,
    audio: Option<AudioEmitter>,
    flash: FlashEmitter,
}

impl PlaybackController {
    /// `audio` is `None` when no sound output could be opened; `play` then
    /// reports [`EngineError::AudioUnavailable`].
    pub fn new(audio: Option<Arc<dyn ToneSink>>, light: Arc<dyn LightSink>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(ControllerState {
                codes: Vec::new(),
                active: None,
                next_id: 0,
            }),
            audio: audio.map(AudioEmitter::new),
            flash: FlashEmitter::new(clock, light),
        }
    }

    /// Encode `text` as the current message and return it in written Morse
    pub fn load(&self, text: &str) -> String {
        let report = cw::encode_report(text);
        if report.skipped > 0 {
            debug!("[playback] skipped {} unsupported characters", report.skipped);
        }
        let morse = render(&report.codes);
        self.state.lock().codes = report.codes;
        morse
    }

    /// The current message in written Morse
    pub fn message(&self) -> String {
        render(&self.state.lock().codes)
    }

    /// Sound the current message
    pub fn play(&self, rate_wpm: u32) -> Result<()> {
        self.start(OutputKind::Audio, rate_wpm)
    }

    /// Flash the current message
    pub fn flash(&self, rate_wpm: u32, color: FlashColor) -> Result<()> {
        self.start(OutputKind::Flash(color), rate_wpm)
    }

    pub fn play_text(&self, text: &str, rate_wpm: u32) -> Result<()> {
        self.load(text);
        self.play(rate_wpm)
    }

    pub fn flash_text(&self, text: &str, rate_wpm: u32, color: FlashColor) -> Result<()> {
        self.load(text);
        self.flash(rate_wpm, color)
    }

    /// Start a new session, first stopping any active one.
    ///
    /// Returns as soon as the output is scheduled.
    pub fn start(&self, kind: OutputKind, rate_wpm: u32) -> Result<()> {
        let mut state = self.state.lock();
        state.stop();

        let timing = TimingModel::from_rate(rate_wpm);
        let plan = cw::plan(&state.codes, &timing);
        if plan.is_empty() {
            debug!("[playback] nothing to send");
            return Ok(());
        }

        let id = state.next_session();
        let output = match kind {
            OutputKind::Audio => {
                let emitter = self.audio.as_ref().ok_or_else(|| {
                    EngineError::AudioUnavailable("no audio output configured".to_string())
                })?;
                ActiveOutput::Audio(emitter.start(&plan, id)?)
            }
            OutputKind::Flash(color) => ActiveOutput::Flash(self.flash.start(&plan, color, id)),
        };

        info!(
            "[playback] session {} {:?} at {} WPM, {:?}",
            id,
            output.mode(),
            timing.rate(),
            plan.total_duration()
        );
        state.active = Some(PlaybackSession { id, output });
        Ok(())
    }

    /// Cancel the active session. A no-op when idle.
    pub fn stop(&self) {
        self.state.lock().stop();
    }

    pub fn mode(&self) -> Mode {
        self.state.lock().mode()
    }

    /// Cancellation token of the active session
    pub fn cancel_token(&self) -> Option<CancelToken> {
        let mut state = self.state.lock();
        state.reap();
        state.active.as_ref().map(|s| s.output.token())
    }

    /// Block until idle or `timeout` passes; true if idle
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.mode() == Mode::Idle {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.state.get_mut().stop();
    }
}

fn render(codes: &[Code]) -> String {
    codes
        .iter()
        .map(Code::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

use std::collections::VecDeque;
use std::f32::consts::PI;

use crate::session::SessionId;

/// A tone placed on the sample timeline, `[start, end)` in frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedTone {
    pub session: SessionId,
    pub start: u64,
    pub end: u64,
}

/// Pending and sounding tones, ordered by start frame
#[derive(Debug, Default)]
pub struct ToneQueue {
    tones: VecDeque<QueuedTone>,
}

impl ToneQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tone: QueuedTone) {
        if tone.end <= tone.start {
            return;
        }
        let at = self.tones.partition_point(|t| t.start <= tone.start);
        self.tones.insert(at, tone);
    }

    /// Drop every tone of `session` that has not started by `from`.
    /// A tone already sounding is left to finish.
    pub fn cancel(&mut self, session: SessionId, from: u64) -> usize {
        let before = self.tones.len();
        self.tones.retain(|t| t.session != session || t.start < from);
        before - self.tones.len()
    }

    /// Pop finished tones off the front of the queue.
    ///
    /// Only the front is inspected, so this costs one comparison per tone
    /// retired. A finished tone stuck behind a longer overlapping one is
    /// skipped by [`envelope_at`](Self::envelope_at) until it reaches the front.
    pub fn retire(&mut self, frame: u64) {
        while self.tones.front().is_some_and(|t| t.end <= frame) {
            self.tones.pop_front();
        }
    }

    /// Envelope gain at `frame`, with a linear ramp of `fade` frames at both edges
    pub fn envelope_at(&self, frame: u64, fade: u64) -> f32 {
        let mut gain: f32 = 0.0;
        for tone in self.tones.iter().take_while(|t| t.start <= frame) {
            if frame >= tone.end {
                continue;
            }
            let level = if fade == 0 {
                1.0
            } else {
                let rise = (frame - tone.start + 1) as f32 / fade as f32;
                let fall = (tone.end - frame) as f32 / fade as f32;
                rise.min(fall).min(1.0)
            };
            gain = gain.max(level);
        }
        gain
    }

    pub fn len(&self) -> usize {
        self.tones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tones.is_empty()
    }
}

/// Sine carrier shaped by the tone queue's envelope
pub struct ToneRenderer {
    phase: f32,
    phase_increment: f32,
    volume: f32,
    fade_frames: u64,
}

impl ToneRenderer {
    pub fn new(frequency: f32, volume: f32, fade_secs: f32, sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            phase_increment: 2.0 * PI * frequency / sample_rate,
            volume: volume.clamp(0.0, 1.0),
            fade_frames: (fade_secs * sample_rate).round() as u64,
        }
    }

    /// Generate the sample for `frame`. Call [`ToneQueue::retire`] once per
    /// output buffer before rendering it.
    pub fn next_sample(&mut self, queue: &ToneQueue, frame: u64) -> f32 {
        let envelope = queue.envelope_at(frame, self.fade_frames);

        let sample = self.phase.sin() * envelope * self.volume;

        self.phase += self.phase_increment;
        if self.phase >= 2.0 * PI {
            self.phase -= 2.0 * PI;
        }

        sample
    }

    pub fn fade_frames(&self) -> u64 {
        self.fade_frames
    }
}

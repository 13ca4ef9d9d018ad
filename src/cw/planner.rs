use std::time::Duration;

use serde::{Serialize, Serializer};

use super::{Code, TimingModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalKind {
    Audible,
    Silent,
}

/// A half-open span `[offset, offset + duration)` relative to the start of a transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub kind: IntervalKind,
    #[serde(rename = "offset_ms", serialize_with = "as_millis")]
    pub offset: Duration,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

impl Interval {
    pub fn end(&self) -> Duration {
        self.offset + self.duration
    }

    pub fn is_audible(&self) -> bool {
        self.kind == IntervalKind::Audible
    }
}

/// Ordered, immutable on/off schedule for one transmission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransmissionPlan {
    #[serde(rename = "total_ms", serialize_with = "as_millis")]
    total: Duration,
    intervals: Vec<Interval>,
}

/// Durations appear in JSON as fractional milliseconds
pub fn as_millis<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(d.as_nanos() as f64 / 1_000_000.0)
}

impl TransmissionPlan {
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn audible(&self) -> impl Iterator<Item = &Interval> + '_ {
        self.intervals.iter().filter(|i| i.is_audible())
    }

    pub fn total_duration(&self) -> Duration {
        self.total
    }

    /// True when nothing would be keyed
    pub fn is_empty(&self) -> bool {
        self.audible().next().is_none()
    }
}

/// Build the schedule of audible intervals for `codes`.
///
/// Silent spans are implicit: they are whatever lies between audible intervals.
pub fn plan(codes: &[Code], timing: &TimingModel) -> TransmissionPlan {
    Planner::new(timing, false).run(codes)
}

/// Like [`plan`], but also emits a `Silent` interval for every gap so the
/// intervals tile `[0, total)` without holes.
pub fn plan_with_gaps(codes: &[Code], timing: &TimingModel) -> TransmissionPlan {
    Planner::new(timing, true).run(codes)
}

struct Planner<'a> {
    timing: &'a TimingModel,
    emit_gaps: bool,
    cursor: Duration,
    intervals: Vec<Interval>,
}

impl<'a> Planner<'a> {
    fn new(timing: &'a TimingModel, emit_gaps: bool) -> Self {
        Self {
            timing,
            emit_gaps,
            cursor: Duration::ZERO,
            intervals: Vec::new(),
        }
    }

    fn run(mut self, codes: &[Code]) -> TransmissionPlan {
        for (i, code) in codes.iter().enumerate() {
            let symbols = match code {
                Code::WordGap => {
                    self.silence(self.timing.word_gap());
                    continue;
                }
                Code::Symbols(symbols) => symbols,
            };

            for (j, symbol) in symbols.iter().enumerate() {
                self.tone(self.timing.symbol(*symbol));
                if j + 1 < symbols.len() {
                    self.silence(self.timing.intra_char_gap());
                }
            }

            // Characters inside a word are separated; the word gap replaces
            // this at word boundaries and nothing trails the last code
            let next_is_char = codes.get(i + 1).is_some_and(|c| !c.is_word_gap());
            if next_is_char {
                self.silence(self.timing.inter_char_gap());
            }
        }

        TransmissionPlan {
            intervals: self.intervals,
            total: self.cursor,
        }
    }

    fn tone(&mut self, duration: Duration) {
        self.push(IntervalKind::Audible, duration);
    }

    fn silence(&mut self, duration: Duration) {
        if self.emit_gaps {
            self.push(IntervalKind::Silent, duration);
        } else {
            self.cursor += duration;
        }
    }

    fn push(&mut self, kind: IntervalKind, duration: Duration) {
        self.intervals.push(Interval {
            kind,
            offset: self.cursor,
            duration,
        });
        self.cursor += duration;
    }
}

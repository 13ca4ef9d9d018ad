use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::sidetone::{QueuedTone, ToneQueue, ToneRenderer};
use super::{ScheduledTone, ToneConfig, ToneSink};
use crate::error::{EngineError, Result};
use crate::session::SessionId;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Lower bound on the scheduling lead-in, for hosts with tiny buffers
const MIN_LEAD_IN: Duration = Duration::from_millis(30);

/// Commands sent to the audio thread
enum AudioCommand {
    Shutdown,
}

/// State shared between the sink handle and the stream callback
struct SinkShared {
    /// Frames rendered so far; this is the audio clock
    frames: AtomicU64,
    /// Frames in the most recent callback buffer
    block_frames: AtomicU64,
    sample_rate: AtomicU32,
    queue: Mutex<ToneQueue>,
    alive: AtomicBool,
}

impl SinkShared {
    fn frames_to_duration(&self, frames: u64) -> Duration {
        let rate = u128::from(self.sample_rate.load(Ordering::Acquire).max(1));
        let nanos = u128::from(frames) * NANOS_PER_SEC / rate;
        Duration::from_nanos(nanos as u64)
    }

    fn duration_to_frames(&self, at: Duration) -> u64 {
        let rate = u128::from(self.sample_rate.load(Ordering::Acquire));
        (at.as_nanos() * rate / NANOS_PER_SEC) as u64
    }
}

/// Tone sink backed by a cpal output stream.
///
/// The stream lives on its own thread (cpal streams are not Send); this handle
/// only holds a command channel and the shared tone queue, so it is Send + Sync.
pub struct CpalToneSink {
    command_tx: Sender<AudioCommand>,
    shared: Arc<SinkShared>,
}

impl CpalToneSink {
    /// Open the configured (or default) output device and start the stream.
    ///
    /// Blocks until the audio thread reports whether the stream is running.
    pub fn open(config: &ToneConfig) -> Result<Self> {
        let (command_tx, command_rx) = bounded::<AudioCommand>(16);
        let (ready_tx, ready_rx) = bounded::<Result<u32>>(1);

        let shared = Arc::new(SinkShared {
            frames: AtomicU64::new(0),
            block_frames: AtomicU64::new(0),
            sample_rate: AtomicU32::new(48000),
            queue: Mutex::new(ToneQueue::new()),
            alive: AtomicBool::new(false),
        });

        let thread_shared = Arc::clone(&shared);
        let config = config.clone();
        thread::Builder::new()
            .name("morse-audio".to_string())
            .spawn(move || audio_thread(command_rx, ready_tx, thread_shared, config))
            .map_err(|e| EngineError::AudioUnavailable(format!("failed to spawn audio thread: {e}")))?;

        let sample_rate = ready_rx
            .recv()
            .map_err(|_| EngineError::AudioUnavailable("audio thread not responding".to_string()))??;

        info!("[audio] output running at {} Hz", sample_rate);
        Ok(Self { command_tx, shared })
    }

    /// List available audio output devices
    pub fn list_output_devices() -> Vec<String> {
        let host = cpal::default_host();
        host.output_devices()
            .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
            .unwrap_or_default()
    }

    pub fn sample_rate(&self) -> u32 {
        self.shared.sample_rate.load(Ordering::Acquire)
    }
}

impl ToneSink for CpalToneSink {
    fn now(&self) -> Duration {
        self.shared
            .frames_to_duration(self.shared.frames.load(Ordering::Acquire))
    }

    /// Two callback buffers: one that may be rendering right now and one of slack
    fn lead_in(&self) -> Duration {
        let block = self.shared.block_frames.load(Ordering::Acquire);
        self.shared.frames_to_duration(block * 2).max(MIN_LEAD_IN)
    }

    fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::Acquire)
    }

    fn schedule(&self, session: SessionId, tones: &[ScheduledTone]) -> Result<()> {
        if !self.is_alive() {
            return Err(EngineError::AudioUnavailable(
                "audio stream stopped".to_string(),
            ));
        }

        let mut queue = self.shared.queue.lock();
        // A callback that missed the lock can still move this on by one buffer
        let head = self.shared.frames.load(Ordering::Acquire);
        for tone in tones {
            let start = self.shared.duration_to_frames(tone.start);
            if start < head {
                warn!("[audio] session {} tone at frame {} is behind the render head {}", session, start, head);
            }
            queue.push(QueuedTone {
                session,
                start,
                end: self.shared.duration_to_frames(tone.end()),
            });
        }
        debug!("[audio] {} tones queued", queue.len());
        Ok(())
    }

    fn cancel(&self, session: SessionId, from: Duration) {
        let from = self.shared.duration_to_frames(from);
        let dropped = self.shared.queue.lock().cancel(session, from);
        debug!("[audio] dropped {} pending tones of session {}", dropped, session);
    }
}

impl Drop for CpalToneSink {
    fn drop(&mut self) {
        let _ = self.command_tx.send(AudioCommand::Shutdown);
    }
}

/// Audio thread that owns the cpal Stream (not Send)
fn audio_thread(
    command_rx: Receiver<AudioCommand>,
    ready_tx: Sender<Result<u32>>,
    shared: Arc<SinkShared>,
    config: ToneConfig,
) {
    let stream = match create_output_stream(&config, Arc::clone(&shared)) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("[audio] failed to create output stream: {}", e);
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        warn!("[audio] failed to start output stream: {}", e);
        let _ = ready_tx.send(Err(EngineError::AudioUnavailable(e.to_string())));
        return;
    }

    shared.alive.store(true, Ordering::Release);
    let _ = ready_tx.send(Ok(shared.sample_rate.load(Ordering::Acquire)));

    // Park until shut down; the stream keeps running meanwhile
    match command_rx.recv() {
        Ok(AudioCommand::Shutdown) | Err(_) => {}
    }

    shared.alive.store(false, Ordering::Release);
    drop(stream);
    debug!("[audio] audio thread stopped");
}

fn find_output_device(host: &cpal::Host, device_name: Option<&str>) -> Result<Device> {
    let Some(name) = device_name else {
        return host
            .default_output_device()
            .ok_or_else(|| EngineError::AudioUnavailable("no default output device".to_string()));
    };

    let devices: Vec<_> = host
        .output_devices()
        .map_err(|e| EngineError::AudioUnavailable(e.to_string()))?
        .collect();

    debug!("[audio] available output devices:");
    for d in &devices {
        if let Ok(n) = d.name() {
            debug!("[audio]   - '{}'", n);
        }
    }

    devices
        .iter()
        .find(|d| d.name().map(|n| n == name).unwrap_or(false))
        .cloned()
        .or_else(|| {
            warn!("[audio] output device '{}' not found, using default", name);
            host.default_output_device()
        })
        .ok_or_else(|| EngineError::AudioUnavailable(format!("output device '{name}' not found")))
}

fn create_output_stream(config: &ToneConfig, shared: Arc<SinkShared>) -> Result<Stream> {
    let host = cpal::default_host();
    let device = find_output_device(&host, config.device.as_deref())?;
    info!("[audio] using output device: {:?}", device.name());

    let output_config = device
        .default_output_config()
        .map_err(|e| EngineError::AudioUnavailable(e.to_string()))?;

    let sample_rate = output_config.sample_rate().0;
    let channels = output_config.channels() as usize;
    shared.sample_rate.store(sample_rate, Ordering::Release);

    debug!(
        "[audio] tone: freq={} Hz, volume={}, fade={:?}",
        config.frequency, config.volume, config.fade
    );
    let renderer = ToneRenderer::new(
        config.frequency,
        config.volume,
        config.fade.as_secs_f32(),
        sample_rate as f32,
    );

    let stream_config: StreamConfig = output_config.config();
    match output_config.sample_format() {
        cpal::SampleFormat::F32 => build_output_stream::<f32>(&device, &stream_config, shared, renderer, channels),
        cpal::SampleFormat::I16 => build_output_stream::<i16>(&device, &stream_config, shared, renderer, channels),
        cpal::SampleFormat::U16 => build_output_stream::<u16>(&device, &stream_config, shared, renderer, channels),
        _ => Err(EngineError::AudioUnavailable("unsupported output sample format".to_string())),
    }
}

fn build_output_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
    device: &Device,
    config: &StreamConfig,
    shared: Arc<SinkShared>,
    mut renderer: ToneRenderer,
    channels: usize,
) -> Result<Stream> {
    let error_shared = Arc::clone(&shared);

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let start = shared.frames.load(Ordering::Acquire);
                let block = (data.len() / channels) as u64;
                shared.block_frames.store(block, Ordering::Release);

                // Never block the audio callback; a contended queue renders silence
                match shared.queue.try_lock() {
                    Some(mut queue) => {
                        queue.retire(start);
                        for (frame, out) in (start..).zip(data.chunks_mut(channels)) {
                            let value = T::from_sample(renderer.next_sample(&queue, frame));
                            for channel in out.iter_mut() {
                                *channel = value;
                            }
                        }
                        shared.frames.store(start + block, Ordering::Release);
                    }
                    None => {
                        let silence = T::from_sample(0.0f32);
                        for channel in data.iter_mut() {
                            *channel = silence;
                        }
                        shared.frames.store(start + block, Ordering::Release);
                    }
                }
            },
            move |err| {
                error!("[audio] output stream error: {}", err);
                error_shared.alive.store(false, Ordering::Release);
            },
            None,
        )
        .map_err(|e| EngineError::AudioUnavailable(e.to_string()))
}

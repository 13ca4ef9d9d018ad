use std::sync::Arc;
use std::thread;
use std::time::Duration;

use morse_beacon::testing::{RecordingLight, RecordingToneSink, SinkEvent};
use morse_beacon::{FlashColor, ManualClock, Mode, MonotonicClock, PlaybackController};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn play_then_play_cancels_first_session() {
    let clock = Arc::new(ManualClock::new());
    let sink = Arc::new(RecordingToneSink::new(clock.clone()));
    let controller = PlaybackController::new(Some(sink.clone()), Arc::new(RecordingLight::new()), clock.clone());

    controller.load("PARIS");
    controller.play(20).unwrap();
    let first = controller.cancel_token().unwrap();

    clock.advance(ms(150));
    controller.play(20).unwrap();
    assert!(first.is_cancelled());

    // P is .--. : the dot at 0 and the dash at 120 ms had started by 150 ms
    let tones = sink.audible_tones();
    let first_len = match &sink.events()[0] {
        SinkEvent::Scheduled { tones, .. } => tones.len(),
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(tones.len(), 2 + first_len);
    assert!(tones[..2].iter().all(|t| t.start < ms(150)));
}

#[test]
fn stop_twice_is_harmless() {
    let clock = Arc::new(ManualClock::new());
    let sink = Arc::new(RecordingToneSink::new(clock.clone()));
    let controller = PlaybackController::new(Some(sink), Arc::new(RecordingLight::new()), clock);

    controller.play_text("TEST", 25).unwrap();
    controller.stop();
    assert_eq!(controller.mode(), Mode::Idle);
    controller.stop();
    assert_eq!(controller.mode(), Mode::Idle);
}

#[test]
fn out_of_range_rate_is_clamped_not_rejected() {
    let clock = Arc::new(ManualClock::new());
    let sink = Arc::new(RecordingToneSink::new(clock.clone()));
    let controller = PlaybackController::new(Some(sink.clone()), Arc::new(RecordingLight::new()), clock.clone());

    controller.play_text("E", 500).unwrap();
    // 50 WPM: a dot is 24 ms
    assert_eq!(sink.audible_tones()[0].duration, ms(24));
    clock.advance(ms(24));
    assert_eq!(controller.mode(), Mode::Idle);
}

#[test]
fn flash_runs_to_completion_and_goes_idle() {
    let light = Arc::new(RecordingLight::new());
    let controller = PlaybackController::new(None, light.clone(), Arc::new(MonotonicClock::new()));

    controller.flash_text("IE", 50, FlashColor::Yellow).unwrap();
    assert_eq!(controller.mode(), Mode::Flashing);
    assert!(controller.wait_idle(Duration::from_secs(2)));

    assert_eq!(light.flashes(), 3);
    assert!(!light.is_lit());
    assert_eq!(light.color(), Some(FlashColor::Yellow));
}

#[test]
fn stop_turns_light_off_immediately() {
    let light = Arc::new(RecordingLight::new());
    let controller = PlaybackController::new(None, light.clone(), Arc::new(MonotonicClock::new()));

    controller.flash_text("OOO", 5, FlashColor::Red).unwrap();
    thread::sleep(ms(30));
    assert!(light.is_lit());

    controller.stop();
    assert!(!light.is_lit());
    let after_stop = light.transitions();
    thread::sleep(ms(300));
    assert_eq!(light.transitions(), after_stop);
}

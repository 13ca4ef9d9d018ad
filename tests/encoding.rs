use std::time::Duration;

use morse_beacon::cw::{self, supported_chars, MAX_WPM, MIN_WPM};
use morse_beacon::{decode, encode, encode_to_string, plan, TimingModel};

#[test]
fn sos_both_ways() {
    assert_eq!(encode_to_string("SOS"), "... --- ...");
    assert_eq!(decode("... --- ..."), "SOS");
}

#[test]
fn empty_everything() {
    assert_eq!(encode_to_string(""), "");
    assert_eq!(decode(""), "");
    assert_eq!(plan(&[], &TimingModel::default()).total_duration(), Duration::ZERO);
}

#[test]
fn round_trip_for_supported_text() {
    let samples = [
        "cq cq de w1aw k",
        "The quick brown fox jumps over the lazy dog 1234567890",
        "what? (yes) & no: \"ok\" $5 a_b 1+1=2 x/y @home 'hi' end!",
        "  leading and trailing  ",
    ];
    for s in samples {
        assert_eq!(decode(&encode_to_string(s)), s.to_uppercase(), "{s:?}");
    }

    let every: String = supported_chars().collect();
    assert_eq!(decode(&encode_to_string(&every)), every);
}

#[test]
fn unsupported_input_loses_information() {
    assert_eq!(decode(&encode_to_string("a#b")), "AB");
    assert_eq!(cw::encode_report("a#b~").skipped, 2);
}

#[test]
fn total_duration_shrinks_as_rate_grows() {
    let codes = encode("MORSE CODE 73");
    for slow in MIN_WPM..MAX_WPM {
        for fast in (slow + 1)..=MAX_WPM {
            let a = plan(&codes, &TimingModel::from_rate(slow)).total_duration();
            let b = plan(&codes, &TimingModel::from_rate(fast)).total_duration();
            assert!(a > b, "{slow} WPM should take longer than {fast} WPM");
        }
    }
}

#[test]
fn planned_intervals_do_not_overlap() {
    for wpm in [MIN_WPM, 13, 20, 33, MAX_WPM] {
        let timing = TimingModel::from_rate(wpm);
        let p = plan(&encode("HELLO, WORLD. 599 5NN TU"), &timing);
        let mut intervals = p.intervals().to_vec();
        intervals.sort_by_key(|i| i.offset);
        for pair in intervals.windows(2) {
            assert!(pair[0].offset + pair[0].duration <= pair[1].offset);
        }
        assert!(intervals.last().unwrap().end() <= p.total_duration());
    }
}

#[test]
fn a_word_gap_b_matches_formula() {
    for wpm in MIN_WPM..=MAX_WPM {
        let t = TimingModel::from_rate(wpm);
        let expected = (t.unit() + t.intra_char_gap() + t.dash())
            + t.word_gap()
            + (t.dash()
                + t.intra_char_gap()
                + t.unit()
                + t.intra_char_gap()
                + t.unit()
                + t.intra_char_gap()
                + t.unit());
        assert_eq!(plan(&encode("A B"), &t).total_duration(), expected);
    }
}

#[test]
fn single_e_at_twenty_wpm() {
    let p = plan(&encode("E"), &TimingModel::from_rate(20));
    assert_eq!(p.intervals().len(), 1);
    assert_eq!(p.intervals()[0].offset, Duration::ZERO);
    assert_eq!(p.intervals()[0].duration, Duration::from_millis(60));
    assert_eq!(p.total_duration(), Duration::from_millis(60));
}

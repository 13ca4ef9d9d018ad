use super::table;
use super::Code;

/// Result of encoding, with a count of characters that had no pattern
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeReport {
    pub codes: Vec<Code>,
    pub skipped: usize,
}

/// Encode text into codes, counting unsupported characters.
///
/// Input is case-insensitive. A space becomes the word gap; anything without
/// a table entry is dropped.
pub fn encode_report(text: &str) -> EncodeReport {
    let mut report = EncodeReport::default();

    for ch in text.chars().flat_map(char::to_uppercase) {
        if ch == ' ' {
            report.codes.push(Code::WordGap);
            continue;
        }

        match table::pattern_for(ch).and_then(Code::parse) {
            Some(code) => report.codes.push(code),
            None => report.skipped += 1,
        }
    }

    report
}

/// Encode text into codes, silently skipping unsupported characters
pub fn encode(text: &str) -> Vec<Code> {
    encode_report(text).codes
}

/// Encode text into written Morse: tokens joined by single spaces, `/` between words
pub fn encode_to_string(text: &str) -> String {
    encode(text)
        .iter()
        .map(Code::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

use super::table::{self, WORD_SEPARATOR};

/// Decode written Morse tokens back into text.
///
/// `/` decodes to a space. Tokens that match no table entry are skipped and
/// decoding carries on with the rest.
pub fn decode_tokens<'a, I>(tokens: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut output = String::new();

    for token in tokens {
        if token == WORD_SEPARATOR {
            output.push(' ');
        } else if let Some(ch) = table::char_for(token) {
            output.push(ch);
        }
    }

    output
}

/// Decode a whitespace-delimited Morse string
pub fn decode(morse: &str) -> String {
    decode_tokens(morse.split_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cw::{encode_to_string, supported_chars};

    #[test]
    fn test_decode_sos() {
        assert_eq!(decode("... --- ..."), "SOS");
    }

    #[test]
    fn test_word_separator() {
        assert_eq!(decode(".- / -..."), "A B");
    }

    #[test]
    fn test_unknown_tokens_are_skipped() {
        assert_eq!(decode("... ........ --- abc ..."), "SOS");
        assert_eq!(decode(".-/-..."), "");
    }

    #[test]
    fn test_extra_whitespace_is_tolerated() {
        assert_eq!(decode("  ...   ---\t...\n"), "SOS");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(decode(""), "");
    }

    #[test]
    fn test_round_trip_whole_alphabet() {
        let alphabet: String = supported_chars().collect();
        let text = format!("{alphabet} the quick brown fox 73");
        assert_eq!(decode(&encode_to_string(&text)), text.to_uppercase());
    }
}

/// Morse code lookup table
///
/// Every pattern is unique, so the table can be searched in both directions.
/// Space is not listed: it maps to the word separator rather than a pattern.
const MORSE_TABLE: &[(char, &str)] = &[
    ('A', ".-"),
    ('B', "-..."),
    ('C', "-.-."),
    ('D', "-.."),
    ('E', "."),
    ('F', "..-."),
    ('G', "--."),
    ('H', "...."),
    ('I', ".."),
    ('J', ".---"),
    ('K', "-.-"),
    ('L', ".-.."),
    ('M', "--"),
    ('N', "-."),
    ('O', "---"),
    ('P', ".--."),
    ('Q', "--.-"),
    ('R', ".-."),
    ('S', "..."),
    ('T', "-"),
    ('U', "..-"),
    ('V', "...-"),
    ('W', ".--"),
    ('X', "-..-"),
    ('Y', "-.--"),
    ('Z', "--.."),
    ('1', ".----"),
    ('2', "..---"),
    ('3', "...--"),
    ('4', "....-"),
    ('5', "....."),
    ('6', "-...."),
    ('7', "--..."),
    ('8', "---.."),
    ('9', "----."),
    ('0', "-----"),
    ('.', ".-.-.-"),
    (',', "--..--"),
    ('?', "..--.."),
    ('/', "-..-."),
    ('=', "-...-"),
    ('+', ".-.-."),
    ('-', "-....-"),
    ('@', ".--.-."),
    ('!', "-.-.--"),
    ('\'', ".----."),
    ('(', "-.--."),
    (')', "-.--.-"),
    ('&', ".-..."),
    (':', "---..."),
    (';', "-.-.-."),
    ('"', ".-..-."),
    ('$', "...-..-"),
    ('_', "..--.-"),
];

/// Token that stands for the gap between words in written Morse
pub const WORD_SEPARATOR: &str = "/";

/// Look up the pattern for an (already uppercased) character
pub fn pattern_for(ch: char) -> Option<&'static str> {
    MORSE_TABLE
        .iter()
        .find(|(c, _)| *c == ch)
        .map(|(_, p)| *p)
}

/// Look up a Morse pattern and return the character
pub fn char_for(pattern: &str) -> Option<char> {
    MORSE_TABLE
        .iter()
        .find(|(_, p)| *p == pattern)
        .map(|(c, _)| *c)
}

/// All characters with a pattern, in table order
pub fn supported_chars() -> impl Iterator<Item = char> {
    MORSE_TABLE.iter().map(|(c, _)| *c)
}

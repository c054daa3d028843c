// src/text.rs

//! Text casing normalizer: lower-case the input, then upper-case the first
//! letter of every word, preserving the delimiter runs between words.
//! Words on the exception list are left lower-case.

/// Characters that separate words (in addition to whitespace).
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '+' | '-' | '/' | '.' | ',')
}

#[derive(Debug, Default)]
pub struct Beautifier {
    exceptions: Vec<String>,
}

impl Beautifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Words (compared lower-case) that keep their casing untouched,
    /// e.g. particles like "van", "bin", "de".
    pub fn with_exceptions<I, S>(exceptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exceptions: exceptions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn add_exception(&mut self, word: impl Into<String>) {
        self.exceptions.push(word.into());
    }

    pub fn beautify(&self, s: &str) -> String {
        let lower = s.to_lowercase();
        let mut out = String::with_capacity(lower.len());

        for (word, delimiter) in split_words(&lower) {
            if self.exceptions.iter().any(|e| e == word) {
                out.push_str(word);
            } else {
                out.push_str(&capitalize(word));
            }
            out.push_str(delimiter);
        }
        out
    }
}

/// Split into `(word, trailing-delimiter-run)` pairs. The final word may
/// carry an empty delimiter.
fn split_words(s: &str) -> Vec<(&str, &str)> {
    let mut parts = Vec::new();
    let mut word_start = 0;
    let mut delim_start: Option<usize> = None;

    for (idx, c) in s.char_indices() {
        match (is_delimiter(c), delim_start) {
            (true, None) => delim_start = Some(idx),
            (false, Some(start)) => {
                parts.push((&s[word_start..start], &s[start..idx]));
                word_start = idx;
                delim_start = None;
            }
            _ => {}
        }
    }
    match delim_start {
        Some(start) => parts.push((&s[word_start..start], &s[start..])),
        None if word_start < s.len() => parts.push((&s[word_start..], "")),
        None => {}
    }
    parts
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalizes_each_word() {
        let b = Beautifier::new();
        assert_eq!(b.beautify("HELLO world"), "Hello World");
    }

    #[test]
    fn preserves_delimiter_runs() {
        let b = Beautifier::new();
        assert_eq!(b.beautify("a.b-c/d, e"), "A.B-C/D, E");
        assert_eq!(b.beautify("one  two"), "One  Two");
    }

    #[test]
    fn exceptions_stay_lower_case() {
        let b = Beautifier::with_exceptions(["de", "van"]);
        assert_eq!(b.beautify("JAN VAN DER BERG"), "Jan van Der Berg");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let b = Beautifier::new();
        assert_eq!(b.beautify(""), "");
    }

    #[test]
    fn leading_delimiters_are_kept() {
        let b = Beautifier::new();
        assert_eq!(b.beautify(" x"), " X");
    }
}

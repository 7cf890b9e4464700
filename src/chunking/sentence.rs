//! Punctuation-aware sentence segmentation.

use std::ops::Range;

/// Words that end with a period without ending a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "fig", "no", "inc", "ltd", "co",
    "approx", "dept", "vol", "cf", "al", "eq", "ch", "sec",
];

/// Characters that may follow a terminator and still belong to the sentence.
fn is_closer(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}')
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Split `text` into sentence byte ranges.
///
/// The ranges tile the text from its first non-whitespace character to the
/// end: each sentence owns the whitespace that follows it, so concatenating
/// the slices gives back the (left-trimmed) input.
pub fn split_sentences(text: &str) -> Vec<Range<usize>> {
    let mut sentences = Vec::new();

    let Some(mut start) = text.find(|c: char| !c.is_whitespace()) else {
        return sentences;
    };

    let mut pos = start;
    while let Some(c) = text[pos..].chars().next() {
        let after = pos + c.len_utf8();

        if !is_terminator(c) {
            pos = after;
            continue;
        }

        let mut end = after;
        while let Some(next) = text[end..].chars().next() {
            if !is_closer(next) {
                break;
            }
            end += next.len_utf8();
        }

        // A boundary needs whitespace after it; "3.14" and "e.g.x" never split.
        match text[end..].chars().next() {
            Some(next) if next.is_whitespace() => {}
            _ => {
                pos = end;
                continue;
            }
        }

        if c == '.' && is_abbreviation(&text[start..pos]) {
            pos = end;
            continue;
        }

        let next_start = match text[end..].find(|c: char| !c.is_whitespace()) {
            Some(offset) => end + offset,
            None => break,
        };

        // "approx. five minutes" - a lowercase continuation is the same sentence.
        if text[next_start..]
            .chars()
            .next()
            .is_some_and(|c| c.is_lowercase())
        {
            pos = next_start;
            continue;
        }

        sentences.push(start..next_start);
        start = next_start;
        pos = next_start;
    }

    if start < text.len() {
        sentences.push(start..text.len());
    }

    sentences
}

/// Whether the word right before a period is an abbreviation or initial.
fn is_abbreviation(before_period: &str) -> bool {
    let word = before_period
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .trim_start_matches(|c: char| !c.is_alphanumeric());

    if word.is_empty() {
        return false;
    }

    // Initials such as "J." and dotted forms such as "e.g." or "U.S."
    let mut chars = word.chars();
    if let (Some(first), None) = (chars.next(), chars.next()) {
        return first.is_alphabetic() && first.is_uppercase();
    }
    if word.contains('.') {
        return true;
    }

    let lower = word.to_lowercase();
    ABBREVIATIONS.contains(&lower.as_str())
}

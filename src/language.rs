//! Character-class language detection
//!
//! Classifies free text as Arabic / English / Mixed from the ratio of
//! Arabic-block characters to Latin letters. Pure function, no I/O.

use crate::models::{DetectionResult, Language};

const ARABIC_THRESHOLD: f64 = 0.7;
const ENGLISH_THRESHOLD: f64 = 0.3;

fn is_arabic_char(c: char) -> bool {
    ('\u{0600}'..='\u{06FF}').contains(&c)
}

/// Detect the dominant language of `text`.
///
/// Empty or symbol-only input (no Arabic, no Latin characters) defaults to
/// Arabic with a zero ratio. This is a fixed policy default, not inference.
pub fn detect(text: &str) -> DetectionResult {
    let mut arabic_count = 0usize;
    let mut latin_count = 0usize;

    for c in text.chars() {
        if is_arabic_char(c) {
            arabic_count += 1;
        } else if c.is_ascii_alphabetic() {
            latin_count += 1;
        }
    }

    let total = arabic_count + latin_count;
    if total == 0 {
        return DetectionResult {
            language: Language::Ar,
            arabic_ratio: 0.0,
        };
    }

    let ratio = arabic_count as f64 / total as f64;

    let language = if ratio > ARABIC_THRESHOLD {
        Language::Ar
    } else if ratio < ENGLISH_THRESHOLD {
        Language::En
    } else {
        Language::Mixed
    };

    DetectionResult {
        language,
        arabic_ratio: ratio,
    }
}

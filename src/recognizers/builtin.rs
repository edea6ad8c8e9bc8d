//! Built-in recognizers required by §4.A: PERSON, EMAIL_ADDRESS,
//! PHONE_NUMBER, IP_ADDRESS, DATE_TIME, URL, CREDIT_CARD, US_SSN.
//!
//! These are deliberately simple, deterministic, regex-based recognizers —
//! the crate consumes a model-backed [`super::EntityAnalyzer`] for anything
//! that needs real natural-language understanding (PERSON recognition in
//! particular is a crude capitalized-bigram heuristic here, good enough to
//! exercise the rest of the pipeline without NLP weights, not a production
//! name detector).

use super::Recognizer;
use crate::error::Result;
use crate::span::Span;
use regex::Regex;
use std::sync::Arc;

macro_rules! regex_recognizer {
    ($struct_name:ident, $id:expr, $entity_type:expr, $confidence:expr, $pattern:expr) => {
        pub struct $struct_name {
            pattern: Regex,
        }

        impl $struct_name {
            pub fn new() -> Self {
                Self {
                    pattern: Regex::new($pattern).expect("builtin recognizer pattern is valid"),
                }
            }
        }

        impl Default for $struct_name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Recognizer for $struct_name {
            fn recognizer_id(&self) -> &str {
                $id
            }

            fn entity_types(&self) -> &[&str] {
                &[$entity_type]
            }

            fn detect(&self, text: &str, _language: &str) -> Result<Vec<Span>> {
                Ok(self
                    .pattern
                    .find_iter(text)
                    .map(|m| Span::new(m.start(), m.end(), $entity_type, $confidence, $id))
                    .collect())
            }
        }
    };
}

regex_recognizer!(
    EmailRecognizer,
    "builtin.email",
    "EMAIL_ADDRESS",
    0.95,
    r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b"
);

regex_recognizer!(
    PhoneRecognizer,
    "builtin.phone",
    "PHONE_NUMBER",
    0.9,
    r"\b(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]\d{3}[-.\s]\d{4}\b"
);

regex_recognizer!(
    IpAddressRecognizer,
    "builtin.ip_address",
    "IP_ADDRESS",
    0.9,
    r"\b(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)\b"
);

regex_recognizer!(
    DateTimeRecognizer,
    "builtin.date_time",
    "DATE_TIME",
    0.9,
    r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b"
);

regex_recognizer!(
    UrlRecognizer,
    "builtin.url",
    "URL",
    0.9,
    r"(?i)\bhttps?://[^\s]+"
);

regex_recognizer!(
    CreditCardRecognizer,
    "builtin.credit_card",
    "CREDIT_CARD",
    0.92,
    r"\b\d{4}[ -]?\d{4}[ -]?\d{4}[ -]?\d{4}\b"
);

regex_recognizer!(
    UsSsnRecognizer,
    "builtin.us_ssn",
    "US_SSN",
    0.93,
    r"\b\d{3}-\d{2}-\d{4}\b"
);

/// Honorifics and role words that commonly precede a name in clinical and
/// business prose. The regex crate has no lookbehind, so a capitalized-word
/// run like "Patient John Doe" is found whole and then trimmed in Rust:
/// leading words in this list are dropped from the front of the run rather
/// than excluded from the match itself.
const TITLE_WORDS: &[&str] = &[
    "Patient", "Doctor", "Dr", "Nurse", "Professor", "Mr", "Mrs", "Ms", "Miss", "Mister",
];

/// Crude capitalized-bigram-or-longer PERSON heuristic: a run of two or more
/// consecutive capitalized words, with any leading title word stripped. Good
/// enough to exercise the rest of the pipeline without NLP weights; a
/// model-backed [`super::EntityAnalyzer`] is the real PERSON detector in
/// production.
pub struct PersonRecognizer {
    pattern: Regex,
}

impl PersonRecognizer {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"\b[A-Z][a-z]+(?:\s[A-Z][a-z]+)+\b").expect("PERSON pattern is valid"),
        }
    }
}

impl Default for PersonRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognizer for PersonRecognizer {
    fn recognizer_id(&self) -> &str {
        "builtin.person"
    }

    fn entity_types(&self) -> &[&str] {
        &["PERSON"]
    }

    fn detect(&self, text: &str, _language: &str) -> Result<Vec<Span>> {
        let mut spans = Vec::new();

        for m in self.pattern.find_iter(text) {
            let run = m.as_str();
            let mut words = run.split_whitespace();
            let mut offset = m.start();
            let mut trimmed_start = None;

            for word in words.by_ref() {
                if TITLE_WORDS.contains(&word) {
                    offset += word.len() + 1; // +1 for the following space
                } else {
                    trimmed_start = Some(offset);
                    break;
                }
            }

            if let Some(start) = trimmed_start {
                spans.push(Span::new(start, m.end(), "PERSON", 0.9, self.recognizer_id()));
            }
        }

        Ok(spans)
    }
}

pub fn builtin_recognizers() -> Vec<Arc<dyn Recognizer>> {
    vec![
        Arc::new(PersonRecognizer::new()),
        Arc::new(EmailRecognizer::new()),
        Arc::new(PhoneRecognizer::new()),
        Arc::new(IpAddressRecognizer::new()),
        Arc::new(DateTimeRecognizer::new()),
        Arc::new(UrlRecognizer::new()),
        Arc::new(CreditCardRecognizer::new()),
        Arc::new(UsSsnRecognizer::new()),
    ]
}

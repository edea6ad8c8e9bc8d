//! Component 4.B: the Allow-List Filter.

use crate::policy::AegisPolicy;
use crate::span::Span;

/// Drop every span whose surface text, NFC-normalized and case-folded,
/// appears in `policy.allow_list`. Everything else passes through
/// unchanged, in original order.
pub fn filter_allow_listed(text: &str, spans: Vec<Span>, policy: &AegisPolicy) -> Vec<Span> {
    if policy.allow_list().is_empty() {
        return spans;
    }

    spans
        .into_iter()
        .filter(|span| !policy.is_allow_listed(&text[span.start..span.end]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{AegisPolicyBuilder, PolicyValidator};

    #[test]
    fn drops_allow_listed_span() {
        let validator = PolicyValidator::new(Vec::<String>::new());
        let policy = AegisPolicyBuilder::new()
            .allow_list(["Tylenol"])
            .build(&validator)
            .unwrap();

        let text = "Give Tylenol to John Doe.";
        let spans = vec![
            Span::new(5, 12, "DRUG", 0.9, "r"),
            Span::new(16, 24, "PERSON", 0.9, "r"),
        ];

        let filtered = filter_allow_listed(text, spans, &policy);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].entity_type, "PERSON");
    }

    #[test]
    fn empty_allow_list_is_identity() {
        let validator = PolicyValidator::new(Vec::<String>::new());
        let policy = AegisPolicyBuilder::new().build(&validator).unwrap();
        let spans = vec![Span::new(0, 4, "PERSON", 0.9, "r")];
        let filtered = filter_allow_listed("John says hi", spans.clone(), &policy);
        assert_eq!(filtered, spans);
    }
}

use causal_decoder_report::{
    classify, consolidate, reason_for_message, FailedExpectation, FailureReason, KeyLayout,
    TestResultRecord, TAXONOMY,
};
use proptest::prelude::*;

fn taxonomy_reason() -> impl Strategy<Value = FailureReason> {
    prop::sample::select(TAXONOMY.iter().map(|(_, r)| *r).collect::<Vec<_>>())
}

fn record(status: &str, messages: Vec<String>) -> TestResultRecord {
    TestResultRecord {
        full_name: "m | s | k | t".to_string(),
        status: status.to_string(),
        failed_expectations: messages
            .into_iter()
            .map(|message| FailedExpectation { message })
            .collect(),
    }
}

proptest! {
    #[test]
    fn passed_records_never_carry_a_reason(messages in prop::collection::vec(".{0,40}", 0..5)) {
        let row = classify(&record("passed", messages), KeyLayout::Suite).unwrap();
        prop_assert_eq!(row.reason, None);
    }

    #[test]
    fn repeated_reason_consolidates_to_itself(reason in taxonomy_reason(), n in 1usize..6) {
        prop_assert_eq!(consolidate(std::iter::repeat(reason).take(n)), reason);
    }

    #[test]
    fn prefixed_messages_classify_by_prefix(idx in 0..TAXONOMY.len(), suffix in ".{0,40}") {
        let (prefix, reason) = TAXONOMY[idx];
        prop_assert_eq!(reason_for_message(&format!("{prefix}{suffix}")), reason);
    }

    #[test]
    fn two_distinct_reasons_are_multiple(a in taxonomy_reason(), b in taxonomy_reason()) {
        prop_assume!(a != b);
        prop_assert_eq!(consolidate([a, b, a]), FailureReason::Multiple);
    }
}

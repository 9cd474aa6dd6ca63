//! Stream-level behavior of the failure report.

use causal_decoder_report::{process_stream, FailureReason, KeyLayout, ReportError};

const MIXED_OUTPUT: &str = r#"Randomized with seed 1234
Started
{"fullName":"gpt-4o | Conformance | Basic | rain causes floods","status":"passed","failedExpectations":[]}
{"fullName":"gpt-4o | Conformance | Basic | drought","status":"failed","failedExpectations":[{"message":"Incorrect polarity discovered for Drought -> Harvest"}]}
  {"indented":"lines are not records"}
{"fullName":"llama3, | Quantitative | Hard | loops ,","status":"failed","failedExpectations":[{"message":"Too many variables"},{"message":"Too few feedback loops"}]}
{"fullName":"llama3 | Quantitative | Hard | empty","status":"failed","failedExpectations":[]}
5 specs, 3 failures
"#;

fn run(
    input: &str,
    layout: KeyLayout,
) -> Result<(Vec<String>, causal_decoder_report::ReportSummary), ReportError> {
    let mut out = Vec::new();
    let summary = process_stream(input.as_bytes(), &mut out, layout)?;
    let text = String::from_utf8(out).expect("CSV output is UTF-8");
    Ok((text.lines().map(str::to_string).collect(), summary))
}

#[test]
fn test_mixed_log_output_suite_layout() {
    let (lines, summary) = run(MIXED_OUTPUT, KeyLayout::Suite).unwrap();

    assert_eq!(
        lines,
        vec![
            "LLM,Suite,Kind,Test,Status,Failure Reason",
            r#""gpt-4o","Conformance","Basic","rain causes floods","passed","""#,
            r#""gpt-4o","Conformance","Basic","drought","failed","Polarity""#,
            r#""llama3","Quantitative","Hard","loops","failed","Multiple Kinds of Failures""#,
            r#""llama3","Quantitative","Hard","empty","failed","Unknown""#,
        ]
    );

    assert_eq!(summary.records, 4);
    assert_eq!(summary.skipped_lines, 4);
    assert_eq!(summary.passed, 1);
    assert_eq!(
        summary.reasons,
        vec![
            (FailureReason::Polarity, 1),
            (FailureReason::Multiple, 1),
            (FailureReason::Unknown, 1),
        ]
    );
}

#[test]
fn test_type_layout() {
    let input = concat!(
        r#"{"fullName":"qwen | qualitative | feedback","status":"failed","failedExpectations":[{"message":"Real relationships not found: A -> B"}]}"#,
        "\n",
        r#"{"fullName":"qwen | qualitative | simple","status":"passed"}"#,
        "\n",
    );

    let (lines, summary) = run(input, KeyLayout::Type).unwrap();
    assert_eq!(
        lines,
        vec![
            "LLM,Type,Test,Status,Failure Reason",
            r#""qwen","qualitative","feedback","failed","Missing relationship""#,
            r#""qwen","qualitative","simple","passed","""#,
        ]
    );
    assert_eq!(summary.passed, 1);
}

#[test]
fn test_malformed_key_reports_line_and_key() {
    let input = concat!(
        "header\n",
        r#"{"fullName":"a|b|c|d","status":"passed"}"#,
        "\n",
        r#"{"fullName":"only | three | parts","status":"failed"}"#,
        "\n",
    );

    let err = run(input, KeyLayout::Suite).unwrap_err();
    match err {
        ReportError::MalformedKey {
            line,
            ref full_name,
            expected,
            found,
        } => {
            assert_eq!(line, 3);
            assert_eq!(full_name, "only | three | parts");
            assert_eq!(expected, 4);
            assert_eq!(found, 3);
        }
        other => panic!("expected MalformedKey, got {:?}", other),
    }
    assert_eq!(err.line(), Some(3));
    assert!(err.to_string().contains("only | three | parts"));
}

#[test]
fn test_missing_status_is_invalid_record() {
    let err = run(r#"{"fullName":"a|b|c|d"}"#, KeyLayout::Suite).unwrap_err();
    assert!(matches!(err, ReportError::InvalidRecord { line: 1, .. }));
}

//! CSV emission. Every field is double-quoted.

use crate::classify::ClassifiedRow;
use crate::record::{strip_field, KeyLayout};

/// Header row for a layout.
pub fn header(layout: KeyLayout) -> &'static str {
    match layout {
        KeyLayout::Suite => "LLM,Suite,Kind,Test,Status,Failure Reason",
        KeyLayout::Type => "LLM,Type,Test,Status,Failure Reason",
    }
}

/// Render one row without a trailing newline.
pub fn format_row(row: &ClassifiedRow) -> String {
    let mut fields: Vec<&str> = Vec::with_capacity(6);
    fields.push(&row.key.llm);
    fields.push(&row.key.group);
    if let Some(kind) = &row.key.kind {
        fields.push(kind);
    }
    fields.push(&row.key.test);
    fields.push(&row.status);
    fields.push(row.reason_label());

    fields
        .into_iter()
        .map(|f| quote(strip_field(f)))
        .collect::<Vec<_>>()
        .join(",")
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

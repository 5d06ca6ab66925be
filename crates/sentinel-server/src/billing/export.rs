//! History export as JSON or CSV.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::storage::ScanHistory;
use crate::storage::time::to_rfc3339;

const CSV_HEADER: [&str; 8] = [
    "Date",
    "Content Type",
    "Content",
    "Risk Score",
    "Classification",
    "Explanation",
    "Recommendations",
    "Tokens Used",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unsupported export format: {other}")),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonExport<'a> {
    exported_at: String,
    user_id: &'a str,
    scans: &'a [ScanHistory],
}

/// Pretty-printed `{exportedAt, userId, scans}` document.
pub fn to_json(user_id: &str, scans: &[ScanHistory], exported_at: i64) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonExport {
        exported_at: to_rfc3339(exported_at),
        user_id,
        scans,
    })
}

/// Header plus one line per scan, joined with `\n`. Only the free-text
/// columns are quoted.
pub fn to_csv(scans: &[ScanHistory]) -> String {
    let mut lines = Vec::with_capacity(scans.len() + 1);
    lines.push(CSV_HEADER.join(","));
    for scan in scans {
        lines.push(
            [
                to_rfc3339(scan.created_at),
                scan.content_type.to_string(),
                quote(&scan.content),
                scan.risk_score.clone(),
                scan.classification.clone(),
                quote(&scan.explanation),
                quote(&scan.recommendations),
                scan.tokens_used.to_string(),
            ]
            .join(","),
        );
    }
    lines.join("\n")
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

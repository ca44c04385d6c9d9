//! JSON rendering for reports

use crate::report::Report;
use serde_json::Value;

/// Render the report as a JSON value
pub fn render_json(report: &Report) -> serde_json::Result<Value> {
    serde_json::to_value(report)
}

/// Render the report as a pretty-printed JSON string
pub fn render_json_string(report: &Report) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// Render the report as a compact JSON string (no whitespace)
pub fn render_json_compact(report: &Report) -> serde_json::Result<String> {
    serde_json::to_string(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Process, SourceKind};
    use crate::snapshot::Snapshot;
    use crate::warnings::WarningEngine;
    use time::macros::datetime;

    fn sample_report() -> Report {
        let snapshot = Snapshot::new(vec![
            Process::new(1, "cron"),
            Process {
                health: "zombie".into(),
                ..Process::new(2, "backup.sh")
            },
        ]);
        Report::analyze(
            &snapshot,
            &WarningEngine::default(),
            datetime!(2025-03-04 05:06:07 UTC),
        )
    }

    #[test]
    fn test_render_json_shape() {
        let value = render_json(&sample_report()).unwrap();
        assert_eq!(value["source"]["kind"], "cron");
        assert_eq!(value["source"]["name"], "cron");
        assert_eq!(value["target"]["health"], "zombie");
        assert_eq!(value["warnings"][0]["kind"], "zombie");
        assert_eq!(value["evaluated_at"], "2025-03-04T05:06:07Z");
    }

    #[test]
    fn test_render_json_string_parses_back() {
        let json_str = render_json_string(&sample_report()).unwrap();
        let parsed: Report = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.source.kind, SourceKind::Cron);
        assert_eq!(parsed.warnings.len(), 1);
        assert!(!render_json_compact(&parsed).unwrap().contains('\n'));
    }
}

//! Terminal run summary.

use std::collections::BTreeMap;

use crate::calibrate::CalibrationOutput;
use crate::domain::SkipAction;
use crate::io::IngestedPanel;

/// Manifest entries counted by `(reason code, action)`.
pub fn skip_counts(output: &CalibrationOutput) -> BTreeMap<(&'static str, SkipAction), usize> {
    let mut counts = BTreeMap::new();
    for entry in &output.manifest {
        *counts.entry((entry.reason.code(), entry.action)).or_insert(0) += 1;
    }
    counts
}

pub fn format_run_summary(ingest: &IngestedPanel, output: &CalibrationOutput) -> String {
    let mut out = String::new();
    out.push_str("== Calibration ==\n");
    out.push_str(&format!(
        "Rows: {} read, {} used, {} row errors\n",
        ingest.rows_read,
        ingest.rows_used,
        ingest.row_errors.len()
    ));
    out.push_str(&format!("Groups: {} seen, {} calibrated\n", output.groups_seen, output.records.len()));

    if let Some((shortest, longest)) = window_range(output) {
        out.push_str(&format!("Window length: {shortest}..={longest} periods\n"));
    }

    let counts = skip_counts(output);
    if counts.is_empty() {
        out.push_str("Skips: none\n");
    } else {
        out.push_str("Skips:\n");
        for ((code, action), n) in counts {
            out.push_str(&format!("  {code:<26} {:<14} {n}\n", action.label()));
        }
    }
    out
}

fn window_range(output: &CalibrationOutput) -> Option<(usize, usize)> {
    let lengths = output.records.iter().map(|r| r.observations());
    let shortest = lengths.clone().min()?;
    let longest = lengths.max()?;
    Some((shortest, longest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ManifestEntry, Panel, SkipReason};

    fn entry(group: &str, reason: SkipReason, action: SkipAction) -> ManifestEntry {
        ManifestEntry {
            group: group.to_string(),
            reason,
            action,
        }
    }

    #[test]
    fn counts_skips_by_reason_and_action() {
        let output = CalibrationOutput {
            manifest: vec![
                entry("A", SkipReason::InsufficientWindow { length: 3, required: 10 }, SkipAction::GroupSkipped),
                entry("B", SkipReason::InsufficientWindow { length: 0, required: 10 }, SkipAction::GroupSkipped),
                entry("C", SkipReason::MissingGroupLookup, SkipAction::FieldOmitted),
            ],
            groups_seen: 3,
            ..Default::default()
        };
        let counts = skip_counts(&output);
        assert_eq!(counts[&("insufficient-window", SkipAction::GroupSkipped)], 2);
        assert_eq!(counts[&("missing-group-lookup", SkipAction::FieldOmitted)], 1);

        let ingest = IngestedPanel {
            panel: Panel::default(),
            indicators: Vec::new(),
            row_errors: Vec::new(),
            rows_read: 10,
            rows_used: 9,
        };
        let text = format_run_summary(&ingest, &output);
        assert!(text.contains("Groups: 3 seen, 0 calibrated"));
        assert!(text.contains("insufficient-window"));
        assert!(!text.contains("Window length"));
    }
}

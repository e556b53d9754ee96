//! Validator finding classification

use crate::types::{ClassifiedIssue, Severity};

/// A finding before classification, tagged with where it was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawIssue {
    pub label: String,
    pub schema_type: String,
    pub predicate: String,
    pub message: String,
}

/// Reshape validator findings into uniform records, preserving order
pub fn classify(raw_issues: &[RawIssue]) -> Vec<ClassifiedIssue> {
    raw_issues
        .iter()
        .map(|raw| ClassifiedIssue {
            severity: severity_from_label(&raw.label),
            schema_type: raw.schema_type.clone(),
            predicate: raw.predicate.clone(),
            message: raw.message.clone(),
        })
        .collect()
}

/// Map a validator severity label; anything unrecognized counts as a warning
pub fn severity_from_label(label: &str) -> Severity {
    match label.trim().to_ascii_lowercase().as_str() {
        "error" | "errors" | "severe" | "critical" | "fatal" => Severity::Error,
        _ => Severity::Warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(label: &str, predicate: &str) -> RawIssue {
        RawIssue {
            label: label.to_string(),
            schema_type: "Product".to_string(),
            predicate: predicate.to_string(),
            message: format!("{label} on {predicate}"),
        }
    }

    #[test]
    fn preserves_known_labels() {
        assert_eq!(severity_from_label("error"), Severity::Error);
        assert_eq!(severity_from_label("ERROR"), Severity::Error);
        assert_eq!(severity_from_label(" Severe "), Severity::Error);
        assert_eq!(severity_from_label("warning"), Severity::Warning);
    }

    #[test]
    fn unknown_labels_become_warnings() {
        assert_eq!(severity_from_label("notice"), Severity::Warning);
        assert_eq!(severity_from_label(""), Severity::Warning);
    }

    #[test]
    fn keeps_input_order_and_fields() {
        let classified = classify(&[
            raw("warning", "offers"),
            raw("error", "name"),
            raw("hint", "sku"),
        ]);

        let severities: Vec<Severity> = classified.iter().map(|issue| issue.severity).collect();
        assert_eq!(
            severities,
            vec![Severity::Warning, Severity::Error, Severity::Warning]
        );
        assert_eq!(classified[1].predicate, "name");
        assert_eq!(classified[1].schema_type, "Product");
        assert_eq!(classified[2].message, "hint on sku");
    }
}

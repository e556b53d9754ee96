//! Human-readable rendering of a [`Report`]

use std::fmt::Write as FmtWrite;

use schemalens_core::{Report, Severity};

const DIVIDER: &str = "─────────────────────────────────────────────────────────────";
const LABEL_WIDTH: usize = 16;

pub fn push_section_header(buf: &mut String, icon: &str, title: &str) {
    let _ = writeln!(buf, "{DIVIDER}");
    let _ = writeln!(buf, "{icon} {title}");
    let _ = writeln!(buf, "{DIVIDER}");
}

pub fn push_key_value(buf: &mut String, label: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    let _ = writeln!(buf, "• {:<width$} : {}", label, value, width = LABEL_WIDTH);
}

fn join<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render the text summary printed by `--summary`
pub fn render_summary(report: &Report) -> String {
    let mut output = String::new();

    push_section_header(&mut output, "🔎", "Schema Audit");
    push_key_value(&mut output, "URL", &report.input_url);
    push_key_value(&mut output, "Keyword", &report.keyword);
    push_key_value(
        &mut output,
        "Types",
        &join(report.profile.comparable_types().map(|(name, _)| name)),
    );
    let errors = report
        .issues
        .iter()
        .filter(|issue| issue.severity == Severity::Error)
        .count();
    push_key_value(
        &mut output,
        "Issues",
        &format!("{errors} errors, {} warnings", report.issues.len() - errors),
    );
    output.push('\n');

    push_section_header(&mut output, "📚", "Catalog Comparison");
    for (schema_type, diff) in &report.diffs {
        let status = if diff.is_clean() { "✅" } else { "⚠️" };
        let _ = writeln!(output, "{status} {schema_type}");
        push_key_value(&mut output, "Missing required", &join(&diff.missing_required));
        push_key_value(
            &mut output,
            "Missing recomm.",
            &join(&diff.missing_recommended),
        );
        push_key_value(&mut output, "Rich results", &join(diff.rich_result_opportunities.keys()));
        push_key_value(&mut output, "Undocumented", &join(&diff.extra));
    }
    if !report.unresolved_types.is_empty() {
        push_key_value(&mut output, "Not in catalog", &join(&report.unresolved_types));
    }
    output.push('\n');

    push_section_header(&mut output, "🏁", "Competitors");
    let competitors = &report.competitors;
    if report.competitor_data_unavailable {
        let _ = writeln!(output, "No competitor data; recommendations use the catalog only.");
    }
    push_key_value(
        &mut output,
        "Analyzed",
        &format!("{} of {}", competitors.analyzed, competitors.requested),
    );
    for failure in &competitors.failed {
        push_key_value(&mut output, "Dropped", &format!("{} ({})", failure.url, failure.reason));
    }
    for usage in &competitors.type_usage {
        let _ = writeln!(
            output,
            "  {:<28} {:>3} ({:.0}%)",
            usage.schema_type, usage.usage_count, usage.percentage
        );
    }
    output.push('\n');

    push_section_header(&mut output, "✅", "Recommendations");
    if report.recommendations.is_empty() {
        let _ = writeln!(output, "Nothing to recommend.");
    }
    for (index, item) in report.recommendations.iter().enumerate() {
        let target = match &item.property {
            Some(property) => format!("{}.{}", item.schema_type, property),
            None => item.schema_type.clone(),
        };
        let _ = writeln!(
            output,
            "{:>2}. [{:>2}] {} {}",
            index + 1,
            item.priority,
            item.kind.label(),
            target
        );
        let _ = writeln!(output, "      {}", item.rationale);
        if let Some(source) = item.source_urls.first() {
            let _ = writeln!(output, "      ↳ {source}");
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_skips_empty_values() {
        let mut buf = String::new();
        push_key_value(&mut buf, "Label", "");
        assert!(buf.is_empty());

        push_key_value(&mut buf, "Label", "value");
        assert_eq!(buf, "• Label            : value\n");
    }

    #[test]
    fn section_header_is_framed() {
        let mut buf = String::new();
        push_section_header(&mut buf, "✅", "Recommendations");
        let lines: Vec<&str> = buf.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], DIVIDER);
        assert_eq!(lines[1], "✅ Recommendations");
    }
}

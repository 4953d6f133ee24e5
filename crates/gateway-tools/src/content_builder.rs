//! Markdown assembly helpers shared by every tool, enforcing the
//! formatting guarantees tool output is expected to have: blank-line-padded
//! headings, truncated code examples, severity-grouped findings, and
//! top-10-capped result cards.

use serde_json::Value;

/// Code fences longer than this are truncated with a trailing marker.
const MAX_CODE_LINES: usize = 20;
/// Search-result cards are capped at this many entries.
const MAX_CARDS: usize = 10;
/// Severities in their fixed display order.
const SEVERITY_ORDER: [&str; 3] = ["high", "medium", "low"];

/// A Markdown heading on its own line, padded with a blank line before
/// and after so headings never run into adjacent prose.
#[must_use]
pub fn heading(level: usize, text: &str) -> String {
    format!("\n{} {}\n\n", "#".repeat(level.max(1)), text)
}

/// A presentational divider, alone on its own line.
#[must_use]
pub fn divider() -> String {
    "\n---\n".to_string()
}

/// Wrap `code` in a fenced code block, truncating to [`MAX_CODE_LINES`]
/// lines with a trailing `// ...` marker when it's longer.
#[must_use]
pub fn code_block(language: &str, code: &str) -> String {
    let lines: Vec<&str> = code.lines().collect();
    let body = if lines.len() > MAX_CODE_LINES {
        let mut truncated = lines[..MAX_CODE_LINES].join("\n");
        truncated.push_str("\n// ...");
        truncated
    } else {
        code.to_string()
    };
    format!("```{language}\n{body}\n```\n")
}

/// One finding, grouped and rendered under its severity section.
#[derive(Debug, Clone)]
pub struct Finding {
    pub severity: String,
    pub title: String,
    pub detail: String,
}

/// Render findings grouped by severity in the fixed `high, medium, low`
/// order, each group as its own heading; severities outside that set are
/// appended last, in first-seen order, rather than dropped.
#[must_use]
pub fn render_findings_by_severity(findings: &[Finding]) -> String {
    let mut out = String::new();

    for severity in SEVERITY_ORDER {
        let group: Vec<&Finding> = findings.iter().filter(|f| f.severity == severity).collect();
        if group.is_empty() {
            continue;
        }
        out.push_str(&heading(3, &capitalize(severity)));
        for finding in group {
            out.push_str(&format!("- **{}** — {}\n", finding.title, finding.detail));
        }
    }

    let mut seen_other = std::collections::HashSet::new();
    for finding in findings {
        if SEVERITY_ORDER.contains(&finding.severity.as_str()) {
            continue;
        }
        if seen_other.insert(finding.severity.clone()) {
            out.push_str(&heading(3, &capitalize(&finding.severity)));
        }
        out.push_str(&format!("- **{}** — {}\n", finding.title, finding.detail));
    }

    out
}

/// Severity breakdown counts, in the same fixed order, for the JSON
/// metadata block.
#[must_use]
pub fn severity_breakdown(findings: &[Finding]) -> Value {
    let mut counts = serde_json::Map::new();
    for severity in SEVERITY_ORDER {
        let count = findings.iter().filter(|f| f.severity == severity).count();
        counts.insert(severity.to_string(), Value::from(count));
    }
    Value::Object(counts)
}

/// Render up to [`MAX_CARDS`] pattern cards, dropping the rest (the
/// caller is expected to mention the true total separately in metadata).
#[must_use]
pub fn render_pattern_cards(cards: &[(String, String)]) -> String {
    let mut out = String::new();
    for (name, summary) in cards.iter().take(MAX_CARDS) {
        out.push_str(&heading(4, name));
        out.push_str(summary);
        out.push('\n');
    }
    out
}

/// How many cards `render_pattern_cards` actually rendered from `total`.
#[must_use]
pub fn cards_shown(total: usize) -> usize {
    total.min(MAX_CARDS)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

use std::fmt::{self, Write};

use comfy_table::{Cell, Color as TableColor};
use indexmap::IndexMap;

use crate::console::{ansi, Node, Section, SectionKind, StatusAnnotation};

use super::styling::{bright, bright_red, bright_yellow, cyan, dim, Outcome};
use super::tables::{color_coded_duration_cell, create_table, status_cell};

const MAX_HEADER_WIDTH: usize = 60;

fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) -> fmt::Result {
    writeln!(output, "{} {}", bright(emoji), bright(title).underlined())
}

fn truncate(text: &str, width: usize) -> String {
    let visible = ansi::strip(&StatusAnnotation::strip(text));
    if visible.chars().count() <= width {
        visible
    } else {
        let cut: String = visible.chars().take(width.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

/// Section counts per kind, in order of first appearance.
fn kind_counts(sections: &[&Section]) -> IndexMap<SectionKind, usize> {
    let mut counts = IndexMap::new();
    for section in sections {
        *counts.entry(section.kind()).or_insert(0) += 1;
    }
    counts
}

/// Renders a section-by-section summary of a folded console.
///
/// Displays:
/// - Overview: source, line and section counts, per-kind breakdown
/// - Sections: one row per section with status, size, start time, duration
///   and any exit-code/elapsed annotation
/// - Failures: headers of every failed section
pub fn render_summary(source: &str, nodes: &[Node]) -> Result<String, fmt::Error> {
    let mut output = String::new();
    let sections: Vec<&Section> = nodes.iter().filter_map(Node::as_section).collect();
    let total_lines: usize = nodes
        .iter()
        .map(|node| match node {
            Node::Line(_) => 1,
            Node::Section(section) => section.line_count(),
        })
        .sum();
    let failed: Vec<&Section> = sections.iter().copied().filter(|s| s.is_errored()).collect();

    add_section_header(&mut output, "📊", "Overview")?;

    let outcome = if sections.iter().any(|s| s.is_open()) {
        Outcome::Running
    } else if failed.is_empty() {
        Outcome::Passed
    } else {
        Outcome::Failed
    };
    let breakdown = kind_counts(&sections)
        .iter()
        .map(|(kind, count)| format!("{kind}: {count}"))
        .collect::<Vec<_>>()
        .join(", ");

    write!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n\n",
        dim("Source:"),
        cyan(source),
        dim("Lines:"),
        bright_yellow(total_lines),
        dim("Sections:"),
        bright_yellow(sections.len()),
        dim("Breakdown:"),
        dim(if breakdown.is_empty() { "-".to_string() } else { breakdown }),
        dim("Outcome:"),
        outcome.paint(outcome.label()),
    )?;

    if sections.is_empty() {
        writeln!(output, "{}", bright_yellow("No sections found."))?;
        return Ok(output);
    }

    add_section_header(&mut output, "📋", "Sections")?;

    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "#", "Type", "Status", "Lines", "Started", "Duration", "Header", "Result",
    ]));
    for (index, section) in sections.iter().enumerate() {
        let duration = section
            .elapsed()
            .map_or_else(|| Cell::new("-"), |d| color_coded_duration_cell(d.as_secs_f64()));
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(section.kind()),
            status_cell(section),
            Cell::new(section.line_count()),
            Cell::new(section.header().timestamp.as_deref().unwrap_or("-")),
            duration,
            Cell::new(truncate(&section.header().text, MAX_HEADER_WIDTH)),
            Cell::new(
                section
                    .annotation()
                    .map_or_else(|| "-".to_string(), |a| a.to_string()),
            ),
        ]);
    }
    writeln!(output, "{table}\n")?;

    if !failed.is_empty() {
        add_section_header(&mut output, "❌", "Failures")?;
        for section in &failed {
            writeln!(
                output,
                "  {} {} {}",
                bright_red(format!("[{}]", section.kind())),
                dim(section.header().timestamp.as_deref().unwrap_or("")),
                truncate(&section.header().text, MAX_HEADER_WIDTH * 2)
            )?;
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::LogOutputTransformer;

    fn plain(source: &str, nodes: &[Node]) -> String {
        console::strip_ansi_codes(&render_summary(source, nodes).unwrap()).into_owned()
    }

    #[test]
    fn empty_console() {
        let text = plain("empty.log", &[]);
        assert!(text.contains("Source: empty.log"));
        assert!(text.contains("Sections: 0"));
        assert!(text.contains("No sections found."));
    }

    #[test]
    fn counts_and_failures() {
        let nodes = LogOutputTransformer::transform([
            "bare line",
            "##|10:00:00.000 Job started",
            "!!|10:00:01.000 Task: make",
            "&1|10:00:02.000 compiling",
            "?1|10:00:04.500 Task status: failed (exit code: 2) (3500 ms)",
            "j1|10:00:05.000 Job failed",
        ]);
        let text = plain("build.log", &nodes);

        assert!(text.contains("Lines: 6"));
        assert!(text.contains("Sections: 3"));
        assert!(text.contains("Breakdown: info: 1, task: 1, result: 1"));
        assert!(text.contains("Outcome: failed"));
        assert!(text.contains("exited: 2"));
        assert!(text.contains("Failures"));
        assert!(text.contains("[task] 10:00:01.000 Task: make"));
        assert!(text.contains("[result] 10:00:05.000 Job failed"));
    }

    #[test]
    fn running_outcome() {
        let mut transformer = LogOutputTransformer::new();
        transformer.push_line("!!|10:00:00.000 Task: sleep 60");
        let text = plain("live", &transformer.snapshot());
        assert!(text.contains("Outcome: running"));
        assert!(text.contains("running"));
    }

    #[test]
    fn truncate_long_headers() {
        let long = "x".repeat(100);
        let cut = truncate(&long, 10);
        assert_eq!(cut.chars().count(), 10);
        assert!(cut.ends_with('…'));
        assert_eq!(truncate("short (exit code: 1)", 10), "short");
    }
}

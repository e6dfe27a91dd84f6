use std::fmt::{self, Write};

use crate::console::{LogLine, Node, Section};

use super::styling::{bright, dim, Outcome};

const EXPANDED_MARKER: &str = "▾";
const COLLAPSED_MARKER: &str = "▸";

/// Renders folded console output for a terminal.
///
/// Collapsed sections show only their header and a line count unless
/// `expand_all` is set. ANSI escapes in the log text pass through untouched.
pub fn render_console(nodes: &[Node], expand_all: bool) -> Result<String, fmt::Error> {
    let mut output = String::new();
    for node in nodes {
        match node {
            Node::Line(line) => writeln!(output, "{}", format_line(line))?,
            Node::Section(section) => render_section(&mut output, section, expand_all)?,
        }
    }
    Ok(output)
}

fn render_section(output: &mut String, section: &Section, expand_all: bool) -> fmt::Result {
    let show_body = section.is_multiline() && (expand_all || section.is_expanded());
    let marker = if !section.is_multiline() {
        " "
    } else if show_body {
        EXPANDED_MARKER
    } else {
        COLLAPSED_MARKER
    };

    let kind = Outcome::of(section).paint(format!("[{}]", section.kind()));

    let mut header = format!("{} {} {}", bright(marker), kind, format_line(section.header()));
    if let Some(annotation) = section.annotation() {
        write!(header, " {}", dim(format!("({annotation})")))?;
    }
    if section.is_multiline() && !show_body {
        write!(header, " {}", dim(format!("[+{} lines]", section.body().len())))?;
    }
    writeln!(output, "{header}")?;

    if show_body {
        for line in section.body() {
            writeln!(output, "    {}", format_line(line))?;
        }
    }
    Ok(())
}

fn format_line(line: &LogLine) -> String {
    match &line.timestamp {
        Some(timestamp) => format!("{} {}", dim(timestamp), line.text),
        None => line.text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::LogOutputTransformer;

    fn plain(nodes: &[Node], expand_all: bool) -> String {
        console::strip_ansi_codes(&render_console(nodes, expand_all).unwrap()).into_owned()
    }

    fn sample() -> Vec<Node> {
        LogOutputTransformer::transform([
            "Agent booting",
            "!!|10:00:00.000 Task: make",
            "&1|10:00:00.500 compiling",
            "?0|10:00:01.000 Task status: passed (1000 ms)",
            "!!|10:00:02.000 Task: make test",
            "&2|10:00:02.500 assertion failed",
            "?1|10:00:03.000 Task status: failed (exit code: 1)",
        ])
    }

    #[test]
    fn collapsed_sections_hide_body() {
        let text = plain(&sample(), false);
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "Agent booting");
        assert_eq!(
            lines[1],
            "▸ [task] 10:00:00.000 Task: make (took: 1.000s) [+2 lines]"
        );
        assert!(!text.contains("compiling"));
        assert_eq!(lines[2], "▾ [task] 10:00:02.000 Task: make test (exited: 1)");
        assert_eq!(lines[3], "    10:00:02.500 assertion failed");
    }

    #[test]
    fn expand_all_shows_everything() {
        let text = plain(&sample(), true);
        assert!(text.contains("    10:00:00.500 compiling"));
        assert!(!text.contains("[+"));
    }

    #[test]
    fn single_line_section_has_no_marker() {
        let nodes = LogOutputTransformer::transform(["j0|10:00:00.000 Job passed"]);
        assert_eq!(plain(&nodes, false), "  [result] 10:00:00.000 Job passed\n");
    }
}

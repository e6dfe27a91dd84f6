use std::fmt::{self, Write};

use v_htmlescape::escape;

use crate::console::ansi;
use crate::console::{LogLine, Node, Section, StatusAnnotation};

use super::exports::FoldedConsole;

const STYLESHEET: &str = r#"
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 40px; background: #f5f5f5; }
        .console { max-width: 1200px; margin: 0 auto; background: #1e1e1e; color: #d4d4d4; padding: 20px; border-radius: 8px; font-family: Menlo, Consolas, monospace; font-size: 13px; }
        h2 { color: #2c3e50; max-width: 1200px; margin: 30px auto 10px; }
        h1 { color: #2c3e50; border-bottom: 3px solid #3498db; padding-bottom: 10px; max-width: 1200px; margin: 0 auto 20px; }
        .foldable-section { border-left: 3px solid #555; margin: 2px 0; padding-left: 6px; }
        .foldable-section > summary { cursor: pointer; list-style: none; }
        .foldable-section > summary::before { content: "\25B8  "; }
        .foldable-section[open] > summary::before { content: "\25BE  "; }
        .log-fs-body { padding-left: 18px; }
        .log-fs-line { white-space: pre-wrap; }
        .log-fs-timestamp { color: #808080; margin-right: 8px; }
        .log-fs-annotation { color: #9cdcfe; margin-left: 12px; }
        .log-fs-line-err, .log-fs-line-prep-err, .log-fs-line-publish-err { color: #f48771; }
        [class*="-status-passed"] { border-left-color: #27ae60; }
        [class*="-status-failed"] { border-left-color: #e74c3c; }
        .ansi-bold { font-weight: bold; }
        .ansi-italic { font-style: italic; }
        .ansi-underline { text-decoration: underline; }
        .ansi-black-fg { color: #000; } .ansi-red-fg { color: #cd3131; } .ansi-green-fg { color: #0dbc79; } .ansi-yellow-fg { color: #e5e510; }
        .ansi-blue-fg { color: #2472c8; } .ansi-magenta-fg { color: #bc3fbc; } .ansi-cyan-fg { color: #11a8cd; } .ansi-white-fg { color: #e5e5e5; }
        .ansi-bright-black-fg { color: #666; } .ansi-bright-red-fg { color: #f14c4c; } .ansi-bright-green-fg { color: #23d18b; } .ansi-bright-yellow-fg { color: #f5f543; }
        .ansi-bright-blue-fg { color: #3b8eea; } .ansi-bright-magenta-fg { color: #d670d6; } .ansi-bright-cyan-fg { color: #29b8db; } .ansi-bright-white-fg { color: #fff; }
        .ansi-black-bg { background: #000; } .ansi-red-bg { background: #cd3131; } .ansi-green-bg { background: #0dbc79; } .ansi-yellow-bg { background: #e5e510; }
        .ansi-blue-bg { background: #2472c8; } .ansi-magenta-bg { background: #bc3fbc; } .ansi-cyan-bg { background: #11a8cd; } .ansi-white-bg { background: #e5e5e5; }
"#;

/// Renders a self-contained HTML page around one or more folded consoles.
///
/// A single console fills the page under `title`; several get a heading and
/// a console block each.
pub fn render_document(title: &str, consoles: &[FoldedConsole]) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\">")?;
    writeln!(out, "<head>")?;
    writeln!(out, "    <meta charset=\"UTF-8\">")?;
    writeln!(
        out,
        "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">"
    )?;
    writeln!(out, "    <title>Console - {}</title>", escape(title))?;
    writeln!(out, "    <style>{STYLESHEET}    </style>")?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;
    writeln!(out, "    <h1>{}</h1>", escape(title))?;
    for console in consoles {
        if consoles.len() > 1 {
            writeln!(out, "    <h2>{}</h2>", escape(console.source))?;
        }
        writeln!(out, "    <div class=\"console\">")?;
        out.push_str(&render_nodes(console.nodes)?);
        writeln!(out, "    </div>")?;
    }
    writeln!(out, "</body>")?;
    writeln!(out, "</html>")?;
    Ok(out)
}

/// Renders the folded console as an HTML fragment, one node per line.
pub fn render_nodes(nodes: &[Node]) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Line(line) => render_line(&mut out, line, None)?,
            Node::Section(section) => render_section(&mut out, section)?,
        }
        out.push('\n');
    }
    Ok(out)
}

fn section_classes(section: &Section) -> String {
    let mut classes = vec![
        "foldable-section".to_string(),
        format!("log-fs-type-{}", section.kind()),
    ];
    classes.extend(section.status_class());
    if section.is_errored() {
        classes.push("log-fs-errored".to_string());
    }
    if section.is_open() {
        classes.push("log-fs-running".to_string());
    }
    classes.join(" ")
}

fn render_section(out: &mut String, section: &Section) -> fmt::Result {
    let classes = section_classes(section);
    let annotation = section.annotation();

    if !section.is_multiline() {
        write!(out, "<div class=\"{classes}\">")?;
        render_line(out, section.header(), annotation.as_ref())?;
        out.push_str("</div>");
        return Ok(());
    }

    let open = if section.is_expanded() { " open" } else { "" };
    write!(out, "<details class=\"{classes}\"{open}>")?;
    out.push_str("<summary class=\"log-fs-toggle\">");
    render_line(out, section.header(), annotation.as_ref())?;
    out.push_str("</summary><div class=\"log-fs-body\">");
    for line in section.body() {
        render_line(out, line, None)?;
    }
    out.push_str("</div></details>");
    Ok(())
}

fn render_line(out: &mut String, line: &LogLine, annotation: Option<&StatusAnnotation>) -> fmt::Result {
    match line.prefix {
        Some(prefix) => write!(out, "<div class=\"log-fs-line log-fs-line-{}\">", prefix.name())?,
        None => out.push_str("<div class=\"log-fs-line\">"),
    }

    if let Some(timestamp) = &line.timestamp {
        write!(out, "<span class=\"log-fs-timestamp\">{}</span>", escape(timestamp))?;
    }
    render_text(out, &line.text)?;
    if let Some(annotation) = annotation {
        write!(
            out,
            "<span class=\"log-fs-annotation\">{}</span>",
            escape(&annotation.to_string())
        )?;
    }

    out.push_str("</div>");
    Ok(())
}

fn render_text(out: &mut String, text: &str) -> fmt::Result {
    for span in ansi::parse(text) {
        if span.style.is_plain() {
            write!(out, "{}", escape(&span.text))?;
        } else {
            write!(
                out,
                "<span class=\"{}\">{}</span>",
                span.style.classes().join(" "),
                escape(&span.text)
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::{LogOutputTransformer, SectionKind};

    #[test]
    fn bare_lines_render_in_order() {
        let nodes = LogOutputTransformer::transform(["Starting build", "Build finished in no time!"]);
        let html = render_nodes(&nodes).unwrap();

        let first = html.find("Starting build").unwrap();
        let second = html.find("Build finished in no time!").unwrap();
        assert!(first < second);
        assert_eq!(html.matches("<div class=\"log-fs-line\">").count(), 2);
        assert!(!html.contains("foldable-section"));
    }

    #[test]
    fn info_section_with_timestamps() {
        let nodes = LogOutputTransformer::transform([
            "##|01:01:00.123 Starting build",
            "##|01:02:00.123 Build finished in no time!",
        ]);
        let html = render_nodes(&nodes).unwrap();

        assert!(html.contains("log-fs-type-info"));
        assert!(html.contains("<span class=\"log-fs-timestamp\">01:01:00.123</span>"));
        assert!(html.contains("<span class=\"log-fs-timestamp\">01:02:00.123</span>"));
        assert_eq!(html.matches("<details").count(), 1);
    }

    #[test]
    fn repeated_promotion_renders_one_toggle() {
        let mut section = Section::start(SectionKind::Task, LogLine::parse("!!|10:00:00.000 make"));
        section.promote_to_multiline();
        section.promote_to_multiline();

        let html = render_nodes(&[Node::Section(section)]).unwrap();
        assert_eq!(html.matches("<summary").count(), 1);
        assert_eq!(html.matches("log-fs-toggle").count(), 1);
    }

    #[test]
    fn single_line_section_has_no_toggle() {
        let nodes = LogOutputTransformer::transform(["j0|10:00:00.000 Job passed"]);
        let html = render_nodes(&nodes).unwrap();
        assert!(!html.contains("<summary"));
        assert!(html.contains("job-status-passed"));
    }

    #[test]
    fn failed_sections_render_open_and_passed_closed() {
        let nodes = LogOutputTransformer::transform([
            "!!|10:00:00.000 Task: ok",
            "?0|10:00:01.000 passed",
            "!!|10:00:02.000 Task: broken",
            "?1|10:00:03.000 Task status: failed (exit code: 127) (8675309 ms)",
        ]);
        let html = render_nodes(&nodes).unwrap();
        let lines: Vec<_> = html.lines().collect();

        assert!(lines[0].starts_with("<details class=\"foldable-section log-fs-type-task task-status-passed\">"));
        assert!(lines[1].contains("task-status-failed log-fs-errored\" open>"));
        assert!(lines[1].contains(
            "<span class=\"log-fs-annotation\">exited: 127, took: 2h 24m 35.309s</span>"
        ));
    }

    #[test]
    fn running_section_is_marked() {
        let mut transformer = LogOutputTransformer::new();
        transformer.push_line("!!|10:00:00.000 Task: sleep");
        let html = render_nodes(&transformer.snapshot()).unwrap();
        assert!(html.contains("log-fs-running"));
        assert!(!html.contains("-status-"));
    }

    #[test]
    fn ansi_and_escaping() {
        let nodes = LogOutputTransformer::transform(["&1|10:00:00.000 \x1b[31m<error>\x1b[0m & done"]);
        let html = render_nodes(&nodes).unwrap();
        assert!(html.contains("<span class=\"ansi-red-fg\">&lt;error&gt;</span> &amp; done"));
    }

    #[test]
    fn escape_covers_quotes() {
        let nodes = LogOutputTransformer::transform([r#"echo "a" 'b'"#]);
        let html = render_nodes(&nodes).unwrap();
        assert!(html.contains("echo &quot;a&quot; &#x27;b&#x27;"));
        assert!(!html.contains("'b'"));
    }

    #[test]
    fn document_wraps_fragment() {
        let nodes = LogOutputTransformer::transform(["hello"]);
        let consoles = [FoldedConsole::new("nightly <main>", &nodes)];
        let html = render_document("nightly <main>", &consoles).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Console - nightly &lt;main&gt;</title>"));
        assert!(html.contains("<div class=\"log-fs-line\">hello</div>"));
        assert!(!html.contains("<h2>"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn several_consoles_share_one_document() {
        let first = LogOutputTransformer::transform(["!!|10:00:00.000 Task: make", "?0|10:00:01.000 ok"]);
        let second = LogOutputTransformer::transform(["!!|10:00:00.000 Task: test", "?1|10:00:01.000 failed"]);
        let consoles = [
            FoldedConsole::new("build-unit", &first),
            FoldedConsole::new("build-lint", &second),
        ];
        let html = render_document("2 job consoles", &consoles).unwrap();

        assert_eq!(html.matches("<!DOCTYPE html>").count(), 1);
        assert_eq!(html.matches("<div class=\"console\">").count(), 2);
        assert!(html.find("<h2>build-unit</h2>").unwrap() < html.find("<h2>build-lint</h2>").unwrap());
        assert!(html.contains("task-status-failed"));
    }
}

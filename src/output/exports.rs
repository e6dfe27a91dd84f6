use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::config::OutputFormat;
use crate::console::Node;

use super::styling::magenta_bold;
use super::{html, summary, terminal};

/// JSON envelope around a folded console.
#[derive(Debug, Serialize)]
pub struct ConsoleReport<'a> {
    pub source: &'a str,
    pub generated_at: DateTime<Utc>,
    pub total_lines: usize,
    pub total_sections: usize,
    pub failed_sections: usize,
    pub nodes: &'a [Node],
}

impl<'a> ConsoleReport<'a> {
    pub fn new(source: &'a str, nodes: &'a [Node]) -> Self {
        let sections: Vec<_> = nodes.iter().filter_map(Node::as_section).collect();
        let total_lines = nodes
            .iter()
            .map(|node| match node {
                Node::Line(_) => 1,
                Node::Section(section) => section.line_count(),
            })
            .sum();

        Self {
            source,
            generated_at: Utc::now(),
            total_lines,
            total_sections: sections.len(),
            failed_sections: sections.iter().filter(|s| s.is_errored()).count(),
            nodes,
        }
    }
}

/// One job's folded console and where it came from.
#[derive(Debug, Clone, Copy)]
pub struct FoldedConsole<'a> {
    pub source: &'a str,
    pub nodes: &'a [Node],
}

impl<'a> FoldedConsole<'a> {
    pub fn new(source: &'a str, nodes: &'a [Node]) -> Self {
        Self { source, nodes }
    }
}

/// Exports a folded console in the requested format.
pub fn export_console(
    source: &str,
    nodes: &[Node],
    format: OutputFormat,
    pretty: bool,
    expand_all: bool,
    output: &mut dyn Write,
) -> Result<()> {
    export_consoles(&[FoldedConsole::new(source, nodes)], format, pretty, expand_all, output)
}

/// Exports one or more folded consoles as a single document.
///
/// - HTML: self-contained page with collapsible sections, one block per console
/// - Text: folded terminal output, with a header per console when there are several
/// - JSON: a `ConsoleReport`, or an array of them for several consoles
/// - Summary: overview and per-section table for each console
pub fn export_consoles(
    consoles: &[FoldedConsole],
    format: OutputFormat,
    pretty: bool,
    expand_all: bool,
    output: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Html => {
            let title = match consoles {
                [console] => console.source.to_string(),
                _ => format!("{} job consoles", consoles.len()),
            };
            write!(output, "{}", html::render_document(&title, consoles)?)?;
        }
        OutputFormat::Text => {
            for console in consoles {
                if consoles.len() > 1 {
                    writeln!(output, "{}", magenta_bold(format!("==> {} <==", console.source)))?;
                }
                write!(output, "{}", terminal::render_console(console.nodes, expand_all)?)?;
            }
        }
        OutputFormat::Summary => {
            for console in consoles {
                writeln!(output, "{}", summary::render_summary(console.source, console.nodes)?)?;
            }
        }
        OutputFormat::Json => export_json(consoles, pretty, output)?,
    }
    Ok(())
}

fn export_json(consoles: &[FoldedConsole], pretty: bool, output: &mut dyn Write) -> Result<()> {
    let reports: Vec<_> = consoles
        .iter()
        .map(|console| ConsoleReport::new(console.source, console.nodes))
        .collect();

    let json = match (reports.as_slice(), pretty) {
        ([report], true) => serde_json::to_string_pretty(report)?,
        ([report], false) => serde_json::to_string(report)?,
        (_, true) => serde_json::to_string_pretty(&reports)?,
        (_, false) => serde_json::to_string(&reports)?,
    };
    writeln!(output, "{}", json)?;
    Ok(())
}

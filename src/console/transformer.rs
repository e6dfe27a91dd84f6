use log::debug;
use serde::Serialize;

use super::line::LogLine;
use super::prefix::SectionKind;
use super::section::Section;

/// One entry of the folded console: a bare line outside any section, or a
/// section.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Line(LogLine),
    Section(Section),
}

impl Node {
    pub fn as_section(&self) -> Option<&Section> {
        match self {
            Node::Section(section) => Some(section),
            Node::Line(_) => None,
        }
    }
}

/// Single-pass driver that folds console lines into sections.
///
/// Lines can be fed incrementally as they arrive from the server; closed
/// sections are final, the open one is still growing.
#[derive(Debug, Default)]
pub struct LogOutputTransformer {
    nodes: Vec<Node>,
    current: Option<Section>,
    last_kind: Option<SectionKind>,
    lines_seen: usize,
}

impl LogOutputTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a complete set of lines.
    pub fn transform<I, S>(lines: I) -> Vec<Node>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut transformer = Self::new();
        for line in lines {
            transformer.push_line(line.as_ref());
        }
        transformer.finish()
    }

    pub fn push_chunk(&mut self, chunk: &str) {
        for line in chunk.lines() {
            self.push_line(line);
        }
    }

    pub fn push_line(&mut self, raw: &str) {
        self.lines_seen += 1;
        let line = LogLine::parse(raw);

        let Some(prefix) = line.prefix else {
            match self.current.as_mut() {
                Some(section) => section.push(line),
                None => self.nodes.push(Node::Line(line)),
            }
            return;
        };

        match self.current.take() {
            Some(mut section) if section.accepts(prefix) => {
                section.push(line);
                self.current = Some(section);
            }
            Some(section) => {
                let inherited = section.kind();
                self.close(section, prefix.signals_cancel());
                let kind = prefix.section_kind().unwrap_or(inherited);
                self.current = Some(Section::start(kind, line));
            }
            None => {
                let kind = prefix
                    .section_kind()
                    .or(self.last_kind)
                    .unwrap_or(SectionKind::Info);
                self.current = Some(Section::start(kind, line));
            }
        }

        if prefix.is_explicit_end_boundary() {
            if let Some(section) = self.current.take() {
                self.close(section, false);
            }
        }
    }

    fn close(&mut self, mut section: Section, cancel_detected: bool) {
        section.close(cancel_detected);
        self.last_kind = Some(section.kind());
        self.nodes.push(Node::Section(section));
    }

    /// Number of raw lines consumed so far.
    pub fn lines_seen(&self) -> usize {
        self.lines_seen
    }

    /// Nodes that will not change anymore.
    pub fn completed(&self) -> &[Node] {
        &self.nodes
    }

    pub fn current(&self) -> Option<&Section> {
        self.current.as_ref()
    }

    /// Everything folded so far, with the open section (if any) last.
    pub fn snapshot(&self) -> Vec<Node> {
        let mut nodes = self.nodes.clone();
        nodes.extend(self.current.clone().map(Node::Section));
        nodes
    }

    /// Closes the open section and returns the folded output.
    pub fn finish(mut self) -> Vec<Node> {
        if let Some(section) = self.current.take() {
            self.close(section, false);
        }
        debug!(
            "Folded {} lines into {} nodes",
            self.lines_seen,
            self.nodes.len()
        );
        self.nodes
    }
}

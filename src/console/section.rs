use std::time::Duration;

use log::debug;
use serde::Serialize;

use super::annotation::StatusAnnotation;
use super::line::LogLine;
use super::prefix::{Prefix, SectionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionState {
    Open,
    Closed,
}

/// A run of console lines folded under one header.
///
/// A section starts from a single header line. The second line promotes it
/// to a multiline section, which renders with a toggle. Once closed it is
/// immutable: an errored section stays expanded, a clean one collapses.
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    kind: SectionKind,
    lines: Vec<LogLine>,
    errored: bool,
    multiline: bool,
    state: SectionState,
    expanded: bool,
}

impl Section {
    pub fn start(kind: SectionKind, header: LogLine) -> Self {
        let errored = header.is_failure();
        Self {
            kind,
            lines: vec![header],
            errored,
            multiline: false,
            state: SectionState::Open,
            expanded: true,
        }
    }

    pub fn kind(&self) -> SectionKind {
        self.kind
    }

    pub fn accepts(&self, prefix: Prefix) -> bool {
        self.kind.accepts(prefix)
    }

    pub fn push(&mut self, line: LogLine) {
        if self.state == SectionState::Closed {
            debug!("Dropping line pushed to closed {} section", self.kind);
            return;
        }

        self.errored |= line.is_failure();
        self.lines.push(line);

        if self.lines.len() == 2 {
            self.promote_to_multiline();
        }
    }

    /// Switches the section to header-plus-body form.
    ///
    /// Returns `false` when the section was already multiline.
    pub fn promote_to_multiline(&mut self) -> bool {
        if self.multiline {
            return false;
        }
        self.multiline = true;
        true
    }

    /// Closes the section. `cancel_detected` reports that the line forcing
    /// the close was itself a cancellation; a cancel task cut short this
    /// way counts as errored.
    pub fn close(&mut self, cancel_detected: bool) {
        if self.state == SectionState::Closed {
            return;
        }

        if cancel_detected && self.kind == SectionKind::Cancel {
            self.errored = true;
        }

        self.state = SectionState::Closed;
        self.expanded = self.errored;
        debug!(
            "Closed {} section ({} lines, errored: {})",
            self.kind,
            self.lines.len(),
            self.errored
        );
    }

    pub fn is_open(&self) -> bool {
        self.state == SectionState::Open
    }

    pub fn is_errored(&self) -> bool {
        self.errored
    }

    pub fn is_multiline(&self) -> bool {
        self.multiline
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn header(&self) -> &LogLine {
        &self.lines[0]
    }

    pub fn body(&self) -> &[LogLine] {
        &self.lines[1..]
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Status class for a closed section, e.g. `task-status-failed`.
    pub fn status_class(&self) -> Option<String> {
        match self.state {
            SectionState::Open => None,
            SectionState::Closed => self.kind.status_class(!self.errored),
        }
    }

    /// The last status annotation found in the section.
    pub fn annotation(&self) -> Option<StatusAnnotation> {
        self.lines
            .iter()
            .rev()
            .find_map(|line| StatusAnnotation::parse(&line.text))
    }

    /// Time between the first and last timestamped lines.
    pub fn elapsed(&self) -> Option<Duration> {
        let mut times = self.lines.iter().filter_map(LogLine::time);
        let first = times.next()?;
        let last = times.last().unwrap_or(first);

        let mut span = last.signed_duration_since(first);
        if span < chrono::Duration::zero() {
            span += chrono::Duration::days(1);
        }
        span.to_std().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(lines: &[&str]) -> Section {
        let mut parsed = lines.iter().map(|l| LogLine::parse(l));
        let header = parsed.next().unwrap();
        let kind = header
            .prefix
            .and_then(Prefix::section_kind)
            .unwrap_or(SectionKind::Info);
        let mut section = Section::start(kind, header);
        for line in parsed {
            section.push(line);
        }
        section
    }

    #[test]
    fn second_line_promotes_to_multiline() {
        let mut s = section(&["!!|10:00:00.000 ls"]);
        assert!(!s.is_multiline());

        s.push(LogLine::parse("&1|10:00:00.100 file.txt"));
        assert!(s.is_multiline());
        assert_eq!(s.line_count(), 2);
        assert_eq!(s.body().len(), 1);
    }

    #[test]
    fn promotion_is_idempotent() {
        let mut s = section(&["!!|10:00:00.000 ls"]);
        assert!(s.promote_to_multiline());
        assert!(!s.promote_to_multiline());
        assert!(s.is_multiline());
    }

    #[test]
    fn failed_section_stays_expanded() {
        for failure in ["?1|10:00:01.000 failed", "^C|10:00:01.000 cancelled"] {
            let mut s = section(&["!!|10:00:00.000 make", failure]);
            s.close(false);
            assert!(s.is_errored());
            assert!(s.is_expanded());
            assert_eq!(s.status_class().as_deref(), Some("task-status-failed"));
        }
    }

    #[test]
    fn passed_section_collapses() {
        let mut s = section(&["!!|10:00:00.000 make", "?0|10:00:01.000 passed"]);
        assert!(s.is_expanded(), "open sections are shown expanded");
        s.close(false);
        assert!(!s.is_errored());
        assert!(!s.is_expanded());
        assert_eq!(s.status_class().as_deref(), Some("task-status-passed"));
    }

    #[test]
    fn job_result_classes() {
        let mut passed = section(&["j0|10:00:00.000 Job passed"]);
        passed.close(false);
        assert_eq!(passed.status_class().as_deref(), Some("job-status-passed"));

        let mut failed = section(&["j1|10:00:00.000 Job failed"]);
        failed.close(false);
        assert_eq!(failed.status_class().as_deref(), Some("job-status-failed"));
        assert!(failed.is_expanded());
    }

    #[test]
    fn cancel_section_interrupted_by_cancel_is_errored() {
        let mut s = section(&["!x|10:00:00.000 kill", "&1|10:00:00.500 killing"]);
        s.close(true);
        assert!(s.is_errored());
        assert!(s.is_expanded());
        assert_eq!(s.status_class().as_deref(), Some("cancel-status-failed"));
    }

    #[test]
    fn cancel_detection_only_affects_cancel_sections() {
        let mut s = section(&["!!|10:00:00.000 make"]);
        s.close(true);
        assert!(!s.is_errored());
    }

    #[test]
    fn closed_section_ignores_further_lines() {
        let mut s = section(&["##|10:00:00.000 hello"]);
        s.close(false);
        s.push(LogLine::parse("##|10:00:01.000 late"));
        assert_eq!(s.line_count(), 1);
        assert!(!s.is_open());
        assert_eq!(s.status_class(), None);
    }

    #[test]
    fn annotation_comes_from_status_line() {
        let s = section(&[
            "!!|10:00:00.000 make",
            "&1|10:00:00.100 building",
            "?1|10:00:01.000 Task status: failed (exit code: 2) (1000 ms)",
        ]);
        assert_eq!(s.annotation().unwrap().to_string(), "exited: 2, took: 1.000s");
    }

    #[test]
    fn elapsed_spans_first_to_last_timestamp() {
        let s = section(&[
            "!!|23:59:59.500 make",
            "&1|00:00:01.000 building",
        ]);
        assert_eq!(s.elapsed(), Some(Duration::from_millis(1_500)));

        let single = section(&["##|10:00:00.000 hello"]);
        assert_eq!(single.elapsed(), Some(Duration::ZERO));
    }
}

use serde::Serialize;

/// Two-character tag the agent writes in front of every console line.
///
/// Each tag says which part of the job produced the line: task output,
/// preparation, artifact publishing, cancellation, or the final job result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Prefix {
    Info,
    Prep,
    PrepErr,
    TaskStart,
    Out,
    Err,
    Pass,
    Fail,
    Cancelled,
    CancelTaskStart,
    CancelTaskPass,
    CancelTaskFail,
    Publish,
    PublishErr,
    JobPass,
    JobFail,
    Completed,
}

impl Prefix {
    pub const ALL: [Prefix; 17] = [
        Prefix::Info,
        Prefix::Prep,
        Prefix::PrepErr,
        Prefix::TaskStart,
        Prefix::Out,
        Prefix::Err,
        Prefix::Pass,
        Prefix::Fail,
        Prefix::Cancelled,
        Prefix::CancelTaskStart,
        Prefix::CancelTaskPass,
        Prefix::CancelTaskFail,
        Prefix::Publish,
        Prefix::PublishErr,
        Prefix::JobPass,
        Prefix::JobFail,
        Prefix::Completed,
    ];

    /// The code as it appears on the wire.
    pub fn code(self) -> &'static str {
        match self {
            Prefix::Info => "##",
            Prefix::Prep => "pr",
            Prefix::PrepErr => "pe",
            Prefix::TaskStart => "!!",
            Prefix::Out => "&1",
            Prefix::Err => "&2",
            Prefix::Pass => "?0",
            Prefix::Fail => "?1",
            Prefix::Cancelled => "^C",
            Prefix::CancelTaskStart => "!x",
            Prefix::CancelTaskPass => "x0",
            Prefix::CancelTaskFail => "x1",
            Prefix::Publish => "ar",
            Prefix::PublishErr => "ae",
            Prefix::JobPass => "j0",
            Prefix::JobFail => "j1",
            Prefix::Completed => "ed",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|prefix| prefix.code() == code)
    }

    /// CSS-friendly name used for per-line classes.
    pub fn name(self) -> &'static str {
        match self {
            Prefix::Info => "info",
            Prefix::Prep => "prep",
            Prefix::PrepErr => "prep-err",
            Prefix::TaskStart => "task-start",
            Prefix::Out => "out",
            Prefix::Err => "err",
            Prefix::Pass => "pass",
            Prefix::Fail => "fail",
            Prefix::Cancelled => "cancelled",
            Prefix::CancelTaskStart => "cancel-task-start",
            Prefix::CancelTaskPass => "cancel-task-pass",
            Prefix::CancelTaskFail => "cancel-task-fail",
            Prefix::Publish => "publish",
            Prefix::PublishErr => "publish-err",
            Prefix::JobPass => "job-pass",
            Prefix::JobFail => "job-fail",
            Prefix::Completed => "completed",
        }
    }

    /// The section kind a line with this prefix opens, if it opens one.
    ///
    /// Output, status and cancellation lines derive no kind of their own; a
    /// section started by one of them inherits the kind of its predecessor.
    pub fn section_kind(self) -> Option<SectionKind> {
        match self {
            Prefix::Info => Some(SectionKind::Info),
            Prefix::Prep | Prefix::PrepErr => Some(SectionKind::Prep),
            Prefix::TaskStart => Some(SectionKind::Task),
            Prefix::CancelTaskStart => Some(SectionKind::Cancel),
            Prefix::Publish | Prefix::PublishErr => Some(SectionKind::Publish),
            Prefix::JobPass | Prefix::JobFail => Some(SectionKind::Result),
            Prefix::Completed => Some(SectionKind::End),
            Prefix::Out
            | Prefix::Err
            | Prefix::Pass
            | Prefix::Fail
            | Prefix::Cancelled
            | Prefix::CancelTaskPass
            | Prefix::CancelTaskFail => None,
        }
    }

    /// Whether a line with this prefix terminates its section on its own.
    pub fn is_explicit_end_boundary(self) -> bool {
        matches!(
            self,
            Prefix::Pass
                | Prefix::Fail
                | Prefix::Cancelled
                | Prefix::JobPass
                | Prefix::JobFail
                | Prefix::CancelTaskPass
                | Prefix::CancelTaskFail
        )
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Prefix::Cancelled | Prefix::Fail | Prefix::JobFail | Prefix::CancelTaskFail
        )
    }

    /// A cancellation showing up while a cancel task is still running.
    pub fn signals_cancel(self) -> bool {
        matches!(self, Prefix::CancelTaskStart | Prefix::Cancelled)
    }
}

/// Semantic category of a folded section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Info,
    Task,
    Prep,
    Publish,
    Cancel,
    Result,
    End,
}

impl SectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SectionKind::Info => "info",
            SectionKind::Task => "task",
            SectionKind::Prep => "prep",
            SectionKind::Publish => "publish",
            SectionKind::Cancel => "cancel",
            SectionKind::Result => "result",
            SectionKind::End => "end",
        }
    }

    /// Whether a line with `prefix` belongs to an open section of this kind.
    pub fn accepts(self, prefix: Prefix) -> bool {
        match self {
            SectionKind::Info => matches!(prefix, Prefix::Info),
            SectionKind::Prep => matches!(prefix, Prefix::Prep | Prefix::PrepErr),
            SectionKind::Task => matches!(
                prefix,
                Prefix::Out | Prefix::Err | Prefix::Pass | Prefix::Fail | Prefix::Cancelled
            ),
            SectionKind::Cancel => matches!(
                prefix,
                Prefix::Out | Prefix::Err | Prefix::CancelTaskPass | Prefix::CancelTaskFail
            ),
            SectionKind::Publish => matches!(prefix, Prefix::Publish | Prefix::PublishErr),
            SectionKind::Result => matches!(prefix, Prefix::JobPass | Prefix::JobFail),
            SectionKind::End => matches!(prefix, Prefix::Completed),
        }
    }

    /// Stem of the status class, or `None` for kinds that carry no status.
    fn status_stem(self) -> Option<&'static str> {
        match self {
            SectionKind::Info | SectionKind::End => None,
            SectionKind::Result => Some("job"),
            SectionKind::Task => Some("task"),
            SectionKind::Prep => Some("prep"),
            SectionKind::Publish => Some("publish"),
            SectionKind::Cancel => Some("cancel"),
        }
    }

    /// Status class such as `task-status-failed` or `job-status-passed`.
    pub fn status_class(self, passed: bool) -> Option<String> {
        let outcome = if passed { "passed" } else { "failed" };
        self.status_stem()
            .map(|stem| format!("{stem}-status-{outcome}"))
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_lookup() {
        for prefix in Prefix::ALL {
            assert_eq!(Prefix::from_code(prefix.code()), Some(prefix));
        }
        assert_eq!(Prefix::from_code("zz"), None);
        assert_eq!(Prefix::from_code("#"), None);
    }

    #[test]
    fn explicit_end_boundaries_are_exactly_the_terminal_set() {
        let terminal = [
            Prefix::Pass,
            Prefix::Fail,
            Prefix::Cancelled,
            Prefix::JobPass,
            Prefix::JobFail,
            Prefix::CancelTaskPass,
            Prefix::CancelTaskFail,
        ];

        for prefix in Prefix::ALL {
            assert_eq!(
                prefix.is_explicit_end_boundary(),
                terminal.contains(&prefix),
                "unexpected boundary classification for {prefix:?}"
            );
        }
    }

    #[test]
    fn failure_prefixes() {
        let failures: Vec<_> = Prefix::ALL
            .into_iter()
            .filter(|p| p.is_failure())
            .collect();
        assert_eq!(
            failures,
            vec![
                Prefix::Fail,
                Prefix::Cancelled,
                Prefix::CancelTaskFail,
                Prefix::JobFail
            ]
        );
    }

    #[test]
    fn section_kind_lookup() {
        assert_eq!(Prefix::Info.section_kind(), Some(SectionKind::Info));
        assert_eq!(Prefix::TaskStart.section_kind(), Some(SectionKind::Task));
        assert_eq!(Prefix::PrepErr.section_kind(), Some(SectionKind::Prep));
        assert_eq!(Prefix::PublishErr.section_kind(), Some(SectionKind::Publish));
        assert_eq!(Prefix::CancelTaskStart.section_kind(), Some(SectionKind::Cancel));
        assert_eq!(Prefix::JobFail.section_kind(), Some(SectionKind::Result));
        assert_eq!(Prefix::Completed.section_kind(), Some(SectionKind::End));
        assert_eq!(Prefix::Out.section_kind(), None);
        assert_eq!(Prefix::Pass.section_kind(), None);
    }

    #[test]
    fn task_and_cancel_membership() {
        for prefix in [Prefix::Out, Prefix::Err, Prefix::Pass, Prefix::Fail, Prefix::Cancelled] {
            assert!(SectionKind::Task.accepts(prefix));
        }
        assert!(!SectionKind::Task.accepts(Prefix::TaskStart));
        assert!(!SectionKind::Task.accepts(Prefix::CancelTaskPass));

        for prefix in [
            Prefix::Out,
            Prefix::Err,
            Prefix::CancelTaskPass,
            Prefix::CancelTaskFail,
        ] {
            assert!(SectionKind::Cancel.accepts(prefix));
        }
        assert!(!SectionKind::Cancel.accepts(Prefix::Cancelled));
        assert!(!SectionKind::Cancel.accepts(Prefix::Pass));
    }

    #[test]
    fn status_classes() {
        assert_eq!(
            SectionKind::Task.status_class(false).as_deref(),
            Some("task-status-failed")
        );
        assert_eq!(
            SectionKind::Result.status_class(true).as_deref(),
            Some("job-status-passed")
        );
        assert_eq!(SectionKind::Info.status_class(true), None);
        assert_eq!(SectionKind::End.status_class(false), None);
    }
}

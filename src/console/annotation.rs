use std::fmt;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::duration::humanize;

static EXIT_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(exit code: (-?\d+)\)").unwrap());
static ELAPSED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d+) ms\)").unwrap());

/// Exit code and elapsed time embedded in a task status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusAnnotation {
    pub exit_code: Option<i64>,
    pub elapsed: Option<Duration>,
}

impl StatusAnnotation {
    /// Returns `None` when the text carries neither annotation.
    pub fn parse(text: &str) -> Option<Self> {
        let exit_code = EXIT_CODE
            .captures(text)
            .and_then(|caps| caps[1].parse().ok());
        let elapsed = ELAPSED
            .captures(text)
            .and_then(|caps| caps[1].parse().ok())
            .map(Duration::from_millis);

        (exit_code.is_some() || elapsed.is_some()).then_some(Self { exit_code, elapsed })
    }

    /// Removes both annotations from `text`.
    pub fn strip(text: &str) -> String {
        let without_exit = EXIT_CODE.replace_all(text, "");
        let without_elapsed = ELAPSED.replace_all(&without_exit, "");
        without_elapsed.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl fmt::Display for StatusAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(2);
        if let Some(code) = self.exit_code {
            parts.push(format!("exited: {code}"));
        }
        if let Some(elapsed) = self.elapsed {
            parts.push(format!("took: {}", humanize(elapsed)));
        }
        f.write_str(&parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_only() {
        let annotation = StatusAnnotation::parse("Task status: failed (exit code: 127)").unwrap();
        assert_eq!(annotation.exit_code, Some(127));
        assert_eq!(annotation.to_string(), "exited: 127");
    }

    #[test]
    fn elapsed_only() {
        let annotation = StatusAnnotation::parse("Task status: passed (8675309 ms)").unwrap();
        assert_eq!(annotation.to_string(), "took: 2h 24m 35.309s");
    }

    #[test]
    fn both_annotations_are_joined() {
        let annotation =
            StatusAnnotation::parse("Task status: failed (8675309 ms) (exit code: 127)").unwrap();
        assert_eq!(annotation.to_string(), "exited: 127, took: 2h 24m 35.309s");
    }

    #[test]
    fn no_annotation() {
        assert_eq!(StatusAnnotation::parse("Task status: passed"), None);
        assert_eq!(StatusAnnotation::parse("(exit code: abc) (12s)"), None);
    }

    #[test]
    fn strip_removes_annotations() {
        assert_eq!(
            StatusAnnotation::strip("Task status: failed (exit code: 1) (1500 ms)"),
            "Task status: failed"
        );
        assert_eq!(StatusAnnotation::strip("untouched  text"), "untouched text");
    }
}

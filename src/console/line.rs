use chrono::NaiveTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::prefix::Prefix;

static TAGGED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.{2})\|(\d{2}:\d{2}:\d{2}\.\d{3})? ?(.*)$").unwrap()
});

const TIMESTAMP_FORMAT: &str = "%H:%M:%S%.3f";

/// One console line split into its tag, timestamp and message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub prefix: Option<Prefix>,
    pub timestamp: Option<String>,
    pub text: String,
}

impl LogLine {
    /// Parses a raw line of the form `CC|HH:MM:SS.mmm message`.
    ///
    /// Lines without a tag, and lines whose two-character tag is not a known
    /// prefix, come back as plain text holding the whole raw line.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);

        let tagged = TAGGED_LINE.captures(raw).and_then(|caps| {
            let prefix = Prefix::from_code(caps.get(1)?.as_str())?;
            Some(Self {
                prefix: Some(prefix),
                timestamp: caps.get(2).map(|m| m.as_str().to_string()),
                text: caps.get(3).map_or_else(String::new, |m| m.as_str().to_string()),
            })
        });

        tagged.unwrap_or_else(|| Self::plain(raw))
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            prefix: None,
            timestamp: None,
            text: text.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.prefix.is_some_and(Prefix::is_failure)
    }

    /// The timestamp as a time of day, if present and well formed.
    pub fn time(&self) -> Option<NaiveTime> {
        self.timestamp
            .as_deref()
            .and_then(|ts| NaiveTime::parse_from_str(ts, TIMESTAMP_FORMAT).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_line() {
        let line = LogLine::parse("##|01:01:00.123 Starting build");
        assert_eq!(line.prefix, Some(Prefix::Info));
        assert_eq!(line.timestamp.as_deref(), Some("01:01:00.123"));
        assert_eq!(line.text, "Starting build");
    }

    #[test]
    fn plain_line_keeps_everything() {
        let line = LogLine::parse("Starting build");
        assert_eq!(line, LogLine::plain("Starting build"));
    }

    #[test]
    fn unknown_tag_is_plain_text() {
        let line = LogLine::parse("zz|01:01:00.123 not a tag");
        assert_eq!(line.prefix, None);
        assert_eq!(line.timestamp, None);
        assert_eq!(line.text, "zz|01:01:00.123 not a tag");
    }

    #[test]
    fn tag_without_timestamp() {
        let line = LogLine::parse("&1|plain output");
        assert_eq!(line.prefix, Some(Prefix::Out));
        assert_eq!(line.timestamp, None);
        assert_eq!(line.text, "plain output");
    }

    #[test]
    fn empty_message_and_carriage_return() {
        let line = LogLine::parse("&2|10:00:00.000\r");
        assert_eq!(line.prefix, Some(Prefix::Err));
        assert_eq!(line.timestamp.as_deref(), Some("10:00:00.000"));
        assert_eq!(line.text, "");
    }

    #[test]
    fn time_parses_milliseconds() {
        let line = LogLine::parse("!!|23:59:58.250 ls");
        let time = line.time().unwrap();
        assert_eq!(time, NaiveTime::from_hms_milli_opt(23, 59, 58, 250).unwrap());
        assert!(LogLine::plain("x").time().is_none());
    }

    #[test]
    fn failure_detection() {
        assert!(LogLine::parse("?1|10:00:00.000 failed").is_failure());
        assert!(!LogLine::parse("?0|10:00:00.000 passed").is_failure());
        assert!(!LogLine::plain("?1 lookalike").is_failure());
    }
}

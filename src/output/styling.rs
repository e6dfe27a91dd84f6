use std::fmt::Display;

use comfy_table::Color as TableColor;
use console::{style, StyledObject};

use crate::console::Section;

pub fn bright_yellow(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn bright_green(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn bright_red(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub fn cyan(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn dim(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bright(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn magenta_bold(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

/// How a section is shown: still running, failed, passed, or with no status
/// at all (info and end sections).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Running,
    Failed,
    Passed,
    Neutral,
}

impl Outcome {
    pub fn of(section: &Section) -> Self {
        if section.is_open() {
            Outcome::Running
        } else if section.is_errored() {
            Outcome::Failed
        } else if section.status_class().is_some() {
            Outcome::Passed
        } else {
            Outcome::Neutral
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Running => "running",
            Outcome::Failed => "failed",
            Outcome::Passed => "passed",
            Outcome::Neutral => "-",
        }
    }

    pub fn paint(self, text: impl Display) -> StyledObject<String> {
        match self {
            Outcome::Running => bright_yellow(text),
            Outcome::Failed => bright_red(text),
            Outcome::Passed => bright_green(text),
            Outcome::Neutral => cyan(text),
        }
    }

    pub fn table_color(self) -> Option<TableColor> {
        match self {
            Outcome::Running => Some(TableColor::Yellow),
            Outcome::Failed => Some(TableColor::Red),
            Outcome::Passed => Some(TableColor::Green),
            Outcome::Neutral => None,
        }
    }
}

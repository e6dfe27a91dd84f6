use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static CSI: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[([0-9;]*)([A-Za-z])").unwrap());

const COLOR_NAMES: [&str; 8] = [
    "black", "red", "green", "yellow", "blue", "magenta", "cyan", "white",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnsiColor {
    /// Index into the eight basic colors.
    pub index: u8,
    pub bright: bool,
}

impl AnsiColor {
    fn new(index: u16, bright: bool) -> Self {
        Self {
            index: (index % 8) as u8,
            bright,
        }
    }

    pub fn name(self) -> String {
        let base = COLOR_NAMES[usize::from(self.index)];
        if self.bright {
            format!("bright-{base}")
        } else {
            base.to_string()
        }
    }
}

/// Text attributes in effect for a span of output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnsiStyle {
    pub fg: Option<AnsiColor>,
    pub bg: Option<AnsiColor>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl AnsiStyle {
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    /// CSS classes for this style, e.g. `ansi-bold ansi-red-fg`.
    pub fn classes(&self) -> Vec<String> {
        let mut classes = Vec::new();
        if self.bold {
            classes.push("ansi-bold".to_string());
        }
        if self.italic {
            classes.push("ansi-italic".to_string());
        }
        if self.underline {
            classes.push("ansi-underline".to_string());
        }
        if let Some(fg) = self.fg {
            classes.push(format!("ansi-{}-fg", fg.name()));
        }
        if let Some(bg) = self.bg {
            classes.push(format!("ansi-{}-bg", bg.name()));
        }
        classes
    }

    fn apply_sgr(&mut self, params: &str) {
        if params.is_empty() {
            *self = Self::default();
            return;
        }

        let mut codes = params.split(';').map(|code| code.parse::<u16>().unwrap_or(0));
        while let Some(code) = codes.next() {
            match code {
                0 => *self = Self::default(),
                1 => self.bold = true,
                3 => self.italic = true,
                4 => self.underline = true,
                22 => self.bold = false,
                23 => self.italic = false,
                24 => self.underline = false,
                30..=37 => self.fg = Some(AnsiColor::new(code - 30, false)),
                39 => self.fg = None,
                40..=47 => self.bg = Some(AnsiColor::new(code - 40, false)),
                49 => self.bg = None,
                90..=97 => self.fg = Some(AnsiColor::new(code - 90, true)),
                100..=107 => self.bg = Some(AnsiColor::new(code - 100, true)),
                // 256-color and truecolor selectors; their arguments are skipped.
                38 | 48 => match codes.next() {
                    Some(5) => {
                        codes.next();
                    }
                    Some(2) => {
                        codes.nth(2);
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyledSpan {
    pub text: String,
    pub style: AnsiStyle,
}

/// Splits `text` into spans of uniformly styled output.
///
/// SGR sequences change the style; any other CSI sequence is dropped.
pub fn parse(text: &str) -> Vec<StyledSpan> {
    let mut spans: Vec<StyledSpan> = Vec::new();
    let mut style = AnsiStyle::default();
    let mut cursor = 0;

    for caps in CSI.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        push(&mut spans, &text[cursor..whole.start()], style);
        if &caps[2] == "m" {
            style.apply_sgr(&caps[1]);
        }
        cursor = whole.end();
    }
    push(&mut spans, &text[cursor..], style);

    spans
}

fn push(spans: &mut Vec<StyledSpan>, chunk: &str, style: AnsiStyle) {
    if chunk.is_empty() {
        return;
    }
    match spans.last_mut() {
        Some(last) if last.style == style => last.text.push_str(chunk),
        _ => spans.push(StyledSpan {
            text: chunk.to_string(),
            style,
        }),
    }
}

/// Removes every escape sequence, keeping only the visible text.
pub fn strip(text: &str) -> String {
    CSI.replace_all(text, "").into_owned()
}

//! ANSI colour segmentation for build output
//!
//! Compiler and UAT output carries SGR escape sequences (`ESC [ 31 m`).
//! The consumer renders text in runs, so a line is split into segments
//! that each carry the foreground colour active when the run began.

use once_cell::sync::Lazy;
use regex::Regex;
use strum_macros::EnumIter;

static SGR_SEQUENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[([0-9;]*)m").expect("valid SGR pattern"));

/// The eight base foreground colours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum AnsiColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl AnsiColor {
    /// Map an SGR parameter to a colour; anything outside 30..=37 is `None`
    pub fn from_code(code: &str) -> Option<Self> {
        let color = match code {
            "30" => AnsiColor::Black,
            "31" => AnsiColor::Red,
            "32" => AnsiColor::Green,
            "33" => AnsiColor::Yellow,
            "34" => AnsiColor::Blue,
            "35" => AnsiColor::Magenta,
            "36" => AnsiColor::Cyan,
            "37" => AnsiColor::White,
            _ => return None,
        };
        Some(color)
    }

    /// SGR parameter that selects this colour again
    pub fn sgr_code(&self) -> u8 {
        match self {
            AnsiColor::Black => 30,
            AnsiColor::Red => 31,
            AnsiColor::Green => 32,
            AnsiColor::Yellow => 33,
            AnsiColor::Blue => 34,
            AnsiColor::Magenta => 35,
            AnsiColor::Cyan => 36,
            AnsiColor::White => 37,
        }
    }
}

/// A run of text rendered in a single colour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub color: Option<AnsiColor>,
}

impl Segment {
    fn new(text: &str, color: Option<AnsiColor>) -> Self {
        Self {
            text: text.to_string(),
            color,
        }
    }
}

/// Split `text` into coloured segments.
///
/// `0` resets the colour, `30`-`37` set it, every other parameter is ignored
/// and leaves the current colour alone. Segments never have empty text, and
/// their concatenation is `text` with the escape sequences removed.
pub fn parse_ansi(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current: Option<AnsiColor> = None;
    let mut last = 0;

    for caps in SGR_SEQUENCE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::new(&text[last..whole.start()], current));
        }

        let params = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        for code in params.split(';') {
            if code == "0" {
                current = None;
            } else if let Some(color) = AnsiColor::from_code(code) {
                current = Some(color);
            }
        }
        last = whole.end();
    }

    if last < text.len() {
        segments.push(Segment::new(&text[last..], current));
    }

    segments
}

/// `text` with every SGR sequence removed
pub fn strip_ansi(text: &str) -> String {
    SGR_SEQUENCE.replace_all(text, "").into_owned()
}

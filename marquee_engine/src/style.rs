//! Styling helpers for console output.
//!
//! The [`ConsoleStyle`] trait applies ANSI styling via the `colored` crate.
//! Implementations for `&str` and `String` are provided so literals can be
//! styled directly.

use colored::{ColoredString, Colorize};

/// Convenience trait for applying color and style to runner output.
pub trait ConsoleStyle {
    fn echo_style(&self) -> ColoredString;
    fn diagnostic_style(&self) -> ColoredString;
    fn heading_style(&self) -> ColoredString;
    fn dump_style(&self) -> ColoredString;
}

impl ConsoleStyle for &str {
    fn echo_style(&self) -> ColoredString {
        self.truecolor(220, 180, 40)
    }
    fn diagnostic_style(&self) -> ColoredString {
        self.italic().truecolor(200, 50, 50)
    }
    fn heading_style(&self) -> ColoredString {
        self.bold().truecolor(223, 77, 10).underline()
    }
    fn dump_style(&self) -> ColoredString {
        self.dimmed().truecolor(102, 208, 250)
    }
}

impl ConsoleStyle for String {
    fn echo_style(&self) -> ColoredString {
        self.as_str().echo_style()
    }
    fn diagnostic_style(&self) -> ColoredString {
        self.as_str().diagnostic_style()
    }
    fn heading_style(&self) -> ColoredString {
        self.as_str().heading_style()
    }
    fn dump_style(&self) -> ColoredString {
        self.as_str().dump_style()
    }
}

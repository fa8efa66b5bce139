//! Output formatting for the `mdkw` command line

use crate::keywords::{slot_to_char, KeywordTable, Slot};
use regex::Regex;
use serde::Serialize;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// One filled slot as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordEntry {
    pub slot: Slot,
    pub code: char,
    pub name: String,
}

/// Filled slots of `table`, optionally restricted to names matching `filter`
pub fn collect_entries(table: &KeywordTable, filter: Option<&Regex>) -> Vec<KeywordEntry> {
    table
        .entries()
        .filter(|(_, name)| filter.is_none_or(|re| re.is_match(name)))
        .map(|(slot, name)| KeywordEntry {
            slot,
            code: slot_to_char(slot),
            name: name.to_string(),
        })
        .collect()
}

/// Print entries as `<code>  <slot>  <name>` lines
pub fn print_entries(entries: &[KeywordEntry], color: bool) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(color_choice(color));

    for entry in entries {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
        write!(stdout, "{}", entry.code)?;
        stdout.reset()?;

        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        write!(stdout, "  {:>2}", entry.slot)?;
        stdout.reset()?;

        writeln!(stdout, "  {}", entry.name)?;
    }

    stdout.flush()
}

/// Print entries as a JSON array
pub fn print_entries_json(entries: &[KeywordEntry]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    serde_json::to_writer_pretty(&mut lock, entries)?;
    writeln!(lock)
}

/// Print a keyword code with its name, highlighting the code
pub fn print_code(code: char, name: &str, color: bool) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(color_choice(color));
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
    write!(stdout, "{}", code)?;
    stdout.reset()?;
    writeln!(stdout, "  {}", name)
}

/// Print a warning line to stderr
pub fn print_warning(message: &str, color: bool) -> io::Result<()> {
    let mut stderr = StandardStream::stderr(color_choice(color));
    stderr.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
    write!(stderr, "warning:")?;
    stderr.reset()?;
    writeln!(stderr, " {}", message)
}

fn color_choice(color: bool) -> ColorChoice {
    if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

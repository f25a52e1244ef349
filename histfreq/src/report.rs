use crate::clock::LAST_USED_WIDTH;
use crate::domain::CommandEntry;
use owo_colors::Style;
use std::io::{self, Write};

const LAST_USED_LABEL: &str = "Last used";
const COUNT_LABEL: &str = "Count";
const COMMAND_LABEL: &str = "Command";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    Newline,
    Nul,
}

impl Terminator {
    fn as_bytes(self) -> &'static [u8] {
        match self {
            Terminator::Newline => b"\n",
            Terminator::Nul => b"\0",
        }
    }
}

/// Styles for the three colored regions. Each styled region ends in a reset.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    styles: Option<(Style, Style, Style)>,
}

impl Palette {
    pub fn plain() -> Self {
        Self { styles: None }
    }

    pub fn ansi() -> Self {
        Self {
            styles: Some((
                Style::new().cyan(),
                Style::new().bright_black(),
                Style::new().yellow(),
            )),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.styles.is_some()
    }

    fn time(&self, text: &str) -> String {
        match self.styles {
            Some((time, _, _)) => time.style(text).to_string(),
            None => text.to_string(),
        }
    }

    fn separator(&self, text: &str) -> String {
        match self.styles {
            Some((_, sep, _)) => sep.style(text).to_string(),
            None => text.to_string(),
        }
    }

    fn count(&self, text: &str) -> String {
        match self.styles {
            Some((_, _, count)) => count.style(text).to_string(),
            None => text.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub separator: String,
    pub terminator: Terminator,
    pub palette: Palette,
    pub header_before: bool,
    pub header_after: bool,
}

/// Most recent first, or oldest first when `reverse`. Ties keep their
/// incoming order.
pub fn sort_entries(entries: &mut [CommandEntry], reverse: bool) {
    if reverse {
        entries.sort_by(|a, b| a.last_used.cmp(&b.last_used));
    } else {
        entries.sort_by(|a, b| b.last_used.cmp(&a.last_used));
    }
}

pub fn count_width(entries: &[CommandEntry], with_header: bool) -> usize {
    let widest = entries
        .iter()
        .map(|e| e.count.to_string().len())
        .max()
        .unwrap_or(0);
    if with_header {
        widest.max(COUNT_LABEL.len())
    } else {
        widest
    }
}

pub fn write_report<W: Write>(
    out: &mut W,
    entries: &[CommandEntry],
    opts: &ReportOptions,
) -> io::Result<()> {
    let width = count_width(entries, opts.header_before || opts.header_after);

    if opts.header_before {
        write_header(out, width, opts)?;
    }

    let sep = opts.palette.separator(&opts.separator);
    for entry in entries {
        let count = format!("{:>width$}", entry.count);
        write!(
            out,
            "{}{sep}{}{sep}{}",
            opts.palette.time(&entry.last_used_str),
            opts.palette.count(&count),
            entry.command,
        )?;
        out.write_all(opts.terminator.as_bytes())?;
    }

    if opts.header_after {
        write_header(out, width, opts)?;
    }

    out.flush()
}

fn write_header<W: Write>(out: &mut W, width: usize, opts: &ReportOptions) -> io::Result<()> {
    let sep = opts.palette.separator(&opts.separator);
    let time = format!("{:<w$}", LAST_USED_LABEL, w = LAST_USED_WIDTH);
    let count = format!("{:>width$}", COUNT_LABEL);
    write!(
        out,
        "{}{sep}{}{sep}{}",
        opts.palette.time(&time),
        opts.palette.count(&count),
        COMMAND_LABEL,
    )?;
    out.write_all(opts.terminator.as_bytes())
}

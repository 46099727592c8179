use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate, NaiveTime};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::CLOCK_FORMAT;
use crate::day::DateRecord;
use crate::task::{DayStatus, Mode, Task, TaskState};
use crate::template::{WeeklyTemplate, day_name};

const DAY_HEADERS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self::plain(color && io::stdout().is_terminal()))
    }

    pub fn plain(color: bool) -> Self {
        Self { color }
    }

    #[tracing::instrument(skip(self, record))]
    pub fn print_day(&self, date: NaiveDate, record: &DateRecord) -> anyhow::Result<()> {
        self.write_day(io::stdout().lock(), date, record)
    }

    #[tracing::instrument(skip(self, overview))]
    pub fn print_calendar(
        &self,
        cursor: NaiveDate,
        overview: &[(NaiveDate, DayStatus)],
        today: NaiveDate,
        selected: NaiveDate,
    ) -> anyhow::Result<()> {
        self.write_calendar(io::stdout().lock(), cursor, overview, today, selected)
    }

    #[tracing::instrument(skip(self, template))]
    pub fn print_template(&self, template: &WeeklyTemplate) -> anyhow::Result<()> {
        self.write_template(io::stdout().lock(), template)
    }

    pub fn write_day<W: Write>(
        &self,
        mut out: W,
        date: NaiveDate,
        record: &DateRecord,
    ) -> anyhow::Result<()> {
        writeln!(
            out,
            "{}  [{}]  {}",
            date.format("%A, %B %-d, %Y"),
            record.mode,
            self.paint_status(record.status())
        )?;

        if record.tasks.is_empty() {
            let hint = match record.mode {
                Mode::Time => "No time-based tasks scheduled",
                Mode::Simple => "No simple tasks added",
            };
            writeln!(out, "{hint}")?;
            return Ok(());
        }

        let mut headers = vec!["#".to_string(), "ID".to_string()];
        if record.mode == Mode::Time {
            headers.push("Time".to_string());
        }
        headers.extend(["Task".to_string(), "State".to_string(), "Reason".to_string()]);

        let rows = record
            .tasks
            .iter()
            .enumerate()
            .map(|(idx, task)| self.task_row(idx + 1, task, record.mode))
            .collect();
        write_table(&mut out, headers, rows)?;

        let counts = record.counts();
        writeln!(
            out,
            "done {}  missed {}  pending {}",
            counts.completed, counts.incomplete, counts.pending
        )?;
        Ok(())
    }

    pub fn write_calendar<W: Write>(
        &self,
        mut out: W,
        cursor: NaiveDate,
        overview: &[(NaiveDate, DayStatus)],
        today: NaiveDate,
        selected: NaiveDate,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", cursor.format("%B %Y"))?;
        for header in DAY_HEADERS {
            write!(out, "{header:^5}")?;
        }
        writeln!(out)?;

        let lead = overview
            .first()
            .map(|(d, _)| d.weekday().num_days_from_sunday() as usize)
            .unwrap_or(0);
        write!(out, "{}", " ".repeat(lead * 5))?;

        for (date, status) in overview {
            let (open, close) = if *date == selected { ('[', ']') } else { (' ', ' ') };
            let mut day = format!("{:>2}", date.day());
            if *date == today {
                day = self.paint(&day, "1");
            }
            write!(out, "{open}{day}{}{close}", status_marker(*status))?;
            if date.weekday().num_days_from_sunday() == 6 {
                writeln!(out)?;
            }
        }
        if overview
            .last()
            .is_some_and(|(d, _)| d.weekday().num_days_from_sunday() != 6)
        {
            writeln!(out)?;
        }
        writeln!(out, "+ completed  ~ partial  x missed  . pending")?;
        Ok(())
    }

    pub fn write_template<W: Write>(&self, mut out: W, template: &WeeklyTemplate) -> anyhow::Result<()> {
        for (day, entries) in template.iter() {
            if entries.is_empty() {
                writeln!(out, "{:<10} -", day_name(day))?;
                continue;
            }
            writeln!(out, "{:<10} {} tasks", day_name(day), entries.len())?;
            for entry in entries {
                let slot = format_slot(entry.start_time, entry.end_time);
                if slot.is_empty() {
                    writeln!(out, "    {}", entry.title)?;
                } else {
                    writeln!(out, "    {slot} {}", entry.title)?;
                }
            }
        }
        Ok(())
    }

    fn task_row(&self, position: usize, task: &Task, mode: Mode) -> Vec<String> {
        let mut row = vec![
            self.paint(&position.to_string(), "33"),
            task.id.short().to_string(),
        ];
        if mode == Mode::Time {
            row.push(format_slot(task.start_time, task.end_time));
        }
        let mut title = task.display_title().to_string();
        if task.editing {
            title.push_str(" (editing)");
        }
        row.push(title);
        let state = match &task.state {
            TaskState::Pending => task.state.label().to_string(),
            TaskState::Completed => self.paint(task.state.label(), "32"),
            TaskState::Incomplete { .. } => self.paint(task.state.label(), "31"),
        };
        row.push(state);
        row.push(task.state.reason().unwrap_or_default().to_string());
        row
    }

    fn paint_status(&self, status: DayStatus) -> String {
        let code = match status {
            DayStatus::Pending => return status.as_str().to_string(),
            DayStatus::Partial => "33",
            DayStatus::Completed => "32",
            DayStatus::Missed => "31",
        };
        self.paint(status.as_str(), code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn status_marker(status: DayStatus) -> char {
    match status {
        DayStatus::Pending => '.',
        DayStatus::Partial => '~',
        DayStatus::Completed => '+',
        DayStatus::Missed => 'x',
    }
}

fn format_slot(start: Option<NaiveTime>, end: Option<NaiveTime>) -> String {
    let fmt = |t: Option<NaiveTime>| {
        t.map(|t| t.format(CLOCK_FORMAT).to_string())
            .unwrap_or_else(|| "--:--".to_string())
    };
    if start.is_none() && end.is_none() {
        return String::new();
    }
    format!("{}-{}", fmt(start), fmt(end))
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

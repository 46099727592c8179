use anyhow::{Context, anyhow};
use chrono::{Datelike, NaiveDate, NaiveTime};
use tracing::{debug, info, instrument};

use crate::cli::Invocation;
use crate::datetime::{format_date_key, parse_clock_time, parse_date_expr};
use crate::day::{DateRecord, TimeSlot};
use crate::kv::KeyValueStore;
use crate::render::Renderer;
use crate::task::{Mode, TaskId, TaskTemplate};
use crate::template::{day_name, parse_day};
use crate::tracker::Tracker;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "show", "calendar", "select", "prev", "next", "today", "mode", "add", "done", "undone",
        "miss", "title", "start", "end", "edit", "delete", "template", "help", "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &str, known: &[&'a str]) -> Option<&'a str> {
    if let Some(exact) = known.iter().copied().find(|name| *name == token) {
        return Some(exact);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(tracker, renderer, inv))]
pub fn dispatch<S: KeyValueStore>(
    tracker: &mut Tracker<S>,
    renderer: &Renderer,
    inv: Invocation,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    let args = inv.args.as_slice();
    debug!(command, ?args, "dispatching command");

    match command {
        "show" => cmd_show(tracker, renderer, args, today),
        "calendar" => cmd_calendar(tracker, renderer, today),
        "select" => cmd_select(tracker, renderer, args, today),
        "prev" => {
            tracker.previous_month(today)?;
            cmd_calendar(tracker, renderer, today)
        }
        "next" => {
            tracker.next_month(today)?;
            cmd_calendar(tracker, renderer, today)
        }
        "today" => {
            let record = tracker.go_to_today(today)?;
            renderer.print_day(today, &record)
        }
        "mode" => cmd_mode(tracker, args, today),
        "add" => cmd_add(tracker, args, today),
        "done" => cmd_complete(tracker, args, today, true),
        "undone" => cmd_complete(tracker, args, today, false),
        "miss" => cmd_miss(tracker, args, today),
        "title" => cmd_title(tracker, args, today),
        "start" => cmd_time(tracker, args, today, TimeSlot::Start),
        "end" => cmd_time(tracker, args, today, TimeSlot::End),
        "edit" => cmd_edit(tracker, args, today),
        "delete" => cmd_delete(tracker, args, today),
        "template" => cmd_template(tracker, renderer, args, today),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

/// Resolves a 1-based display position or an id prefix to a task id.
pub fn resolve_task_ref(record: &DateRecord, reference: &str) -> anyhow::Result<TaskId> {
    let reference = reference.trim();
    if let Ok(position) = reference.parse::<usize>()
        && (1..=record.tasks.len()).contains(&position)
    {
        return Ok(record.tasks[position - 1].id.clone());
    }

    let mut matches = record
        .tasks
        .iter()
        .filter(|t| !reference.is_empty() && t.id.as_str().starts_with(reference));
    match (matches.next(), matches.next()) {
        (Some(task), None) => Ok(task.id.clone()),
        (Some(_), Some(_)) => Err(anyhow!("task reference {reference} is ambiguous")),
        (None, _) => Err(anyhow!("no task matches {reference}")),
    }
}

fn selected_date<S: KeyValueStore>(tracker: &Tracker<S>, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    Ok(tracker.app_state(today)?.selected_date)
}

/// Selected date plus the id its first argument refers to.
fn target<S: KeyValueStore>(
    tracker: &Tracker<S>,
    args: &[String],
    today: NaiveDate,
    usage: &str,
) -> anyhow::Result<(NaiveDate, TaskId)> {
    let reference = args.first().ok_or_else(|| anyhow!("usage: {usage}"))?;
    let date = selected_date(tracker, today)?;
    let record = tracker.date_data(date)?;
    let id = resolve_task_ref(&record, reference)
        .with_context(|| format!("on {}", format_date_key(date)))?;
    Ok((date, id))
}

fn report(changed: bool, verb: &str, id: &TaskId) {
    if changed {
        println!("{verb} task {}.", id.short());
    } else {
        println!("No task matched {}.", id.short());
    }
}

#[instrument(skip(tracker, renderer))]
fn cmd_show<S: KeyValueStore>(
    tracker: &mut Tracker<S>,
    renderer: &Renderer,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    let date = match args.first() {
        Some(expr) => parse_date_expr(expr, today)?,
        None => selected_date(tracker, today)?,
    };
    let record = tracker.date_data(date)?;
    renderer.print_day(date, &record)
}

#[instrument(skip(tracker, renderer))]
fn cmd_calendar<S: KeyValueStore>(
    tracker: &mut Tracker<S>,
    renderer: &Renderer,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let state = tracker.app_state(today)?;
    let cursor = state.current_date;
    let overview = tracker.month_overview(cursor.year(), cursor.month())?;
    renderer.print_calendar(cursor, &overview, today, state.selected_date)
}

#[instrument(skip(tracker, renderer))]
fn cmd_select<S: KeyValueStore>(
    tracker: &mut Tracker<S>,
    renderer: &Renderer,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    let expr = args.first().ok_or_else(|| anyhow!("usage: select DATE"))?;
    let date = parse_date_expr(expr, today)?;
    let record = tracker.select_date(date, today)?;
    info!(date = %date, "selected date");
    renderer.print_day(date, &record)
}

#[instrument(skip(tracker))]
fn cmd_mode<S: KeyValueStore>(
    tracker: &mut Tracker<S>,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    let raw = args.first().ok_or_else(|| anyhow!("usage: mode time|simple"))?;
    let mode: Mode = raw.parse()?;
    let state = tracker.switch_mode(mode, today)?;
    println!(
        "Mode set to {mode} for {}.",
        format_date_key(state.selected_date)
    );
    Ok(())
}

#[instrument(skip(tracker))]
fn cmd_add<S: KeyValueStore>(
    tracker: &mut Tracker<S>,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    let date = selected_date(tracker, today)?;
    let id = tracker.add_task(date)?;
    let title = args.join(" ");
    if !title.trim().is_empty() {
        tracker.set_title(date, &id, &title)?;
    }
    println!("Added task {} on {}.", id.short(), format_date_key(date));
    Ok(())
}

#[instrument(skip(tracker))]
fn cmd_complete<S: KeyValueStore>(
    tracker: &mut Tracker<S>,
    args: &[String],
    today: NaiveDate,
    completed: bool,
) -> anyhow::Result<()> {
    let usage = if completed { "done REF" } else { "undone REF" };
    let (date, id) = target(tracker, args, today, usage)?;
    let changed = tracker.mark_complete(date, &id, completed)?;
    report(changed, if completed { "Completed" } else { "Unchecked" }, &id);
    Ok(())
}

#[instrument(skip(tracker))]
fn cmd_miss<S: KeyValueStore>(
    tracker: &mut Tracker<S>,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    let (date, id) = target(tracker, args, today, "miss REF REASON...")?;
    let reason = args[1..].join(" ");
    let changed = tracker.mark_incomplete(date, &id, &reason)?;
    report(changed, "Marked missed", &id);
    Ok(())
}

#[instrument(skip(tracker))]
fn cmd_title<S: KeyValueStore>(
    tracker: &mut Tracker<S>,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    let (date, id) = target(tracker, args, today, "title REF TEXT...")?;
    let changed = tracker.set_title(date, &id, &args[1..].join(" "))?;
    report(changed, "Renamed", &id);
    Ok(())
}

#[instrument(skip(tracker))]
fn cmd_time<S: KeyValueStore>(
    tracker: &mut Tracker<S>,
    args: &[String],
    today: NaiveDate,
    slot: TimeSlot,
) -> anyhow::Result<()> {
    let usage = match slot {
        TimeSlot::Start => "start REF HH:MM",
        TimeSlot::End => "end REF HH:MM",
    };
    let (date, id) = target(tracker, args, today, usage)?;
    let value = args.get(1).ok_or_else(|| anyhow!("usage: {usage}"))?;
    let changed = tracker.set_time(date, &id, slot, value)?;
    report(changed, "Rescheduled", &id);
    Ok(())
}

#[instrument(skip(tracker))]
fn cmd_edit<S: KeyValueStore>(
    tracker: &mut Tracker<S>,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    let (date, id) = target(tracker, args, today, "edit REF")?;
    let changed = tracker.toggle_editing(date, &id)?;
    report(changed, "Toggled editing on", &id);
    Ok(())
}

#[instrument(skip(tracker))]
fn cmd_delete<S: KeyValueStore>(
    tracker: &mut Tracker<S>,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    let (date, id) = target(tracker, args, today, "delete REF")?;
    let changed = tracker.delete_task(date, &id)?;
    report(changed, "Deleted", &id);
    Ok(())
}

#[instrument(skip(tracker, renderer))]
fn cmd_template<S: KeyValueStore>(
    tracker: &mut Tracker<S>,
    renderer: &Renderer,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    let sub = args.first().map(String::as_str).unwrap_or("show");
    match sub {
        "show" => renderer.print_template(&tracker.weekly_template()?),
        "set" => {
            let day = parse_day(
                args.get(1)
                    .ok_or_else(|| anyhow!("usage: template set DAY [HH:MM-HH:MM] TITLE..."))?,
            )?;
            let entry = parse_template_entry(&args[2..])?;
            let mut template = tracker.weekly_template()?;
            template.push(day, entry);
            tracker.save_weekly_template(&template)?;
            println!(
                "{} now has {} template task(s).",
                day_name(day),
                template.day(day).len()
            );
            Ok(())
        }
        "reset" => {
            let day = parse_day(args.get(1).ok_or_else(|| anyhow!("usage: template reset DAY"))?)?;
            let mut template = tracker.weekly_template()?;
            template.set_day(day, vec![]);
            tracker.save_weekly_template(&template)?;
            println!("Cleared template for {}.", day_name(day));
            Ok(())
        }
        "clear" => {
            tracker.clear_weekly_template()?;
            println!("Weekly template cleared.");
            Ok(())
        }
        "apply" => {
            let anchor = match args.get(1) {
                Some(expr) => parse_date_expr(expr, today)?,
                None => selected_date(tracker, today)?,
            };
            let filled = tracker.project_template(anchor, today)?;
            if filled.is_empty() {
                println!("Template applied; no empty future dates to fill.");
            } else {
                let dates: Vec<String> = filled.into_iter().map(format_date_key).collect();
                println!("Template applied to {}.", dates.join(", "));
            }
            Ok(())
        }
        other => Err(anyhow!("unknown template subcommand: {other}")),
    }
}

/// `[HH:MM[-HH:MM]] TITLE...`
pub fn parse_template_entry(args: &[String]) -> anyhow::Result<TaskTemplate> {
    let (times, title_words) = match args.first() {
        Some(first) if first.contains(':') => (Some(parse_time_range(first)?), &args[1..]),
        _ => (None, args),
    };
    let title = title_words.join(" ").trim().to_string();
    if title.is_empty() {
        return Err(anyhow!("template task needs a title"));
    }
    Ok(match times {
        Some((start, end)) => TaskTemplate::timed(title, start, end),
        None => TaskTemplate::simple(title),
    })
}

fn parse_time_range(token: &str) -> anyhow::Result<(NaiveTime, Option<NaiveTime>)> {
    let (start, end) = match token.split_once('-') {
        Some((start, end)) => (start, Some(end)),
        None => (token, None),
    };
    let start = parse_clock_time(start)?;
    let end = end.map(parse_clock_time).transpose()?;
    Ok((start, end))
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "daybook commands:\n  \
         show [DATE]                 tasks for the selected or given date\n  \
         calendar                    month view with day status\n  \
         select DATE                 choose the working date\n  \
         prev | next | today         move the month cursor\n  \
         mode time|simple            switch mode for the selected date\n  \
         add [TITLE...]              add a task\n  \
         done REF | undone REF       mark complete / uncheck\n  \
         miss REF REASON...          mark incomplete with a reason\n  \
         title REF TEXT...           rename a task\n  \
         start REF HH:MM | end REF HH:MM\n  \
         edit REF                    toggle the editing flag\n  \
         delete REF                  remove a task\n  \
         template [show]             print the weekly template\n  \
         template set DAY [HH:MM-HH:MM] TITLE...\n  \
         template reset DAY | template clear\n  \
         template apply [DATE]       fill empty future days of that week\n\
         REF is a task number from `show` or an id prefix."
    );
    Ok(())
}

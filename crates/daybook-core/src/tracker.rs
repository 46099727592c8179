use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::app_state::{AppState, AppStatePatch};
use crate::datetime::{days_in_month, format_date_key};
use crate::day::{DateRecord, TimeSlot};
use crate::error::{TrackerResult, ValidationError};
use crate::kv::{KeyValueStore, load_json, save_json};
use crate::task::{DayStatus, Mode, TaskId};
use crate::template::{WeeklyTemplate, entries_for, projection_targets};

pub const CALENDAR_DATA_KEY: &str = "dailyTracker_calendarData";
pub const WEEKLY_TEMPLATE_KEY: &str = "dailyTracker_weeklyTemplate";
pub const APP_STATE_KEY: &str = "dailyTracker_appState";

pub type CalendarData = BTreeMap<String, DateRecord>;

/// Date records, weekly template and app state over one key-value store.
///
/// Every write is a read-modify-write of the whole collection under its
/// key, so callers never observe a partially applied mutation.
#[derive(Debug)]
pub struct Tracker<S: KeyValueStore> {
    store: S,
    default_mode: Mode,
}

impl<S: KeyValueStore> Tracker<S> {
    pub fn new(store: S) -> Self {
        Self::with_default_mode(store, Mode::Time)
    }

    /// `default_mode` seeds the app state and the mode of fresh dates until
    /// a mode has been saved.
    pub fn with_default_mode(store: S, default_mode: Mode) -> Self {
        Self {
            store,
            default_mode,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    #[instrument(skip(self))]
    pub fn calendar_data(&self) -> TrackerResult<CalendarData> {
        let mut calendar: CalendarData =
            load_json(&self.store, CALENDAR_DATA_KEY)?.unwrap_or_default();
        // Older clients did not recompute status on every change.
        for (key, record) in calendar.iter_mut() {
            if record.refresh_status() {
                debug!(
                    date = %key,
                    status = record.status().as_str(),
                    "re-derived stale status"
                );
            }
        }
        Ok(calendar)
    }

    /// The record stored for `date`, or an empty one in the current mode.
    #[instrument(skip(self))]
    pub fn date_data(&self, date: NaiveDate) -> TrackerResult<DateRecord> {
        let key = format_date_key(date);
        match self.calendar_data()?.remove(&key) {
            Some(record) => Ok(record),
            None => Ok(DateRecord::new(self.current_mode()?)),
        }
    }

    #[instrument(skip(self, record), fields(tasks = record.tasks.len()))]
    pub fn save_date_data(&mut self, date: NaiveDate, record: &DateRecord) -> TrackerResult<()> {
        let mut calendar = self.calendar_data()?;
        calendar.insert(format_date_key(date), record.clone());
        save_json(&mut self.store, CALENDAR_DATA_KEY, &calendar)?;
        debug!(dates = calendar.len(), "saved calendar data");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn weekly_template(&self) -> TrackerResult<WeeklyTemplate> {
        Ok(load_json(&self.store, WEEKLY_TEMPLATE_KEY)?.unwrap_or_default())
    }

    #[instrument(skip(self, template))]
    pub fn save_weekly_template(&mut self, template: &WeeklyTemplate) -> TrackerResult<()> {
        save_json(&mut self.store, WEEKLY_TEMPLATE_KEY, template)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn clear_weekly_template(&mut self) -> TrackerResult<()> {
        info!("clearing weekly template");
        self.save_weekly_template(&WeeklyTemplate::default())
    }

    #[instrument(skip(self))]
    pub fn app_state(&self, today: NaiveDate) -> TrackerResult<AppState> {
        let mut state = AppState::starting_at(today, self.default_mode);
        if let Some(stored) = load_json::<_, AppStatePatch>(&self.store, APP_STATE_KEY)? {
            state.merge(stored);
        }
        Ok(state)
    }

    /// Mode given to dates that have no record yet.
    fn current_mode(&self) -> TrackerResult<Mode> {
        let stored: Option<AppStatePatch> = load_json(&self.store, APP_STATE_KEY)?;
        Ok(stored
            .and_then(|patch| patch.current_mode)
            .unwrap_or(self.default_mode))
    }

    /// Merges `patch` into the stored app state and returns the result.
    #[instrument(skip(self))]
    pub fn save_app_state(
        &mut self,
        patch: AppStatePatch,
        today: NaiveDate,
    ) -> TrackerResult<AppState> {
        let mut state = self.app_state(today)?;
        state.merge(patch);
        save_json(&mut self.store, APP_STATE_KEY, &state)?;
        Ok(state)
    }

    #[instrument(skip(self))]
    pub fn add_task(&mut self, date: NaiveDate) -> TrackerResult<TaskId> {
        let mut record = self.date_data(date)?;
        let id = record.add_task(record.mode);
        self.save_date_data(date, &record)?;
        info!(id = %id, mode = %record.mode, "task added");
        Ok(id)
    }

    #[instrument(skip(self))]
    pub fn mark_complete(
        &mut self,
        date: NaiveDate,
        id: &TaskId,
        completed: bool,
    ) -> TrackerResult<bool> {
        self.mutate_date(date, |record| Ok(record.mark_complete(id, completed)))
    }

    #[instrument(skip(self))]
    pub fn mark_incomplete(
        &mut self,
        date: NaiveDate,
        id: &TaskId,
        reason: &str,
    ) -> TrackerResult<bool> {
        self.mutate_date(date, |record| record.mark_incomplete(id, reason))
    }

    #[instrument(skip(self))]
    pub fn set_title(&mut self, date: NaiveDate, id: &TaskId, title: &str) -> TrackerResult<bool> {
        self.mutate_date(date, |record| Ok(record.set_title(id, title)))
    }

    #[instrument(skip(self))]
    pub fn set_time(
        &mut self,
        date: NaiveDate,
        id: &TaskId,
        slot: TimeSlot,
        value: &str,
    ) -> TrackerResult<bool> {
        self.mutate_date(date, |record| record.set_time(id, slot, value))
    }

    #[instrument(skip(self))]
    pub fn toggle_editing(&mut self, date: NaiveDate, id: &TaskId) -> TrackerResult<bool> {
        self.mutate_date(date, |record| Ok(record.toggle_editing(id)))
    }

    #[instrument(skip(self))]
    pub fn delete_task(&mut self, date: NaiveDate, id: &TaskId) -> TrackerResult<bool> {
        self.mutate_date(date, |record| Ok(record.delete_task(id)))
    }

    /// Copies template entries into the still-empty dates of the week
    /// containing `anchor` that lie after `today`. Returns the dates
    /// that were filled.
    #[instrument(skip(self))]
    pub fn project_template(
        &mut self,
        anchor: NaiveDate,
        today: NaiveDate,
    ) -> TrackerResult<Vec<NaiveDate>> {
        let template = self.weekly_template()?;
        let mut calendar = self.calendar_data()?;
        let mut filled = Vec::new();

        for date in projection_targets(anchor, today) {
            let entries = entries_for(&template, date);
            if entries.is_empty() {
                continue;
            }
            let record = calendar.entry(format_date_key(date)).or_default();
            if record.apply_template(entries) {
                debug!(date = %date, tasks = entries.len(), "projected template");
                filled.push(date);
            } else {
                debug!(date = %date, "date already has tasks; skipping");
            }
        }

        if !filled.is_empty() {
            save_json(&mut self.store, CALENDAR_DATA_KEY, &calendar)?;
        }
        info!(filled = filled.len(), "template projection finished");
        Ok(filled)
    }

    /// Selects `date` and aligns the current mode with its record.
    #[instrument(skip(self))]
    pub fn select_date(&mut self, date: NaiveDate, today: NaiveDate) -> TrackerResult<DateRecord> {
        let record = self.date_data(date)?;
        self.save_app_state(
            AppStatePatch::selection(date).with_mode(record.mode),
            today,
        )?;
        Ok(record)
    }

    /// Sets the current mode and stamps it onto the selected date.
    #[instrument(skip(self))]
    pub fn switch_mode(&mut self, mode: Mode, today: NaiveDate) -> TrackerResult<AppState> {
        let state = self.save_app_state(AppStatePatch::mode(mode), today)?;
        let mut record = self.date_data(state.selected_date)?;
        if record.mode != mode {
            if !record.tasks.is_empty() {
                warn!(
                    date = %state.selected_date,
                    from = %record.mode,
                    to = %mode,
                    "switching mode on a date that already has tasks"
                );
            }
            record.mode = mode;
            self.save_date_data(state.selected_date, &record)?;
        }
        Ok(state)
    }

    pub fn previous_month(&mut self, today: NaiveDate) -> TrackerResult<AppState> {
        self.move_cursor(-1, today)
    }

    pub fn next_month(&mut self, today: NaiveDate) -> TrackerResult<AppState> {
        self.move_cursor(1, today)
    }

    #[instrument(skip(self))]
    pub fn go_to_today(&mut self, today: NaiveDate) -> TrackerResult<DateRecord> {
        self.save_app_state(AppStatePatch::cursor(today), today)?;
        self.select_date(today, today)
    }

    /// Status of every day in a month, for calendar views.
    #[instrument(skip(self))]
    pub fn month_overview(&self, year: i32, month: u32) -> TrackerResult<Vec<(NaiveDate, DayStatus)>> {
        let calendar = self.calendar_data()?;
        Ok(days_in_month(year, month)
            .into_iter()
            .map(|date| {
                let status = calendar
                    .get(&format_date_key(date))
                    .map(DateRecord::status)
                    .unwrap_or_default();
                (date, status)
            })
            .collect())
    }

    fn move_cursor(&mut self, delta: i32, today: NaiveDate) -> TrackerResult<AppState> {
        let state = self.app_state(today)?;
        let cursor = state.month_shifted(delta);
        debug!(from = %state.current_date, to = %cursor, "moving month cursor");
        self.save_app_state(AppStatePatch::cursor(cursor), today)
    }

    /// Loads `date`, applies `op`, and writes back only when `op`
    /// reports a change.
    fn mutate_date<F>(&mut self, date: NaiveDate, op: F) -> TrackerResult<bool>
    where
        F: FnOnce(&mut DateRecord) -> Result<bool, ValidationError>,
    {
        let mut record = self.date_data(date)?;
        let changed = op(&mut record)?;
        if changed {
            self.save_date_data(date, &record)?;
        } else {
            debug!(date = %date, "no task matched; nothing written");
        }
        Ok(changed)
    }
}

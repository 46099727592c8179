use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::datetime::shift_months;
use crate::task::Mode;

/// Navigation state: month cursor, selected day and last-used mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub current_date: NaiveDate,
    pub selected_date: NaiveDate,
    #[serde(default)]
    pub current_mode: Mode,
}

impl AppState {
    pub fn starting_at(today: NaiveDate, mode: Mode) -> Self {
        Self {
            current_date: today,
            selected_date: today,
            current_mode: mode,
        }
    }

    pub fn merge(&mut self, patch: AppStatePatch) {
        if let Some(date) = patch.current_date {
            self.current_date = date;
        }
        if let Some(date) = patch.selected_date {
            self.selected_date = date;
        }
        if let Some(mode) = patch.current_mode {
            self.current_mode = mode;
        }
    }

    pub fn month_shifted(&self, delta: i32) -> NaiveDate {
        shift_months(self.current_date, delta)
    }
}

/// Partial update; `None` fields keep their stored value.
///
/// Also the stored shape on read: older clients saved only the fields
/// they touched, e.g. `{"currentMode":"simple"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppStatePatch {
    pub current_date: Option<NaiveDate>,
    pub selected_date: Option<NaiveDate>,
    pub current_mode: Option<Mode>,
}

impl AppStatePatch {
    pub fn cursor(date: NaiveDate) -> Self {
        Self {
            current_date: Some(date),
            ..Self::default()
        }
    }

    pub fn selection(date: NaiveDate) -> Self {
        Self {
            selected_date: Some(date),
            ..Self::default()
        }
    }

    pub fn mode(mode: Mode) -> Self {
        Self {
            current_mode: Some(mode),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.current_mode = Some(mode);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_only_touches_given_fields() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).expect("date");
        let other = NaiveDate::from_ymd_opt(2026, 12, 1).expect("date");
        let mut state = AppState::starting_at(day, Mode::Time);

        state.merge(AppStatePatch::mode(Mode::Simple));
        assert_eq!(state.current_date, day);
        assert_eq!(state.current_mode, Mode::Simple);

        state.merge(AppStatePatch::selection(other));
        assert_eq!(state.selected_date, other);
        assert_eq!(state.current_date, day);
    }

    #[test]
    fn stored_shape_is_camel_case() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 9).expect("date");
        let value = serde_json::to_value(AppState::starting_at(day, Mode::Time)).expect("json");
        assert_eq!(value["currentDate"], "2026-03-09");
        assert_eq!(value["selectedDate"], "2026-03-09");
        assert_eq!(value["currentMode"], "time");
    }

    #[test]
    fn partial_stored_state_parses_as_patch() {
        let patch: AppStatePatch =
            serde_json::from_str(r#"{"currentMode":"simple"}"#).expect("parse");
        assert_eq!(patch, AppStatePatch::mode(Mode::Simple));

        let day = NaiveDate::from_ymd_opt(2026, 10, 19).expect("date");
        let mut state = AppState::starting_at(day, Mode::Time);
        state.merge(patch);
        assert_eq!(state.selected_date, day);
        assert_eq!(state.current_mode, Mode::Simple);
    }
}

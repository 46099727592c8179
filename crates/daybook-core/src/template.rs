use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::datetime::{parse_weekday_name, week_start};
use crate::error::ValidationError;
use crate::task::TaskTemplate;

/// Week order used for display and projection, Sunday first.
pub const WEEK_DAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "sunday",
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
    }
}

pub fn parse_day(token: &str) -> Result<Weekday, ValidationError> {
    parse_weekday_name(token).ok_or_else(|| ValidationError::UnknownDay(token.to_string()))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyTemplate {
    #[serde(default)]
    pub sunday: Vec<TaskTemplate>,
    #[serde(default)]
    pub monday: Vec<TaskTemplate>,
    #[serde(default)]
    pub tuesday: Vec<TaskTemplate>,
    #[serde(default)]
    pub wednesday: Vec<TaskTemplate>,
    #[serde(default)]
    pub thursday: Vec<TaskTemplate>,
    #[serde(default)]
    pub friday: Vec<TaskTemplate>,
    #[serde(default)]
    pub saturday: Vec<TaskTemplate>,
}

impl WeeklyTemplate {
    pub fn day(&self, day: Weekday) -> &[TaskTemplate] {
        match day {
            Weekday::Sun => &self.sunday,
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
        }
    }

    pub fn day_mut(&mut self, day: Weekday) -> &mut Vec<TaskTemplate> {
        match day {
            Weekday::Sun => &mut self.sunday,
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
        }
    }

    pub fn set_day(&mut self, day: Weekday, tasks: Vec<TaskTemplate>) {
        *self.day_mut(day) = tasks;
    }

    pub fn push(&mut self, day: Weekday, task: TaskTemplate) {
        self.day_mut(day).push(task);
    }

    pub fn is_empty(&self) -> bool {
        WEEK_DAYS.into_iter().all(|d| self.day(d).is_empty())
    }

    /// Days in Sunday-first order with their entries.
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &[TaskTemplate])> {
        WEEK_DAYS.into_iter().map(move |d| (d, self.day(d)))
    }
}

/// Dates of the week containing `anchor` that a projection may fill:
/// only those strictly after `today`.
pub fn projection_targets(anchor: NaiveDate, today: NaiveDate) -> Vec<NaiveDate> {
    let start = week_start(anchor);
    (0..7)
        .map(|offset| start + Duration::days(offset))
        .filter(|date| *date > today)
        .collect()
}

/// Entries the template holds for `date`'s weekday.
pub fn entries_for(template: &WeeklyTemplate, date: NaiveDate) -> &[TaskTemplate] {
    template.day(date.weekday())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn default_has_seven_empty_days() {
        let template = WeeklyTemplate::default();
        assert!(template.is_empty());
        let value = serde_json::to_value(&template).expect("serialize");
        let obj = value.as_object().expect("object");
        assert_eq!(obj.len(), 7);
        for day in WEEK_DAYS {
            assert_eq!(obj[day_name(day)], serde_json::json!([]));
        }
    }

    #[test]
    fn push_targets_one_day() {
        let mut template = WeeklyTemplate::default();
        template.push(Weekday::Mon, TaskTemplate::simple("Gym"));
        assert_eq!(template.day(Weekday::Mon).len(), 1);
        assert!(template.day(Weekday::Tue).is_empty());
        assert_eq!(template.iter().next().map(|(d, _)| d), Some(Weekday::Sun));
    }

    #[test]
    fn targets_skip_today_and_past() {
        // Wednesday 2026-10-21; week runs 18th..24th.
        let targets = projection_targets(date(2026, 10, 21), date(2026, 10, 21));
        assert_eq!(targets, vec![date(2026, 10, 22), date(2026, 10, 23), date(2026, 10, 24)]);

        let future = projection_targets(date(2026, 11, 4), date(2026, 10, 21));
        assert_eq!(future.len(), 7);
        assert_eq!(future[0], date(2026, 11, 1));
    }

    #[test]
    fn parses_day_names() {
        assert_eq!(parse_day("Thursday"), Ok(Weekday::Thu));
        assert_eq!(
            parse_day("someday"),
            Err(ValidationError::UnknownDay("someday".to_string()))
        );
    }
}

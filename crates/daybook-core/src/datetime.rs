use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Duration,
  Local,
  Months,
  NaiveDate,
  NaiveTime,
  Weekday
};
use regex::Regex;

use crate::error::ValidationError;

pub const DATE_KEY_FORMAT: &str =
  "%Y-%m-%d";
pub const CLOCK_FORMAT: &str = "%H:%M";

/// Local calendar day, truncated.
#[must_use]
pub fn today() -> NaiveDate {
  Local::now().date_naive()
}

#[must_use]
pub fn format_date_key(
  date: NaiveDate
) -> String {
  date
    .format(DATE_KEY_FORMAT)
    .to_string()
}

pub fn parse_date_key(
  key: &str
) -> Result<NaiveDate, ValidationError> {
  let trimmed = key.trim();
  // chrono accepts unpadded fields; keys must be zero-padded.
  if trimmed.len() != 10 {
    return Err(
      ValidationError::InvalidDateKey(
        key.to_string()
      )
    );
  }
  NaiveDate::parse_from_str(
    trimmed,
    DATE_KEY_FORMAT
  )
  .map_err(|_| {
    ValidationError::InvalidDateKey(
      key.to_string()
    )
  })
}

/// First day (Sunday) of the week containing `anchor`.
#[must_use]
pub fn week_start(
  anchor: NaiveDate
) -> NaiveDate {
  let offset = anchor
    .weekday()
    .num_days_from_sunday()
    as i64;
  anchor - Duration::days(offset)
}

/// Moves `date` by whole calendar months, clamping the day to the
/// target month's length.
#[must_use]
pub fn shift_months(
  date: NaiveDate,
  delta: i32
) -> NaiveDate {
  let months =
    Months::new(delta.unsigned_abs());
  let shifted = if delta >= 0 {
    date.checked_add_months(months)
  } else {
    date.checked_sub_months(months)
  };
  shifted.unwrap_or(date)
}

#[must_use]
pub fn days_in_month(
  year: i32,
  month: u32
) -> Vec<NaiveDate> {
  let Some(first) =
    NaiveDate::from_ymd_opt(
      year, month, 1
    )
  else {
    return vec![];
  };
  first
    .iter_days()
    .take_while(|d| d.month() == month)
    .collect()
}

#[tracing::instrument]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token =
    input.trim().to_ascii_lowercase();

  match token.as_str() {
    | "today" | "now" => {
      return Ok(today);
    }
    | "tomorrow" => {
      return Ok(
        today + Duration::days(1)
      );
    }
    | "yesterday" => {
      return Ok(
        today - Duration::days(1)
      );
    }
    | _ => {}
  }

  if let Some(weekday) =
    parse_weekday_name(&token)
  {
    return Ok(next_weekday_date(
      today, weekday
    ));
  }

  let rel_re =
    Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)d$")
      .context(
        "invalid relative date regex"
      )?;
  if let Some(caps) =
    rel_re.captures(&token)
  {
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .unwrap_or("+");
    return Ok(if sign == "-" {
      today - Duration::days(num)
    } else {
      today + Duration::days(num)
    });
  }

  if let Ok(date) =
    parse_date_key(&token)
  {
    return Ok(date);
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, \
     weekday names (e.g. monday), \
     +Nd/-Nd, YYYY-MM-DD"
  })
}

pub fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_sunday()
    as i64;
  let target_idx = target
    .num_days_from_sunday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from
    .checked_add_signed(Duration::days(
      delta
    ))
    .unwrap_or(from)
}

/// Parses `HH:MM` (24h) or `H:MMam`/`H:MMpm`.
pub fn parse_clock_time(
  token: &str
) -> Result<NaiveTime, ValidationError> {
  let invalid = || {
    ValidationError::InvalidTime(
      token.to_string()
    )
  };
  let clock_re = Regex::new(
    r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<ampm>[ap]m)?$",
  )
  .map_err(|_| invalid())?;
  let captures = clock_re
    .captures(token.trim())
    .ok_or_else(invalid)?;

  let raw_hour = captures
    .name("hour")
    .and_then(|m| {
      m.as_str().parse::<u32>().ok()
    })
    .ok_or_else(invalid)?;
  let minute = captures
    .name("minute")
    .and_then(|m| {
      m.as_str().parse::<u32>().ok()
    })
    .ok_or_else(invalid)?;

  let hour = if let Some(ampm_match) =
    captures.name("ampm")
  {
    if raw_hour == 0 || raw_hour > 12 {
      return Err(invalid());
    }
    match ampm_match
      .as_str()
      .to_ascii_lowercase()
      .as_str()
    {
      | "am" => raw_hour % 12,
      | _ => raw_hour % 12 + 12
    }
  } else {
    raw_hour
  };

  NaiveTime::from_hms_opt(
    hour, minute, 0
  )
  .ok_or_else(invalid)
}

/// Serde adapter storing an optional wall-clock time as `HH:MM`.
/// Empty strings load as unset.
pub mod clock_serde {
  use chrono::NaiveTime;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  use super::CLOCK_FORMAT;

  pub fn serialize<S>(
    value: &Option<NaiveTime>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    match value {
      | Some(t) => serializer
        .serialize_str(
          &t.format(CLOCK_FORMAT)
            .to_string()
        ),
      | None => {
        serializer.serialize_none()
      }
    }
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<Option<NaiveTime>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = Option::<String>::deserialize(
      deserializer
    )?;
    match raw.as_deref().map(str::trim)
    {
      | None | Some("") => Ok(None),
      | Some(text) => {
        super::parse_clock_time(text)
          .map(Some)
          .map_err(
            serde::de::Error::custom
          )
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::{
    days_in_month,
    parse_clock_time,
    parse_date_expr,
    parse_date_key,
    shift_months,
    week_start
  };

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn week_starts_on_sunday() {
    // 2026-10-21 is a Wednesday.
    assert_eq!(
      week_start(date(2026, 10, 21)),
      date(2026, 10, 18)
    );
    assert_eq!(
      week_start(date(2026, 10, 18)),
      date(2026, 10, 18)
    );
  }

  #[test]
  fn rejects_unpadded_date_keys() {
    assert!(
      parse_date_key("2026-1-05")
        .is_err()
    );
    assert_eq!(
      parse_date_key("2026-01-05")
        .expect("padded key"),
      date(2026, 1, 5)
    );
  }

  #[test]
  fn parses_weekday_name() {
    // 2026-10-19 is a Monday.
    let today = date(2026, 10, 19);
    assert_eq!(
      parse_date_expr("wednesday", today)
        .expect("parse weekday"),
      date(2026, 10, 21)
    );
    assert_eq!(
      parse_date_expr("monday", today)
        .expect("parse weekday"),
      date(2026, 10, 26)
    );
  }

  #[test]
  fn parses_relative_days() {
    let today = date(2026, 10, 19);
    assert_eq!(
      parse_date_expr("+3d", today)
        .expect("parse relative"),
      date(2026, 10, 22)
    );
    assert_eq!(
      parse_date_expr("yesterday", today)
        .expect("parse yesterday"),
      date(2026, 10, 18)
    );
  }

  #[test]
  fn parses_clock_time() {
    let t = parse_clock_time("3:23pm")
      .expect("parse pm");
    assert_eq!(
      t.format("%H:%M").to_string(),
      "15:23"
    );
    assert!(
      parse_clock_time("24:00").is_err()
    );
    assert!(
      parse_clock_time("noon").is_err()
    );
  }

  #[test]
  fn month_shift_clamps_day() {
    assert_eq!(
      shift_months(date(2026, 1, 31), 1),
      date(2026, 2, 28)
    );
    assert_eq!(
      shift_months(date(2026, 1, 15), -1),
      date(2025, 12, 15)
    );
    assert_eq!(
      days_in_month(2028, 2).len(),
      29
    );
  }
}

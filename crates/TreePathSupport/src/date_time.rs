//! # Precision-Aware Temporal Values
//!
//! Dates, times and date-times in path expressions may be partial (`@2020`,
//! `@2020-03`, `@T10`). The types here keep track of which components were
//! written, compare only as far as both sides are specified, and support the
//! calendar arithmetic used by `date + 1 month` style expressions.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};

/// Finest component present in a temporal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemporalPrecision {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

/// Units accepted on the right-hand side of temporal arithmetic.
///
/// Both the calendar keywords (`year`, `months`, ...) and the corresponding UCUM
/// codes (`'a'`, `'mo'`, ...) are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarUnit {
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

impl CalendarUnit {
    pub fn parse(unit: &str) -> Option<Self> {
        match unit {
            "year" | "years" | "a" => Some(CalendarUnit::Year),
            "month" | "months" | "mo" => Some(CalendarUnit::Month),
            "week" | "weeks" | "wk" => Some(CalendarUnit::Week),
            "day" | "days" | "d" => Some(CalendarUnit::Day),
            "hour" | "hours" | "h" => Some(CalendarUnit::Hour),
            "minute" | "minutes" | "min" => Some(CalendarUnit::Minute),
            "second" | "seconds" | "s" => Some(CalendarUnit::Second),
            "millisecond" | "milliseconds" | "ms" => Some(CalendarUnit::Millisecond),
            _ => None,
        }
    }

    fn is_time_of_day(self) -> bool {
        matches!(
            self,
            CalendarUnit::Hour
                | CalendarUnit::Minute
                | CalendarUnit::Second
                | CalendarUnit::Millisecond
        )
    }

    /// Whole days represented by `amount` of a sub-day unit, truncated toward zero.
    fn as_whole_days(self, amount: i64) -> i64 {
        match self {
            CalendarUnit::Hour => amount / 24,
            CalendarUnit::Minute => amount / (24 * 60),
            CalendarUnit::Second => amount / (24 * 60 * 60),
            CalendarUnit::Millisecond => amount / (24 * 60 * 60 * 1000),
            _ => amount,
        }
    }
}

/// Compares component lists from most to least significant.
///
/// When every component present on both sides is equal but one side specifies
/// more components than the other, the ordering is indeterminate.
fn compare_components(left: &[Option<i64>], right: &[Option<i64>]) -> Option<Ordering> {
    for (l, r) in left.iter().zip(right.iter()) {
        match (l, r) {
            (Some(l), Some(r)) => match l.cmp(r) {
                Ordering::Equal => continue,
                other => return Some(other),
            },
            (None, None) => return Some(Ordering::Equal),
            _ => return None,
        }
    }
    Some(Ordering::Equal)
}

fn shift(datetime: NaiveDateTime, amount: i64, unit: CalendarUnit) -> Option<NaiveDateTime> {
    let months = |count: i64| -> Option<NaiveDateTime> {
        let magnitude = Months::new(u32::try_from(count.unsigned_abs()).ok()?);
        if count >= 0 {
            datetime.checked_add_months(magnitude)
        } else {
            datetime.checked_sub_months(magnitude)
        }
    };
    let delta = match unit {
        CalendarUnit::Year => return months(amount.checked_mul(12)?),
        CalendarUnit::Month => return months(amount),
        CalendarUnit::Week => TimeDelta::try_weeks(amount)?,
        CalendarUnit::Day => TimeDelta::try_days(amount)?,
        CalendarUnit::Hour => TimeDelta::try_hours(amount)?,
        CalendarUnit::Minute => TimeDelta::try_minutes(amount)?,
        CalendarUnit::Second => TimeDelta::try_seconds(amount)?,
        CalendarUnit::Millisecond => TimeDelta::try_milliseconds(amount)?,
    };
    datetime.checked_add_signed(delta)
}

/// A calendar date with year, year-month or full precision.
///
/// # Examples
/// ```rust
/// use treepath_support::{PrecisionDate, TemporalPrecision};
///
/// let date = PrecisionDate::parse("@2023-03").unwrap();
/// assert_eq!(date.precision(), TemporalPrecision::Month);
/// assert_eq!(date.to_string(), "2023-03");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrecisionDate {
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
    original_string: Arc<str>,
}

impl PrecisionDate {
    /// Parses `YYYY`, `YYYY-MM` or `YYYY-MM-DD`, with an optional leading `@`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.strip_prefix('@').unwrap_or(s);
        let parts: Vec<&str> = s.split('-').collect();
        if parts.is_empty() || parts.len() > 3 || parts[0].len() != 4 {
            return None;
        }
        let year = parts[0].parse::<i32>().ok()?;
        let month = match parts.get(1) {
            Some(m) if m.len() == 2 => Some(m.parse::<u32>().ok().filter(|m| (1..=12).contains(m))?),
            Some(_) => return None,
            None => None,
        };
        let day = match parts.get(2) {
            Some(d) if d.len() == 2 => {
                let day = d.parse::<u32>().ok()?;
                NaiveDate::from_ymd_opt(year, month?, day)?;
                Some(day)
            }
            Some(_) => return None,
            None => None,
        };
        Some(Self {
            year,
            month,
            day,
            original_string: Arc::from(s),
        })
    }

    /// Builds a date from a chrono date, keeping only the components `precision` names.
    pub fn from_naive(date: NaiveDate, precision: TemporalPrecision) -> Self {
        let (month, day, text) = match precision {
            TemporalPrecision::Year => (None, None, format!("{:04}", date.year())),
            TemporalPrecision::Month => (
                Some(date.month()),
                None,
                format!("{:04}-{:02}", date.year(), date.month()),
            ),
            _ => (
                Some(date.month()),
                Some(date.day()),
                date.format("%Y-%m-%d").to_string(),
            ),
        };
        Self {
            year: date.year(),
            month,
            day,
            original_string: Arc::from(text),
        }
    }

    pub fn precision(&self) -> TemporalPrecision {
        match (self.month, self.day) {
            (None, _) => TemporalPrecision::Year,
            (Some(_), None) => TemporalPrecision::Month,
            (Some(_), Some(_)) => TemporalPrecision::Day,
        }
    }

    pub fn original_string(&self) -> &str {
        &self.original_string
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Option<u32> {
        self.month
    }

    pub fn day(&self) -> Option<u32> {
        self.day
    }

    /// Converts to a chrono date, filling missing components with 1.
    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month.unwrap_or(1), self.day.unwrap_or(1))
    }

    fn components(&self) -> [Option<i64>; 3] {
        [
            Some(i64::from(self.year)),
            self.month.map(i64::from),
            self.day.map(i64::from),
        ]
    }

    /// Compares two dates as far as both are specified.
    /// Returns None if the answer depends on components only one side has.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        compare_components(&self.components(), &other.components())
    }

    /// Adds `amount` of `unit`, keeping this date's precision.
    ///
    /// Sub-day units are applied as whole days.
    pub fn add_calendar(&self, amount: i64, unit: CalendarUnit) -> Option<Self> {
        let (amount, unit) = if unit.is_time_of_day() {
            (unit.as_whole_days(amount), CalendarUnit::Day)
        } else {
            (amount, unit)
        };
        let start = self.to_naive_date()?.and_hms_opt(0, 0, 0)?;
        let shifted = shift(start, amount, unit)?;
        Some(Self::from_naive(shifted.date(), self.precision()))
    }
}

impl fmt::Display for PrecisionDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original_string)
    }
}

/// A time of day with hour through millisecond precision. Never carries a timezone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrecisionTime {
    hour: u32,
    minute: Option<u32>,
    second: Option<u32>,
    millisecond: Option<u32>,
    original_string: Arc<str>,
}

impl PrecisionTime {
    /// Parses `HH`, `HH:MM`, `HH:MM:SS` or `HH:MM:SS.fff`, with optional `@` and `T` prefixes.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.strip_prefix('@').unwrap_or(s);
        let s = s.strip_prefix('T').unwrap_or(s);
        if s.contains(['+', '-', 'Z']) {
            return None;
        }

        let parts: Vec<&str> = s.split(':').collect();
        if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.len() < 2) {
            return None;
        }
        let hour = parts[0].parse::<u32>().ok().filter(|h| *h < 24)?;
        let minute = match parts.get(1) {
            Some(m) => Some(m.parse::<u32>().ok().filter(|m| *m < 60)?),
            None => None,
        };
        let (second, millisecond) = match parts.get(2) {
            Some(sec) => {
                let (whole, fraction) = match sec.split_once('.') {
                    Some((whole, fraction)) => (whole, Some(fraction)),
                    None => (*sec, None),
                };
                let second = whole.parse::<u32>().ok().filter(|s| *s < 60)?;
                let millisecond = match fraction {
                    Some(digits) if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) => {
                        let padded = format!("{:0<3}", &digits[..digits.len().min(3)]);
                        Some(padded.parse::<u32>().ok()?)
                    }
                    Some(_) => return None,
                    None => None,
                };
                (Some(second), millisecond)
            }
            None => (None, None),
        };
        Some(Self {
            hour,
            minute,
            second,
            millisecond,
            original_string: Arc::from(s),
        })
    }

    pub fn from_naive(time: NaiveTime, precision: TemporalPrecision) -> Self {
        let millis = time.nanosecond() / 1_000_000;
        let (minute, second, millisecond, pattern) = match precision {
            TemporalPrecision::Hour => (None, None, None, "%H"),
            TemporalPrecision::Minute => (Some(time.minute()), None, None, "%H:%M"),
            TemporalPrecision::Millisecond => (
                Some(time.minute()),
                Some(time.second()),
                Some(millis),
                "%H:%M:%S%.3f",
            ),
            _ => (Some(time.minute()), Some(time.second()), None, "%H:%M:%S"),
        };
        Self {
            hour: time.hour(),
            minute,
            second,
            millisecond,
            original_string: Arc::from(time.format(pattern).to_string()),
        }
    }

    pub fn precision(&self) -> TemporalPrecision {
        match (self.minute, self.second, self.millisecond) {
            (None, _, _) => TemporalPrecision::Hour,
            (Some(_), None, _) => TemporalPrecision::Minute,
            (Some(_), Some(_), None) => TemporalPrecision::Second,
            (Some(_), Some(_), Some(_)) => TemporalPrecision::Millisecond,
        }
    }

    pub fn original_string(&self) -> &str {
        &self.original_string
    }

    pub fn to_naive_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_milli_opt(
            self.hour,
            self.minute.unwrap_or(0),
            self.second.unwrap_or(0),
            self.millisecond.unwrap_or(0),
        )
    }

    // Seconds and milliseconds are a single precision level for comparison.
    fn components(&self) -> [Option<i64>; 3] {
        [
            Some(i64::from(self.hour)),
            self.minute.map(i64::from),
            self.second
                .map(|s| i64::from(s) * 1000 + i64::from(self.millisecond.unwrap_or(0))),
        ]
    }

    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        compare_components(&self.components(), &other.components())
    }

    /// Adds a time-of-day quantity, wrapping around midnight.
    /// Calendar units (year through day) are not defined for times.
    pub fn add_calendar(&self, amount: i64, unit: CalendarUnit) -> Option<Self> {
        if !unit.is_time_of_day() {
            return None;
        }
        let anchor = NaiveDate::from_ymd_opt(2000, 1, 1)?.and_time(self.to_naive_time()?);
        let shifted = shift(anchor, amount, unit)?;
        Some(Self::from_naive(shifted.time(), self.precision()))
    }
}

impl fmt::Display for PrecisionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original_string)
    }
}

/// A date with an optional time of day and an optional UTC offset in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrecisionDateTime {
    date: PrecisionDate,
    time: Option<PrecisionTime>,
    timezone_offset: Option<i32>,
    original_string: Arc<str>,
}

impl PrecisionDateTime {
    /// Parses `DATE[T[TIME][TZ]]` where TZ is `Z` or `+hh:mm`/`-hh:mm`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.strip_prefix('@').unwrap_or(s);
        let (date_part, rest) = match s.split_once('T') {
            Some((date, rest)) => (date, Some(rest)),
            None => (s, None),
        };
        let date = PrecisionDate::parse(date_part)?;

        let (time, timezone_offset) = match rest {
            None | Some("") => (None, None),
            Some(rest) => {
                let (time_part, offset) = split_timezone(rest)?;
                let time = PrecisionTime::parse(time_part)?;
                if date.precision() != TemporalPrecision::Day {
                    return None;
                }
                (Some(time), offset)
            }
        };
        Some(Self {
            date,
            time,
            timezone_offset,
            original_string: Arc::from(s),
        })
    }

    /// Parses a `Z`, `+hh:mm` or `-hh:mm` suffix into minutes east of UTC.
    pub fn parse_timezone_offset(tz: &str) -> Option<i32> {
        if tz == "Z" {
            return Some(0);
        }
        let sign = match tz.chars().next()? {
            '+' => 1,
            '-' => -1,
            _ => return None,
        };
        let (hours, minutes) = tz[1..].split_once(':')?;
        if hours.len() != 2 || minutes.len() != 2 {
            return None;
        }
        let hours = hours.parse::<i32>().ok().filter(|h| *h <= 14)?;
        let minutes = minutes.parse::<i32>().ok().filter(|m| *m < 60)?;
        Some(sign * (hours * 60 + minutes))
    }

    /// Promotes a date to a date-time with the same precision.
    pub fn from_date(date: &PrecisionDate) -> Self {
        Self {
            original_string: Arc::from(format!("{}T", date.original_string())),
            date: date.clone(),
            time: None,
            timezone_offset: None,
        }
    }

    pub fn from_naive(
        datetime: NaiveDateTime,
        precision: TemporalPrecision,
        timezone_offset: Option<i32>,
    ) -> Self {
        let date = PrecisionDate::from_naive(datetime.date(), precision);
        let time = (precision >= TemporalPrecision::Hour)
            .then(|| PrecisionTime::from_naive(datetime.time(), precision));
        let mut text = date.original_string().to_string();
        text.push('T');
        if let Some(time) = &time {
            text.push_str(time.original_string());
            if let Some(offset) = timezone_offset {
                text.push_str(&format_offset(offset));
            }
        }
        Self {
            date,
            timezone_offset: time.as_ref().and(timezone_offset),
            time,
            original_string: Arc::from(text),
        }
    }

    pub fn precision(&self) -> TemporalPrecision {
        match &self.time {
            Some(time) => time.precision(),
            None => self.date.precision(),
        }
    }

    pub fn original_string(&self) -> &str {
        &self.original_string
    }

    pub fn date(&self) -> &PrecisionDate {
        &self.date
    }

    pub fn time(&self) -> Option<&PrecisionTime> {
        self.time.as_ref()
    }

    pub fn timezone_offset(&self) -> Option<i32> {
        self.timezone_offset
    }

    /// Local date and time with missing components defaulted.
    pub fn to_naive_datetime(&self) -> Option<NaiveDateTime> {
        let time = match &self.time {
            Some(time) => time.to_naive_time()?,
            None => NaiveTime::from_hms_opt(0, 0, 0)?,
        };
        Some(self.date.to_naive_date()?.and_time(time))
    }

    // Expressed in UTC when an offset is known and the value carries a time.
    fn components(&self) -> Option<[Option<i64>; 6]> {
        let normalized = match (self.timezone_offset, &self.time) {
            (Some(offset), Some(_)) => {
                let utc = self.to_naive_datetime()? - TimeDelta::try_minutes(i64::from(offset))?;
                Self::from_naive(utc, self.precision(), None)
            }
            _ => self.clone(),
        };
        let [year, month, day] = normalized.date.components();
        let [hour, minute, second] = match &normalized.time {
            Some(time) => time.components(),
            None => [None, None, None],
        };
        Some([year, month, day, hour, minute, second])
    }

    /// Precision and timezone aware comparison.
    ///
    /// Offsets are only applied when both values carry one; otherwise both are
    /// compared as local times.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        if self.timezone_offset.is_some() && other.timezone_offset.is_some() {
            compare_components(&self.components()?, &other.components()?)
        } else {
            let strip = |dt: &Self| Self {
                timezone_offset: None,
                ..dt.clone()
            };
            compare_components(&strip(self).components()?, &strip(other).components()?)
        }
    }

    pub fn add_calendar(&self, amount: i64, unit: CalendarUnit) -> Option<Self> {
        let shifted = shift(self.to_naive_datetime()?, amount, unit)?;
        Some(Self::from_naive(shifted, self.precision(), self.timezone_offset))
    }
}

fn split_timezone(rest: &str) -> Option<(&str, Option<i32>)> {
    if let Some(time) = rest.strip_suffix('Z') {
        return Some((time, Some(0)));
    }
    match rest.find(['+', '-']) {
        Some(index) => {
            let offset = PrecisionDateTime::parse_timezone_offset(&rest[index..])?;
            Some((&rest[..index], Some(offset)))
        }
        None => Some((rest, None)),
    }
}

fn format_offset(offset: i32) -> String {
    if offset == 0 {
        return "Z".to_string();
    }
    let sign = if offset < 0 { '-' } else { '+' };
    let offset = offset.abs();
    format!("{}{:02}:{:02}", sign, offset / 60, offset % 60)
}

impl fmt::Display for PrecisionDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_parse_precision() {
        assert_eq!(PrecisionDate::parse("2020").unwrap().precision(), TemporalPrecision::Year);
        assert_eq!(PrecisionDate::parse("@2020-02").unwrap().precision(), TemporalPrecision::Month);
        assert_eq!(PrecisionDate::parse("2020-02-29").unwrap().precision(), TemporalPrecision::Day);
        assert!(PrecisionDate::parse("2021-02-29").is_none());
        assert!(PrecisionDate::parse("2020-13").is_none());
        assert!(PrecisionDate::parse("20").is_none());
    }

    #[test]
    fn test_date_compare_with_mixed_precision() {
        let year = PrecisionDate::parse("2020").unwrap();
        let month = PrecisionDate::parse("2020-05").unwrap();
        let later = PrecisionDate::parse("2021-01").unwrap();
        assert_eq!(year.compare(&month), None);
        assert_eq!(month.compare(&later), Some(Ordering::Less));
        assert_eq!(later.compare(&year), Some(Ordering::Greater));
    }

    #[test]
    fn test_time_parse_and_compare() {
        let t1 = PrecisionTime::parse("T10:30:00").unwrap();
        let t2 = PrecisionTime::parse("10:30:00.000").unwrap();
        let t3 = PrecisionTime::parse("10:30").unwrap();
        assert_eq!(t1.precision(), TemporalPrecision::Second);
        assert_eq!(t2.precision(), TemporalPrecision::Millisecond);
        assert_eq!(t1.compare(&t2), Some(Ordering::Equal));
        assert_eq!(t1.compare(&t3), None);
        assert!(PrecisionTime::parse("10:30Z").is_none());
        assert!(PrecisionTime::parse("25").is_none());
    }

    #[test]
    fn test_datetime_timezone_comparison() {
        let utc = PrecisionDateTime::parse("2020-01-01T10:00:00Z").unwrap();
        let plus_two = PrecisionDateTime::parse("2020-01-01T12:00:00+02:00").unwrap();
        assert_eq!(plus_two.timezone_offset(), Some(120));
        assert_eq!(utc.compare(&plus_two), Some(Ordering::Equal));

        let date_only = PrecisionDateTime::parse("2020-01-01T").unwrap();
        assert_eq!(date_only.precision(), TemporalPrecision::Day);
        assert_eq!(date_only.compare(&utc), None);
    }

    #[test]
    fn test_month_arithmetic_clamps_day() {
        let date = PrecisionDate::parse("2020-01-31").unwrap();
        let next = date.add_calendar(1, CalendarUnit::Month).unwrap();
        assert_eq!(next.to_string(), "2020-02-29");

        let year = PrecisionDate::parse("2020").unwrap();
        assert_eq!(year.add_calendar(-2, CalendarUnit::Year).unwrap().to_string(), "2018");
    }

    #[test]
    fn test_time_arithmetic_wraps() {
        let time = PrecisionTime::parse("23:30").unwrap();
        assert_eq!(time.add_calendar(45, CalendarUnit::Minute).unwrap().to_string(), "00:15");
        assert!(time.add_calendar(1, CalendarUnit::Day).is_none());
    }

    #[test]
    fn test_datetime_arithmetic_keeps_offset() {
        let dt = PrecisionDateTime::parse("2020-12-31T23:00:00+01:00").unwrap();
        let shifted = dt.add_calendar(2, CalendarUnit::Hour).unwrap();
        assert_eq!(shifted.to_string(), "2021-01-01T01:00:00+01:00");
    }

    #[test]
    fn test_calendar_unit_aliases() {
        assert_eq!(CalendarUnit::parse("years"), Some(CalendarUnit::Year));
        assert_eq!(CalendarUnit::parse("mo"), Some(CalendarUnit::Month));
        assert_eq!(CalendarUnit::parse("kg"), None);
    }
}

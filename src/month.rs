//! Calendar month keys and the contiguous month windows used as chart x-axes.

use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Serialize, Serializer};
use time::{Date, Month};

use crate::{Error, date::parse_date, flatten::TransactionRecord, format::month_label};

/// Number of months shown when no month has been selected.
pub const TRAILING_WINDOW_MONTHS: i32 = 6;
/// Number of months shown either side of a selected month.
pub const CENTERED_WINDOW_RADIUS: i32 = 3;
/// How many months the month selector offers.
pub const AVAILABLE_MONTHS_LIMIT: usize = 6;

/// A calendar month, written as `"YYYY-MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    year: i32,
    /// 1-based month number.
    month: u8,
}

impl MonthKey {
    /// Create a month key, returning `None` if `month` is not in `1..=12`.
    pub fn new(year: i32, month: u8) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The month containing `date`.
    pub fn from_date(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month() as u8,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Month {
        // `month` is validated on construction.
        Month::try_from(self.month).unwrap_or(Month::January)
    }

    /// The month `offset` months after this one (before, if negative).
    pub fn add_months(self, offset: i32) -> Self {
        let index = self.year * 12 + i32::from(self.month) - 1 + offset;

        Self {
            year: index.div_euclid(12),
            month: (index.rem_euclid(12) + 1) as u8,
        }
    }

    /// The first day of the month.
    pub fn first_day(&self) -> Date {
        Date::from_calendar_date(self.year, self.month(), 1).unwrap_or(Date::MIN)
    }

    /// The last day of the month.
    pub fn last_day(&self) -> Date {
        self.add_months(1)
            .first_day()
            .previous_day()
            .unwrap_or(Date::MAX)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidMonth(text.to_owned());

        let (year, month) = text.trim().split_once('-').ok_or_else(invalid)?;

        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u8 = month.parse().map_err(|_| invalid())?;

        MonthKey::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One month on a chart axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthBucket {
    pub key: MonthKey,
    /// Short label such as "nov/24".
    pub label: String,
    /// The first day of the month.
    pub start: Date,
}

impl MonthBucket {
    fn new(key: MonthKey) -> Self {
        Self {
            key,
            label: month_label(key),
            start: key.first_day(),
        }
    }
}

/// Builds the contiguous, ascending months to aggregate over.
///
/// With an `anchor`, the window is the anchor month and three months either
/// side of it (seven months). Without one, it is the six months ending with
/// the month of `today`.
pub fn month_buckets(anchor: Option<MonthKey>, today: Date) -> Vec<MonthBucket> {
    let (first, count) = match anchor {
        Some(anchor) => (
            anchor.add_months(-CENTERED_WINDOW_RADIUS),
            2 * CENTERED_WINDOW_RADIUS + 1,
        ),
        None => (
            MonthKey::from_date(today).add_months(1 - TRAILING_WINDOW_MONTHS),
            TRAILING_WINDOW_MONTHS,
        ),
    };

    (0..count)
        .map(|offset| MonthBucket::new(first.add_months(offset)))
        .collect()
}

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Date,
    pub end: Date,
}

impl DateRange {
    /// The days of a single month.
    pub fn month(key: MonthKey) -> Self {
        Self {
            start: key.first_day(),
            end: key.last_day(),
        }
    }

    /// The days from the first to the last bucket, or `None` if `buckets` is empty.
    pub fn covering(buckets: &[MonthBucket]) -> Option<Self> {
        let first = buckets.first()?;
        let last = buckets.last()?;

        Some(Self {
            start: first.start,
            end: last.key.last_day(),
        })
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The most recent months that have at least one dated transaction, newest first.
pub fn available_months(records: &[TransactionRecord<'_>]) -> Vec<MonthKey> {
    let months: BTreeSet<MonthKey> = records
        .iter()
        .filter_map(|record| parse_date(record.transaction.date.as_deref()))
        .map(MonthKey::from_date)
        .collect();

    months
        .into_iter()
        .rev()
        .take(AVAILABLE_MONTHS_LIMIT)
        .collect()
}

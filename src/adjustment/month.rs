use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MonthFormatError;

/// A calendar month. Orders chronologically, which is also the text order of
/// its zero-padded `YYYY-MM` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, MonthFormatError> {
        if !(0..=9999).contains(&year) || !(1..=12).contains(&month) {
            return Err(MonthFormatError::new(format!("{}-{}", year, month)));
        }
        Ok(Self { year, month })
    }

    /// The month the host's local clock is currently in.
    pub fn current() -> Self {
        let today = Local::now().date_naive();
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Number of months from `self` to `later`; negative when `later` is earlier.
    pub fn months_until(self, later: YearMonth) -> i64 {
        (later.year as i64 - self.year as i64) * 12 + (later.month as i64 - self.month as i64)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = MonthFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MonthFormatError::new(s);

        let (year, month) = s.split_once('-').ok_or_else(err)?;
        if year.len() != 4
            || month.len() != 2
            || !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit())
        {
            return Err(err());
        }

        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        YearMonth::new(year, month).map_err(|_| err())
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Work a catch-up pass has to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingMonths {
    /// Nothing has ever been recorded: `to` becomes the unadjusted baseline.
    Baseline(YearMonth),
    /// Months to adjust, oldest first. Empty when already caught up.
    Adjust(Vec<YearMonth>),
}

impl PendingMonths {
    pub fn is_empty(&self) -> bool {
        matches!(self, PendingMonths::Adjust(months) if months.is_empty())
    }
}

/// Every month strictly after `from` through `to`, inclusive, in order.
/// A `from` at or after `to` yields an empty list.
pub fn pending_months(from: Option<YearMonth>, to: YearMonth) -> PendingMonths {
    let Some(from) = from else {
        return PendingMonths::Baseline(to);
    };

    let mut months = Vec::with_capacity(from.months_until(to).max(0) as usize);
    let mut current = from.next();
    while current <= to {
        months.push(current);
        current = current.next();
    }
    PendingMonths::Adjust(months)
}

//! Academic calendar settings.
//!
//! | variable | default |
//! |---|---|
//! | `ACADEMIC_YEAR_START` | `09-15` |
//! | `CALENDAR_HORIZON_YEARS` | `6` |
//! | `CALENDAR_CONSISTENCY_INTERVAL_SECS` | `86400` |
//! | `SCHEDULER_ENABLED` | `true` |

use chrono::{Datelike, NaiveDate};
use std::env;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalendarConfig {
    /// Month and day the academic year starts on
    pub academic_year_start: (u32, u32),
    /// Years generated ahead of the current academic year
    pub horizon_years: i32,
    pub consistency_interval: Duration,
    pub scheduler_enabled: bool,
}

impl CalendarConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let academic_year_start = env::var("ACADEMIC_YEAR_START")
            .ok()
            .and_then(|raw| parse_month_day(&raw))
            .unwrap_or(defaults.academic_year_start);
        let horizon_years = env::var("CALENDAR_HORIZON_YEARS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|years: &i32| *years >= 0)
            .unwrap_or(defaults.horizon_years);
        let consistency_interval = env::var("CALENDAR_CONSISTENCY_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|secs: &u64| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.consistency_interval);
        let scheduler_enabled = env::var("SCHEDULER_ENABLED")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no"))
            .unwrap_or(defaults.scheduler_enabled);

        Self {
            academic_year_start,
            horizon_years,
            consistency_interval,
            scheduler_enabled,
        }
    }

    /// Academic year `today` belongs to: the calendar year when the start
    /// boundary has been reached, the previous one otherwise.
    pub fn current_academic_year(&self, today: NaiveDate) -> i32 {
        let (month, day) = self.academic_year_start;
        if (today.month(), today.day()) >= (month, day) {
            today.year()
        } else {
            today.year() - 1
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            academic_year_start: (9, 15),
            horizon_years: 6,
            consistency_interval: Duration::from_secs(86_400),
            scheduler_enabled: true,
        }
    }
}

/// Parses `MM-DD`, rejecting dates that exist in no year.
fn parse_month_day(raw: &str) -> Option<(u32, u32)> {
    let (month, day) = raw.trim().split_once('-')?;
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    // 2024 is a leap year, so 02-29 is accepted
    NaiveDate::from_ymd_opt(2024, month, day).map(|_| (month, day))
}

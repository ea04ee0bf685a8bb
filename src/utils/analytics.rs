//! Study analytics derived from a user's full log list.
//!
//! Every figure is recomputed from scratch; nothing is maintained
//! incrementally. Calendar dates are taken in the caller's offset.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::models::study_log::{ActivityType, StudyLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[default]
    Week,
    Month,
    All,
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(Timeframe::Week),
            "month" => Ok(Timeframe::Month),
            "all" => Ok(Timeframe::All),
            other => Err(format!("Invalid timeframe: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityShare {
    pub activity_type: ActivityType,
    pub minutes: i64,
    pub sessions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayMinutes {
    pub day: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityMinutes {
    pub activity_type: ActivityType,
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMinutes {
    pub date: NaiveDate,
    pub weekday: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub timeframe: Timeframe,
    pub total_minutes: i64,
    pub streak_days: u32,
    pub average_session_minutes: i64,
    pub most_active_day: Option<WeekdayMinutes>,
    pub most_studied_activity: Option<ActivityMinutes>,
    pub distribution: Vec<ActivityShare>,
    pub daily: Vec<DailyMinutes>,
}

const WEEK_FROM_SUNDAY: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

fn local_date(log: &StudyLog, offset: &FixedOffset) -> NaiveDate {
    log.logged_at.with_timezone(offset).date_naive()
}

fn study_rows(logs: &[StudyLog]) -> impl Iterator<Item = &StudyLog> {
    logs.iter().filter(|log| !log.is_milestone())
}

pub fn filter_timeframe(logs: &[StudyLog], timeframe: Timeframe, now: DateTime<FixedOffset>) -> Vec<StudyLog> {
    let cutoff = match timeframe {
        Timeframe::All => return logs.to_vec(),
        Timeframe::Week => now - Duration::days(7),
        Timeframe::Month => now.checked_sub_months(Months::new(1)).unwrap_or(now),
    };
    logs.iter()
        .filter(|log| log.logged_at >= cutoff)
        .cloned()
        .collect()
}

/// Minutes across non-Milestone rows.
pub fn total_minutes(logs: &[StudyLog]) -> i64 {
    study_rows(logs).map(|log| i64::from(log.duration)).sum()
}

pub fn average_session_minutes(logs: &[StudyLog]) -> i64 {
    let (total, count) = study_rows(logs).fold((0i64, 0i64), |(total, count), log| {
        (total + i64::from(log.duration), count + 1)
    });
    if count == 0 {
        return 0;
    }
    (total as f64 / count as f64).round() as i64
}

/// Minutes and sessions per known activity type; unknown types are skipped.
pub fn activity_distribution(logs: &[StudyLog]) -> Vec<ActivityShare> {
    let mut shares: Vec<ActivityShare> = ActivityType::ALL
        .into_iter()
        .map(|activity_type| ActivityShare { activity_type, minutes: 0, sessions: 0 })
        .collect();

    for log in logs {
        if let Some(share) = shares.iter_mut().find(|s| s.activity_type.as_str() == log.activity_type) {
            share.minutes += i64::from(log.duration);
            share.sessions += 1;
        }
    }
    shares
}

/// Consecutive study days ending today or yesterday.
pub fn streak_days(logs: &[StudyLog], now: DateTime<FixedOffset>) -> u32 {
    let offset = *now.offset();
    let dates: BTreeSet<NaiveDate> = logs.iter().map(|log| local_date(log, &offset)).collect();

    let Some(&latest) = dates.last() else {
        return 0;
    };
    let today = now.date_naive();
    let yesterday = today - Duration::days(1);
    if latest != today && latest != yesterday {
        return 0;
    }

    let mut streak = 1;
    let mut expected = latest - Duration::days(1);
    for date in dates.iter().rev().skip(1) {
        if *date != expected {
            break;
        }
        streak += 1;
        expected = expected - Duration::days(1);
    }
    streak
}

pub fn most_active_day(logs: &[StudyLog], offset: &FixedOffset) -> Option<WeekdayMinutes> {
    let mut minutes = [0i64; 7];
    for log in study_rows(logs) {
        let weekday = local_date(log, offset).weekday();
        minutes[weekday.num_days_from_sunday() as usize] += i64::from(log.duration);
    }

    let mut best: Option<WeekdayMinutes> = None;
    for (day, total) in WEEK_FROM_SUNDAY.iter().zip(minutes) {
        if total > best.as_ref().map_or(0, |b| b.minutes) {
            best = Some(WeekdayMinutes { day: weekday_name(*day).to_string(), minutes: total });
        }
    }
    best
}

pub fn most_studied_activity(distribution: &[ActivityShare]) -> Option<ActivityMinutes> {
    let mut best: Option<ActivityMinutes> = None;
    for share in distribution {
        if share.minutes > best.as_ref().map_or(0, |b| b.minutes) {
            best = Some(ActivityMinutes { activity_type: share.activity_type, minutes: share.minutes });
        }
    }
    best
}

/// Seven entries, oldest first, ending with today.
pub fn daily_minutes(logs: &[StudyLog], now: DateTime<FixedOffset>) -> Vec<DailyMinutes> {
    let offset = *now.offset();
    let today = now.date_naive();

    let mut days: Vec<DailyMinutes> = (0..7)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            DailyMinutes {
                date,
                weekday: weekday_name(date.weekday())[..3].to_string(),
                minutes: 0,
            }
        })
        .collect();

    for log in study_rows(logs) {
        let date = local_date(log, &offset);
        if let Some(day) = days.iter_mut().find(|d| d.date == date) {
            day.minutes += i64::from(log.duration);
        }
    }
    days
}

pub fn build_report(logs: &[StudyLog], timeframe: Timeframe, now: DateTime<FixedOffset>) -> AnalyticsReport {
    let filtered = filter_timeframe(logs, timeframe, now);
    let distribution = activity_distribution(&filtered);

    AnalyticsReport {
        timeframe,
        total_minutes: total_minutes(&filtered),
        streak_days: streak_days(&filtered, now),
        average_session_minutes: average_session_minutes(&filtered),
        most_active_day: most_active_day(&filtered, now.offset()),
        most_studied_activity: most_studied_activity(&distribution),
        distribution,
        daily: daily_minutes(&filtered, now),
    }
}

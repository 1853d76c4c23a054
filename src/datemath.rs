use time::{Date, Duration, Month, OffsetDateTime};

use crate::db::{BirthdayRecord, PhoneNumberRecord};

/// The next calendar date on which `month`/`day` recurs, relative to
/// `today`. A same-day occurrence counts as not past, so a birthday today
/// resolves to today, not next year.
pub fn next_occurrence(month: u8, day: u8, today: Date) -> Date {
    let candidate = occurrence_in_year(today.year(), month, day);
    if candidate < today {
        occurrence_in_year(today.year() + 1, month, day)
    } else {
        candidate
    }
}

pub fn days_until_next_occurrence(month: u8, day: u8, today: Date) -> i64 {
    (next_occurrence(month, day, today) - today).whole_days()
}

pub fn days_til_label(days: i64) -> String {
    match days {
        0 => "It's today!".to_string(),
        1 => "It's tomorrow!".to_string(),
        _ => format!("{days} days"),
    }
}

/// Whether a reminder should fire right now: the owner is enabled, the
/// current UTC hour matches the owner's notification hour, and the next
/// occurrence is strictly inside the notification window.
pub fn is_due_now(phone: &PhoneNumberRecord, birthday: &BirthdayRecord, now: OffsetDateTime) -> bool {
    if !phone.enabled {
        return false;
    }
    if now.hour() != phone.notification_hour_utc {
        return false;
    }
    let days = days_until_next_occurrence(birthday.month, birthday.day, now.date());
    days < phone.notification_days
}

pub fn month_name(month: u8) -> &'static str {
    match clamp_month(month) {
        Month::January => "January",
        Month::February => "February",
        Month::March => "March",
        Month::April => "April",
        Month::May => "May",
        Month::June => "June",
        Month::July => "July",
        Month::August => "August",
        Month::September => "September",
        Month::October => "October",
        Month::November => "November",
        Month::December => "December",
    }
}

// Stored days are 1-31 regardless of month length, so the occurrence is
// anchored to the first of the month and the excess days roll forward:
// April 31 resolves to May 1, Feb 30 to March 1 (or March 2 outside leap
// years). Matches civil-time normalization.
fn occurrence_in_year(year: i32, month: u8, day: u8) -> Date {
    let first = Date::from_calendar_date(year, clamp_month(month), 1)
        .expect("first of a clock-derived year/month is a valid date");
    first.saturating_add(Duration::days(i64::from(day) - 1))
}

fn clamp_month(month: u8) -> Month {
    debug_assert!((1..=12).contains(&month), "month out of range: {month}");
    Month::try_from(month.clamp(1, 12)).expect("clamped month is in range")
}

use rusqlite::Connection;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::datemath;
use crate::db;
use crate::error::AppError;

/// One reminder for the delivery collaborator. The scan keeps no send
/// state: whatever is due at evaluation time is emitted, every time.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Reminder {
    pub phone_number: String,
    pub name: String,
    pub month: u8,
    pub day: u8,
    pub year: i32,
}

/// Scan all enabled (owner, birthday) pairs and keep the ones whose
/// notification window and hour gate are both satisfied at `now`.
pub fn scan_due(conn: &Connection, now: OffsetDateTime) -> Result<Vec<Reminder>, AppError> {
    let pairs = db::list_enabled_pairs(conn)?;
    let scanned = pairs.len();
    let mut reminders = Vec::new();
    for (phone, birthday) in pairs {
        debug_assert_eq!(phone.id, birthday.phone_number_id);
        if !datemath::is_due_now(&phone, &birthday, now) {
            continue;
        }
        debug!(
            birthday = birthday.id,
            verified = phone.verified,
            "due reminder"
        );
        reminders.push(Reminder {
            phone_number: phone.number,
            name: birthday.name,
            month: birthday.month,
            day: birthday.day,
            year: birthday.year,
        });
    }
    info!(scanned, due = reminders.len(), "reminder scan finished");
    Ok(reminders)
}

pub fn format_reminder(reminder: &Reminder) -> String {
    format!(
        "Sending reminder to {} for {}'s birthday on {}/{}/{}",
        reminder.phone_number, reminder.name, reminder.month, reminder.day, reminder.year
    )
}

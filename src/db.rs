use std::time::Duration;

use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Result};

pub const CURRENT_SCHEMA_VERSION: i64 = 1;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 1] = [Migration {
    version: 1,
    name: "baseline_reminder_schema_v1",
    sql: r#"
CREATE TABLE IF NOT EXISTS phone_numbers (
    id INTEGER PRIMARY KEY,
    phone_number TEXT NOT NULL UNIQUE,
    enabled INTEGER NOT NULL DEFAULT 1,
    notification_days INTEGER NOT NULL DEFAULT 7,
    notification_hour_utc INTEGER NOT NULL DEFAULT 14,
    verified INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS birthdays (
    id INTEGER PRIMARY KEY,
    phone_number_id INTEGER NOT NULL REFERENCES phone_numbers(id),
    name TEXT NOT NULL,
    month INTEGER NOT NULL,
    day INTEGER NOT NULL,
    year INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_birthdays_phone_number_id
    ON birthdays(phone_number_id);
"#,
}];

pub fn open_connection(path: &str) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    configure_connection(&conn)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.pragma_update(None::<DatabaseName>, "foreign_keys", "ON")?;
    conn.pragma_update(None::<DatabaseName>, "busy_timeout", 5000i64)?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> Result<()> {
    debug_assert_eq!(
        MIGRATIONS.last().map(|migration| migration.version),
        Some(CURRENT_SCHEMA_VERSION)
    );
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);
"#,
    )?;

    for migration in MIGRATIONS {
        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;

        if already_applied.is_some() {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
    }

    tx.commit()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumberRecord {
    pub id: i64,
    pub number: String,
    pub enabled: bool,
    pub notification_days: i64,
    pub notification_hour_utc: u8,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BirthdayRecord {
    pub id: i64,
    pub phone_number_id: i64,
    pub name: String,
    pub month: u8,
    pub day: u8,
    pub year: i32,
}

/// Insert-or-ignore: registering a number that already exists is a no-op,
/// not an error, so re-submitting the entry screen never duplicates rows.
pub fn upsert_phone_number(conn: &Connection, number: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO phone_numbers (phone_number, verified) VALUES (?1, 1)",
        params![number],
    )?;
    Ok(())
}

pub fn get_phone_number(conn: &Connection, number: &str) -> Result<Option<PhoneNumberRecord>> {
    conn.query_row(
        r#"
SELECT id, phone_number, enabled, notification_days, notification_hour_utc, verified
FROM phone_numbers
WHERE phone_number = ?1
"#,
        params![number],
        phone_number_from_row,
    )
    .optional()
}

/// All birthdays owned by `number`, in natural row order. Urgency sorting
/// happens in the list screen so the store order stays the stable tie-break.
pub fn list_birthdays_for_number(conn: &Connection, number: &str) -> Result<Vec<BirthdayRecord>> {
    let mut stmt = conn.prepare(
        r#"
SELECT birthdays.id, birthdays.phone_number_id, birthdays.name,
       birthdays.month, birthdays.day, birthdays.year
FROM birthdays
JOIN phone_numbers ON phone_numbers.id = birthdays.phone_number_id
WHERE phone_numbers.phone_number = ?1
ORDER BY birthdays.id
"#,
    )?;

    let mut rows = stmt.query(params![number])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(birthday_from_row(row)?);
    }
    Ok(result)
}

pub fn get_birthday(conn: &Connection, id: i64) -> Result<Option<BirthdayRecord>> {
    conn.query_row(
        r#"
SELECT id, phone_number_id, name, month, day, year
FROM birthdays
WHERE id = ?1
"#,
        params![id],
        birthday_from_row,
    )
    .optional()
}

/// Create a birthday for the owner registered as `number`. The owner row is
/// resolved by sub-select; a missing owner fails the NOT NULL constraint
/// rather than inserting an orphan.
pub fn insert_birthday(
    conn: &Connection,
    number: &str,
    name: &str,
    month: u8,
    day: u8,
    year: i32,
) -> Result<i64> {
    conn.execute(
        r#"
INSERT INTO birthdays (phone_number_id, name, month, day, year)
VALUES ((SELECT id FROM phone_numbers WHERE phone_number = ?1), ?2, ?3, ?4, ?5)
"#,
        params![number, name, month, day, year],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Mutate one existing row in place. Returns the number of rows changed so
/// callers can tell an update of a vanished id from a successful one.
pub fn update_birthday(
    conn: &Connection,
    id: i64,
    name: &str,
    month: u8,
    day: u8,
    year: i32,
) -> Result<usize> {
    conn.execute(
        r#"
UPDATE birthdays
SET name = ?2, month = ?3, day = ?4, year = ?5
WHERE id = ?1
"#,
        params![id, name, month, day, year],
    )
}

/// Every (owner, birthday) pair with notifications enabled. Due filtering
/// is date math, not SQL, so the scan sees the same calendar the list does.
pub fn list_enabled_pairs(conn: &Connection) -> Result<Vec<(PhoneNumberRecord, BirthdayRecord)>> {
    let mut stmt = conn.prepare(
        r#"
SELECT phone_numbers.id, phone_numbers.phone_number, phone_numbers.enabled,
       phone_numbers.notification_days, phone_numbers.notification_hour_utc,
       phone_numbers.verified,
       birthdays.id, birthdays.phone_number_id, birthdays.name,
       birthdays.month, birthdays.day, birthdays.year
FROM birthdays
JOIN phone_numbers ON phone_numbers.id = birthdays.phone_number_id
WHERE phone_numbers.enabled = 1
ORDER BY birthdays.id
"#,
    )?;

    let mut rows = stmt.query([])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let phone = PhoneNumberRecord {
            id: row.get(0)?,
            number: row.get(1)?,
            enabled: row.get(2)?,
            notification_days: row.get(3)?,
            notification_hour_utc: row.get(4)?,
            verified: row.get(5)?,
        };
        let birthday = BirthdayRecord {
            id: row.get(6)?,
            phone_number_id: row.get(7)?,
            name: row.get(8)?,
            month: row.get(9)?,
            day: row.get(10)?,
            year: row.get(11)?,
        };
        result.push((phone, birthday));
    }
    Ok(result)
}

fn phone_number_from_row(row: &rusqlite::Row<'_>) -> Result<PhoneNumberRecord> {
    Ok(PhoneNumberRecord {
        id: row.get(0)?,
        number: row.get(1)?,
        enabled: row.get(2)?,
        notification_days: row.get(3)?,
        notification_hour_utc: row.get(4)?,
        verified: row.get(5)?,
    })
}

fn birthday_from_row(row: &rusqlite::Row<'_>) -> Result<BirthdayRecord> {
    Ok(BirthdayRecord {
        id: row.get(0)?,
        phone_number_id: row.get(1)?,
        name: row.get(2)?,
        month: row.get(3)?,
        day: row.get(4)?,
        year: row.get(5)?,
    })
}

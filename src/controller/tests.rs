use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::{Flow, NavigationController};
use crate::bus::{CommandBus, SessionEvent};
use crate::db;
use crate::keymap::KeyMap;
use crate::screens::{Screen, StoreOutcome};

fn unique_db_path() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX_EPOCH")
        .as_nanos();
    std::env::temp_dir()
        .join(format!("bday-controller-{}.sqlite", nanos))
        .display()
        .to_string()
}

fn cleanup_db_files(path: &str) {
    for suffix in ["", "-wal", "-shm"] {
        let candidate = format!("{path}{suffix}");
        let _ = std::fs::remove_file(candidate);
    }
}

struct Session {
    controller: NavigationController,
    events: Receiver<SessionEvent>,
}

fn open_session(path: &str) -> Session {
    let conn = db::open_connection(path).expect("connection should open");
    let store = Arc::new(Mutex::new(conn));
    let (events_tx, events) = mpsc::channel();
    let bus = CommandBus::start(store, events_tx);
    Session {
        controller: NavigationController::new(bus, KeyMap::default()),
        events,
    }
}

fn press(session: &mut Session, code: KeyCode) -> Flow {
    session
        .controller
        .dispatch(SessionEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)))
}

fn type_text(session: &mut Session, text: &str) {
    for c in text.chars() {
        press(session, KeyCode::Char(c));
    }
}

/// Deliver the next store outcome into the controller, the way the session
/// loop would.
fn pump(session: &mut Session) -> Flow {
    let event = session
        .events
        .recv_timeout(Duration::from_secs(5))
        .expect("a store outcome should arrive");
    session.controller.dispatch(event)
}

fn register(session: &mut Session, suffix: &str) {
    type_text(session, suffix);
    press(session, KeyCode::Enter);
    pump(session); // PhoneNumberSaved -> navigate to the list
    pump(session); // BirthdaysFetched from the list's entry hook
}

#[test]
fn submitting_a_valid_number_registers_and_opens_the_list() {
    let path = unique_db_path();
    let mut session = open_session(&path);

    register(&mut session, "2025550143");

    match session.controller.screen() {
        Screen::BirthdayList(list) => {
            assert_eq!(list.owner, "+12025550143");
            assert!(list.rows.is_empty());
        }
        other => panic!("expected the birthday list, got {other:?}"),
    }

    let conn = db::open_connection(&path).expect("connection should open");
    let record = db::get_phone_number(&conn, "+12025550143")
        .expect("lookup should succeed")
        .expect("number should be registered");
    assert!(record.verified);

    cleanup_db_files(&path);
}

#[test]
fn an_invalid_number_stays_on_entry_with_an_inline_error() {
    let path = unique_db_path();
    let mut session = open_session(&path);

    type_text(&mut session, "202555");
    press(&mut session, KeyCode::Enter);

    match session.controller.screen() {
        Screen::PhoneEntry(entry) => {
            assert!(entry.error.is_some());
        }
        other => panic!("expected phone entry, got {other:?}"),
    }
    // No command was issued, so nothing arrives on the session channel.
    assert!(matches!(
        session.events.recv_timeout(Duration::from_millis(200)),
        Err(RecvTimeoutError::Timeout)
    ));

    cleanup_db_files(&path);
}

#[test]
fn resubmitting_the_same_number_keeps_one_row() {
    let path = unique_db_path();

    let mut first = open_session(&path);
    register(&mut first, "2025550143");
    drop(first);

    let mut second = open_session(&path);
    register(&mut second, "2025550143");
    drop(second);

    let conn = db::open_connection(&path).expect("connection should open");
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM phone_numbers WHERE phone_number = '+12025550143'",
            [],
            |row| row.get(0),
        )
        .expect("row count should be readable");
    assert_eq!(count, 1);

    cleanup_db_files(&path);
}

#[test]
fn the_create_flow_inserts_a_row_for_the_owner() {
    let path = unique_db_path();
    let mut session = open_session(&path);
    register(&mut session, "2025550143");

    press(&mut session, KeyCode::Char('c'));
    type_text(&mut session, "Grace");
    press(&mut session, KeyCode::Enter); // name -> month
    press(&mut session, KeyCode::Down); // January -> February
    press(&mut session, KeyCode::Enter); // month -> day
    type_text(&mut session, "9");
    press(&mut session, KeyCode::Enter); // day -> year
    type_text(&mut session, "1906");
    press(&mut session, KeyCode::Enter); // year -> confirm
    press(&mut session, KeyCode::Char('y'));

    pump(&mut session); // BirthdaySaved -> back to the list
    pump(&mut session); // refreshed rows

    match session.controller.screen() {
        Screen::BirthdayList(list) => {
            assert_eq!(list.rows.len(), 1);
            assert_eq!(list.rows[0].name, "Grace");
        }
        other => panic!("expected the birthday list, got {other:?}"),
    }

    let conn = db::open_connection(&path).expect("connection should open");
    let rows = db::list_birthdays_for_number(&conn, "+12025550143")
        .expect("listing should succeed");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].month, 2);
    assert_eq!(rows[0].day, 9);
    assert_eq!(rows[0].year, 1906);

    cleanup_db_files(&path);
}

#[test]
fn the_edit_flow_mutates_the_same_row() {
    let path = unique_db_path();
    let seeded_id = {
        let conn = db::open_connection(&path).expect("connection should open");
        db::upsert_phone_number(&conn, "+12025550143").expect("upsert should succeed");
        db::insert_birthday(&conn, "+12025550143", "Ada", 12, 10, 1990)
            .expect("insert should succeed")
    };

    let mut session = open_session(&path);
    register(&mut session, "2025550143");

    press(&mut session, KeyCode::Char('e'));
    pump(&mut session); // BirthdayFetched populates the drafts

    match session.controller.screen() {
        Screen::BirthdayEditor(editor) => {
            assert_eq!(editor.editing_id, seeded_id);
            assert_eq!(editor.draft_name, "Ada");
            assert_eq!(editor.draft_month, 12);
        }
        other => panic!("expected the editor, got {other:?}"),
    }

    type_text(&mut session, " Lovelace");
    press(&mut session, KeyCode::Enter); // name -> month
    press(&mut session, KeyCode::Enter); // month -> day
    press(&mut session, KeyCode::Enter); // day -> year
    press(&mut session, KeyCode::Enter); // year -> confirm
    press(&mut session, KeyCode::Char('y'));

    pump(&mut session); // BirthdaySaved
    pump(&mut session); // refreshed rows

    let conn = db::open_connection(&path).expect("connection should open");
    let rows = db::list_birthdays_for_number(&conn, "+12025550143")
        .expect("listing should succeed");
    assert_eq!(rows.len(), 1, "editing must never create a second row");
    assert_eq!(rows[0].id, seeded_id);
    assert_eq!(rows[0].name, "Ada Lovelace");

    cleanup_db_files(&path);
}

#[test]
fn declining_confirmation_persists_nothing() {
    let path = unique_db_path();
    let mut session = open_session(&path);
    register(&mut session, "2025550143");

    press(&mut session, KeyCode::Char('c'));
    type_text(&mut session, "Nobody");
    press(&mut session, KeyCode::Enter);
    press(&mut session, KeyCode::Enter);
    type_text(&mut session, "1");
    press(&mut session, KeyCode::Enter);
    type_text(&mut session, "2000");
    press(&mut session, KeyCode::Enter);
    press(&mut session, KeyCode::Char('n'));

    pump(&mut session); // only the list's refetch, no save outcome

    match session.controller.screen() {
        Screen::BirthdayList(list) => assert!(list.rows.is_empty()),
        other => panic!("expected the birthday list, got {other:?}"),
    }

    let conn = db::open_connection(&path).expect("connection should open");
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM birthdays", [], |row| row.get(0))
        .expect("birthday count should be readable");
    assert_eq!(count, 0);

    cleanup_db_files(&path);
}

#[test]
fn stale_outcomes_do_not_disturb_the_active_screen() {
    let path = unique_db_path();
    let mut session = open_session(&path);

    // A fetch result from a screen the user already left is ignored.
    let flow = session
        .controller
        .dispatch(SessionEvent::Store(StoreOutcome::BirthdaysFetched {
            owner: "+12025550143".to_string(),
            rows: Vec::new(),
        }));
    assert_eq!(flow, Flow::Continue);
    match session.controller.screen() {
        Screen::PhoneEntry(entry) => {
            assert_eq!(entry.draft_number, "+1");
            assert!(entry.error.is_none());
        }
        other => panic!("expected phone entry, got {other:?}"),
    }

    cleanup_db_files(&path);
}

#[test]
fn persistence_failures_surface_inline_and_are_recoverable() {
    let path = unique_db_path();
    let mut session = open_session(&path);

    let flow = session
        .controller
        .dispatch(SessionEvent::Store(StoreOutcome::Failed {
            message: "database is locked".to_string(),
        }));
    assert_eq!(flow, Flow::Continue);
    match session.controller.screen() {
        Screen::PhoneEntry(entry) => {
            assert_eq!(entry.error.as_deref(), Some("database is locked"));
        }
        other => panic!("expected phone entry, got {other:?}"),
    }

    // The session keeps working after the failure.
    register(&mut session, "2025550143");
    assert!(matches!(
        session.controller.screen(),
        Screen::BirthdayList(_)
    ));

    cleanup_db_files(&path);
}

#[test]
fn ctrl_c_always_quits() {
    let path = unique_db_path();
    let mut session = open_session(&path);

    let flow = session.controller.dispatch(SessionEvent::Key(KeyEvent::new(
        KeyCode::Char('c'),
        KeyModifiers::CONTROL,
    )));
    assert_eq!(flow, Flow::Quit);

    cleanup_db_files(&path);
}

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use rusqlite::Connection;
use tracing::debug;

use crate::db;
use crate::screens::{StoreCommand, StoreOutcome};

/// Everything a session reacts to flows through one serial stream:
/// keystrokes from the terminal, outcomes from the store worker, and the
/// end of the input source itself.
#[derive(Debug)]
pub enum SessionEvent {
    Key(crossterm::event::KeyEvent),
    Store(StoreOutcome),
    Resize,
    Closed,
}

/// Executes persistence commands off the interaction thread. Every
/// submitted command produces exactly one `SessionEvent::Store` on the
/// session channel; the screen that receives it decides whether the
/// outcome still applies.
pub struct CommandBus {
    commands: Option<Sender<StoreCommand>>,
    worker: Option<JoinHandle<()>>,
}

impl CommandBus {
    pub fn start(store: Arc<Mutex<Connection>>, events: Sender<SessionEvent>) -> Self {
        let (commands, queue) = mpsc::channel::<StoreCommand>();
        let worker = thread::spawn(move || run_worker(&store, &queue, &events));
        Self {
            commands: Some(commands),
            worker: Some(worker),
        }
    }

    pub fn submit(&self, command: StoreCommand) {
        if let Some(commands) = &self.commands {
            if commands.send(command).is_err() {
                debug!("store worker is gone; dropping command");
            }
        }
    }
}

impl Drop for CommandBus {
    fn drop(&mut self) {
        // Closing the queue lets the worker finish in-flight work and exit.
        self.commands.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker(
    store: &Mutex<Connection>,
    queue: &Receiver<StoreCommand>,
    events: &Sender<SessionEvent>,
) {
    while let Ok(command) = queue.recv() {
        let outcome = execute(store, command);
        if events.send(SessionEvent::Store(outcome)).is_err() {
            break;
        }
    }
}

fn execute(store: &Mutex<Connection>, command: StoreCommand) -> StoreOutcome {
    let conn = match store.lock() {
        Ok(conn) => conn,
        Err(poisoned) => poisoned.into_inner(),
    };
    match command {
        StoreCommand::UpsertPhoneNumber { number } => {
            match db::upsert_phone_number(&conn, &number) {
                Ok(()) => StoreOutcome::PhoneNumberSaved { number },
                Err(err) => failed(err),
            }
        }
        StoreCommand::FetchBirthdays { owner } => {
            match db::list_birthdays_for_number(&conn, &owner) {
                Ok(rows) => StoreOutcome::BirthdaysFetched { owner, rows },
                Err(err) => failed(err),
            }
        }
        StoreCommand::FetchBirthday { id } => match db::get_birthday(&conn, id) {
            Ok(Some(record)) => StoreOutcome::BirthdayFetched { id, record },
            Ok(None) => StoreOutcome::Failed {
                message: format!("birthday {id} no longer exists"),
            },
            Err(err) => failed(err),
        },
        StoreCommand::InsertBirthday {
            owner,
            name,
            month,
            day,
            year,
        } => match db::get_phone_number(&conn, &owner) {
            Ok(Some(_)) => match db::insert_birthday(&conn, &owner, &name, month, day, year) {
                Ok(_) => StoreOutcome::BirthdaySaved,
                Err(err) => failed(err),
            },
            Ok(None) => StoreOutcome::Failed {
                message: format!("phone number {owner} is not registered"),
            },
            Err(err) => failed(err),
        },
        StoreCommand::UpdateBirthday {
            id,
            name,
            month,
            day,
            year,
        } => match db::update_birthday(&conn, id, &name, month, day, year) {
            Ok(0) => StoreOutcome::Failed {
                message: format!("birthday {id} no longer exists"),
            },
            Ok(_) => StoreOutcome::BirthdaySaved,
            Err(err) => failed(err),
        },
    }
}

fn failed(err: rusqlite::Error) -> StoreOutcome {
    StoreOutcome::Failed {
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use super::{CommandBus, SessionEvent};
    use crate::db;
    use crate::screens::{StoreCommand, StoreOutcome};

    fn unique_db_path() -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before UNIX_EPOCH")
            .as_nanos();
        std::env::temp_dir()
            .join(format!("bday-bus-{}.sqlite", nanos))
            .display()
            .to_string()
    }

    fn cleanup_db_files(path: &str) {
        for suffix in ["", "-wal", "-shm"] {
            let candidate = format!("{path}{suffix}");
            let _ = std::fs::remove_file(candidate);
        }
    }

    fn recv_outcome(events: &mpsc::Receiver<SessionEvent>) -> StoreOutcome {
        match events
            .recv_timeout(Duration::from_secs(5))
            .expect("outcome should arrive")
        {
            SessionEvent::Store(outcome) => outcome,
            other => panic!("unexpected session event: {other:?}"),
        }
    }

    #[test]
    fn each_command_yields_exactly_one_outcome_in_order() {
        let path = unique_db_path();
        let conn = db::open_connection(&path).expect("connection should open");
        let store = Arc::new(Mutex::new(conn));
        let (events_tx, events) = mpsc::channel();
        let bus = CommandBus::start(store, events_tx);

        bus.submit(StoreCommand::UpsertPhoneNumber {
            number: "+12025550143".to_string(),
        });
        bus.submit(StoreCommand::FetchBirthdays {
            owner: "+12025550143".to_string(),
        });

        assert_eq!(
            recv_outcome(&events),
            StoreOutcome::PhoneNumberSaved {
                number: "+12025550143".to_string()
            }
        );
        assert_eq!(
            recv_outcome(&events),
            StoreOutcome::BirthdaysFetched {
                owner: "+12025550143".to_string(),
                rows: Vec::new()
            }
        );

        drop(bus);
        cleanup_db_files(&path);
    }

    #[test]
    fn storage_failures_come_back_as_messages_not_panics() {
        let path = unique_db_path();
        let conn = db::open_connection(&path).expect("connection should open");
        let store = Arc::new(Mutex::new(conn));
        let (events_tx, events) = mpsc::channel();
        let bus = CommandBus::start(store, events_tx);

        // No owner registered: the insert cannot resolve its target row.
        bus.submit(StoreCommand::InsertBirthday {
            owner: "+12025550143".to_string(),
            name: "Ada".to_string(),
            month: 12,
            day: 10,
            year: 1990,
        });

        assert!(matches!(
            recv_outcome(&events),
            StoreOutcome::Failed { .. }
        ));

        drop(bus);
        cleanup_db_files(&path);
    }

    #[test]
    fn fetching_a_missing_birthday_fails_recoverably() {
        let path = unique_db_path();
        let conn = db::open_connection(&path).expect("connection should open");
        let store = Arc::new(Mutex::new(conn));
        let (events_tx, events) = mpsc::channel();
        let bus = CommandBus::start(store, events_tx);

        bus.submit(StoreCommand::FetchBirthday { id: 42 });

        assert!(matches!(
            recv_outcome(&events),
            StoreOutcome::Failed { .. }
        ));

        drop(bus);
        cleanup_db_files(&path);
    }
}

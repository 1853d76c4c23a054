use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::bus::{CommandBus, SessionEvent};
use crate::controller::{Flow, NavigationController};
use crate::db;
use crate::error::AppError;
use crate::keymap::KeyMap;
use crate::ui;

/// Local interactive session: one controller, one terminal, one serial
/// event stream fed by the keyboard reader and the store worker.
pub fn run(db_path: &str, keymap: KeyMap) -> Result<(), AppError> {
    let conn = db::open_connection(db_path)?;
    let store = Arc::new(Mutex::new(conn));

    let (events_tx, events) = mpsc::channel();
    let bus = CommandBus::start(store, events_tx.clone());
    let mut controller = NavigationController::new(bus, keymap);

    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    let result = event_loop(&mut controller, &events, events_tx);
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
    let _ = disable_raw_mode();
    result
}

fn event_loop(
    controller: &mut NavigationController,
    events: &Receiver<SessionEvent>,
    events_tx: Sender<SessionEvent>,
) -> Result<(), AppError> {
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    thread::spawn(move || forward_terminal_events(&events_tx));

    terminal.draw(|frame| ui::draw(frame, controller.screen(), controller.keymap()))?;
    loop {
        let Ok(session_event) = events.recv() else {
            break;
        };
        let flow = controller.dispatch(session_event);
        terminal.draw(|frame| ui::draw(frame, controller.screen(), controller.keymap()))?;
        if flow == Flow::Quit {
            break;
        }
    }
    Ok(())
}

fn forward_terminal_events(events: &Sender<SessionEvent>) {
    loop {
        let forwarded = match event::read() {
            Ok(Event::Key(key)) => events.send(SessionEvent::Key(key)),
            Ok(Event::Resize(_, _)) => events.send(SessionEvent::Resize),
            Ok(_) => Ok(()),
            Err(_) => {
                let _ = events.send(SessionEvent::Closed);
                break;
            }
        };
        if forwarded.is_err() {
            break;
        }
    }
}
